use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::traits::NotifierPlugin;
use crate::models::AlertEvent;

pub type NotifierPluginBox = Box<dyn NotifierPlugin>;

/// Fans each alert out to every registered notifier.
#[derive(Clone)]
pub struct PluginManager {
    notifiers: Arc<RwLock<Vec<NotifierPluginBox>>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a notifier plugin; a second plugin of the same type replaces the first
    pub async fn register_notifier(&self, plugin: NotifierPluginBox) {
        let mut notifiers = self.notifiers.write().await;
        notifiers.retain(|existing| existing.plugin_type() != plugin.plugin_type());
        debug!("Registered notifier: {}", plugin.name());
        notifiers.push(plugin);
    }

    /// List registered notifier types in registration order
    pub async fn list_notifier_types(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().await;
        notifiers.iter().map(|n| n.plugin_type().to_string()).collect()
    }

    /// Deliver `event` through every notifier. Failures are logged, never
    /// returned; the count of successful deliveries is.
    pub async fn alert_all(&self, event: &AlertEvent) -> usize {
        let notifiers = self.notifiers.read().await;
        let mut delivered = 0;

        for notifier in notifiers.iter() {
            match notifier.notify(event).await {
                Ok(result) if result.success => delivered += 1,
                Ok(result) => warn!(
                    "Notifier {} did not deliver: {}",
                    notifier.plugin_type(),
                    result.error.unwrap_or_default()
                ),
                Err(e) => warn!("Notifier {} failed: {}", notifier.plugin_type(), e),
            }
        }

        delivered
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
