use async_trait::async_trait;
use tracing::warn;

use crate::models::AlertEvent;
use crate::plugins::traits::{NotificationResult, NotifierPlugin};
use crate::utils::error::AppError;

/// Prints a banner to stdout; always available, even on headless hosts.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }

    pub fn banner(event: &AlertEvent) -> String {
        format!("⚠️  [{}] {}", event.reason, event.summary())
    }
}

#[async_trait]
impl NotifierPlugin for ConsoleNotifier {
    fn name(&self) -> &str {
        "Console Notifier"
    }

    fn plugin_type(&self) -> &str {
        "console"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<NotificationResult, AppError> {
        println!("{}", Self::banner(event));
        warn!("Alert sent to console: {}", event.reason);
        Ok(NotificationResult::delivered())
    }
}
