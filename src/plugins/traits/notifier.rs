use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::AlertEvent;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered() -> Self {
        Self {
            success: true,
            message_id: None,
            error: None,
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

/// Trait for implementing alert channels (desktop, console, Discord, etc.)
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    /// Deliver one alert. Callers log failures and carry on.
    async fn notify(&self, event: &AlertEvent) -> Result<NotificationResult, AppError>;
}
