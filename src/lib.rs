pub mod config;
pub mod element_finder;
pub mod logging;
pub mod models;
pub mod navigator;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod snapshots;
pub mod utils;
pub mod watcher;

// Re-export commonly used types
pub use config::AppConfig;
pub use navigator::{CycleRunner, PageNavigator};
pub use scheduler::CheckScheduler;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
