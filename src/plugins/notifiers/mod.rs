// Notifier plugin implementations
pub mod console;
pub mod desktop;
pub mod discord;

pub use console::ConsoleNotifier;
pub use desktop::{AlertCommand, DesktopNotifier, DesktopOptions, PlatformAlerter};
pub use discord::{DiscordConfig, DiscordNotifier};
