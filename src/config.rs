use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");
const DISCORD_WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub target: TargetConfig,
    pub route: RouteConfig,
    pub calendar: CalendarConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    pub scheduler: SchedulerConfig,
    pub browser: BrowserConfig,
    pub logging: LoggingConfig,
    pub screenshots: ScreenshotConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub departure: LocationConfig,
    pub arrival: LocationConfig,
    /// Suggestion list items; the first visible one is the fallback pick.
    pub suggestion_selector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub text: String,
    pub input_selector: String,
    pub primary_xpath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub date: NaiveDate,
    pub label_text: String,
    pub date_input_selector: String,
    pub header_selector: String,
    pub day_cell_selector: String,
    pub next_selector: String,
    pub ready_selector: String,
    pub max_month_steps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub button_selector: String,
    pub result_selector: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchConfig {
    pub expected_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout_secs: u64,
    pub element_timeout_secs: u64,
    pub result_timeout_secs: u64,
    pub ui_wait_timeout_ms: u64,
    pub settle_delay_ms: u64,
    pub calendar_step_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub file: PathBuf,
    pub filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub console: bool,
    pub desktop: bool,
    pub sound: bool,
    pub speech: bool,
    pub discord_webhook_url: Option<String>,
    pub discord_username: String,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_secs(self.result_timeout_secs)
    }

    pub fn ui_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.ui_wait_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn calendar_step_delay(&self) -> Duration {
        Duration::from_millis(self.calendar_step_delay_ms)
    }
}

impl AppConfig {
    /// Layered load: built-in defaults, `config/local`, an explicit file,
    /// then `TICKET_WATCHER__SECTION__KEY` environment variables.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = Config::builder()
            // Start with the compiled-in defaults
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let s = builder
            .add_source(
                Environment::with_prefix("TICKET_WATCHER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    /// The compiled-in defaults, without local files or environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate target
        match Url::parse(&self.target.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::Message("Invalid target URL format".into())),
        }

        // Validate route
        for (name, location) in [("departure", &self.route.departure), ("arrival", &self.route.arrival)] {
            if location.text.trim().is_empty() {
                return Err(ConfigError::Message(format!("Route {} text must not be empty", name)));
            }
            if location.primary_xpath.trim().is_empty() {
                return Err(ConfigError::Message(format!("Route {} primary_xpath must not be empty", name)));
            }
            Self::check_selector(&format!("route.{}.input_selector", name), &location.input_selector)?;
        }
        Self::check_selector("route.suggestion_selector", &self.route.suggestion_selector)?;

        // Validate calendar
        for (name, selector) in [
            ("calendar.date_input_selector", &self.calendar.date_input_selector),
            ("calendar.header_selector", &self.calendar.header_selector),
            ("calendar.day_cell_selector", &self.calendar.day_cell_selector),
            ("calendar.next_selector", &self.calendar.next_selector),
            ("calendar.ready_selector", &self.calendar.ready_selector),
        ] {
            Self::check_selector(name, selector)?;
        }

        if self.calendar.max_month_steps == 0 || self.calendar.max_month_steps > 12 {
            return Err(ConfigError::Message("Calendar max_month_steps must be between 1 and 12".into()));
        }

        // Validate search
        Self::check_selector("search.button_selector", &self.search.button_selector)?;
        Self::check_selector("search.result_selector", &self.search.result_selector)?;

        // Validate scheduler
        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Message("Scheduler interval_secs must be greater than 0".into()));
        }

        // Validate browser
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(ConfigError::Message("Browser window size must be greater than 0".into()));
        }

        if self.browser.navigation_timeout_secs == 0
            || self.browser.element_timeout_secs == 0
            || self.browser.result_timeout_secs == 0
        {
            return Err(ConfigError::Message("Browser timeouts must be greater than 0".into()));
        }

        // Validate logging
        if self.logging.file.file_name().is_none() {
            return Err(ConfigError::Message("Logging file must name a file".into()));
        }

        // Validate notifications
        if let Some(webhook_url) = &self.notifications.discord_webhook_url {
            if !webhook_url.starts_with(DISCORD_WEBHOOK_PREFIX) {
                return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
            }
        }

        Ok(())
    }

    fn check_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
        scraper::Selector::parse(selector)
            .map(|_| ())
            .map_err(|_| ConfigError::Message(format!("Invalid CSS selector in {}: {}", name, selector)))
    }
}
