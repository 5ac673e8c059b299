use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::{CaptureScreenshotFormatOption, Viewport};
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use std::ffi::OsStr;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tracing::debug;

use crate::config::BrowserConfig;
use crate::element_finder::Locator;
use crate::utils::error::{AppError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One live browser page. Every method is a bounded I/O step.
#[async_trait]
pub trait PageSession: Send {
    /// Load `url` and wait until the page reports it has settled.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until `locator` resolves, or fail after `timeout`.
    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<()>;

    /// Click the element if it exists; `Ok(false)` when nothing matched.
    async fn click(&mut self, locator: &Locator) -> Result<bool>;

    /// Focus the element and type `text` into it as key presses.
    async fn type_text(&mut self, locator: &Locator, text: &str) -> Result<()>;

    /// Trimmed text content of the element, `None` when it does not exist.
    async fn text_content(&mut self, locator: &Locator) -> Result<Option<String>>;

    /// Full-page PNG capture.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Pause for transient UI with no readiness signal.
    async fn settle(&mut self, delay: Duration) {
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    /// Release the browser. Called once per cycle on every exit path.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a fresh browser session for each cycle.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageSession>>;
}

pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(self.config.headless)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some((self.config.window_width, self.config.window_height)))
            .idle_browser_timeout(self.config.navigation_timeout() * 2)
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-setuid-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        // Set Chrome path if provided
        if let Some(chrome_path) = &self.config.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        Ok(launch_options)
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>> {
        let launch_options = self.launch_options()?;
        let default_timeout = self.config.element_timeout();

        let (browser, tab) = blocking(move || {
            let browser = Browser::new(launch_options)
                .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;
            let tab = browser
                .new_tab()
                .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;
            tab.set_default_timeout(default_timeout);
            Ok((browser, tab))
        })
        .await?;

        debug!("Browser launched");
        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab,
        }))
    }
}

pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromeSession {
    async fn evaluate(&self, script: String) -> Result<serde_json::Value> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            let result = tab.evaluate(&script, false).map_err(AppError::browser)?;
            Ok(result.value.unwrap_or(serde_json::Value::Null))
        })
        .await
    }

    async fn evaluate_bool(&self, script: String) -> Result<bool> {
        Ok(self.evaluate(script).await?.as_bool().unwrap_or(false))
    }

    /// Text of a CSS match taken from the rendered document.
    async fn css_text(&self, selector: &str) -> Result<Option<String>> {
        let tab = Arc::clone(&self.tab);
        let html_content = blocking(move || {
            tab.get_content()
                .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))
        })
        .await?;

        Ok(first_css_text(&html_content, selector))
    }
}

/// Trimmed text of the first element matching `selector` in `html`.
pub fn first_css_text(html: &str, selector: &str) -> Option<String> {
    let css_selector = Selector::parse(selector).ok()?;
    let document = Html::parse_document(html);
    document
        .select(&css_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn goto(&mut self, url: &str, limit: Duration) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        let navigation = blocking(move || {
            tab.set_default_timeout(limit);
            tab.navigate_to(&target).map_err(AppError::browser)?;
            tab.wait_until_navigated().map_err(AppError::browser)?;
            Ok(())
        });

        match timeout(limit, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(AppError::Browser(message))) if message.contains("timed out") || message.contains("Timeout") => {
                Err(AppError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_secs: limit.as_secs(),
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AppError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: limit.as_secs(),
            }),
        }
    }

    async fn wait_for(&mut self, locator: &Locator, limit: Duration) -> Result<()> {
        let script = locator.exists_script();
        let session = &*self;
        poll_until(&locator.to_string(), limit, move || session.evaluate_bool(script.clone())).await
    }

    async fn click(&mut self, locator: &Locator) -> Result<bool> {
        self.evaluate_bool(locator.click_script()).await
    }

    async fn type_text(&mut self, locator: &Locator, text: &str) -> Result<()> {
        if !self.evaluate_bool(locator.focus_script()).await? {
            return Err(AppError::UnexpectedPageState(format!("{} is not focusable", locator)));
        }

        let tab = Arc::clone(&self.tab);
        let text = text.to_string();
        blocking(move || {
            tab.type_str(&text).map_err(AppError::browser)?;
            Ok(())
        })
        .await
    }

    async fn text_content(&mut self, locator: &Locator) -> Result<Option<String>> {
        if let Locator::Css(selector) = locator {
            return self.css_text(selector).await;
        }

        let value = self.evaluate(locator.text_script()).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let size = self
            .evaluate(
                "JSON.stringify([document.documentElement.scrollWidth, document.documentElement.scrollHeight])"
                    .to_string(),
            )
            .await?;
        let (width, height) = size
            .as_str()
            .and_then(|raw| serde_json::from_str::<(f64, f64)>(raw).ok())
            .unwrap_or((0.0, 0.0));

        let clip = (width > 0.0 && height > 0.0).then_some(Viewport {
            x: 0.0,
            y: 0.0,
            width,
            height,
            scale: 1.0,
        });

        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, clip, true)
                .map_err(|e| AppError::Browser(format!("Screenshot capture failed: {}", e)))
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };

        let tab = Arc::clone(&self.tab);
        blocking(move || {
            if let Err(e) = tab.close(true) {
                debug!("Tab did not close cleanly: {}", e);
            }
            // Dropping the last handle terminates the Chrome process
            drop(browser);
            Ok(())
        })
        .await
    }
}

/// Poll `probe` until it reports true or `limit` elapses.
///
/// A failing probe counts as "not there yet": pages in mid-navigation reject
/// script evaluation until the new document is ready. Each probe is bounded by
/// the remaining time, and the last probe error is kept for the final message.
pub async fn poll_until<F, Fut>(what: &str, limit: Duration, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + limit;
    let mut last_error: Option<String> = None;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, probe()).await {
            Ok(Ok(true)) => return Ok(()),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                debug!("Probe for {} failed: {}", what, e);
                last_error = Some(e.to_string());
            }
            Err(_) => debug!("Probe for {} outlived the wait", what),
        }

        if Instant::now() >= deadline {
            let mut message = format!("{} did not appear within {}ms", what, limit.as_millis());
            if let Some(e) = last_error {
                message.push_str(&format!(" (last error: {})", e));
            }
            return Err(AppError::UnexpectedPageState(message));
        }
        sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now()))).await;
    }
}

/// Run a blocking headless_chrome call off the async worker threads.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Browser(format!("Browser task failed: {}", e)))?
}
