use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, LocationConfig};
use crate::element_finder::{ElementFinder, Locator, LocatorChain, LocatorOutcome};
use crate::models::{CheckFailure, CheckResult, Stage};
use crate::scraper::{BrowserLauncher, PageSession};
use crate::snapshots::SnapshotStore;
use crate::utils::error::AppError;

const ENGLISH_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

const TURKISH_MONTHS: [&str; 12] = [
    "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran",
    "Temmuz", "Ağustos", "Eylül", "Ekim", "Kasım", "Aralık",
];

/// Runs one complete check and reports its outcome.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> CheckResult;
}

/// Calendar header texts that identify the month of `date`.
pub fn month_labels(date: NaiveDate) -> Vec<String> {
    let month = date.month0() as usize;
    vec![
        format!("{} {}", TURKISH_MONTHS[month], date.year()),
        format!("{} {}", ENGLISH_MONTHS[month], date.year()),
    ]
}

fn shows_month(header: &str, labels: &[String]) -> bool {
    labels.iter().any(|label| header.contains(label.as_str()))
}

/// Drives a browser from the landing page to the results view and
/// extracts the watched value.
pub struct PageNavigator {
    config: Arc<AppConfig>,
    launcher: Arc<dyn BrowserLauncher>,
    snapshots: SnapshotStore,
}

impl PageNavigator {
    pub fn new(config: Arc<AppConfig>, launcher: Arc<dyn BrowserLauncher>, snapshots: SnapshotStore) -> Self {
        Self {
            config,
            launcher,
            snapshots,
        }
    }

    /// One cycle. The browser session is closed on every exit path.
    pub async fn run_cycle(&self) -> CheckResult {
        info!("Starting new check...");

        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                error!("Error during site check: {}", e);
                return CheckResult::failure(Stage::Navigate, e.to_string());
            }
        };

        let mut stage = Stage::Navigate;
        let driven = AssertUnwindSafe(self.drive(session.as_mut(), &mut stage))
            .catch_unwind()
            .await;

        let result = match driven {
            Ok(Ok(value)) => CheckResult::success(value),
            Ok(Err(failure)) => {
                error!("Error during {}: {}", failure.stage, failure.message);
                self.snapshots.capture_timestamped(session.as_mut(), "error").await;
                failure.into()
            }
            Err(panic) => {
                let err = AppError::UnexpectedPageState(panic_message(panic.as_ref()));
                error!("Error during {}: {}", stage, err);
                self.snapshots.capture_timestamped(session.as_mut(), "error").await;
                CheckFailure::from_error(stage, &err).into()
            }
        };

        match session.close().await {
            Ok(()) => info!("Browser closed"),
            Err(e) => warn!("Browser did not close cleanly: {}", e),
        }

        result
    }

    async fn drive(&self, session: &mut dyn PageSession, stage: &mut Stage) -> Result<String, CheckFailure> {
        let browser = &self.config.browser;

        *stage = Stage::Navigate;
        info!("Navigating to {}", self.config.target.url);
        session
            .goto(&self.config.target.url, browser.navigation_timeout())
            .await
            .map_err(failed(Stage::Navigate))?;
        self.snapshots.capture(session, "initial_page").await;

        *stage = Stage::SetDeparture;
        self.set_location(session, Stage::SetDeparture, "departure", &self.config.route.departure)
            .await?;

        *stage = Stage::SetArrival;
        self.set_location(session, Stage::SetArrival, "arrival", &self.config.route.arrival)
            .await?;

        *stage = Stage::OpenCalendar;
        if self.open_calendar(session).await.is_resolved() {
            *stage = Stage::PickDate;
            self.pick_date(session).await;
        }

        *stage = Stage::SubmitSearch;
        self.submit_search(session).await?;

        *stage = Stage::ExtractResult;
        self.extract_result(session).await
    }

    /// Fill a location field and pick its suggestion, primary locator first.
    async fn set_location(
        &self,
        session: &mut dyn PageSession,
        stage: Stage,
        label: &str,
        location: &LocationConfig,
    ) -> Result<LocatorOutcome, CheckFailure> {
        let browser = &self.config.browser;
        let input = Locator::css(&location.input_selector);

        session
            .wait_for(&input, browser.element_timeout())
            .await
            .map_err(|_| not_found(stage, &location.input_selector))?;
        if !session.click(&input).await.map_err(failed(stage))? {
            return Err(not_found(stage, &location.input_selector));
        }
        info!("Clicked on {} input", label);

        session
            .type_text(&input, &location.text)
            .await
            .map_err(failed(stage))?;
        info!("Typed {} text: {}", label, location.text);

        let suggestions = Locator::first_visible(&self.config.route.suggestion_selector);
        if let Err(e) = session.wait_for(&suggestions, browser.ui_wait_timeout()).await {
            warn!("No {} suggestions appeared: {}", label, e);
        }
        self.snapshots.capture(session, &format!("{}_dropdown", label)).await;

        let chain = LocatorChain::new(format!("{} suggestion", label))
            .then("primary", Locator::xpath(&location.primary_xpath))
            .then("first-visible", suggestions);
        let outcome = ElementFinder::click_first(session, &chain).await;

        match &outcome {
            LocatorOutcome::Resolved { strategy, .. } if outcome.is_fallback() => {
                warn!(
                    "{} item {} not found; selected {} suggestion instead",
                    label, location.primary_xpath, strategy
                );
            }
            LocatorOutcome::Resolved { .. } => {
                info!("Clicked on {} dropdown item with XPath: {}", label, location.primary_xpath);
            }
            LocatorOutcome::Exhausted => {
                warn!("No {} suggestion could be selected; continuing", label);
            }
        }

        session.settle(browser.settle_delay()).await;
        Ok(outcome)
    }

    /// Open the date picker by its label, else the first date-like input.
    async fn open_calendar(&self, session: &mut dyn PageSession) -> LocatorOutcome {
        let calendar = &self.config.calendar;
        let chain = LocatorChain::new("date picker")
            .then("label", Locator::label_containing(&calendar.label_text))
            .then("date-input", Locator::css(&calendar.date_input_selector));

        let outcome = ElementFinder::click_first(session, &chain).await;
        match &outcome {
            LocatorOutcome::Resolved { strategy, .. } => {
                info!("Opened date picker via {}", strategy);
                let ready = Locator::css(&calendar.ready_selector);
                if let Err(e) = session.wait_for(&ready, self.config.browser.ui_wait_timeout()).await {
                    warn!("Date picker did not report ready: {}", e);
                }
                self.snapshots.capture(session, "calendar_open").await;
            }
            LocatorOutcome::Exhausted => {
                warn!(
                    "Could not find '{}' label or date inputs; continuing without date selection",
                    calendar.label_text
                );
            }
        }
        outcome
    }

    /// Select the target date: data attribute, then a day cell in the
    /// visible month, then forward month navigation before retrying.
    async fn pick_date(&self, session: &mut dyn PageSession) -> LocatorOutcome {
        let calendar = &self.config.calendar;
        let date = calendar.date;
        let labels = month_labels(date);
        let day_cell = Locator::day_cell(&calendar.day_cell_selector, date.day());

        let by_attribute = Locator::css(format!("td[data-date=\"{}\"]", date.format("%Y-%m-%d")));
        let mut outcome = LocatorOutcome::Exhausted;

        if try_click(session, &by_attribute).await {
            outcome = resolved("data-date", 0);
        } else {
            match self.header_text(session).await {
                None => {
                    warn!(
                        "Calendar header {} not readable; skipping month navigation",
                        calendar.header_selector
                    );
                }
                Some(text) if shows_month(&text, &labels) => {
                    if try_click(session, &day_cell).await {
                        outcome = resolved("day-cell", 1);
                    }
                }
                Some(_) => {
                    if self.advance_to_month(session, &labels).await && try_click(session, &day_cell).await {
                        outcome = resolved("day-cell-after-navigation", 2);
                    }
                }
            }
        }

        match &outcome {
            LocatorOutcome::Resolved { strategy, .. } => {
                info!("Selected {} from calendar via {}", date, strategy);
                session.settle(self.config.browser.settle_delay()).await;
                self.snapshots.capture(session, "after_date_selection").await;
            }
            LocatorOutcome::Exhausted => {
                warn!("Could not select {} after all attempts; continuing without date selection", date);
            }
        }
        outcome
    }

    /// Click "next month" until the header shows one of `labels`.
    async fn advance_to_month(&self, session: &mut dyn PageSession, labels: &[String]) -> bool {
        let calendar = &self.config.calendar;
        let next = Locator::css(&calendar.next_selector);

        for step in 1..=calendar.max_month_steps {
            if !try_click(session, &next).await {
                debug!("No next-month control after {} steps", step - 1);
                return false;
            }
            session.settle(self.config.browser.calendar_step_delay()).await;
            match self.header_text(session).await {
                Some(text) if shows_month(&text, labels) => {
                    debug!("Reached target month after {} steps", step);
                    return true;
                }
                Some(_) => {}
                None => {
                    debug!("Calendar header vanished after {} steps", step);
                    return false;
                }
            }
        }
        false
    }

    /// Current calendar header text; `None` when it cannot be read.
    async fn header_text(&self, session: &mut dyn PageSession) -> Option<String> {
        let header = Locator::css(&self.config.calendar.header_selector);
        match session.text_content(&header).await {
            Ok(text) => text,
            Err(e) => {
                debug!("Calendar header unreadable: {}", e);
                None
            }
        }
    }

    async fn submit_search(&self, session: &mut dyn PageSession) -> Result<(), CheckFailure> {
        let selector = &self.config.search.button_selector;
        let button = Locator::css(selector);

        session
            .wait_for(&button, self.config.browser.element_timeout())
            .await
            .map_err(|_| not_found(Stage::SubmitSearch, selector))?;
        if !session.click(&button).await.map_err(failed(Stage::SubmitSearch))? {
            return Err(not_found(Stage::SubmitSearch, selector));
        }
        info!("Clicked search button");

        self.snapshots.capture(session, "after_search").await;
        Ok(())
    }

    async fn extract_result(&self, session: &mut dyn PageSession) -> Result<String, CheckFailure> {
        let selector = &self.config.search.result_selector;
        let result = Locator::css(selector);
        let timeout = self.config.browser.result_timeout();

        session.wait_for(&result, timeout).await.map_err(|e| {
            warn!("Result wait ended: {}", e);
            CheckFailure::from_error(
                Stage::ExtractResult,
                &AppError::ExtractionTimeout {
                    selector: selector.clone(),
                    timeout_secs: timeout.as_secs(),
                },
            )
        })?;

        let value = session
            .text_content(&result)
            .await
            .map_err(failed(Stage::ExtractResult))?
            .ok_or_else(|| not_found(Stage::ExtractResult, selector))?;

        self.snapshots.capture_timestamped(session, "result").await;
        Ok(value.trim().to_string())
    }
}

#[async_trait]
impl CycleRunner for PageNavigator {
    async fn run_cycle(&self) -> CheckResult {
        PageNavigator::run_cycle(self).await
    }
}

fn failed(stage: Stage) -> impl Fn(AppError) -> CheckFailure {
    move |e| CheckFailure::from_error(stage, &e)
}

fn not_found(stage: Stage, selector: &str) -> CheckFailure {
    CheckFailure::from_error(
        stage,
        &AppError::ElementNotFound {
            stage,
            selector: selector.to_string(),
        },
    )
}

fn resolved(strategy: &str, position: usize) -> LocatorOutcome {
    LocatorOutcome::Resolved {
        strategy: strategy.to_string(),
        position,
    }
}

async fn try_click(session: &mut dyn PageSession, locator: &Locator) -> bool {
    match session.click(locator).await {
        Ok(clicked) => clicked,
        Err(e) => {
            debug!("Click on {} failed: {}", locator, e);
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "cycle panicked".to_string()
    }
}
