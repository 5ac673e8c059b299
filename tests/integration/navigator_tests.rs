use super::*;
use chrono::NaiveDate;
use ticket_watcher::element_finder::Locator;
use ticket_watcher::models::{CheckResult, Stage};

fn departure_primary(config: &AppConfig) -> Locator {
    Locator::xpath(&config.route.departure.primary_xpath)
}

fn arrival_primary(config: &AppConfig) -> Locator {
    Locator::xpath(&config.route.arrival.primary_xpath)
}

fn suggestion(config: &AppConfig) -> Locator {
    Locator::first_visible(&config.route.suggestion_selector)
}

fn date_attribute(date: NaiveDate) -> Locator {
    Locator::css(format!("td[data-date=\"{}\"]", date.format("%Y-%m-%d")))
}

fn day_cell(config: &AppConfig) -> Locator {
    Locator::day_cell(&config.calendar.day_cell_selector, 29)
}

#[tokio::test]
async fn test_full_cycle_extracts_trimmed_value() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let launcher = FakeLauncher::new(&config, vec![PageScript::with_result("(2)")]);
    let navigator = navigator(&config, launcher.clone());

    let result = navigator.run_cycle().await;

    assert_eq!(result, CheckResult::success("(2)"));
    assert_eq!(launcher.recorder.launches(), 1);
    assert_eq!(launcher.recorder.closes(), 1);
    assert!(launcher.recorder.clicked(&departure_primary(&config)));
    assert!(launcher.recorder.clicked(&arrival_primary(&config)));
    assert!(launcher.recorder.clicked(&date_attribute(config.calendar.date)));
    assert!(launcher.recorder.clicked(&Locator::css(&config.search.button_selector)));
    assert_eq!(
        *launcher.recorder.typed.lock().unwrap(),
        vec![config.route.departure.text.clone(), config.route.arrival.text.clone()]
    );

    let names = snapshot_names(&config);
    for step in [
        "initial_page.png",
        "departure_dropdown.png",
        "arrival_dropdown.png",
        "calendar_open.png",
        "after_date_selection.png",
        "after_search.png",
    ] {
        assert!(names.contains(&step.to_string()), "missing snapshot {}", step);
    }
    assert!(names.iter().any(|name| name.starts_with("result_")));
    assert!(!names.iter().any(|name| name.starts_with("error_")));
}

#[tokio::test]
async fn test_departure_primary_locator_falls_back_to_first_suggestion() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript::with_result("(2)").without(departure_primary(&config));
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    let result = navigator.run_cycle().await;

    // The cycle still reaches extraction
    assert_eq!(result, CheckResult::success("(2)"));
    assert!(!launcher.recorder.clicked(&departure_primary(&config)));
    assert!(launcher.recorder.clicked(&suggestion(&config)));
    assert!(launcher.recorder.clicked(&arrival_primary(&config)));
    assert_eq!(launcher.recorder.closes(), 1);
}

#[tokio::test]
async fn test_extraction_timeout_fails_with_snapshot() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript {
        result: None,
        ..PageScript::with_result("(2)")
    };
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    let result = navigator.run_cycle().await;

    match result {
        CheckResult::Failure { stage, message } => {
            assert_eq!(stage, Stage::ExtractResult);
            assert!(message.contains("did not appear within 30s"), "{}", message);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(snapshot_names(&config).iter().any(|name| name.starts_with("error_")));
    assert_eq!(launcher.recorder.closes(), 1);
}

#[tokio::test]
async fn test_navigation_failure_releases_browser_once() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript {
        navigation_fails: true,
        ..PageScript::with_result("(2)")
    };
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    let result = navigator.run_cycle().await;

    assert!(matches!(result, CheckResult::Failure { stage: Stage::Navigate, .. }));
    assert_eq!(launcher.recorder.closes(), 1);
    assert!(launcher.recorder.clicks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_exhausted_fallbacks_degrade_without_failing() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript::with_result("(7)")
        .without(departure_primary(&config))
        .without(arrival_primary(&config))
        .without(suggestion(&config))
        .without(Locator::label_containing(&config.calendar.label_text))
        .without(Locator::css(&config.calendar.date_input_selector));
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    let result = navigator.run_cycle().await;

    assert_eq!(result, CheckResult::success("(7)"));
    assert!(!launcher.recorder.clicked(&date_attribute(config.calendar.date)));
    assert!(!snapshot_names(&config).contains(&"calendar_open.png".to_string()));
    assert_eq!(launcher.recorder.closes(), 1);
}

#[tokio::test]
async fn test_date_picked_by_day_cell_in_visible_month() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript {
        headers: vec!["March 2025".to_string()],
        ..PageScript::with_result("(2)")
    }
    .without(date_attribute(config.calendar.date));
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    assert!(navigator.run_cycle().await.is_success());
    assert!(launcher.recorder.clicked(&day_cell(&config)));
    assert!(!launcher.recorder.clicked(&Locator::css(&config.calendar.next_selector)));
}

#[tokio::test]
async fn test_date_picked_after_month_navigation() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript {
        headers: vec![
            "Ocak 2025".to_string(),
            "Şubat 2025".to_string(),
            "Mart 2025".to_string(),
        ],
        ..PageScript::with_result("(2)")
    }
    .without(date_attribute(config.calendar.date));
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    assert!(navigator.run_cycle().await.is_success());

    let next = Locator::css(&config.calendar.next_selector).to_string();
    let clicks = launcher.recorder.clicks.lock().unwrap().clone();
    assert_eq!(clicks.iter().filter(|c| **c == next).count(), 2);
    assert!(clicks.contains(&day_cell(&config).to_string()));
    assert!(snapshot_names(&config).contains(&"after_date_selection.png".to_string()));
}

#[tokio::test]
async fn test_month_navigation_is_bounded() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript {
        headers: vec!["Ocak 2024".to_string()],
        ..PageScript::with_result("(2)")
    }
    .without(date_attribute(config.calendar.date));
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    // Date selection gives up but the search still runs
    assert!(navigator.run_cycle().await.is_success());

    let next = Locator::css(&config.calendar.next_selector).to_string();
    let clicks = launcher.recorder.clicks.lock().unwrap().clone();
    assert_eq!(
        clicks.iter().filter(|c| **c == next).count(),
        config.calendar.max_month_steps as usize
    );
    assert!(!clicks.contains(&day_cell(&config).to_string()));
}

#[tokio::test]
async fn test_missing_search_button_fails_submit_stage() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript::with_result("(2)").without(Locator::css(&config.search.button_selector));
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    let result = navigator.run_cycle().await;

    match result {
        CheckResult::Failure { stage, message } => {
            assert_eq!(stage, Stage::SubmitSearch);
            assert!(message.contains(&config.search.button_selector));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(launcher.recorder.closes(), 1);
}

#[tokio::test]
async fn test_missing_departure_input_fails_its_stage() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script =
        PageScript::with_result("(2)").without(Locator::css(&config.route.departure.input_selector));
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    let result = navigator.run_cycle().await;

    assert!(matches!(result, CheckResult::Failure { stage: Stage::SetDeparture, .. }));
    assert_eq!(launcher.recorder.closes(), 1);
}

#[tokio::test]
async fn test_panic_inside_cycle_becomes_failure() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript {
        panic_on_click: Some(Locator::css(&config.search.button_selector).to_string()),
        ..PageScript::with_result("(2)")
    };
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    let result = navigator.run_cycle().await;

    match result {
        CheckResult::Failure { stage, message } => {
            assert_eq!(stage, Stage::SubmitSearch);
            assert!(message.contains("page script crashed"), "{}", message);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(launcher.recorder.closes(), 1);
}

#[tokio::test]
async fn test_launch_failure_is_navigation_failure() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let launcher = FakeLauncher::failing(&config);
    let navigator = navigator(&config, launcher.clone());

    let result = navigator.run_cycle().await;

    assert!(matches!(result, CheckResult::Failure { stage: Stage::Navigate, .. }));
    assert_eq!(launcher.recorder.launches(), 1);
    assert_eq!(launcher.recorder.closes(), 0);
}

#[tokio::test]
async fn test_month_navigation_skipped_without_header() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let script = PageScript {
        headers: Vec::new(),
        ..PageScript::with_result("(2)")
    }
    .without(date_attribute(config.calendar.date));
    let launcher = FakeLauncher::new(&config, vec![script]);
    let navigator = navigator(&config, launcher.clone());

    // No header means no blind paging through months
    assert!(navigator.run_cycle().await.is_success());

    let next = Locator::css(&config.calendar.next_selector).to_string();
    let clicks = launcher.recorder.clicks.lock().unwrap().clone();
    assert!(!clicks.contains(&next));
    assert!(!clicks.contains(&day_cell(&config).to_string()));
    assert!(!snapshot_names(&config).contains(&"after_date_selection.png".to_string()));
}
