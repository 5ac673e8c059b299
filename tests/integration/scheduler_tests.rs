use super::*;
use async_trait::async_trait;
use ticket_watcher::models::{AlertEvent, AlertReason, CheckResult, Stage};
use ticket_watcher::plugins::{NotificationResult, NotifierPlugin, PluginManager};
use ticket_watcher::scheduler::CheckScheduler;

/// Collects every alert it is handed.
#[derive(Clone, Default)]
struct RecordingNotifier {
    events: Arc<Mutex<Vec<AlertEvent>>>,
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    async fn notify(&self, event: &AlertEvent) -> std::result::Result<NotificationResult, AppError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(NotificationResult::delivered())
    }
}

async fn scheduler_with(
    config: &AppConfig,
    scripts: Vec<PageScript>,
    expected: Option<&str>,
) -> (CheckScheduler, Arc<FakeLauncher>, RecordingNotifier) {
    let launcher = FakeLauncher::new(config, scripts);
    let navigator = Arc::new(navigator(config, launcher.clone()));

    let recording = RecordingNotifier::default();
    let notifiers = PluginManager::new();
    notifiers.register_notifier(Box::new(recording.clone())).await;

    let scheduler = CheckScheduler::new(
        navigator,
        notifiers,
        config.scheduler.interval(),
        expected.map(str::to_string),
    );
    (scheduler, launcher, recording)
}

#[tokio::test]
async fn test_baseline_scenario_across_three_cycles() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let (mut scheduler, launcher, recording) = scheduler_with(
        &config,
        vec![
            PageScript::with_result("(2)"),
            PageScript::with_result("(5)"),
            PageScript::with_result("(5)"),
        ],
        Some("(2)"),
    )
    .await;

    // Cycle 1 matches the baseline
    scheduler.run_once().await;
    assert!(recording.events.lock().unwrap().is_empty());
    assert_eq!(scheduler.state().last_value.as_deref(), Some("(2)"));

    // Cycle 2 changes
    scheduler.run_once().await;
    {
        let events = recording.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, AlertReason::Changed);
        assert_eq!(events[0].previous.as_deref(), Some("(2)"));
        assert_eq!(events[0].value, "(5)");
    }
    assert_eq!(scheduler.state().last_value.as_deref(), Some("(5)"));

    // Cycle 3 repeats the mismatching value
    scheduler.run_once().await;
    {
        let events = recording.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].reason, AlertReason::PersistingMismatch);
        assert_eq!(events[1].expected.as_deref(), Some("(2)"));
    }
    assert_eq!(scheduler.state().last_value.as_deref(), Some("(5)"));

    assert_eq!(launcher.recorder.launches(), 3);
    assert_eq!(launcher.recorder.closes(), 3);
    assert_eq!(scheduler.stats().alerts, 2);
}

#[tokio::test]
async fn test_extraction_timeout_leaves_state_unchanged() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let timeout_script = PageScript {
        result: None,
        ..PageScript::with_result("(2)")
    };
    let (mut scheduler, launcher, recording) = scheduler_with(
        &config,
        vec![PageScript::with_result("(2)"), timeout_script],
        None,
    )
    .await;

    scheduler.run_once().await;
    let result = scheduler.run_once().await;

    assert!(matches!(result, CheckResult::Failure { stage: Stage::ExtractResult, .. }));
    assert_eq!(scheduler.state().last_value.as_deref(), Some("(2)"));
    assert!(recording.events.lock().unwrap().is_empty());
    assert_eq!(scheduler.stats().failures, 1);
    assert_eq!(launcher.recorder.closes(), 2);
}

#[tokio::test]
async fn test_initial_mismatch_alerts_once() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let (mut scheduler, _launcher, recording) =
        scheduler_with(&config, vec![PageScript::with_result("(0)")], Some("(2)")).await;

    scheduler.run_once().await;

    let events = recording.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].reason, AlertReason::InitialMismatch);
    assert_eq!(events[0].value, "(0)");
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_run_releases_every_session() {
    let temp = tempfile::tempdir().unwrap();
    let config = get_test_config(temp.path());
    let navigation_failure = PageScript {
        navigation_fails: true,
        ..PageScript::with_result("(2)")
    };
    let (mut scheduler, launcher, _recording) = scheduler_with(
        &config,
        vec![
            PageScript::with_result("(2)"),
            navigation_failure,
            PageScript::with_result("(2)"),
        ],
        None,
    )
    .await;

    scheduler.run(Some(3)).await;

    assert_eq!(launcher.recorder.launches(), 3);
    assert_eq!(launcher.recorder.closes(), 3);
    assert_eq!(scheduler.stats().successes, 2);
    assert_eq!(scheduler.stats().failures, 1);
}
