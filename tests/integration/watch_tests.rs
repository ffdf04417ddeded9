use async_trait::async_trait;
use slot_watch::config::Config;
use slot_watch::notify::{DispatchError, Notifier};
use slot_watch::state::{SlotState, Target, TargetMap};
use slot_watch::storage::{add_target, remove_target, JsonStore, TargetStore};
use slot_watch::watcher::{build_http_client, Watcher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AVAILABLE_PAGE: &str = "<html><body><a href=\"itms-beta://\">View in TestFlight</a>\
    <p>Testing Apps with TestFlight</p></body></html>";
const FULL_PAGE: &str = "<html><body><p>This beta is full.</p></body></html>";
const UNRELATED_PAGE: &str = "<html><body>Something else entirely</body></html>";

/// Notifier that records every message and can be told to fail
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, _target: &Target, message: &str) -> Result<(), DispatchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DispatchError::Status {
                status: 500,
                body: "webhook down".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

fn test_config(temp_dir: &TempDir, cooldown_secs: u64) -> Config {
    let mut config = Config::default();
    config.watch.interval_secs = 1;
    config.watch.cooldown_secs = cooldown_secs;
    config.http.timeout_secs = 1;
    config.http.user_agent = "SlotWatchTest/1.0".to_string();
    config.storage.path = temp_dir
        .path()
        .join("apps_config.json")
        .display()
        .to_string();
    config
}

fn seed_store(config: &Config, targets: Vec<Target>) -> JsonStore {
    let store = JsonStore::open(&config.storage.path).expect("store should open");
    let map: TargetMap = targets.into_iter().collect();
    store.save(&map).expect("seed should save");
    store
}

fn build_watcher(
    config: &Config,
    store: JsonStore,
    notifier: Option<Arc<RecordingNotifier>>,
) -> Watcher<JsonStore> {
    let client = build_http_client(&config.http).unwrap();
    let notifier = notifier.map(|n| n as Arc<dyn Notifier>);
    Watcher::new(store, client, config, notifier)
}

async fn serve_page(mock_server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_first_available_sends_one_notification() {
    let mock_server = MockServer::start().await;
    serve_page(&mock_server, "/join/appx", AVAILABLE_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 300);
    let url = format!("{}/join/appx", mock_server.uri());
    let store = seed_store(&config, vec![Target::new("AppX", url.clone())]);

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.notified, 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("AVAILABLE"));
    assert!(messages[0].contains("AppX"));
    assert!(messages[0].contains(&url));

    let target = watcher.store().load().get("AppX").cloned().unwrap();
    assert_eq!(target.state, Some(SlotState::Available));
    assert!(target.last_notified_at.is_some());
    assert!(target.pending.is_none());
}

#[tokio::test]
async fn test_available_then_full_sends_filled_notification() {
    let mock_server = MockServer::start().await;
    serve_page(&mock_server, "/join/appx", AVAILABLE_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 0);
    let url = format!("{}/join/appx", mock_server.uri());
    let store = seed_store(&config, vec![Target::new("AppX", url)]);

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    watcher.run_cycle().await.unwrap();

    mock_server.reset().await;
    serve_page(&mock_server, "/join/appx", FULL_PAGE).await;

    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.notified, 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].contains("FILLED"));

    let target = watcher.store().load().get("AppX").cloned().unwrap();
    assert_eq!(target.state, Some(SlotState::Full));
}

#[tokio::test]
async fn test_repeated_available_notifies_once() {
    let mock_server = MockServer::start().await;
    serve_page(&mock_server, "/join/appx", AVAILABLE_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 0);
    let url = format!("{}/join/appx", mock_server.uri());
    let store = seed_store(&config, vec![Target::new("AppX", url)]);

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    watcher.run_cycle().await.unwrap();
    let report = watcher.run_cycle().await.unwrap();

    assert_eq!(report.notified, 0);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_cooldown_suppresses_flapping() {
    let mock_server = MockServer::start().await;
    serve_page(&mock_server, "/join/appx", AVAILABLE_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 300);
    let url = format!("{}/join/appx", mock_server.uri());
    let store = seed_store(&config, vec![Target::new("AppX", url)]);

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    watcher.run_cycle().await.unwrap();

    mock_server.reset().await;
    serve_page(&mock_server, "/join/appx", FULL_PAGE).await;

    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.suppressed, 1);
    assert_eq!(notifier.messages().len(), 1);

    // The new state is still recorded
    let target = watcher.store().load().get("AppX").cloned().unwrap();
    assert_eq!(target.state, Some(SlotState::Full));
}

#[tokio::test]
async fn test_fetch_timeout_leaves_state_unchanged() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/join/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(AVAILABLE_PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 0);
    let mut seeded = Target::new("Slow", format!("{}/join/slow", mock_server.uri()));
    seeded.record_state(SlotState::Full);
    let store = seed_store(&config, vec![seeded.clone()]);

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.fetch_failures, 1);
    assert!(notifier.messages().is_empty());

    let target = watcher.store().load().get("Slow").cloned().unwrap();
    assert_eq!(target, seeded);
}

#[tokio::test]
async fn test_failing_target_does_not_block_others() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/join/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    serve_page(&mock_server, "/join/good", AVAILABLE_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 0);
    let store = seed_store(
        &config,
        vec![
            Target::new("Broken", format!("{}/join/broken", mock_server.uri())),
            Target::new("Good", format!("{}/join/good", mock_server.uri())),
        ],
    );

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.notified, 1);

    let targets = watcher.store().load();
    assert_eq!(targets.get("Broken").unwrap().state, None);
    assert_eq!(
        targets.get("Good").unwrap().state,
        Some(SlotState::Available)
    );
}

#[tokio::test]
async fn test_failed_dispatch_is_retried_next_cycle() {
    let mock_server = MockServer::start().await;
    serve_page(&mock_server, "/join/appx", AVAILABLE_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 300);
    let url = format!("{}/join/appx", mock_server.uri());
    let store = seed_store(&config, vec![Target::new("AppX", url)]);

    let notifier = Arc::new(RecordingNotifier::default());
    notifier.set_failing(true);
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.dispatch_failures, 1);

    let target = watcher.store().load().get("AppX").cloned().unwrap();
    assert_eq!(target.state, Some(SlotState::Available));
    assert!(target.last_notified_at.is_none());
    assert!(target.pending.is_some());

    notifier.set_failing(false);
    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.notified, 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("AVAILABLE"));

    let target = watcher.store().load().get("AppX").cloned().unwrap();
    assert!(target.pending.is_none());
    assert!(target.last_notified_at.is_some());
}

#[tokio::test]
async fn test_missing_webhook_skips_dispatch() {
    let mock_server = MockServer::start().await;
    serve_page(&mock_server, "/join/appx", AVAILABLE_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 300);
    let url = format!("{}/join/appx", mock_server.uri());
    let store = seed_store(&config, vec![Target::new("AppX", url)]);

    let watcher = build_watcher(&config, store, None);

    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.dispatch_skipped, 1);

    let target = watcher.store().load().get("AppX").cloned().unwrap();
    assert_eq!(target.state, Some(SlotState::Available));
    assert!(target.last_notified_at.is_none());
    assert!(target.pending.is_none());
}

#[tokio::test]
async fn test_unrecognized_page_is_quiet() {
    let mock_server = MockServer::start().await;
    serve_page(&mock_server, "/join/appx", UNRELATED_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 0);
    let url = format!("{}/join/appx", mock_server.uri());
    let store = seed_store(&config, vec![Target::new("AppX", url)]);

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    watcher.run_cycle().await.unwrap();

    assert!(notifier.messages().is_empty());
    let target = watcher.store().load().get("AppX").cloned().unwrap();
    assert_eq!(target.state, Some(SlotState::Unknown));
}

#[tokio::test]
async fn test_concurrent_checks_keep_store_order() {
    let mock_server = MockServer::start().await;
    serve_page(&mock_server, "/join/app", FULL_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, 0);
    config.watch.max_concurrent_checks = 4;

    let names = ["Echo", "Alpha", "Delta", "Bravo", "Charlie"];
    let targets = names
        .iter()
        .map(|name| Target::new(*name, format!("{}/join/app", mock_server.uri())))
        .collect();
    let store = seed_store(&config, targets);

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.checked, 5);

    let loaded = watcher.store().load();
    assert_eq!(loaded.names(), names.to_vec());
    assert!(loaded
        .iter()
        .all(|t| t.state == Some(SlotState::Full)));
}

#[tokio::test]
async fn test_missing_store_starts_empty() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 0);

    let store = JsonStore::open(&config.storage.path).unwrap();
    let watcher = build_watcher(&config, store, None);

    let report = watcher.run_cycle().await.unwrap();
    assert_eq!(report.checked, 0);

    let contents = std::fs::read_to_string(&config.storage.path).unwrap();
    assert_eq!(contents.trim(), "{}");
}

#[tokio::test]
async fn test_run_stops_after_cycle_when_shutdown_requested() {
    let mock_server = MockServer::start().await;
    serve_page(&mock_server, "/join/appx", AVAILABLE_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 300);
    let url = format!("{}/join/appx", mock_server.uri());
    let store = seed_store(&config, vec![Target::new("AppX", url)]);

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), watcher.run(rx))
        .await
        .expect("watcher should stop promptly")
        .unwrap();

    // The in-flight cycle completed and persisted
    assert_eq!(notifier.messages().len(), 1);
    let target = watcher.store().load().get("AppX").cloned().unwrap();
    assert_eq!(target.state, Some(SlotState::Available));
}

async fn serve_slow_page(mock_server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .set_delay(Duration::from_millis(800)),
        )
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_target_added_mid_cycle_survives_write_back() {
    let mock_server = MockServer::start().await;
    serve_slow_page(&mock_server, "/join/slow", FULL_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, 0);
    config.http.timeout_secs = 5;
    let store = seed_store(
        &config,
        vec![Target::new("Slow", format!("{}/join/slow", mock_server.uri()))],
    );
    let watcher = build_watcher(&config, store, None);

    let prefix = format!("{}/join/", mock_server.uri());
    let new_url = format!("{}new", prefix);
    let edit = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        add_target(watcher.store(), "NewApp", &new_url, &prefix).unwrap();
    };

    let (report, ()) = tokio::join!(watcher.run_cycle(), edit);
    assert_eq!(report.unwrap().checked, 1);

    let targets = watcher.store().load();
    assert_eq!(targets.names(), vec!["Slow", "NewApp"]);
    assert_eq!(targets.get("Slow").unwrap().state, Some(SlotState::Full));
    assert_eq!(targets.get("NewApp").unwrap().state, None);
}

#[tokio::test]
async fn test_target_removed_mid_cycle_stays_removed() {
    let mock_server = MockServer::start().await;
    serve_slow_page(&mock_server, "/join/slow", FULL_PAGE).await;
    serve_slow_page(&mock_server, "/join/gone", AVAILABLE_PAGE).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, 0);
    config.http.timeout_secs = 5;
    config.watch.max_concurrent_checks = 2;
    let store = seed_store(
        &config,
        vec![
            Target::new("Slow", format!("{}/join/slow", mock_server.uri())),
            Target::new("Gone", format!("{}/join/gone", mock_server.uri())),
        ],
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = build_watcher(&config, store, Some(Arc::clone(&notifier)));

    let edit = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        remove_target(watcher.store(), "Gone").unwrap();
    };

    let (report, ()) = tokio::join!(watcher.run_cycle(), edit);
    assert_eq!(report.unwrap().checked, 2);

    let targets = watcher.store().load();
    assert_eq!(targets.names(), vec!["Slow"]);
}

#[tokio::test]
async fn test_unreadable_store_aborts_cycle_without_saving() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, 0);
    std::fs::create_dir(&config.storage.path).unwrap();

    let store = JsonStore::new(&config.storage.path);
    let watcher = build_watcher(&config, store, None);

    assert!(watcher.run_cycle().await.is_err());
    assert!(std::path::Path::new(&config.storage.path).is_dir());
}
