use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use visitlog_core::config::Config;
use visitlog_core::store::VisitStore;
use visitlog_dashboard::confirm::Confirm;
use visitlog_dashboard::console::run_console;
use visitlog_dashboard::lookup::IpLookup;
use visitlog_dashboard::render::{DashboardSnapshot, Presenter};
use visitlog_dashboard::state::{DashboardState, DELETE_ALL_PROMPT, DELETE_ONE_PROMPT};
use visitlog_storage::{FileSlot, MemorySlot, SlotStorage};

const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

struct FixedLookup(&'static str);

#[async_trait]
impl IpLookup for FixedLookup {
    async fn resolve(&self) -> String {
        self.0.to_string()
    }
}

#[derive(Default)]
struct RecordingPresenter {
    snapshots: Mutex<Vec<DashboardSnapshot>>,
}

impl RecordingPresenter {
    fn count(&self) -> usize {
        self.snapshots.lock().expect("lock").len()
    }

    fn last(&self) -> Option<DashboardSnapshot> {
        self.snapshots.lock().expect("lock").last().cloned()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&self, snapshot: &DashboardSnapshot) -> anyhow::Result<()> {
        self.snapshots.lock().expect("lock").push(snapshot.clone());
        Ok(())
    }
}

struct MissingTarget;

impl Presenter for MissingTarget {
    fn present(&self, _snapshot: &DashboardSnapshot) -> anyhow::Result<()> {
        anyhow::bail!("visitor table element not found")
    }
}

/// Answers every prompt the same way and remembers what was asked.
struct FixedAnswer {
    answer: bool,
    asked: Vec<String>,
}

impl FixedAnswer {
    fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Vec::new(),
        }
    }
}

impl Confirm for FixedAnswer {
    fn confirm(&mut self, message: &str) -> bool {
        self.asked.push(message.to_string());
        self.answer
    }
}

fn test_config() -> Config {
    Config::from_vars(|_| None).expect("default config")
}

fn dashboard(
    slot: Arc<dyn SlotStorage>,
    ip: &'static str,
) -> (Arc<DashboardState>, Arc<RecordingPresenter>) {
    let cfg = test_config();
    let presenter = Arc::new(RecordingPresenter::default());
    let store = VisitStore::new(slot, cfg.store.clone());
    let state = DashboardState::new(store, cfg, presenter.clone(), Arc::new(FixedLookup(ip)));
    (Arc::new(state), presenter)
}

fn temp_dir() -> std::path::PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    std::env::temp_dir().join(format!("visitlog-test-dashboard-{ts}"))
}

// ============================================================
// Initialization: detect, resolve, record, present
// ============================================================
#[tokio::test]
async fn initialize_records_detected_visit_and_presents_it() {
    let (state, presenter) = dashboard(Arc::new(MemorySlot::new()), "8.8.8.8");

    let snapshot = state.initialize(CHROME_WINDOWS).await;

    assert_eq!(snapshot.stats.total, 1);
    assert_eq!(snapshot.rows[0].ip, "8.8.8.8");
    assert_eq!(snapshot.rows[0].browser, "Chrome");
    assert_eq!(snapshot.rows[0].platform, "Windows");
    assert_eq!(presenter.count(), 1);
    assert_eq!(presenter.last(), Some(snapshot));
}

#[tokio::test]
async fn reinitializing_within_an_hour_does_not_duplicate() {
    let slot: Arc<dyn SlotStorage> = Arc::new(MemorySlot::new());
    let (first, _) = dashboard(slot.clone(), "9.9.9.9");
    first.initialize(CHROME_WINDOWS).await;

    let (second, presenter) = dashboard(slot, "9.9.9.9");
    let snapshot = second.initialize("curl/8.4.0").await;

    assert_eq!(snapshot.stats.total, 1);
    assert_eq!(snapshot.rows[0].browser, "Chrome");
    assert_eq!(presenter.count(), 1);
}

#[tokio::test]
async fn sentinel_ip_is_recorded_like_any_other() {
    let (state, _) = dashboard(Arc::new(MemorySlot::new()), "Error");
    let snapshot = state.initialize("curl/8.4.0").await;
    assert_eq!(snapshot.rows[0].ip, "Error");
    assert_eq!(snapshot.rows[0].browser, "Unknown");
    assert_eq!(snapshot.rows[0].platform, "Unknown");
}

#[tokio::test]
async fn missing_presenter_target_does_not_stop_the_flow() {
    let cfg = test_config();
    let store = VisitStore::new(Arc::new(MemorySlot::new()), cfg.store.clone());
    let state = DashboardState::new(
        store,
        cfg,
        Arc::new(MissingTarget),
        Arc::new(FixedLookup("1.1.1.1")),
    );

    let snapshot = state.initialize(CHROME_WINDOWS).await;
    assert_eq!(snapshot.stats.total, 1);
    assert_eq!(state.refresh().stats.total, 1);
}

// ============================================================
// Confirmation-gated commands
// ============================================================
#[tokio::test]
async fn declined_delete_leaves_store_untouched() {
    let (state, presenter) = dashboard(Arc::new(MemorySlot::new()), "8.8.8.8");
    let snapshot = state.initialize(CHROME_WINDOWS).await;
    let id = snapshot.rows[0].id.clone();

    let mut confirm = FixedAnswer::new(false);
    let outcome = state.request_delete(&id, &mut confirm).expect("delete");

    assert!(outcome.is_none());
    assert_eq!(confirm.asked, vec![DELETE_ONE_PROMPT.to_string()]);
    assert_eq!(state.store.list_all().len(), 1);
    assert_eq!(presenter.count(), 1, "no refresh after a declined delete");
}

#[tokio::test]
async fn confirmed_delete_removes_visit_and_refreshes() {
    let (state, presenter) = dashboard(Arc::new(MemorySlot::new()), "8.8.8.8");
    let snapshot = state.initialize(CHROME_WINDOWS).await;
    let id = snapshot.rows[0].id.clone();

    let mut confirm = FixedAnswer::new(true);
    let remaining = state
        .request_delete(&id, &mut confirm)
        .expect("delete")
        .expect("confirmed");

    assert!(remaining.is_empty());
    assert!(state.store.list_all().is_empty());
    assert_eq!(presenter.count(), 2);
    assert_eq!(presenter.last().map(|s| s.stats.total), Some(0));
}

#[tokio::test]
async fn confirmed_delete_of_unknown_id_keeps_collection() {
    let (state, _) = dashboard(Arc::new(MemorySlot::new()), "8.8.8.8");
    state.initialize(CHROME_WINDOWS).await;
    let before = state.store.list_all();

    let after = state
        .request_delete("nope", &mut FixedAnswer::new(true))
        .expect("delete")
        .expect("confirmed");
    assert_eq!(after, before);
}

#[tokio::test]
async fn clear_requires_confirmation() {
    let (state, presenter) = dashboard(Arc::new(MemorySlot::new()), "8.8.8.8");
    state.initialize(CHROME_WINDOWS).await;

    let mut decline = FixedAnswer::new(false);
    assert!(state.request_clear(&mut decline).expect("clear").is_none());
    assert_eq!(decline.asked, vec![DELETE_ALL_PROMPT.to_string()]);
    assert_eq!(state.store.list_all().len(), 1);

    let cleared = state
        .request_clear(&mut FixedAnswer::new(true))
        .expect("clear")
        .expect("confirmed");
    assert!(cleared.is_empty());
    assert!(state.store.list_all().is_empty());
    assert_eq!(presenter.last().map(|s| s.stats.total), Some(0));
}

// ============================================================
// Console drives the same handlers
// ============================================================
#[tokio::test]
async fn console_delete_with_yes_removes_visit() {
    let (state, _) = dashboard(Arc::new(MemorySlot::new()), "8.8.8.8");
    let snapshot = state.initialize(CHROME_WINDOWS).await;
    let id = snapshot.rows[0].id.clone();

    let input = Cursor::new(format!("delete {id}\ny\nquit\nclear\ny\n"));
    let mut output = Vec::new();
    run_console(&state, input, &mut output).expect("console");

    let output = String::from_utf8(output).expect("utf8");
    assert!(output.contains(DELETE_ONE_PROMPT), "{output}");
    assert!(output.contains(&format!("Deleted {id}. 0 visits remain.")), "{output}");
    assert!(state.store.list_all().is_empty());
}

#[tokio::test]
async fn console_clear_declined_then_eof_keeps_data() {
    let (state, _) = dashboard(Arc::new(MemorySlot::new()), "8.8.8.8");
    state.initialize(CHROME_WINDOWS).await;

    let input = Cursor::new("bogus\n\nclear\nno\n");
    let mut output = Vec::new();
    run_console(&state, input, &mut output).expect("console");

    let output = String::from_utf8(output).expect("utf8");
    assert!(output.contains("unknown command"), "{output}");
    assert!(output.contains("Cancelled."), "{output}");
    assert_eq!(state.store.list_all().len(), 1);
}

// ============================================================
// Shared slot across instances + periodic refresh
// ============================================================
#[tokio::test]
async fn instances_sharing_a_data_dir_see_each_others_writes() {
    let dir = temp_dir();
    let (first, _) = dashboard(Arc::new(FileSlot::open(&dir).expect("open")), "1.1.1.1");
    let (second, _) = dashboard(Arc::new(FileSlot::open(&dir).expect("open")), "2.2.2.2");

    first.initialize(CHROME_WINDOWS).await;
    let snapshot = second.initialize(CHROME_WINDOWS).await;

    assert_eq!(snapshot.stats.total, 2);
    assert_eq!(snapshot.stats.unique_ips, 2);
    assert_eq!(first.refresh().stats.total, 2);
}

#[tokio::test(start_paused = true)]
async fn refresh_loop_picks_up_writes_from_other_instances() {
    let slot: Arc<dyn SlotStorage> = Arc::new(MemorySlot::new());
    let (state, presenter) = dashboard(slot.clone(), "1.1.1.1");
    state.initialize(CHROME_WINDOWS).await;
    assert_eq!(presenter.count(), 1);

    tokio::spawn(Arc::clone(&state).run_refresh_loop());

    // Another instance writes to the shared slot behind our back.
    let other = VisitStore::new(slot, test_config().store);
    other.add("2.2.2.2", "Firefox", "Linux").expect("add");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(presenter.count(), 1, "no refresh before the interval elapses");

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(presenter.count(), 2);
    assert_eq!(presenter.last().map(|s| s.stats.total), Some(2));
}

/// Fires a timer refresh while the question is still open.
struct TickDuringPrompt {
    state: Arc<DashboardState>,
    answer: bool,
    ticked: Vec<Option<DashboardSnapshot>>,
}

impl Confirm for TickDuringPrompt {
    fn confirm(&mut self, _message: &str) -> bool {
        self.ticked.push(self.state.refresh_on_tick());
        self.answer
    }
}

#[tokio::test]
async fn timer_refresh_is_held_back_while_a_prompt_is_open() {
    let (state, presenter) = dashboard(Arc::new(MemorySlot::new()), "8.8.8.8");
    state.initialize(CHROME_WINDOWS).await;
    let id = state.store.list_all()[0].id.clone();
    assert_eq!(presenter.count(), 1);

    let mut declining = TickDuringPrompt {
        state: Arc::clone(&state),
        answer: false,
        ticked: Vec::new(),
    };
    state.request_delete(&id, &mut declining).expect("delete");
    state.request_clear(&mut declining).expect("clear");
    assert_eq!(declining.ticked, vec![None, None]);
    assert_eq!(presenter.count(), 1, "nothing printed over the prompt");

    // Answered prompts release the gate.
    assert!(state.refresh_on_tick().is_some());
    assert_eq!(presenter.count(), 2);

    let mut confirming = TickDuringPrompt {
        state: Arc::clone(&state),
        answer: true,
        ticked: Vec::new(),
    };
    state.request_delete(&id, &mut confirming).expect("delete");
    assert_eq!(confirming.ticked, vec![None]);
    // Only the post-delete refresh rendered.
    assert_eq!(presenter.count(), 3);
    assert_eq!(presenter.last().map(|s| s.stats.total), Some(0));
}
