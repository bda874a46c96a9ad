use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use visitlog_core::agent;
use visitlog_core::config::Config;
use visitlog_core::store::VisitStore;
use visitlog_core::visit::VisitRecord;

use crate::confirm::Confirm;
use crate::error::DashboardError;
use crate::lookup::IpLookup;
use crate::render::{DashboardSnapshot, Presenter};

pub const DELETE_ONE_PROMPT: &str = "Are you sure you want to delete this visitor entry?";
pub const DELETE_ALL_PROMPT: &str =
    "Are you sure you want to delete ALL visitor data? This cannot be undone!";

/// Bridges the visit store to the presenter.
///
/// Holds no visit data of its own: every refresh re-reads the store, which
/// is how edits made by other dashboard instances sharing the slot become
/// visible.
pub struct DashboardState {
    pub store: VisitStore,
    pub config: Arc<Config>,
    presenter: Arc<dyn Presenter>,
    lookup: Arc<dyn IpLookup>,
    /// Set while a confirmation prompt is waiting for an answer.
    prompting: AtomicBool,
}

impl DashboardState {
    pub fn new(
        store: VisitStore,
        config: Config,
        presenter: Arc<dyn Presenter>,
        lookup: Arc<dyn IpLookup>,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config),
            presenter,
            lookup,
            prompting: AtomicBool::new(false),
        }
    }

    /// One detection cycle: classify `user_agent`, resolve the public IP,
    /// record the visit, then present the stored collection.
    ///
    /// A failed write is logged and the dashboard still comes up with whatever
    /// the store holds.
    pub async fn initialize(&self, user_agent: &str) -> DashboardSnapshot {
        let info = agent::detect(user_agent);
        let ip = self.lookup.resolve().await;

        match self
            .store
            .add(&ip, info.browser.label(), info.platform.label())
        {
            Ok(visits) => info!(
                ip = %ip,
                browser = %info.browser,
                platform = %info.platform,
                stored = visits.len(),
                "Visit detection complete"
            ),
            Err(e) => error!(ip = %ip, error = %e, "Failed to save visitor data"),
        }

        self.refresh()
    }

    /// Re-read the store and hand a fresh snapshot to the presenter.
    pub fn refresh(&self) -> DashboardSnapshot {
        let visits = self.store.list_all();
        let snapshot = DashboardSnapshot::from_visits(&visits, self.config.display_limit);
        if let Err(e) = self.presenter.present(&snapshot) {
            warn!(error = %e, "Presenter unavailable, skipping render");
        }
        snapshot
    }

    /// Timer-driven refresh. Skipped while a confirmation prompt is pending
    /// so the table is not printed over the question.
    pub fn refresh_on_tick(&self) -> Option<DashboardSnapshot> {
        if self.prompting.load(Ordering::Acquire) {
            debug!("Prompt pending, deferring refresh");
            return None;
        }
        Some(self.refresh())
    }

    fn ask(&self, confirm: &mut dyn Confirm, message: &str) -> bool {
        let _pending = PromptPending::new(&self.prompting);
        confirm.confirm(message)
    }

    /// Delete one visit after confirmation.
    ///
    /// Returns `Ok(None)` when the user declines; nothing is touched then.
    pub fn request_delete(
        &self,
        id: &str,
        confirm: &mut dyn Confirm,
    ) -> Result<Option<Vec<VisitRecord>>, DashboardError> {
        if !self.ask(confirm, DELETE_ONE_PROMPT) {
            info!(id, "Delete declined");
            return Ok(None);
        }
        let visits = self.store.delete_by_id(id)?;
        info!(id, remaining = visits.len(), "Visit deleted");
        self.refresh();
        Ok(Some(visits))
    }

    /// Clear every visit after confirmation.
    pub fn request_clear(
        &self,
        confirm: &mut dyn Confirm,
    ) -> Result<Option<Vec<VisitRecord>>, DashboardError> {
        if !self.ask(confirm, DELETE_ALL_PROMPT) {
            info!("Clear declined");
            return Ok(None);
        }
        let visits = self.store.clear()?;
        self.refresh();
        Ok(Some(visits))
    }

    /// Background loop: refresh on a fixed interval so visits written by
    /// other instances show up.
    ///
    /// Spawned as a `tokio::spawn` task in `main.rs` after
    /// [`DashboardState::initialize`]. The first tick is skipped since
    /// `initialize` has just rendered. Ticks that land while a prompt is
    /// open are dropped; the next one catches up.
    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.refresh_interval());
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.refresh_on_tick();
        }
    }
}

/// Marks a prompt as pending until dropped.
struct PromptPending<'a>(&'a AtomicBool);

impl<'a> PromptPending<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for PromptPending<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
