use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;

use visitlog_core::agent;
use visitlog_core::config::Config;
use visitlog_core::store::VisitStore;
use visitlog_dashboard::console::run_console;
use visitlog_dashboard::lookup::HttpIpLookup;
use visitlog_dashboard::render::TablePresenter;
use visitlog_dashboard::state::DashboardState;
use visitlog_storage::FileSlot;

#[tokio::main]
async fn main() -> Result<()> {
    // Structured JSON logs on stderr; stdout belongs to the dashboard.
    // Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("visitlog=info".parse()?),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let slot = Arc::new(FileSlot::open(&cfg.data_dir)?);
    let store = VisitStore::new(slot, cfg.store.clone());

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None => {}
        // `visitlog list` — dump the stored collection as JSON and exit.
        Some("list") => {
            println!("{}", serde_json::to_string_pretty(&store.list_all())?);
            return Ok(());
        }
        Some(other) => bail!("unknown subcommand {other:?} (expected: list)"),
    }

    info!(
        data_dir = %cfg.data_dir,
        preset = ?cfg.preset,
        max_retained = cfg.store.max_retained,
        dedup_window_secs = ?cfg.store.dedup_window_secs,
        refresh_interval_secs = cfg.refresh_interval_secs,
        "Visit dashboard starting"
    );

    let lookup = Arc::new(HttpIpLookup::from_config(&cfg)?);
    let user_agent = cfg
        .user_agent
        .clone()
        .unwrap_or_else(agent::host_user_agent);
    let state = Arc::new(DashboardState::new(
        store,
        cfg,
        Arc::new(TablePresenter),
        lookup,
    ));

    state.initialize(&user_agent).await;

    // Spawn background refresh task so edits from other instances show up.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_refresh_loop().await;
        });
    }

    let console_state = Arc::clone(&state);
    tokio::task::spawn_blocking(move || {
        run_console(&console_state, std::io::stdin().lock(), std::io::stdout())
    })
    .await??;

    info!("Visit dashboard stopped");
    Ok(())
}
