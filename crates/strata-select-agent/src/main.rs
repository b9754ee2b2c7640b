//! Strata WAN Select
//!
//! Daemon running on multi-modem senders.
//!
//! - Waits for the host to settle after boot
//! - Samples RSRQ of every connected modem on a fixed cadence
//! - Promotes the modem that wins a quorum of recent samples to top
//!   routing priority, then dwells before re-evaluating
//! - In `--simulate` mode, uses fake modems and an in-memory store

mod modem;
mod simulate;
mod store;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use strata_select::memory::MemoryStore;
use strata_select::{ConfigStore, SelectionLoop, TelemetrySource};

/// Strata WAN select daemon.
#[derive(Parser, Debug)]
#[command(name = "strata-wan-select", about = "Promote the cellular link with sustained best RSRQ")]
struct Cli {
    /// Configuration store (tunables and routing-priority rules).
    #[arg(long, env = "STRATA_SELECT_STORE")]
    store: Option<PathBuf>,

    /// Run with simulated modems.
    #[arg(long, default_value_t = false)]
    simulate: bool,

    /// Minimum host uptime in seconds before sampling starts.
    #[arg(long, default_value_t = 120)]
    min_uptime: u64,

    /// Write a routing-priority rule per connected modem when the store has none.
    #[arg(long, default_value_t = false)]
    seed_rules: bool,

    /// Path to the ModemManager CLI.
    #[arg(long, default_value = "mmcli")]
    mmcli: PathBuf,
}

const DEFAULT_STORE: &str = "/etc/strata/wan-select.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!(
        simulate = cli.simulate,
        store = ?cli.store,
        min_uptime_s = cli.min_uptime,
        seed_rules = cli.seed_rules,
        "strata-wan-select starting"
    );

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let min_uptime = Duration::from_secs(cli.min_uptime);

    let mut selection = if cli.simulate {
        let telemetry = simulate::SimulatedTelemetry::new();
        match cli.store {
            Some(path) => spawn_loop(
                telemetry,
                store::FileStore::new(path),
                min_uptime,
                cli.seed_rules,
                shutdown_rx,
            ),
            None => spawn_loop(telemetry, MemoryStore::default(), min_uptime, true, shutdown_rx),
        }
    } else {
        let telemetry = modem::ModemManagerTelemetry::new(cli.mmcli);
        let path = cli.store.unwrap_or_else(|| DEFAULT_STORE.into());
        tracing::info!(path = %path.display(), "using configuration store");
        spawn_loop(
            telemetry,
            store::FileStore::new(path),
            min_uptime,
            cli.seed_rules,
            shutdown_rx,
        )
    };

    // ── Shutdown handling ───────────────────────────────────────
    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("received shutdown signal, stopping");
            let _ = shutdown_tx.send(true);
            join((&mut selection).await)?;
        }
        result = &mut selection => {
            join(result)?;
        }
    }

    tracing::info!("strata-wan-select stopped");
    Ok(())
}

fn spawn_loop<T, C>(
    telemetry: T,
    store: C,
    min_uptime: Duration,
    seed_rules: bool,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<Result<(), strata_select::SelectError>>
where
    T: TelemetrySource + 'static,
    C: ConfigStore + 'static,
{
    let selection = SelectionLoop::new(telemetry, store, shutdown)
        .with_min_uptime(min_uptime)
        .with_rule_seeding(seed_rules);
    tokio::spawn(selection.run())
}

fn join(
    result: Result<Result<(), strata_select::SelectError>, tokio::task::JoinError>,
) -> anyhow::Result<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "selection loop failed");
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("selection task failed: {e}");
            Err(e.into())
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
