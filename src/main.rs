use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

use safeflow_client::config::Config;
use safeflow_client::ledger::LedgerClient;
use safeflow_client::poller::BridgePoller;
use safeflow_client::rpc::Endpoints;
use safeflow_client::session::SessionHandle;
use safeflow_client::tracker::{ReconciliationTracker, TransferStore};
use safeflow_client::{api, metrics};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    // Initialize logging
    init_logging();

    tracing::info!("Starting SafeFlow client");

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        safeflow_contract = %config.stacks.safeflow_contract,
        token_contract = %config.stacks.token_contract,
        "Configuration loaded"
    );

    let timeout = Duration::from_secs(config.poller.rpc_timeout_secs);
    let endpoints = Endpoints::new(config.stacks.api_urls.clone(), timeout)?;
    let ledger = Arc::new(LedgerClient::new(
        endpoints,
        config.stacks.safeflow_contract.clone(),
        config.stacks.token_contract.clone(),
    )?);

    // Load the transfer store, pruning stale entries
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let store = TransferStore::new(&config.bridge.store_path);
    let retention_ms = config.bridge.transfer_retention_secs * 1000;
    let tracker = ReconciliationTracker::load(store, now_ms, retention_ms)?;
    tracing::info!(
        path = %config.bridge.store_path,
        tracked = tracker.transfers().len(),
        "Transfer store loaded"
    );
    let tracker = Arc::new(Mutex::new(tracker));

    // Connect the identity from the environment, if given
    let session = SessionHandle::new();
    if let Ok(address) = std::env::var("STACKS_ADDRESS") {
        session.connect(&address).await?;
    } else {
        tracing::warn!("STACKS_ADDRESS not set, reconciliation idle until a session connects");
    }

    // Shutdown channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    // Start metrics/API server
    let api_addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.status_api_port));
    let api_session = session.clone();
    let api_tracker = tracker.clone();
    tokio::spawn(async move {
        if let Err(e) = api::start_api_server(api_addr, api_session, api_tracker).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    // Run the reconciliation poller until shutdown
    let poller = BridgePoller::new(
        ledger,
        session,
        tracker,
        Duration::from_secs(config.poller.pending_poll_secs),
        Duration::from_secs(config.poller.idle_poll_secs),
    );
    poller.run(shutdown_rx).await;

    metrics::UP.set(0.0);
    tracing::info!("SafeFlow client stopped");
    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,safeflow_client=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
