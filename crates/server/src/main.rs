//! strmlink server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use strmlink_core::SystemClock;
use strmlink_core::config::AppConfig;
use strmlink_server::{AppState, EvictionScheduler, RequestLogger, create_router};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// strmlink - redirect file descriptors to direct download links
#[derive(Parser, Debug)]
#[command(name = "strmlinkd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "STRMLINK_CONFIG",
        default_value = "config/strmlink.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file and the environment.
///
/// Precedence, lowest first: file, `P123_PASSPORT`/`P123_PASSWORD`,
/// then `STRMLINK_` variables with `__` as the section separator.
fn load_config(path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    }

    let legacy = Env::raw()
        .only(&["P123_PASSPORT", "P123_PASSWORD"])
        .map(|key| {
            if key.as_str().eq_ignore_ascii_case("P123_PASSPORT") {
                "upstream.passport".into()
            } else {
                "upstream.password".into()
            }
        });

    let config: AppConfig = figment
        .merge(legacy)
        .merge(Env::prefixed("STRMLINK_").ignore(&["CONFIG"]).split("__"))
        .extract()
        .context("failed to load configuration")?;

    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = Path::new(&args.config);
    let config = load_config(config_path)?;

    let default_filter = if config.server.debug {
        "debug,tower_http=debug"
    } else {
        "info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("strmlink v{}", env!("CARGO_PKG_VERSION"));
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loaded configuration file");
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    strmlink_server::metrics::register_metrics();

    let store = strmlink_cache::from_config(&config.store)
        .await
        .context("failed to initialize resolution store")?;
    store
        .health_check()
        .await
        .context("resolution store health check failed")?;
    tracing::info!(backend = store.backend(), "Resolution store initialized");

    let upstream =
        strmlink_upstream::from_config(&config.upstream).context("failed to initialize upstream")?;

    let (request_log, request_log_writer) = if config.request_log.enabled {
        let (logger, writer) = RequestLogger::spawn(store.clone(), config.request_log.buffer_size);
        tracing::info!(
            retention_secs = config.request_log.retention_secs,
            "Request log enabled"
        );
        (logger, Some(writer))
    } else {
        (RequestLogger::disabled(), None)
    };

    let state = AppState::new(
        config.clone(),
        store,
        upstream,
        Arc::new(SystemClock),
        request_log,
    );

    // Warm the session so the first request does not pay for a login.
    // Failure here is not fatal; the next request retries.
    match state.credentials.ensure_valid().await {
        Ok(credential) => tracing::info!(
            expires_at = ?credential.expires_at,
            "Upstream session established"
        ),
        Err(e) => tracing::warn!(error = %e, "Initial upstream login failed, will retry on demand"),
    }

    let scheduler = EvictionScheduler::start(&state);

    let app = create_router(state);
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutting down");
    scheduler.shutdown().await;
    // The router held the last logger clone; the writer now drains and exits.
    if let Some(writer) = request_log_writer
        && let Err(e) = writer.await
    {
        tracing::warn!(error = %e, "request log writer ended abnormally");
    }

    Ok(())
}
