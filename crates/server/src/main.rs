use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launchpro_core::{
    audit::{create_audit_system, AuditStore, SqliteAuditStore},
    config_path, create_authenticator, load_config, validate_config,
    stoploss::{
        AlertNotifier, HttpPerformanceSource, LogAlertNotifier, SqliteViolationStore,
        ViolationStore, WebhookAlertNotifier,
    },
    tracking::HttpTrackingStatusSource,
    AuditEvent, Authenticator, CampaignStore, HttpArticleSubmitter, HttpCreativeGenerator,
    PlatformRegistry, SqliteCampaignStore,
};
use launchpro_server::api::create_router;
use launchpro_server::state::{AppState, Collaborators, LaunchServices};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = config_path();

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Compute config hash for audit
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("Failed to create audit store")?,
    );
    info!("Audit store initialized");

    let campaigns: Arc<dyn CampaignStore> = Arc::new(
        SqliteCampaignStore::new(&config.database.path)
            .context("Failed to create campaign store")?,
    );
    info!("Campaign store initialized");

    let violations: Arc<dyn ViolationStore> = Arc::new(
        SqliteViolationStore::new(&config.database.path)
            .context("Failed to create violation store")?,
    );
    info!("Stop-loss violation store initialized");

    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted audit event");

    let upstream = config
        .upstream
        .as_ref()
        .context("Missing [upstream] section: article, creative and performance endpoints are required")?;

    info!("Article service at {}", upstream.article.url);
    let articles = Arc::new(
        HttpArticleSubmitter::new(&upstream.article)
            .context("Failed to create article submitter")?,
    );
    let tracking = Arc::new(
        HttpTrackingStatusSource::new(upstream.tracking_endpoint())
            .context("Failed to create tracking status client")?,
    );
    info!("Creative service at {}", upstream.creative.url);
    let creatives = Arc::new(
        HttpCreativeGenerator::new(&upstream.creative)
            .context("Failed to create creative generator")?,
    );
    let performance = Arc::new(
        HttpPerformanceSource::new(&upstream.performance)
            .context("Failed to create performance source")?,
    );

    let platforms = PlatformRegistry::from_config(&config.platforms)
        .context("Failed to create platform launchers")?;
    if platforms.is_empty() {
        error!("No platform launchers configured; every launch will fail");
    } else {
        info!("Platform launchers: {:?}", platforms.platforms());
    }

    let notifier: Arc<dyn AlertNotifier> = match &config.alerts.webhook {
        Some(webhook) => {
            info!("Stop-loss alerts delivered to {}", webhook.url);
            Arc::new(
                WebhookAlertNotifier::new(webhook).context("Failed to create alert webhook")?,
            )
        }
        None => {
            info!("No alert webhook configured, stop-loss alerts will only be logged");
            Arc::new(LogAlertNotifier)
        }
    };

    let services = LaunchServices::new(
        &config,
        Arc::clone(&campaigns),
        Arc::clone(&violations),
        Collaborators {
            articles,
            tracking,
            creatives,
            platforms,
            performance,
            notifier,
        },
        Some(audit_handle.clone()),
    );
    let scheduler = Arc::clone(&services.scheduler);

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        audit_handle.clone(),
        audit_store,
        campaigns,
        violations,
        services,
    ));

    if config.scheduler.enabled {
        scheduler.start().await;
    } else {
        info!("Launch scheduler disabled in config");
    }

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if scheduler.is_running() {
        info!("Stopping launch scheduler...");
        scheduler.stop().await;
    }

    info!("Server shutting down...");
    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // The writer exits once every AuditHandle is gone. The scheduler's jobs
    // hold clones through the orchestrator, queue, stop-loss and cleanup.
    drop(scheduler);
    drop(audit_handle);

    let _ = writer_handle.await;
    info!("Audit writer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
