use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use buildtrack_events::{
    DispatcherConfig, EmailConfig, LogMailer, Mailer, OutboxDispatcher, SmtpMailer,
};
use buildtrack_payments::{DisabledGateway, FlutterwaveConfig, FlutterwaveGateway, PaymentGateway};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buildtrack_api::config::ServerConfig;
use buildtrack_api::router::build_app_router;
use buildtrack_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "buildtrack_api=debug,buildtrack_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = buildtrack_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    buildtrack_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    buildtrack_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Integrations ---
    let mailer: Arc<dyn Mailer> = match EmailConfig::from_env() {
        Some(email_config) => {
            tracing::info!(smtp_host = %email_config.smtp_host, "SMTP delivery enabled");
            Arc::new(SmtpMailer::new(email_config).expect("Invalid SMTP configuration"))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let payments: Arc<dyn PaymentGateway> = match FlutterwaveConfig::from_env() {
        Some(fw_config) => {
            tracing::info!(base_url = %fw_config.base_url, "Flutterwave verification enabled");
            Arc::new(FlutterwaveGateway::new(fw_config))
        }
        None => {
            tracing::warn!("FLUTTERWAVE_SECRET_KEY not set, payment verification is disabled");
            Arc::new(DisabledGateway)
        }
    };

    // --- Outbox dispatcher ---
    let outbox_wakeup = Arc::new(Notify::new());
    let dispatcher = OutboxDispatcher::new(
        pool.clone(),
        mailer,
        DispatcherConfig {
            poll_interval: Duration::from_secs(config.outbox_poll_interval_secs),
            batch_size: config.outbox_batch_size,
        },
        Arc::clone(&outbox_wakeup),
    );
    let dispatcher_cancel = CancellationToken::new();
    let dispatcher_cancel_clone = dispatcher_cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_cancel_clone).await;
    });
    tracing::info!("Outbox dispatcher started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        payments,
        outbox_wakeup,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    dispatcher_cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, dispatcher_handle).await.is_err() {
        tracing::warn!("Outbox dispatcher did not stop in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
