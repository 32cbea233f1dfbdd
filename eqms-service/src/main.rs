use eqms_core::middleware::rate_limit::create_ip_rate_limiter;
use eqms_core::observability::logging::init_tracing;
use eqms_service::{
    build_router,
    config::EqmsConfig,
    middleware::{AuditTrail, FlexibleAuth},
    services::{AuditRecorder, Database, PgAuditSink, SessionService, TokenService},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), eqms_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = EqmsConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting E-QMS service"
    );

    let db = Database::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    let tokens = TokenService::new(&config.tokens);
    let audit = AuditRecorder::new(Arc::new(PgAuditSink::new(db.clone())));
    let sessions = SessionService::new(db.clone(), tokens.clone(), audit.clone());
    let flexible = FlexibleAuth::new(tokens.clone());
    let trail = AuditTrail::new(audit.clone());

    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    tracing::info!("Login rate limiter initialized");

    let state = AppState {
        config: config.clone(),
        db,
        tokens,
        sessions,
        audit,
        flexible,
        trail,
        login_rate_limiter,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
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
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
