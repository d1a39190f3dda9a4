use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use authgate_server::config::CorsConfig;
use authgate_server::{
    configure_routes, notifier_from_settings, AppError, AppState, MemoryOtpStore,
    MemorySessionStore, MemoryUserStore, Settings,
};
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn build_cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
    };

    cors.max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> authgate_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Fails here when JWT_SECRET_KEY is missing
    let config = Settings::new()?;
    info!("Configuration loaded successfully ({} environment)", config.environment);

    let otp_store = Arc::new(MemoryOtpStore::new());
    let sessions = Arc::new(MemorySessionStore::new());
    let state = AppState::from_parts(
        config.clone(),
        otp_store.clone(),
        notifier_from_settings(&config)?,
        sessions.clone(),
        Arc::new(MemoryUserStore::new()),
    )?;

    // Drop expired OTPs and sessions
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let otps = otp_store.purge_expired().await;
            let expired_sessions = sessions.purge_expired().await;
            debug!("Purged {} OTP records and {} sessions", otps, expired_sessions);
        }
    });

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    let gate = state.require_session();
    let state = web::Data::new(state);
    let cors_config = config.cors.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_config))
            .app_data(state.clone())
            .configure(|cfg| configure_routes(cfg, gate.clone()))
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(())
}
