use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use aura_booking::config::AppConfig;
use aura_booking::db;
use aura_booking::handlers;
use aura_booking::services::notifications::resend::ResendEmailProvider;
use aura_booking::services::notifications::{LogNotifier, Notifier};
use aura_booking::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let notifier: Box<dyn Notifier> = if config.resend_api_key.is_empty() {
        tracing::info!("RESEND_API_KEY not set, email notifications are log-only");
        Box::new(LogNotifier)
    } else {
        tracing::info!("using Resend email provider (from: {})", config.from_email);
        Box::new(ResendEmailProvider::new(
            config.resend_api_key.clone(),
            config.from_email.clone(),
        ))
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notifier,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/bookings", post(handlers::public::create_booking))
        .route("/api/bookings/:token", get(handlers::public::booking_status))
        .route(
            "/api/bookings/:token/cancel",
            post(handlers::public::cancel_booking),
        )
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route("/api/admin/bookings/:id", get(handlers::admin::get_booking))
        .route(
            "/api/admin/bookings/:id",
            patch(handlers::admin::update_booking),
        )
        .route(
            "/api/admin/blocked-dates",
            get(handlers::admin::list_blocked_dates),
        )
        .route(
            "/api/admin/blocked-dates",
            post(handlers::admin::add_blocked_date),
        )
        .route(
            "/api/admin/blocked-dates/:date",
            delete(handlers::admin::remove_blocked_date),
        )
        .route("/api/cron/reminders", post(handlers::cron::run_reminder_sweep))
        .route("/calendar/:token", get(handlers::calendar::download_ics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
