mod sweep;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use habitude_api::{AppState, AppStateInner};
use habitude_notify::Notifier;
use habitude_notify::dispatcher;
use habitude_notify::telegram::TelegramNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habitude=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("HABITUDE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("HABITUDE_DB_PATH").unwrap_or_else(|_| "habitude.db".into());
    let host = std::env::var("HABITUDE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("HABITUDE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let reminder_interval: u64 = std::env::var("HABITUDE_REMINDER_INTERVAL_SECS")
        .unwrap_or_else(|_| "60".into())
        .parse()?;
    let sweep_interval: u64 = std::env::var("HABITUDE_SWEEP_INTERVAL_SECS")
        .unwrap_or_else(|_| "86400".into())
        .parse()?;
    let telegram_api_url =
        std::env::var("TELEGRAM_API_URL").unwrap_or_else(|_| "https://api.telegram.org".into());
    let telegram_token = std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();

    // Init database
    let db = Arc::new(habitude_db::Database::open(&PathBuf::from(&db_path))?);

    // Background jobs: habit reminders and the inactive-account sweep
    if telegram_token.is_empty() {
        warn!("TELEGRAM_BOT_TOKEN not set; reminder dispatch disabled");
    } else {
        let notifier: Arc<dyn Notifier> =
            Arc::new(TelegramNotifier::new(telegram_api_url, telegram_token));
        tokio::spawn(dispatcher::run_reminder_loop(
            db.clone(),
            notifier,
            reminder_interval,
        ));
    }
    tokio::spawn(sweep::run_sweep_loop(db.clone(), sweep_interval));

    // Shared state and routes
    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    let app = habitude_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Habitude server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
