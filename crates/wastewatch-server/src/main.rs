use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use wastewatch_api::auth::{self, AppState, AppStateInner};
use wastewatch_api::middleware::require_auth;
use wastewatch_api::{notifications, reports, rewards};
use wastewatch_classify::Classifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wastewatch=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("WASTEWATCH_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("WASTEWATCH_DB_PATH").unwrap_or_else(|_| "wastewatch.db".into());
    let host = std::env::var("WASTEWATCH_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("WASTEWATCH_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let classify_url = std::env::var("WASTEWATCH_CLASSIFY_URL")
        .unwrap_or_else(|_| "https://classify.invalid/v1/generate".into());
    let classify_api_key = std::env::var("WASTEWATCH_CLASSIFY_API_KEY").unwrap_or_default();

    // Init database
    let db = wastewatch_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state; the classifier is built once and injected, never a
    // process-wide singleton.
    let classifier = Classifier::new(classify_url, classify_api_key);
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        classifier,
        jwt_secret,
    });

    // Routes
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::login))
        .route("/reports/recent", get(reports::list_recent))
        .route("/leaderboard", get(rewards::leaderboard))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/classify", post(reports::classify))
        .route("/reports", post(reports::submit_report))
        .route("/tasks", get(reports::list_tasks))
        .route("/tasks/{report_id}/status", post(reports::update_status))
        .route("/tasks/{report_id}/verify", post(reports::verify_collection))
        .route("/rewards", get(rewards::list_offers))
        .route("/rewards/balance", get(rewards::balance))
        .route("/rewards/transactions", get(rewards::list_transactions))
        .route("/rewards/redeem", post(rewards::redeem))
        .route("/notifications", get(notifications::list_unread))
        .route(
            "/notifications/{notification_id}/read",
            post(notifications::mark_read),
        )
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Wastewatch server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}
