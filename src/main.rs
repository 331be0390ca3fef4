use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "challengehub_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Database
    let db = db::create_pool(&config.database_url).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let state = AppState {
        db,
        config: config.clone(),
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        // Template catalog is browsable without an account
        .route("/api/templates", get(handlers::templates::list_templates))
        .route("/api/templates/:id", get(handlers::templates::get_template));

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Challenges
        .route("/api/challenges", get(handlers::challenges::list_challenges))
        .route(
            "/api/challenges/start",
            post(handlers::challenges::start_challenge),
        )
        .route(
            "/api/challenges/custom",
            post(handlers::challenges::create_custom_challenge),
        )
        .route(
            "/api/challenges/:id",
            get(handlers::challenges::get_challenge),
        )
        .route(
            "/api/challenges/:id/complete",
            post(handlers::challenges::complete_challenge),
        )
        .route(
            "/api/challenges/:id/calendar",
            get(handlers::challenges::challenge_calendar),
        )
        // Check-ins
        .route(
            "/api/challenges/:id/checkin",
            post(handlers::checkins::upsert_checkin),
        )
        .route(
            "/api/challenges/:id/checkins",
            get(handlers::checkins::list_checkins),
        )
        // Achievements
        .route(
            "/api/achievements",
            get(handlers::achievements::list_achievements),
        )
        .route(
            "/api/achievements/evaluate",
            post(handlers::achievements::evaluate_achievements),
        )
        .route(
            "/api/achievements/recalculate",
            post(handlers::achievements::recalculate_achievements),
        )
        // Profile
        .route("/api/profile/stats", get(handlers::profile::get_profile_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    // Purge terminal challenges past the retention window
    handlers::challenges::spawn_retention_worker(
        state.db.clone(),
        config.retention_days,
        config.retention_interval_secs,
    );

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
