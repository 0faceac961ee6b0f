//! Word Cloud authentication server
//!
//! Loads configuration, connects to Postgres, runs migrations and serves the
//! authentication routes under `/api/v1`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordcloud_auth::{
    create_routes, AuthConfig, AuthService, MailConfig, PgStore, ServerConfig, SmtpMailer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordcloud_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A missing or weak secret stops the process here.
    let auth_config = AuthConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;
    let mail_config = MailConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(server_config.max_connections)
        .connect(&server_config.database_url)
        .await?;

    let store = PgStore::new(pool);
    store.migrate().await?;

    let service = AuthService::new(
        auth_config,
        Arc::new(store),
        Arc::new(SmtpMailer::new(mail_config)?),
    )?;

    let app = Router::new()
        .route("/", get(root_handler))
        .nest("/api/v1", create_routes(Arc::new(service)))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to the server" }))
}
