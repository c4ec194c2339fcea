// /server/src/main.rs
use dotenvy::dotenv;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod routes;
mod state;
mod store;
mod sync;
mod templates;

use config::Config;
use state::AppState;

/// Creates the configured superuser if no account with that email exists.
async fn ensure_superuser(state: &AppState) -> Result<(), error::AppError> {
    let Some(seed) = &state.config.superuser else {
        return Ok(());
    };

    if store::users::find_by_email(&state.pool, &seed.email).await?.is_some() {
        tracing::debug!("Superuser {} already present", seed.email);
        return Ok(());
    }

    let user = store::users::create_superuser(
        &state.pool,
        &seed.email,
        &seed.first_name,
        &seed.last_name,
        seed.password.as_deref(),
    )
    .await?;
    tracing::info!("Created superuser {}", user.email);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "role_accounts=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration: {:?}", &config);

    let pool = db::connect_db(&config.database_url).await?;
    let bind_addr = config.bind_addr;
    let app_state = AppState { pool, config };

    ensure_superuser(&app_state).await?;

    let app = routes::create_router(app_state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
