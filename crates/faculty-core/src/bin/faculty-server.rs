//! Faculty administration API server

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use faculty_core::api::create_router_with_cors;
use faculty_core::{init, AppConfig, ApiState, Error, NewIdentity, Role};

const BOOTSTRAP_ADMIN_ENV: &str = "FACULTY_BOOTSTRAP_ADMIN_PASSWORD";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = AppConfig::from_env().context("loading configuration")?;
    let state = init(&config).await.context("initializing services")?;

    if let Ok(password) = std::env::var(BOOTSTRAP_ADMIN_ENV) {
        bootstrap_admin(&state, password).await?;
    }

    let app = create_router_with_cors(state, &config.cors);
    let listener = TcpListener::bind(&config.api_bind_address)
        .await
        .with_context(|| format!("binding {}", config.api_bind_address))?;
    info!("Faculty API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("faculty_core=info,faculty_server=info,tower_http=info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the initial `admin` account if it does not exist yet
async fn bootstrap_admin(state: &ApiState, password: String) -> Result<()> {
    let password_hash = state.auth_service.passwords().hash_blocking(password).await?;
    let admin = NewIdentity {
        username: "admin".to_string(),
        password_hash,
        email: "admin@faculty.local".to_string(),
        phone: None,
        full_name: "Administrator".to_string(),
        role: Role::Admin,
        active: true,
    };

    match state.users.create_user(admin).await {
        Ok(user) => info!(user_id = user.id, "Bootstrap admin account created"),
        Err(Error::UserAlreadyExists(_)) => warn!("Bootstrap admin already exists, leaving it untouched"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down server...");
}
