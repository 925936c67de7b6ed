//! Registrar entry-point: loads settings, prepares storage, and serves the
//! REST API with its health checks.

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use registrar::inbound::http::health::HealthState;
use registrar::outbound::persistence::{DbPool, run_pending_migrations};
use registrar::server::{ServerConfig, create_server};
use registrar::settings::RegistrarSettings;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = RegistrarSettings::load_from_iter(std::env::args_os())
        .wrap_err("failed to load settings")?;

    let mut config = ServerConfig::new(settings.bind_addr()?)
        .with_grade_scale(settings.grade_scale()?)
        .with_admin(settings.admin_account()?);

    if let Some(pool_config) = settings.pool_config() {
        run_pending_migrations(pool_config.database_url())
            .await
            .wrap_err("failed to apply migrations")?;
        let pool = DbPool::new(pool_config)
            .await
            .wrap_err("failed to build database pool")?;
        config = config.with_db_pool(pool);
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config).await?;
    let result = server.await;
    health_state.mark_unhealthy();
    result.wrap_err("server terminated with an error")
}
