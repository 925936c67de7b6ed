//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;
pub use state_builders::{MemoryStores, PostgresStores, Stores};

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::DefaultClock;
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::Trace;
#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::Error;
use crate::inbound::http::configure_api;
use crate::inbound::http::error::{json_error_handler, path_error_handler, query_error_handler};
use crate::inbound::http::health::HealthState;
use crate::inbound::http::state::HttpState;
use crate::outbound::memory::MemoryStore;

/// Assemble the application with the shared extractor error handlers.
///
/// Integration tests build their apps through this as well.
pub fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .wrap(Trace)
        .configure(configure_api);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Build the HTTP state for `config`, bootstrapping the administrator first.
///
/// # Errors
///
/// Returns the store failure when the administrator cannot be created.
pub async fn prepare_state(config: &ServerConfig) -> Result<HttpState, Error> {
    let clock = Arc::new(DefaultClock);
    let scale = Arc::clone(&config.grade_scale);
    match &config.db_pool {
        Some(pool) => {
            info!("serving from PostgreSQL");
            let stores = PostgresStores::postgres(pool);
            stores.bootstrap_admin(config.admin.clone()).await?;
            Ok(stores.http_state(scale, clock))
        }
        None => {
            info!("no database configured; serving from the in-memory store");
            let stores = MemoryStores::memory(Arc::new(MemoryStore::new()));
            stores.bootstrap_admin(config.admin.clone()).await?;
            Ok(stores.http_state(scale, clock))
        }
    }
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// The health state is marked ready once the listener is bound.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when state preparation, binding the socket,
/// or starting the server fails.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = prepare_state(&config)
        .await
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    let http_state = web::Data::new(http_state);
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    info!(addr = %config.bind_addr, "registrar listening");
    Ok(server)
}
