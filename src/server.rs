//! actix-web application assembly and startup.

use std::{net::SocketAddr, sync::Arc};

use actix_cors::Cors;
use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use log::info;

use crate::{
    config::GatewayConfig,
    execution::PredictionExecutor,
    handlers::{self, predict},
    process::python::ScriptExecutor,
};

/// Any origin, method and header.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

/// Routes plus the shared state they need.
pub fn configure(
    executor: web::Data<dyn PredictionExecutor>,
    body_limit: usize,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(executor)
            .app_data(
                web::JsonConfig::default()
                    .limit(body_limit)
                    .error_handler(predict::json_error_handler),
            )
            .route("/predict", web::post().to(predict::predict))
            .route("/health", web::get().to(handlers::health::health))
            .default_service(web::route().to(handlers::not_found));
    }
}

/// Bind the listener and return the (not yet awaited) server with its addresses.
pub fn build(config: &GatewayConfig, executor: Arc<dyn PredictionExecutor>) -> Result<(Server, Vec<SocketAddr>)> {
    let executor = web::Data::from(executor);
    let body_limit = config.body_limit;

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors())
            .configure(configure(executor.clone(), body_limit))
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    let server = server
        .bind((config.host.as_str(), config.port))
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let addrs = server.addrs();
    Ok((server.run(), addrs))
}

pub async fn run(config: GatewayConfig) -> Result<()> {
    let executor = Arc::new(ScriptExecutor::from_config(&config));
    let (server, addrs) = build(&config, executor)?;

    let script = config.script.as_deref().unwrap_or("<none>");
    info!("prediction command: {} {} <symptoms>", config.program, script);
    if let Some(t) = config.timeout {
        info!("prediction timeout: {:?}", t);
    }
    if let Some(n) = config.max_concurrency {
        info!("max concurrent predictions: {}", n);
    }
    for addr in &addrs {
        info!("Server running on http://{}", addr);
    }

    server.await.context("HTTP server terminated with an error")
}
