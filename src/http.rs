use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::Server;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};

use crate::error::OrderError;
use crate::metrics::Metrics;
use crate::service::OrderService;

// ============================================================================
// HTTP API - order lookup, metrics and health
// ============================================================================
//
//   GET /orders/{order_uid}  the stored aggregate as JSON
//   GET /metrics             Prometheus text exposition
//   GET /health              liveness probe
//
// ============================================================================

/// Starts the HTTP server. Signal handling stays with the caller, which
/// also decides when to stop the returned server.
pub fn start_http_server(
    addr: &str,
    service: Arc<OrderService>,
    metrics: Arc<Metrics>,
    shutdown_grace: Duration,
) -> std::io::Result<Server> {
    tracing::info!("📊 Starting HTTP server on http://{}", addr);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .app_data(web::Data::new(metrics.clone()))
            .configure(routes)
    })
    .disable_signals()
    .shutdown_timeout(shutdown_grace.as_secs())
    .bind(addr)?
    .run();

    Ok(server)
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/orders/{order_uid}", web::get().to(order_handler))
        .route("/metrics", web::get().to(metrics_handler))
        .route("/health", web::get().to(health_handler));
}

async fn order_handler(
    path: web::Path<String>,
    service: web::Data<Arc<OrderService>>,
) -> impl Responder {
    let order_uid = path.into_inner();
    match service.get_order(&order_uid).await {
        Ok(order) => HttpResponse::Ok().json(order),
        Err(OrderError::NotFound(_)) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "order not found"
        })),
        Err(error) => {
            tracing::error!(order_uid = %order_uid, %error, "Order lookup failed");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "internal error"
            }))
        }
    }
}

async fn metrics_handler(metrics: web::Data<Arc<Metrics>>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = metrics.registry().gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "orderstream"
    }))
}

// ============================================================================
// Tests
// ============================================================================
