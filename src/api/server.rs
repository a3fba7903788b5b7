use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, Method, StatusCode},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::{limit::ConcurrencyLimitLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::api::routes::create_routes;
use crate::api::server_config::*;
use crate::service::RiskMonitor;

#[derive(Clone)]
pub struct MonitorServer {
    pub monitor: Arc<RiskMonitor>,
    pub host: String,
    pub port: u16,
}

impl MonitorServer {
    pub fn new(monitor: Arc<RiskMonitor>, host: impl Into<String>, port: u16) -> Self {
        Self {
            monitor,
            host: host.into(),
            port,
        }
    }

    pub fn create_router(&self) -> Router {
        let cors_origin =
            std::env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string());
        let timeout = request_timeout(self.monitor.classifier().timeout());

        create_routes(self.monitor.clone())
            .layer(
                ServiceBuilder::new()
                    // Convert middleware errors (timeout/overload) into HTTP responses
                    .layer(HandleErrorLayer::new(|err: BoxError| async move {
                        if err.is::<tower::timeout::error::Elapsed>() {
                            (StatusCode::REQUEST_TIMEOUT, "request timed out")
                        } else {
                            (StatusCode::SERVICE_UNAVAILABLE, "service overloaded")
                        }
                    }))
                    .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENCY))
                    .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
                    .layer(TimeoutLayer::new(timeout))
                    .layer(TraceLayer::new_for_http()),
            )
            .layer(cors_layer(&cors_origin))
    }

    pub async fn start(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = self.create_router();
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("Server listening on {}", addr);

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

/// Comma-separated origins; unparsable entries are skipped
fn cors_layer(origins: &str) -> CorsLayer {
    let list: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match HeaderValue::from_str(s) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", s);
                None
            }
        })
        .collect();

    let allow_origin = if list.is_empty() {
        AllowOrigin::exact(HeaderValue::from_static(DEFAULT_CORS_ORIGIN))
    } else {
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .max_age(CORS_MAX_AGE)
}
