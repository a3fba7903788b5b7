//! Risk monitor API routes
//!
//! REST read surface over the monitor plus a WebSocket feed of
//! classification events.

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket},
        Json, Path, Query, State, WebSocketUpgrade,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures::{stream::StreamExt, SinkExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::types::{
    ApiError, ApiResponse, HealthResponse, TransactionQuery, TransactionView,
};
use crate::risk_detection::{transaction::short_hash, TransactionSummary};
use crate::service::RiskMonitor;

pub type AppState = Arc<RiskMonitor>;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/transactions", get(get_transactions))
        .route("/api/transactions/:hash", get(get_transaction))
        .route("/api/stats", get(get_stats))
        .route("/api/analysis", get(get_analysis))
        .route("/api/update_transaction", post(update_transaction))
        .route("/api/events", get(websocket_handler))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// GET /api/health
async fn health_check(State(monitor): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        analyzer: monitor.classifier().analyzer_name().to_string(),
        signatures: monitor.signatures().len(),
    })
}

/// GET /api/transactions?risk=<tier|all>
async fn get_transactions(
    State(monitor): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionView>>, ApiError> {
    let filter = query.tier_filter()?;
    let rows = monitor
        .list_transactions(filter)
        .into_iter()
        .map(TransactionView::from)
        .collect();
    Ok(Json(rows))
}

/// GET /api/transactions/:hash
async fn get_transaction(
    State(monitor): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<TransactionView>, ApiError> {
    monitor
        .get_transaction(&hash)
        .map(|stored| Json(TransactionView::from(stored)))
        .ok_or_else(|| ApiError::not_found(format!("transaction {} not found", hash)))
}

/// GET /api/stats
async fn get_stats(State(monitor): State<AppState>) -> Response {
    Json(monitor.read_stats()).into_response()
}

/// GET /api/analysis
///
/// Latest generative analysis, or `{}` before the first one.
async fn get_analysis(State(monitor): State<AppState>) -> Response {
    match monitor.read_stats().latest_analysis {
        Some(latest) => Json(latest).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    }
}

/// POST /api/update_transaction
async fn update_transaction(
    State(monitor): State<AppState>,
    payload: Result<Json<TransactionSummary>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(summary) = payload.map_err(|rejection| {
        monitor.metrics().record_rejected_input();
        warn!(status = %rejection.status(), "undecodable transaction summary");
        ApiError::bad_request(rejection.body_text())
    })?;
    info!(tx = short_hash(&summary.hash), "transaction submitted");
    let result = monitor.classify_and_record(summary).await?;
    Ok(Json(ApiResponse::ok(result)).into_response())
}

/// GET /metrics
async fn metrics(State(monitor): State<AppState>) -> Result<Response, ApiError> {
    let body = monitor
        .metrics()
        .export_metrics()
        .map_err(|e| ApiError::internal(format!("metrics export failed: {}", e)))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// WS /api/events
async fn websocket_handler(ws: WebSocketUpgrade, State(monitor): State<AppState>) -> Response {
    debug!("event stream upgrade requested");
    ws.on_upgrade(|socket| handle_websocket(socket, monitor))
}

async fn handle_websocket(socket: WebSocket, monitor: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = monitor.subscribe();

    info!("event stream connected");

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Drain client frames so close is noticed; pings are answered by axum
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    info!("event stream disconnected");
}
