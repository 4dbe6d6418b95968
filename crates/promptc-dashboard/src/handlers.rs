//! Request handlers for the dashboard.

use crate::error::DashboardError;
use crate::page;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::{Html, Response};
use promptc_audit::{AuditCategory, AuditEvent, AuditResult};
use promptc_core::{TemplateTable, parse_template_table};
use promptc_runtime::MetricsView;
use serde::Serialize;
use std::time::Duration;

/// Liveness summary for `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub node_online: bool,
    /// RFC 3339 time of the last successful node probe.
    pub last_heartbeat: Option<String>,
    pub templates_count: usize,
    pub inference_count: u64,
    pub uptime_since: String,
}

/// Result of a hot-reload.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    pub templates: usize,
    /// False when the table is live but could not be written to disk.
    pub persisted: bool,
}

pub async fn home() -> Html<&'static str> {
    Html(page::DASHBOARD_HTML)
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsView> {
    Json(state.metrics().view(state.mode(), state.health()))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.metrics().snapshot();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        node_online: state.health().is_online(),
        last_heartbeat: state
            .health()
            .last_successful_check()
            .map(|t| t.to_rfc3339()),
        templates_count: state.templates().len(),
        inference_count: snapshot.inference_count,
        uptime_since: state.metrics().started_at().to_rfc3339(),
    })
}

pub async fn get_templates(State(state): State<AppState>) -> Json<TemplateTable> {
    Json(state.templates().snapshot().as_ref().clone())
}

/// Replace the whole template table.
///
/// A body that does not parse leaves the current table untouched.
pub async fn replace_templates(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ReloadResponse>, DashboardError> {
    let table = parse_template_table(&body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected template reload");
        DashboardError::InvalidRequest(e.to_string())
    })?;

    let (count, persisted, event) = match state.templates().replace(table) {
        Ok(count) => (
            count,
            true,
            AuditEvent::builder(AuditCategory::System, "HOT_RELOAD", "dashboard-operator")
                .detail(format!("{} templates", count)),
        ),
        Err(e) => {
            let count = state.templates().len();
            tracing::warn!(error = %e, "Template table swapped but not persisted");
            (
                count,
                false,
                AuditEvent::builder(AuditCategory::System, "HOT_RELOAD", "dashboard-operator")
                    .result(AuditResult::Warn)
                    .detail(format!("{} templates, not persisted: {}", count, e)),
            )
        }
    };

    tracing::info!(templates = count, persisted, "Templates hot-reloaded");
    state.hub().publish(event.build()).await;

    Ok(Json(ReloadResponse {
        status: "ok",
        templates: count,
        persisted,
    }))
}

pub async fn ws_logs(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_logs(socket, state))
}

/// Replay history, then forward live lines until either side goes away.
async fn stream_logs(mut socket: WebSocket, state: AppState) {
    let hub = state.hub().clone();
    let mut subscription = hub.subscribe();
    hub.publish_internal("dashboard client connected");

    for line in subscription.take_replay() {
        if socket.send(Message::Text(line.into())).await.is_err() {
            drop(subscription);
            hub.publish_internal("dashboard client disconnected");
            return;
        }
    }

    let period = state.ping_interval().max(Duration::from_secs(1));
    let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            line = subscription.recv() => {
                match line {
                    Some(line) => {
                        if socket.send(Message::Text(line.into())).await.is_err() {
                            break;
                        }
                    }
                    // dropped by the hub as a slow consumer
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            _ = ping.tick() => {
                if socket.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(subscription);
    hub.publish_internal("dashboard client disconnected");
}
