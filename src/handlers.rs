// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the TLSRPT alerter service.
//!
//! Reporters only learn whether their payload was acceptable. Alerts are
//! dispatched in the background and their outcome is logged, never returned.

use crate::config::Config;
use crate::decoder::{decode_payload, is_compressed, to_text};
use crate::dispatcher::{AlertDispatcher, DispatchOutcome};
use crate::error::AlertError;
use crate::limiter::AlertGate;
use crate::mailer::MailSender;
use crate::metrics::Metrics;
use crate::report::{extract_failures, PolicyAlert, Report};
use crate::template::TemplateStore;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Shared application state.
pub struct AppState {
    pub dispatcher: AlertDispatcher,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    /// Wire up the alert pipeline from configuration.
    ///
    /// `mailer` is `None` when mail is not enabled.
    pub fn new(config: Config, mailer: Option<Arc<dyn MailSender>>) -> prometheus::Result<Self> {
        let gate = Arc::new(AlertGate::new(config.mail.cooldown_duration()));
        let templates = Arc::new(TemplateStore::new(config.template.path.clone()));
        let dispatcher = AlertDispatcher::new(
            gate,
            templates,
            mailer,
            config.mail.sender().unwrap_or_default(),
            config.mail.recipients.clone(),
        );

        Ok(Self {
            dispatcher,
            metrics: Metrics::new()?,
            config,
        })
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/v1/tls-rpt", post(ingest))
        .route("/v1/tlsrpt", post(ingest));

    if state.config.metrics.enabled {
        let path = state.config.metrics.path.clone();
        app = app.route(&path, get(metrics));
    }

    app.layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "tlsrpt-alerter",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Accept a TLSRPT submission.
///
/// Responds `204` once the payload parses, whatever happens to the alerts;
/// `400` when it does not.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.metrics.reports_received.inc();

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let compressed = is_compressed(content_type);
    debug!(
        content_type = ?content_type,
        compressed,
        len = body.len(),
        "Processing TLSRPT submission"
    );

    let decoded = decode_payload(&body, compressed, state.config.max_body_bytes);
    let report = match Report::parse(to_text(&decoded)) {
        Ok(report) => report,
        Err(err) => {
            state.metrics.reports_rejected.inc();
            warn!(error = %err, "Rejecting malformed report");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.to_string(),
                    code: "MALFORMED_REPORT",
                }),
            )
                .into_response();
        }
    };

    info!(
        org = ?report.organization_name,
        report_id = ?report.report_id,
        policies = report.policies.len(),
        "Report received"
    );

    let alerts = extract_failures(&report);
    if !alerts.is_empty() {
        let state = state.clone();
        tokio::spawn(async move {
            process_alerts(&state, &report, &alerts).await;
        });
    }

    StatusCode::NO_CONTENT.into_response()
}

/// Dispatch alerts for each failing policy in order, logging every outcome.
pub async fn process_alerts(
    state: &AppState,
    report: &Report,
    alerts: &[PolicyAlert],
) -> Vec<Result<DispatchOutcome, AlertError>> {
    let mut results = Vec::with_capacity(alerts.len());
    for alert in alerts {
        let result = state.dispatcher.report_issue(report, alert).await;
        match &result {
            Ok(outcome) => {
                state.metrics.record_alert(outcome.label());
                debug!(domain = ?alert.identity.domain, outcome = outcome.label(), "Alert processed");
            }
            Err(err) => {
                state.metrics.record_alert("failed");
                error!(domain = ?alert.identity.domain, error = %err, "Failed to send alert");
            }
        }
        results.push(result);
    }
    results
}
