//! Prometheus metrics middleware.
//!
//! Provides HTTP request/response metrics collection and export, plus the
//! booking counters recorded by route handlers and jobs.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::JoinOutcome;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Middleware to record HTTP request metrics.
///
/// Records the following metrics:
/// - `http_requests_total`: Counter with labels (method, path, status)
/// - `http_request_duration_seconds`: Histogram with labels (method, path)
///
/// `path` is the matched route template, so booking ids do not explode
/// label cardinality.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = method_to_str(req.method());
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method,
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(duration);

    response
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// Label for a join attempt.
fn join_outcome_label(outcome: &JoinOutcome) -> &'static str {
    match outcome {
        JoinOutcome::Confirmed { .. } => "confirmed",
        JoinOutcome::Waitlisted { .. } => "waitlisted",
    }
}

/// Record a booking created through the API.
pub fn record_booking_created(group: bool) {
    let kind = if group { "group" } else { "single" };
    counter!("bookings_created_total", "kind" => kind).increment(1);
}

/// Record a join attempt that produced a participant or a waitlist entry.
pub fn record_group_join(outcome: &JoinOutcome) {
    counter!("group_booking_joins_total", "outcome" => join_outcome_label(outcome)).increment(1);
}

/// Record a waitlist entry converted into a participant.
pub fn record_waitlist_promotion() {
    counter!("waitlist_promotions_total").increment(1);
}

pub fn record_invitation_sent() {
    counter!("invitations_sent_total").increment(1);
}

/// Record rows expired by the reconciliation sweep.
pub fn record_expired(invitations: u64, waitlist_entries: u64) {
    counter!("expired_items_total", "kind" => "invitation").increment(invitations);
    counter!("expired_items_total", "kind" => "waitlist_entry").increment(waitlist_entries);
}

/// Handler for /metrics endpoint that returns Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        )
    }
}

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once during application startup before any metrics are
/// recorded. A second call fails because the global recorder is already set.
pub fn init_metrics() -> Result<(), BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0])?
        .install_recorder()?;

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{Participant, ParticipantStatus};
    use uuid::Uuid;

    #[test]
    fn test_method_to_str() {
        assert_eq!(method_to_str(&Method::GET), "GET");
        assert_eq!(method_to_str(&Method::POST), "POST");
        assert_eq!(method_to_str(&Method::DELETE), "DELETE");
        assert_eq!(method_to_str(&Method::PATCH), "PATCH");
        assert_eq!(method_to_str(&Method::TRACE), "OTHER");
    }

    #[test]
    fn test_join_outcome_label() {
        let participant = Participant {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            user_id: "user_1".to_string(),
            display_name: None,
            email: None,
            phone: None,
            status: ParticipantStatus::Confirmed,
            role: "participant".to_string(),
            notes: None,
            registered_at: Utc::now(),
            confirmed_at: Some(Utc::now()),
            cancelled_at: None,
            metadata: serde_json::json!({}),
        };
        let outcome = JoinOutcome::Confirmed {
            participant,
            available_spots: 0,
        };
        assert_eq!(join_outcome_label(&outcome), "confirmed");
    }
}
