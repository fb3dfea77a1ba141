//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub email: EmailHealth,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
    pub pool_size: u32,
    pub idle_connections: usize,
}

/// Outbound email status. Email never gates readiness.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EmailHealth {
    pub enabled: bool,
    pub provider: String,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

async fn ping_database(state: &AppState) -> bool {
    sqlx::query("SELECT 1").execute(&state.pool).await.is_ok()
}

/// Full health check endpoint.
///
/// Returns database connectivity, pool usage and the email provider in use.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let start = std::time::Instant::now();
    let db_connected = ping_database(&state).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let response = HealthResponse {
        status: if db_connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            connected: db_connected,
            latency_ms: db_connected.then_some(latency_ms),
            pool_size: state.pool.size(),
            idle_connections: state.pool.num_idle(),
        },
        email: EmailHealth {
            enabled: state.config.email.enabled,
            provider: state.config.email.provider.clone(),
        },
    };

    if db_connected {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    if ping_database(&state).await {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.3.0".to_string(),
            database: DatabaseHealth {
                connected: true,
                latency_ms: Some(5),
                pool_size: 4,
                idle_connections: 3,
            },
            email: EmailHealth {
                enabled: false,
                provider: "console".to_string(),
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"]["latency_ms"], 5);
        assert_eq!(json["database"]["idle_connections"], 3);
        assert_eq!(json["email"]["provider"], "console");
    }

    #[test]
    fn test_database_health_disconnected() {
        let health = DatabaseHealth {
            connected: false,
            latency_ms: None,
            pool_size: 0,
            idle_connections: 0,
        };
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["connected"], false);
        assert!(json["latency_ms"].is_null());
    }

    #[test]
    fn test_status_response() {
        let response = StatusResponse {
            status: "alive".to_string(),
        };
        assert_eq!(serde_json::to_string(&response).unwrap(), r#"{"status":"alive"}"#);
    }
}
