//! Common test utilities for integration tests.
//!
//! Tests run against the PostgreSQL database named by `TEST_DATABASE_URL`
//! and are skipped when it is unset or unreachable. Each test uses its own
//! resource ids, so tests can share one database without cleanup.

#![allow(dead_code)]

use arts_booking_api::{
    app::{create_app, AppState},
    config::Config,
};
use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

/// HS256 secret accepted by `Config::load_for_test`.
pub const TEST_SESSION_SECRET: &str = "test-session-secret";

/// Connects to the test database and applies migrations, or returns `None`
/// when no database is available.
pub async fn try_test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping integration test");
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Test database unreachable ({e}), skipping integration test");
            return None;
        }
    };

    persistence::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

pub fn test_config() -> Config {
    let url = std::env::var("TEST_DATABASE_URL").unwrap_or_default();
    Config::load_for_test(&[("database.url", url.as_str())]).expect("Failed to load test config")
}

pub fn create_test_app(pool: PgPool) -> Router {
    let state = AppState::new(test_config(), pool).expect("Failed to build app state");
    create_app(state)
}

/// A signed-in user with a generated name and email.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl TestUser {
    pub fn new() -> Self {
        Self {
            user_id: format!("user_{}", Uuid::new_v4().simple()),
            name: Name().fake(),
            email: SafeEmail().fake(),
        }
    }

    /// Session token as the auth provider would issue it.
    pub fn token(&self) -> String {
        let now = Utc::now().timestamp();
        let claims = json!({
            "sub": self.user_id,
            "email": self.email,
            "sid": format!("sess_{}", Uuid::new_v4().simple()),
            "iat": now,
            "exp": now + 3600,
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SESSION_SECRET.as_bytes()),
        )
        .expect("Failed to sign test token")
    }
}

/// A resource id no other test uses.
pub fn unique_resource_id() -> String {
    format!("room-{}", Uuid::new_v4().simple())
}

/// A start time safely in the future, on the hour.
pub fn future_slot_start(days_ahead: i64) -> DateTime<Utc> {
    let start = Utc::now() + Duration::days(days_ahead);
    start - Duration::seconds(start.timestamp() % 3600)
}

pub fn request(
    method: Method,
    uri: &str,
    user: Option<&TestUser>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("Authorization", format!("Bearer {}", user.token()));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("Failed to build request")
}

pub async fn parse_response_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

pub fn group_booking_body(resource_id: &str, capacity: i32, booking_type: &str) -> Value {
    let start = future_slot_start(14);
    json!({
        "org_id": "org_test",
        "resource_id": resource_id,
        "title": "Ensemble workshop",
        "start_time": start,
        "end_time": start + Duration::hours(2),
        "capacity": capacity,
        "waitlist_enabled": true,
        "group_booking_type": booking_type,
    })
}
