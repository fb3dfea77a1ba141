use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use domain::services::{BookingService, GroupBookingService};
use persistence::PgBookingStore;
use shared::jwt::{JwtError, SessionVerifier};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, SecurityConfig};
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{bookings, group_bookings, health, invitations};
use crate::services::{EmailNotifier, EmailService};

pub type Bookings = BookingService<PgBookingStore, EmailNotifier>;
pub type GroupBookings = GroupBookingService<PgBookingStore, EmailNotifier>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub verifier: Arc<SessionVerifier>,
    pub bookings: Bookings,
    pub group_bookings: GroupBookings,
}

impl AppState {
    /// Wires the Postgres store and email notifier into the booking
    /// services. Fails when no usable session verification key is
    /// configured.
    pub fn new(config: Config, pool: PgPool) -> Result<Self, JwtError> {
        let verifier = Arc::new(config.auth.session_verifier()?);

        let mut email_config = config.email.clone();
        if email_config.base_url.is_empty() {
            email_config.base_url = config.server.app_base_url.clone();
        }
        let notifier = Arc::new(EmailNotifier::new(EmailService::new(email_config)));
        let store = Arc::new(PgBookingStore::new(pool.clone()));

        let bookings = BookingService::new(Arc::clone(&store), Arc::clone(&notifier));
        let group_bookings =
            GroupBookingService::new(store, notifier, config.booking.group_settings());

        Ok(Self {
            pool,
            config: Arc::new(config),
            verifier,
            bookings,
            group_bookings,
        })
    }
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    // Authentication is enforced per handler by the UserAuth extractor
    let booking_routes = Router::new()
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route(
            "/api/bookings/availability",
            get(bookings::check_availability),
        )
        .route("/api/bookings/:booking_id", get(bookings::get_booking))
        .route(
            "/api/bookings/:booking_id/status",
            patch(bookings::update_booking_status),
        );

    let group_booking_routes = Router::new()
        .route(
            "/api/group-bookings",
            post(group_bookings::create_group_booking),
        )
        .route(
            "/api/group-bookings/:booking_id",
            get(group_bookings::get_group_booking),
        )
        .route(
            "/api/group-bookings/:booking_id/participants",
            post(group_bookings::join_group_booking),
        )
        .route(
            "/api/group-bookings/:booking_id/participants/:user_id",
            delete(group_bookings::leave_group_booking),
        )
        .route(
            "/api/group-bookings/:booking_id/waitlist/:waitlist_id/promote",
            post(group_bookings::promote_waitlist_entry),
        )
        .route(
            "/api/group-bookings/:booking_id/invitations",
            post(group_bookings::send_invitation),
        )
        .route(
            "/api/invitations/respond",
            post(invitations::respond_to_invitation),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(booking_routes)
        .merge(group_booking_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config.security))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    async fn allowed_origin(security: &SecurityConfig, origin: &str) -> Option<String> {
        let app: Router = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer(security));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_cors_layer_with_origins() {
        let security = SecurityConfig {
            cors_origins: vec![
                "https://app.artsbooking.app".to_string(),
                // invalid origins are dropped rather than failing startup
                "not a header value\n".to_string(),
            ],
        };

        assert_eq!(
            allowed_origin(&security, "https://app.artsbooking.app").await,
            Some("https://app.artsbooking.app".to_string())
        );
        assert_eq!(allowed_origin(&security, "https://elsewhere.example").await, None);
    }

    #[tokio::test]
    async fn test_cors_layer_without_origins_allows_any() {
        let security = SecurityConfig {
            cors_origins: Vec::new(),
        };
        assert_eq!(
            allowed_origin(&security, "https://elsewhere.example").await,
            Some("*".to_string())
        );
    }
}
