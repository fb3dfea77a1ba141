//! Database metrics.
//!
//! Every repository method times its statements with [`QueryTimer`]; the
//! pool gauges are refreshed by a background job in the API crate.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::{Duration, Instant};

/// Statements slower than this are counted and logged.
pub const SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(500);

pub fn record_query_duration(query_name: &'static str, elapsed: Duration) {
    histogram!("database_query_duration_seconds", "query" => query_name)
        .record(elapsed.as_secs_f64());

    if elapsed >= SLOW_QUERY_THRESHOLD {
        counter!("database_slow_queries_total", "query" => query_name).increment(1);
        tracing::warn!(
            query = query_name,
            elapsed_ms = elapsed.as_millis() as u64,
            "Slow database query"
        );
    }
}

/// Record connection pool gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle() as u32;
    let max = pool.options().get_max_connections();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
    gauge!("database_pool_utilization").set(utilization(size, idle, max));
}

/// Share of the pool's maximum size currently checked out.
fn utilization(size: u32, idle: u32, max: u32) -> f64 {
    if max == 0 {
        return 0.0;
    }
    size.saturating_sub(idle) as f64 / max as f64
}

/// Times one repository statement.
///
/// ```ignore
/// let timer = QueryTimer::new("find_booking_by_id");
/// let result = sqlx::query_as::<_, BookingEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed());
    }
}
