//! Logging initialization.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Filter used when `RUST_LOG` is not set: the configured level for our
/// crates, sqlx statement logging only at warn.
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{level},sqlx=warn,tower_http=info"))
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured
/// level; `format = "json"` selects structured output, anything else the
/// pretty formatter.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.format == "json" {
        let json_layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true);
        subscriber.with(json_layer).try_init()
    } else {
        let pretty_layer = fmt::layer()
            .pretty()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true);
        subscriber.with(pretty_layer).try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_includes_level() {
        let filter = default_filter("debug").to_string();
        assert!(filter.contains("debug"));
        assert!(filter.contains("sqlx=warn"));
    }
}
