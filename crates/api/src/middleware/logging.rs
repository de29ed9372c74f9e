//! Logging initialization.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Crates whose debug output drowns out request logs.
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn", "tower_http=info"];

/// Builds the filter from the configured level. `RUST_LOG` takes precedence.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut directives = vec![level.to_string()];
        directives.extend(QUIET_TARGETS.iter().map(|t| t.to_string()));
        EnvFilter::new(directives.join(","))
    })
}

/// Initializes the global subscriber. `format` is `json` or anything else for
/// human readable output.
pub fn init_logging(config: &LoggingConfig) {
    let subscriber = tracing_subscriber::registry().with(build_filter(&config.level));

    let result = match config.format.as_str() {
        "json" => subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        _ => subscriber
            .with(
                fmt::layer()
                    .pretty()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true),
            )
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_includes_quiet_targets() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let filter = build_filter("debug").to_string();
        assert!(filter.contains("debug"));
        assert!(filter.contains("sqlx=warn"));
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        let config = LoggingConfig {
            level: "info".into(),
            format: "pretty".into(),
        };
        init_logging(&config);
        init_logging(&config);
    }
}
