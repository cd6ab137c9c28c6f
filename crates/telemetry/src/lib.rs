//! Tracing subscriber bootstrap.
//!
//! `RUST_LOG` takes precedence over `telemetry.log_level`. Initialisation is
//! guarded so that calling [`init`] more than once (tests, CLI subcommands)
//! is harmless.

use std::sync::OnceLock;

use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber described by `settings`.
pub fn init(settings: &TelemetrySettings) {
    INIT.get_or_init(|| {
        let filter = build_filter(settings);
        let registry = tracing_subscriber::registry().with(filter);

        let result = match settings.log_format {
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
                .try_init(),
            LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        };

        // Another subscriber may already be installed (e.g. by a test harness).
        if result.is_ok() {
            tracing::debug!(
                target: "shelf-telemetry",
                format = ?settings.log_format,
                level = %settings.log_level,
                "tracing initialized"
            );
        }
    });
}

fn build_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back_to_info() {
        let settings = TelemetrySettings {
            log_format: LogFormat::Pretty,
            log_level: "not a [valid directive".to_string(),
        };
        // Must not panic regardless of RUST_LOG.
        let _ = build_filter(&settings);
    }

    #[test]
    fn init_is_idempotent() {
        let settings = TelemetrySettings::default();
        init(&settings);
        init(&settings);
    }
}
