//! Tracing subscriber installation.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::ClientSettings;

/// Failures while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter directive did not parse.
    #[error("invalid log filter `{directive}`: {source}")]
    InvalidFilter {
        directive: String,
        #[source]
        source: ParseError,
    },
    /// A global subscriber was already set.
    #[error("tracing init failed: {message}")]
    Install { message: String },
}

/// Build the event filter: `RUST_LOG` when set, the configured directive
/// otherwise.
pub fn build_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::InvalidFilter {
        directive: directive.to_owned(),
        source,
    })
}

/// Install the global fmt subscriber described by `settings`.
pub fn init_tracing(settings: &ClientSettings) -> Result<(), TelemetryError> {
    let filter = build_filter(settings.log_filter())?;
    let builder = fmt().with_env_filter(filter);
    let installed = if settings.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| TelemetryError::Install {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    //! Unit tests for filter construction.
    use super::*;
    use env_lock::lock_env;
    use rstest::rstest;

    #[rstest]
    #[case("info")]
    #[case("blog_client=debug,warn")]
    fn configured_directives_parse(#[case] directive: &str) {
        let _guard = lock_env([("RUST_LOG", None::<String>)]);
        build_filter(directive).expect("valid directive");
    }

    #[rstest]
    fn malformed_levels_are_rejected() {
        let _guard = lock_env([("RUST_LOG", None::<String>)]);
        let err = build_filter("blog_client=loudest").expect_err("bad level");
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }
}
