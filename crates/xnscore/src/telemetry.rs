use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

/// Error enumeration for subscriber installation.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("log directive '{directive}' is not a valid tracing filter")]
    Filter {
        directive: String,
        #[source]
        source: ParseError,
    },
    #[error("global tracing subscriber already installed")]
    AlreadyInstalled(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Build the log filter for this process. An explicit `RUST_LOG` wins over
/// the configured level so operators can raise verbosity without touching
/// configuration.
fn filter_for(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }
    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::Filter {
        directive: config.log_level.clone(),
        source,
    })
}

/// Install the process-wide tracing subscriber: compact single-line output
/// without ANSI colour, suitable for log shipping.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(config)?)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_level_directives() {
        let config = TelemetryConfig {
            log_level: "debug".to_string(),
        };
        assert!(filter_for(&config).is_ok());
    }

    #[test]
    fn rejects_a_malformed_directive() {
        let config = TelemetryConfig {
            log_level: "scoring=notalevel".to_string(),
        };
        // RUST_LOG would shadow the configured directive.
        std::env::remove_var("RUST_LOG");
        match filter_for(&config) {
            Err(TelemetryError::Filter { directive, .. }) => {
                assert_eq!(directive, "scoring=notalevel");
            }
            other => panic!("expected a filter parse error, got {other:?}"),
        }
    }
}
