use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;
use crate::error::AppError;

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over
/// the configured level.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| AppError::ConfigError(format!("Invalid log level '{}': {}", settings.level, e)))?;

    let result = if settings.json {
        fmt().with_env_filter(filter).json().with_current_span(false).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    result.map_err(|e| AppError::InternalError(format!("Failed to install tracing subscriber: {}", e)))
}
