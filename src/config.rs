use serde::Deserialize;

use crate::SinkKind;

/// Configuration for the call logger.
///
/// Deserializable so it can live in an application's own config file; missing fields take
/// their defaults.
///
/// # Examples
///
/// ```rust
/// use call_logger::{CallLoggerConfig, SinkKind};
///
/// // Default configuration
/// let config = CallLoggerConfig::default();
/// assert!(config.enabled);
///
/// // Custom configuration
/// let config = CallLoggerConfig {
///     capture_params: false,
///     sink: SinkKind::Stderr,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CallLoggerConfig {
    /// Whether intercepted calls are logged at all
    pub enabled: bool,
    /// Whether parameter values go into the `params` field
    pub capture_params: bool,
    /// Built-in sink used by [`CallLogger::new`](crate::CallLogger::new)
    pub sink: SinkKind,
}

impl Default for CallLoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capture_params: true,
            sink: SinkKind::Tracing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CallLoggerConfig = serde_json::from_str(r#"{"sink":"stderr"}"#).unwrap();
        assert_eq!(
            config,
            CallLoggerConfig {
                enabled: true,
                capture_params: true,
                sink: SinkKind::Stderr,
            }
        );

        let config: CallLoggerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CallLoggerConfig::default());
    }
}
