use thiserror::Error;

/// Failures while assembling or encoding a [`LogEvent`](crate::LogEvent).
///
/// These never reach the intercepted call; they are logged and the event is emitted with
/// whatever was built so far.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to serialize parameter `{param}`: {source}")]
    Serialize {
        param: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode log event: {0}")]
    Encode(#[source] serde_json::Error),
}
