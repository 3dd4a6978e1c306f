//! Data types for captured call information.
//!
//! [`RequestMeta`] is what the context middleware captures from the in-flight HTTP request,
//! [`LogEvent`] is the record emitted once per intercepted call.

use serde::Serialize;

/// Metadata captured from the HTTP request a call is running under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Resolved client address (forwarded-for first, then the transport peer)
    pub ip_address: String,
    /// Full request URL without the query string
    pub api_url: String,
}

/// The structured record emitted for one intercepted call.
///
/// Serialized with camelCase keys; unset optional fields are left out of the JSON line.
///
/// # Examples
///
/// ```rust
/// use call_logger::LogEvent;
///
/// let event = LogEvent {
///     method_name: "UserController.find".to_string(),
///     cost: Some(3),
///     ..Default::default()
/// };
/// let line = event.to_json_line().unwrap();
/// assert!(line.contains("\"methodName\":\"UserController.find\""));
/// assert!(line.contains("\"cost\":3"));
/// assert!(!line.contains("params"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Caller's resolved network address
    pub ip_address: String,
    /// Full request URL of the triggering call
    pub api_url: String,
    /// `<Type>.<method>` of the intercepted call
    pub method_name: String,
    /// Static description declared for the call
    pub log_desc: String,
    /// JSON object of the logged parameters, unset if capture failed or is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    /// Wall-clock duration in milliseconds, only set when the call succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<u64>,
}

impl LogEvent {
    /// Encode the event as a single JSON line.
    pub fn to_json_line(&self) -> Result<String, crate::BuildError> {
        serde_json::to_string(self).map_err(crate::BuildError::Encode)
    }
}
