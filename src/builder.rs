//! Assembly of [`LogEvent`]s from request metadata and declared call metadata.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, error};

use crate::call::{Param, ParamValue};
use crate::{BuildError, CallSpec, LogEvent, RequestMeta};

/// Builds the event for one intercepted call.
///
/// Fields are filled in a fixed order: request metadata, then method metadata, then the
/// parameter map. Timing is left to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventBuilder;

impl EventBuilder {
    /// Build a fresh event. Never fails: if the parameter map can't be produced the error is
    /// logged and the event is returned without `params`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use call_logger::{CallSpec, EventBuilder, RequestMeta};
    ///
    /// let meta = RequestMeta {
    ///     ip_address: "1.2.3.4".to_string(),
    ///     api_url: "http://api.example.com/users".to_string(),
    /// };
    /// let spec = CallSpec::new("UserController", "list")
    ///     .desc("list users")
    ///     .param("page", &2);
    ///
    /// let event = EventBuilder::build(Some(&meta), spec, true);
    /// assert_eq!(event.ip_address, "1.2.3.4");
    /// assert_eq!(event.method_name, "UserController.list");
    /// assert_eq!(event.params.as_deref(), Some(r#"{"page":2}"#));
    /// assert_eq!(event.cost, None);
    /// ```
    pub fn build(meta: Option<&RequestMeta>, spec: CallSpec, capture_params: bool) -> LogEvent {
        let mut event = LogEvent::default();

        if let Some(meta) = meta {
            event.ip_address = meta.ip_address.clone();
            event.api_url = meta.api_url.clone();
        }

        event.method_name = spec.qualified_name();
        event.log_desc = spec.description().to_owned();

        if !capture_params {
            debug!(method = %event.method_name, "Parameter capture disabled");
            return event;
        }

        match Self::encode_params(spec.into_params()) {
            Ok(params) => event.params = Some(params),
            Err(e) => {
                error!(method = %event.method_name, error = %e, "Failed to build call parameters");
            }
        }

        event
    }

    /// Encode the non-excluded parameters as a JSON object keyed by name.
    fn encode_params(params: Vec<Param>) -> Result<String, BuildError> {
        let mut map: BTreeMap<&'static str, Value> = BTreeMap::new();

        for Param { name, value } in params {
            match value {
                ParamValue::Excluded => continue,
                ParamValue::Captured(Ok(value)) => {
                    if map.insert(name, value).is_some() {
                        debug!(param = name, "Parameter declared twice, keeping the later value");
                    }
                }
                ParamValue::Captured(Err(source)) => {
                    return Err(BuildError::Serialize {
                        param: name,
                        source,
                    });
                }
            }
        }

        serde_json::to_string(&map).map_err(BuildError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{Error as _, Serialize, Serializer};
    use std::collections::HashMap;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("not serializable"))
        }
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            ip_address: "9.9.9.9".to_string(),
            api_url: "http://localhost/foo/bar".to_string(),
        }
    }

    #[test]
    fn test_build_full_event() {
        let spec = CallSpec::new("Foo", "bar")
            .desc("does bar")
            .param("a", &"hello")
            .exclude("b");

        let event = EventBuilder::build(Some(&meta()), spec, true);

        assert_eq!(event.ip_address, "9.9.9.9");
        assert_eq!(event.api_url, "http://localhost/foo/bar");
        assert_eq!(event.method_name, "Foo.bar");
        assert_eq!(event.log_desc, "does bar");
        assert_eq!(event.params.as_deref(), Some(r#"{"a":"hello"}"#));
        assert_eq!(event.cost, None);
    }

    #[test]
    fn test_build_without_request_context() {
        let event = EventBuilder::build(None, CallSpec::new("Job", "run"), true);

        assert_eq!(event.ip_address, "");
        assert_eq!(event.api_url, "");
        assert_eq!(event.method_name, "Job.run");
        assert_eq!(event.params.as_deref(), Some("{}"));
    }

    #[test]
    fn test_params_are_sorted_by_name() {
        let spec = CallSpec::new("Foo", "bar")
            .param("zeta", &1)
            .param("alpha", &vec![1, 2])
            .param("mid", &Option::<u8>::None);

        let event = EventBuilder::build(None, spec, true);
        assert_eq!(
            event.params.as_deref(),
            Some(r#"{"alpha":[1,2],"mid":null,"zeta":1}"#)
        );
    }

    #[test]
    fn test_serialize_failure_keeps_partial_event() {
        let spec = CallSpec::new("Foo", "bar")
            .desc("does bar")
            .param("a", &1)
            .param("b", &Unserializable);

        let event = EventBuilder::build(Some(&meta()), spec, true);

        assert_eq!(event.ip_address, "9.9.9.9");
        assert_eq!(event.method_name, "Foo.bar");
        assert_eq!(event.log_desc, "does bar");
        assert_eq!(event.params, None);
    }

    #[test]
    fn test_non_string_map_keys_fail_serialization() {
        let mut grid = HashMap::new();
        grid.insert((0, 1), "x");

        let spec = CallSpec::new("Grid", "store").param("grid", &grid);
        let err = EventBuilder::encode_params(spec.into_params()).unwrap_err();

        assert!(matches!(err, BuildError::Serialize { param: "grid", .. }));
    }

    struct Foo;

    #[test]
    fn test_skipped_value_is_never_serialized() {
        let a = 1;
        let secret = Unserializable;
        let spec = crate::call_spec!(Foo::bar, "does bar", a; skip secret);

        let event = EventBuilder::build(None, spec, true);
        assert_eq!(event.params.as_deref(), Some(r#"{"a":1}"#));
        drop(secret);
    }

    #[test]
    fn test_duplicate_param_keeps_later_value() {
        let spec = CallSpec::new("Foo", "bar").param("a", &1).param("a", &2);

        let event = EventBuilder::build(None, spec, true);
        assert_eq!(event.params.as_deref(), Some(r#"{"a":2}"#));
    }

    #[test]
    fn test_capture_disabled() {
        let spec = CallSpec::new("Foo", "bar").param("a", &1);
        let event = EventBuilder::build(None, spec, false);

        assert_eq!(event.method_name, "Foo.bar");
        assert_eq!(event.params, None);
    }
}
