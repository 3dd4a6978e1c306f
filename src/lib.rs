//! # Call Logger
//!
//! Per-call request logging for axum services. Wrap a handler's business call in
//! [`CallLogger::intercept`] and one JSON line is emitted when it finishes, carrying the caller
//! IP, the request URL, the called method, a static description, the declared parameters and
//! the call's duration.
//!
//! ## Features
//!
//! - **Ambient request metadata**: [`RequestContextLayer`] captures caller IP and URL once per
//!   request; logged calls pick them up without extra arguments
//! - **Declared parameters**: [`CallSpec`] / [`call_spec!`] name what goes into the log, and
//!   what must never go into it
//! - **Guaranteed emission**: exactly one line per call, whether it returns, fails, panics or
//!   is cancelled
//! - **Transparent**: arguments, return values and errors pass through untouched, and logging
//!   problems never reach the caller
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{extract::{Path, State}, http::StatusCode, routing::get, Router};
//! use call_logger::{call_spec, CallLogger, CallLoggerConfig, RequestContextLayer};
//! use std::net::SocketAddr;
//!
//! struct UserController;
//!
//! async fn find_user(
//!     State(logger): State<CallLogger>,
//!     Path(id): Path<u64>,
//! ) -> Result<String, StatusCode> {
//!     logger
//!         .intercept(call_spec!(UserController::find_user, "look up a user", id), || async move {
//!             if id == 0 {
//!                 return Err(StatusCode::NOT_FOUND);
//!             }
//!             Ok(format!("user {id}"))
//!         })
//!         .await
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     call_logger::logging::init_logging(false);
//!
//!     let app = Router::new()
//!         .route("/users/:id", get(find_user))
//!         .with_state(CallLogger::new(CallLoggerConfig::default()))
//!         .layer(RequestContextLayer::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! A request to `/users/7` then logs something like:
//!
//! ```text
//! {"ipAddress":"127.0.0.1","apiUrl":"http://localhost:3000/users/7","methodName":"UserController.find_user","logDesc":"look up a user","params":"{\"id\":7}","cost":0}
//! ```

use std::{future::Future, sync::Arc, time::Duration, time::Instant};
use tracing::{debug, error};

pub mod types;
pub use types::{LogEvent, RequestMeta};

pub mod call;
pub use call::CallSpec;

pub mod builder;
pub use builder::EventBuilder;

pub mod context;
pub use context::RequestContextLayer;

pub mod sink;
pub use sink::{EventSink, SinkKind, StderrSink, TracingSink};

pub mod config;
pub use config::CallLoggerConfig;

pub mod error;
pub use error::BuildError;

pub mod logging;

/// Intercepts calls and logs one [`LogEvent`] per call.
///
/// Cheap to clone; clones share the sink. Every call gets its own event, so a single logger can
/// serve any number of concurrent calls.
#[derive(Clone)]
pub struct CallLogger {
    config: CallLoggerConfig,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for CallLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallLogger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for CallLogger {
    fn default() -> Self {
        Self::new(CallLoggerConfig::default())
    }
}

impl CallLogger {
    /// Create a logger writing to the built-in sink named by `config.sink`.
    pub fn new(config: CallLoggerConfig) -> Self {
        let sink = config.sink.build();
        Self { config, sink }
    }

    /// Create a logger writing to a custom sink. `config.sink` is ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use call_logger::{CallLogger, CallLoggerConfig, EventSink};
    ///
    /// struct PrintSink;
    ///
    /// impl EventSink for PrintSink {
    ///     fn emit(&self, line: &str) {
    ///         println!("{line}");
    ///     }
    /// }
    ///
    /// let logger = CallLogger::with_sink(CallLoggerConfig::default(), PrintSink);
    /// ```
    pub fn with_sink<K: EventSink>(config: CallLoggerConfig, sink: K) -> Self {
        Self {
            config,
            sink: Arc::new(sink),
        }
    }

    pub fn config(&self) -> &CallLoggerConfig {
        &self.config
    }

    /// Run an async call and log it.
    ///
    /// Request metadata and the event are captured before `call` is invoked. The event is
    /// emitted once the returned future completes, or when it is dropped before completing.
    /// `cost` is only set when the call returns `Ok`.
    pub async fn intercept<F, Fut, T, E>(&self, spec: CallSpec, call: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut pending = self.begin(spec);

        let started = Instant::now();
        let result = call().await;
        let elapsed = started.elapsed();

        if let (Some(pending), Ok(_)) = (pending.as_mut(), &result) {
            pending.record_cost(elapsed);
        }
        result
    }

    /// Run a synchronous call and log it. Same semantics as [`intercept`](Self::intercept).
    pub fn intercept_blocking<F, T, E>(&self, spec: CallSpec, call: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut pending = self.begin(spec);

        let started = Instant::now();
        let result = call();
        let elapsed = started.elapsed();

        if let (Some(pending), Ok(_)) = (pending.as_mut(), &result) {
            pending.record_cost(elapsed);
        }
        result
    }

    fn begin(&self, spec: CallSpec) -> Option<PendingEvent> {
        if !self.config.enabled {
            return None;
        }

        let meta = context::current();
        if meta.is_none() {
            debug!(method = %spec.qualified_name(), "No request context, logging without caller metadata");
        }

        let event = EventBuilder::build(meta.as_ref(), spec, self.config.capture_params);
        Some(PendingEvent {
            event,
            sink: self.sink.clone(),
        })
    }
}

/// An event waiting for its call to finish. Emitted exactly once, on drop.
struct PendingEvent {
    event: LogEvent,
    sink: Arc<dyn EventSink>,
}

impl PendingEvent {
    fn record_cost(&mut self, elapsed: Duration) {
        self.event.cost = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }
}

impl Drop for PendingEvent {
    fn drop(&mut self) {
        match self.event.to_json_line() {
            Ok(line) => self.sink.emit(&line),
            Err(e) => {
                error!(method = %self.event.method_name, error = %e, "Failed to encode call log event");
            }
        }
    }
}
