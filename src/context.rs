//! Ambient request context.
//!
//! [`RequestContextLayer`] captures the caller address and request URL of every request passing
//! through it, and makes them available to any code running inside the request's future through
//! [`current`]. Logged calls read it from there, so handlers never have to thread request
//! metadata through their own signatures.

use axum::{
    extract::ConnectInfo,
    http::{header::HOST, HeaderMap, Request},
};
use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, instrument};

use crate::RequestMeta;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

tokio::task_local! {
    static REQUEST_META: RequestMeta;
}

/// The metadata of the request the current task is serving, if any.
///
/// Returns `None` outside of a [`RequestContextLayer`] or [`scope`], e.g. in a spawned
/// background task.
pub fn current() -> Option<RequestMeta> {
    REQUEST_META.try_with(RequestMeta::clone).ok()
}

/// Run `fut` with `meta` as its request context.
pub async fn scope<F: Future>(meta: RequestMeta, fut: F) -> F::Output {
    REQUEST_META.scope(meta, fut).await
}

/// Run `f` synchronously with `meta` as its request context.
pub fn sync_scope<F, R>(meta: RequestMeta, f: F) -> R
where
    F: FnOnce() -> R,
{
    REQUEST_META.sync_scope(meta, f)
}

/// Resolve the client address of a request.
///
/// The left-most `X-Forwarded-For` entry wins since proxies append to the list. Without a usable
/// header the transport peer address is used, and without that the result is empty.
///
/// # Examples
///
/// ```rust
/// use axum::http::HeaderMap;
/// use call_logger::context::resolve_client_ip;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "1.2.3.4, 5.6.7.8".parse().unwrap());
/// assert_eq!(resolve_client_ip(&headers, None), "1.2.3.4");
///
/// let remote = "9.9.9.9:443".parse().ok();
/// assert_eq!(resolve_client_ip(&HeaderMap::new(), remote), "9.9.9.9");
/// ```
pub fn resolve_client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());

    match forwarded {
        Some(first) => first.to_owned(),
        None => remote.map(|addr| addr.ip().to_string()).unwrap_or_default(),
    }
}

/// The full URL of a request without its query string: `scheme://host/path`.
///
/// Falls back to the bare path when neither the URI nor the `Host` header names a host.
pub fn request_url<B>(request: &Request<B>) -> String {
    let uri = request.uri();
    let scheme = uri.scheme_str().unwrap_or("http");
    let host = uri.authority().map(|a| a.as_str()).or_else(|| {
        request
            .headers()
            .get(HOST)
            .and_then(|value| value.to_str().ok())
    });

    match host {
        Some(host) => format!("{scheme}://{host}{}", uri.path()),
        None => uri.path().to_owned(),
    }
}

/// Capture the [`RequestMeta`] of a request.
pub fn capture<B>(request: &Request<B>) -> RequestMeta {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    RequestMeta {
        ip_address: resolve_client_ip(request.headers(), remote),
        api_url: request_url(request),
    }
}

/// Tower layer that provides the ambient request context.
///
/// Wrap the router (or any subtree) whose handlers make logged calls. For the transport address
/// fallback, serve the app with `into_make_service_with_connect_info::<SocketAddr>()`.
///
/// # Examples
///
/// ```rust,no_run
/// use axum::{routing::get, Router};
/// use call_logger::RequestContextLayer;
/// use std::net::SocketAddr;
///
/// # async fn hello() -> &'static str { "Hello" }
/// # #[tokio::main]
/// # async fn main() {
/// let app = Router::new()
///     .route("/hello", get(hello))
///     .layer(RequestContextLayer::new());
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
/// axum::serve(
///     listener,
///     app.into_make_service_with_connect_info::<SocketAddr>(),
/// )
/// .await
/// .unwrap();
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestContextLayer;

impl RequestContextLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextService { inner }
    }
}

/// Service created by [`RequestContextLayer`].
#[derive(Clone, Debug)]
pub struct RequestContextService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for RequestContextService<S>
where
    S: Service<Request<B>> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    #[instrument(skip_all)]
    fn call(&mut self, request: Request<B>) -> Self::Future {
        let meta = capture(&request);
        debug!(ip = %meta.ip_address, url = %meta.api_url, "Captured request context");

        let future = self.inner.call(request);
        Box::pin(REQUEST_META.scope(meta, future))
    }
}
