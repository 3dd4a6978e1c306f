use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use call_logger::{
    call_spec, logging::init_logging, CallLogger, CallLoggerConfig, EventSink, RequestContextLayer,
    TracingSink,
};
use serde::Deserialize;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{net::TcpListener, time::sleep};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Sink that keeps the most recent call logs in memory and forwards them to tracing
#[derive(Debug, Clone, Default)]
struct DemoSink {
    recent: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl DemoSink {
    const KEEP: usize = 50;

    fn recent(&self) -> Vec<serde_json::Value> {
        self.recent.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl EventSink for DemoSink {
    fn emit(&self, line: &str) {
        TracingSink.emit(line);

        let Ok(event) = serde_json::from_str::<serde_json::Value>(line) else {
            return;
        };
        if let Ok(mut recent) = self.recent.lock() {
            if recent.len() == Self::KEEP {
                recent.remove(0);
            }
            recent.push(event);
        }
    }
}

#[derive(Clone)]
struct AppState {
    logger: CallLogger,
    sink: DemoSink,
}

struct AccountController;

#[derive(Debug, Deserialize)]
struct Login {
    user: String,
    password: String,
}

async fn greet(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<String, StatusCode> {
    state
        .logger
        .intercept(
            call_spec!(AccountController::greet, "say hello", name),
            || async move {
                sleep(Duration::from_millis(100)).await; // Simulate some work
                Ok(format!("Hello, {name}!"))
            },
        )
        .await
}

async fn login(
    State(state): State<AppState>,
    Json(login): Json<Login>,
) -> Result<&'static str, StatusCode> {
    let user = &login.user;
    let password = &login.password;
    state
        .logger
        .intercept(
            call_spec!(AccountController::login, "sign in", user; skip password),
            || async move {
                sleep(Duration::from_millis(20)).await;
                if password.as_str() == "letmein" {
                    Ok("welcome")
                } else {
                    Err(StatusCode::UNAUTHORIZED)
                }
            },
        )
        .await
}

async fn recent_logs(State(state): State<AppState>) -> Json<serde_json::Value> {
    let recent = state.sink.recent();
    Json(serde_json::json!({
        "total": recent.len(),
        "events": recent,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(false);

    info!("Starting call logger demo server");

    let sink = DemoSink::default();
    let logger = CallLogger::with_sink(CallLoggerConfig::default(), sink.clone());

    let app = Router::new()
        .route("/hello/:name", get(greet))
        .route("/login", post(login))
        .route("/logs", get(recent_logs))
        .with_state(AppState { logger, sink })
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestContextLayer::new())
                .into_inner(),
        );

    info!("Demo server endpoints:");
    info!("  GET  /hello/:name - Logged greeting");
    info!("  POST /login       - Logged sign-in, password excluded from the log");
    info!("  GET  /logs        - Recently emitted call logs");
    info!("");
    info!("Try these commands:");
    info!("  curl http://localhost:3000/hello/world");
    info!("  curl -H 'X-Forwarded-For: 1.2.3.4, 10.0.0.1' http://localhost:3000/hello/proxy");
    info!(r#"  curl -X POST -H 'content-type: application/json' -d '{{"user":"alice","password":"letmein"}}' http://localhost:3000/login"#);
    info!("  curl http://localhost:3000/logs");

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!("Demo server listening on http://localhost:3000");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
