//! HTTP API for the login handshake.
//!
//! Every response is HTTP 200 carrying either a `status` or an `error` field,
//! so the dashboard only has to parse the body.

use crate::login::{generate_qr_image, LoginCheck, LoginService};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use goban_core::{config::ApiConfig, error::GobanError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    login: Arc<LoginService>,
    api_key: Option<String>,
    uptime: Instant,
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    #[serde(default)]
    key: String,
}

#[derive(Debug, Deserialize)]
struct CookieRequest {
    cookie: String,
}

fn error_body(message: impl std::fmt::Display) -> Json<Value> {
    Json(json!({ "error": message.to_string() }))
}

/// Constant-time string comparison for API tokens.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check bearer token auth. Returns `Some(body)` when the request is rejected.
fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Option<Json<Value>> {
    let key = api_key.as_ref()?;

    let Some(header) = headers.get("authorization") else {
        return Some(error_body("missing Authorization header"));
    };
    let Ok(value) = header.to_str() else {
        return Some(error_body("invalid Authorization header"));
    };
    match value.strip_prefix("Bearer ") {
        Some(token) if constant_time_eq(token, key) => None,
        _ => Some(error_body("invalid token")),
    }
}

fn check_body(check: LoginCheck) -> Json<Value> {
    let mut body = json!({
        "status": check.status.as_str(),
        "message": check.message,
    });
    if let Some(account) = check.account {
        body["account"] = json!(account);
    }
    Json(body)
}

/// `GET /api/health`. Open even when a token is configured, for liveness checks.
async fn health(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime.elapsed().as_secs(),
        "login_sessions": state.login.pending_sessions(),
    }))
}

/// `POST /api/login`: issue a login code, return its key and QR as base64 PNG.
async fn login_start(headers: HeaderMap, State(state): State<ApiState>) -> Json<Value> {
    if let Some(rejected) = check_auth(&headers, &state.api_key) {
        return rejected;
    }

    let ticket = match state.login.start().await {
        Ok(t) => t,
        Err(e) => {
            error!("failed to start login: {e}");
            return error_body(format!("failed to get login code: {e}"));
        }
    };

    let png = match generate_qr_image(&ticket.url) {
        Ok(png) => png,
        Err(e) => {
            error!("QR image generation failed: {e}");
            state.login.cancel(&ticket.key);
            return error_body(e);
        }
    };

    Json(json!({
        "status": "pending",
        "key": ticket.key,
        "url": ticket.url,
        "qr_png_base64": BASE64.encode(&png),
    }))
}

/// `GET /api/login/check?key=`
async fn login_check(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Query(query): Query<KeyQuery>,
) -> Json<Value> {
    if let Some(rejected) = check_auth(&headers, &state.api_key) {
        return rejected;
    }
    if query.key.is_empty() {
        return error_body("missing session key");
    }

    match state.login.check(&query.key).await {
        Ok(check) => check_body(check),
        Err(GobanError::NotFound(_)) => error_body("session not found"),
        Err(e) => {
            warn!("login check failed: {e}");
            error_body(e)
        }
    }
}

/// `POST /api/login/cancel?key=`
async fn login_cancel(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Query(query): Query<KeyQuery>,
) -> Json<Value> {
    if let Some(rejected) = check_auth(&headers, &state.api_key) {
        return rejected;
    }
    if state.login.cancel(&query.key) {
        Json(json!({ "status": "cancelled" }))
    } else {
        error_body("session not found")
    }
}

/// `POST /api/login/cookie`: register an account from a raw cookie string.
async fn login_cookie(
    headers: HeaderMap,
    State(state): State<ApiState>,
    body: Result<Json<CookieRequest>, JsonRejection>,
) -> Json<Value> {
    if let Some(rejected) = check_auth(&headers, &state.api_key) {
        return rejected;
    }
    let Json(request) = match body {
        Ok(b) => b,
        Err(e) => return error_body(format!("invalid request body: {e}")),
    };

    match state.login.login_with_cookie(&request.cookie).await {
        Ok(account) => Json(json!({
            "status": "success",
            "message": format!("logged in as {}", account.name),
            "account": account,
        })),
        Err(GobanError::Login(reason)) => error_body(reason),
        Err(e) => {
            warn!("cookie login failed: {e}");
            error_body(e)
        }
    }
}

/// Build the axum router with shared state.
fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/login", post(login_start))
        .route("/api/login/check", get(login_check))
        .route("/api/login/cancel", post(login_cancel))
        .route("/api/login/cookie", post(login_cookie))
        .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

/// Serve the API until `stop` fires.
pub async fn serve(config: ApiConfig, login: Arc<LoginService>, mut stop: watch::Receiver<bool>) {
    let api_key = if config.api_key.is_empty() {
        None
    } else {
        Some(config.api_key.clone())
    };
    let state = ApiState {
        login,
        api_key,
        uptime: Instant::now(),
    };

    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("API server failed to bind to {addr}: {e}");
            return;
        }
    };

    info!("API server listening on {addr}");

    let shutdown = async move {
        while stop.changed().await.is_ok() {
            if *stop.borrow() {
                break;
            }
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("API server error: {e}");
    }
}
