use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use {
    courier_channels::{Error, ErrorKind, StartOutcome},
    serde::Deserialize,
    tracing::warn,
};

use crate::server::AppState;

/// Routes mounted under `/telegram`.
///
/// `GET /channels/all` shadows a channel literally named `all`; add that one
/// by its numeric id.
pub fn telegram_router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/verify", post(verify))
        .route("/stop", post(stop))
        .route("/status", get(status))
        .route("/channels", get(list_channels))
        .route("/channels/all", get(list_all_channels))
        .route(
            "/channels/{handle}",
            post(add_channel).delete(remove_channel),
        )
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotRunning => StatusCode::PRECONDITION_FAILED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::NotAChannel | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::AuthenticationFailed => StatusCode::UNAUTHORIZED,
        ErrorKind::Unsupported => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::ResolutionFailed
        | ErrorKind::ChannelSeedFailed
        | ErrorKind::DisconnectError
        | ErrorKind::Cancelled
        | ErrorKind::External => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &Error) -> Response {
    let status = status_for(err.kind());
    if status.is_server_error() {
        warn!(error = %err, "telegram operation failed");
    }
    (
        status,
        Json(serde_json::json!({ "error": err.kind(), "message": err.to_string() })),
    )
        .into_response()
}

async fn start(State(state): State<AppState>) -> impl IntoResponse {
    match state.monitor.start().await {
        Ok(StartOutcome::Started) => Json(serde_json::json!({ "status": "started" })).into_response(),
        Ok(StartOutcome::AlreadyRunning) => {
            Json(serde_json::json!({ "status": "already_running" })).into_response()
        },
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct VerifyRequest {
    code: String,
}

async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> impl IntoResponse {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return error_response(&Error::invalid_input(rejection.body_text()));
        },
    };
    if body.code.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": ErrorKind::InvalidInput,
                "message": "code is required",
            })),
        )
            .into_response();
    }
    match state.monitor.provide_verification_code(&body.code).await {
        Ok(()) => Json(serde_json::json!({
            "status": "success",
            "message": "Verification code provided",
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn stop(State(state): State<AppState>) -> impl IntoResponse {
    match state.monitor.stop().await {
        Ok(()) => Json(serde_json::json!({ "status": "stopped" })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    match state.monitor.is_running().await {
        Ok(running) => Json(serde_json::json!({ "running": running })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn add_channel(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    match state.monitor.add_channel(&handle).await {
        Ok(info) => Json(serde_json::json!({
            "status": "success",
            "channel_id": info.channel_id,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn remove_channel(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    match state.monitor.remove_channel(&handle).await {
        Ok(info) => Json(serde_json::json!({
            "status": "success",
            "channel": info.handle,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn list_channels(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "channels": state.monitor.list_channels() }))
}

async fn list_all_channels(State(state): State<AppState>) -> impl IntoResponse {
    match state.monitor.list_all_member_channels().await {
        Ok(channels) => Json(channels).into_response(),
        Err(e) => error_response(&e),
    }
}
