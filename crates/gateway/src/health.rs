use axum::{Json, response::IntoResponse};

/// Process liveness. Always up while the server answers.
pub async fn livez() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "up", "details": {} }))
}

pub async fn readyz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "up", "details": {} }))
}
