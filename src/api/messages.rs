use crate::api::AppState;
use crate::api::middleware::SessionIdentity;
use crate::api::schemas::messaging::{PostMessageRequest, PostMessageResponse, RoomMessageResponse};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

/// Posts a message into a room, protected under the caller's session token.
///
/// # Errors
/// Returns `AppError::IdentityRequired` without an `X-Session-ID` header.
/// Returns `AppError::BadRequest` if the body is malformed or fails validation.
pub async fn post_message(
    SessionIdentity(token): SessionIdentity,
    State(state): State<AppState>,
    payload: std::result::Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let posted =
        state.message_service.post(&request.room_id, &request.content, request.expires_in_minutes, &token).await?;

    Ok((StatusCode::CREATED, Json(PostMessageResponse::from(posted))))
}

/// Lists the live messages in a room that the caller's session token can reveal.
///
/// # Errors
/// Returns `AppError::IdentityRequired` without an `X-Session-ID` header.
pub async fn list_messages(
    SessionIdentity(token): SessionIdentity,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<RoomMessageResponse>>> {
    let messages = state.message_service.read(&room_id, &token).await?;
    Ok(Json(messages.into_iter().map(RoomMessageResponse::from).collect()))
}
