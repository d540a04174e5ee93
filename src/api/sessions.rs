use crate::api::AppState;
use crate::api::schemas::sessions::{RoomResponse, SessionResponse};
use crate::services::token_service::SESSION_TOKEN_LEN;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Issues a fresh anonymous session token.
pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.token_service.generate_secure_token(SESSION_TOKEN_LEN);
    (StatusCode::CREATED, Json(SessionResponse { session_id }))
}

/// Issues a fresh shareable room id. Rooms are not registered anywhere; any id is usable.
pub async fn create_room(State(state): State<AppState>) -> impl IntoResponse {
    let room_id = state.token_service.generate_room_id();
    (StatusCode::CREATED, Json(RoomResponse { room_id }))
}
