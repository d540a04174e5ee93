use crate::domain::room::SessionToken;
use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Request, request::Parts},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";

/// The caller's session token, taken from `X-Session-ID`.
///
/// Posting and reading both need it as key material, so a missing or blank header is rejected
/// rather than synthesized.
#[derive(Debug)]
pub struct SessionIdentity(pub SessionToken);

impl<S: Send + Sync> FromRequestParts<S> for SessionIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(SESSION_HEADER).ok_or(AppError::IdentityRequired)?;
        let raw = header.to_str().map_err(|_| AppError::IdentityRequired)?;

        Ok(Self(SessionToken::new(raw.trim())?))
    }
}

/// Generates a UUID request id when the client did not send one.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUuidOrHeader;

impl MakeRequestId for MakeRequestUuidOrHeader {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        if let Some(existing) = request.headers().get("x-request-id") {
            return Some(RequestId::new(existing.clone()));
        }
        HeaderValue::from_str(&Uuid::new_v4().to_string()).ok().map(RequestId::new)
    }
}
