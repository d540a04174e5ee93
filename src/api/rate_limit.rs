use crate::api::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

/// Records the limiter's verdict for every relay request, tagged with the matched route.
pub async fn log_rate_limit_events(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let route = request.extensions().get::<MatchedPath>().map_or_else(|| "unmatched".to_owned(), |p| p.as_str().to_owned());

    let response = next.run(request).await;

    let retry_after = response.headers().get("retry-after").and_then(|v| v.to_str().ok());
    state.rate_limit_service.record(&route, response.status(), retry_after);

    response
}
