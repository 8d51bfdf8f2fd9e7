use axum::{Json, Router, extract::State, routing::post};

use crate::{
    auth::{Caller, Role},
    dto::{admin::IngressResponse, events::EventKind},
    error::AppError,
    state::SharedState,
};

/// Administrative broadcast ingress: other backend components push events
/// here and the engine fans them out to every viewer.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/internal/event", post(ingress))
}

/// Fan an event out to all connected viewers.
#[utoipa::path(
    post,
    path = "/internal/event",
    tag = "broadcast",
    request_body = EventKind,
    responses(
        (status = 200, description = "Event accepted", body = IngressResponse),
        (status = 401, description = "Caller is not an admin"),
    )
)]
pub async fn ingress(
    State(state): State<SharedState>,
    caller: Caller,
    Json(event): Json<EventKind>,
) -> Result<Json<IngressResponse>, AppError> {
    caller.require(Role::Admin).map_err(AppError::from)?;

    let client_count = state.broadcast().publish(event).await;
    Ok(Json(IngressResponse {
        success: true,
        client_count,
    }))
}
