use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use cramr_types::api::{AcceptInviteRequest, Claims, HandleInviteRequest, SendInviteRequest, SendInviteResponse};

use crate::auth::{AppState, caller};
use crate::error::to_status;

pub async fn send_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendInviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.target_user_id.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let ctx = caller(&state, &claims).await?;
    let outcome = state
        .invites
        .send_invite(&ctx, &req.target_user_id, &req.course)
        .await
        .map_err(to_status)?;
    Ok(Json(SendInviteResponse { outcome }))
}

/// Turns a received push into the prompt the device should show.
pub async fn handle_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<HandleInviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let ctx = caller(&state, &claims).await?;
    let prompt = state
        .invites
        .handle_incoming_invite(&ctx, &req.payload)
        .await
        .map_err(to_status)?;
    Ok(Json(prompt))
}

pub async fn accept_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AcceptInviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut ctx = caller(&state, &claims).await?;
    let resolution = state
        .invites
        .accept_invite(&mut ctx, &req.prompt)
        .await
        .map_err(to_status)?;
    Ok(Json(resolution))
}
