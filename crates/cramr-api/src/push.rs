use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;

use cramr_push::connection::handle_push_socket;

use crate::auth::AppState;
use crate::middleware::decode_token;

#[derive(Debug, Deserialize)]
pub struct PushQuery {
    pub token: Option<String>,
}

/// Upgrades to the push socket. Browsers cannot set headers on a WebSocket
/// handshake, so the token may also come as `?token=`.
pub async fn push_upgrade(
    State(state): State<AppState>,
    Query(query): Query<PushQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
        .or(query.token)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = decode_token(&state.jwt_secret, &token).ok_or(StatusCode::UNAUTHORIZED)?;
    let hub = state.hub.clone();

    Ok(ws.on_upgrade(move |socket| handle_push_socket(socket, hub, claims.sub)))
}
