use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use cramr_types::api::{Claims, CreateSessionRequest, SessionExistsResponse};
use cramr_types::models::GeoTag;

use crate::auth::{AppState, caller};
use crate::error::to_status;

pub async fn create_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.course.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut ctx = caller(&state, &claims).await?;
    let geo_tag = GeoTag {
        latitude: req.latitude,
        longitude: req.longitude,
    };
    let session = state
        .sessions
        .create_session(&mut ctx, &req.course, &req.description, &req.location, geo_tag)
        .await
        .map_err(to_status)?;

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let session = state
        .sessions
        .session_info(&session_id)
        .await
        .map_err(to_status)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(session))
}

pub async fn session_exists(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let exists = state
        .sessions
        .session_exists(&session_id)
        .await
        .map_err(to_status)?;
    Ok(Json(SessionExistsResponse { exists }))
}

/// Members in join order, as `{username, user_id}` pairs.
pub async fn session_users(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let members = state
        .sessions
        .session_users(&session_id)
        .await
        .map_err(to_status)?;
    Ok(Json(members))
}

pub async fn join_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut ctx = caller(&state, &claims).await?;
    let session = state
        .sessions
        .join_session(&mut ctx, &session_id)
        .await
        .map_err(to_status)?;
    Ok(Json(session))
}

pub async fn leave_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut ctx = caller(&state, &claims).await?;
    state
        .sessions
        .leave_session(&mut ctx, &session_id)
        .await
        .map_err(to_status)?;
    Ok(StatusCode::NO_CONTENT)
}
