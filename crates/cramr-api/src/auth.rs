use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};

use cramr_core::{
    Backend, EnrollmentController, InviteService, Reachability, SessionController, load_context,
};
use cramr_push::PushHub;
use cramr_types::api::{Claims, SignupRequest, SignupResponse};
use cramr_types::models::UserContext;

use crate::error::to_status;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub backend: Arc<dyn Backend>,
    pub sessions: SessionController,
    pub enrollment: EnrollmentController,
    pub invites: InviteService,
    pub hub: PushHub,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(
        backend: Arc<dyn Backend>,
        hub: PushHub,
        reachability: Reachability,
        jwt_secret: String,
    ) -> Self {
        let sessions = SessionController::new(backend.clone(), reachability.clone());
        let enrollment = EnrollmentController::new(backend.clone(), reachability);
        let invites = InviteService::new(sessions.clone(), enrollment.clone(), hub.clone());
        Self {
            backend,
            sessions,
            enrollment,
            invites,
            hub,
            jwt_secret,
        }
    }
}

/// First social login creates the user; later logins just issue a token.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.user_id.trim().is_empty() || req.username.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let created = state
        .backend
        .signup(&req.user_id, &req.username, &req.email, &req.image_url)
        .await
        .map_err(|e| {
            error!("Error in signup: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let context = load_context(state.backend.as_ref(), &req.user_id)
        .await
        .map_err(to_status)?;

    let token = create_token(&state.jwt_secret, &context.user_id, &context.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if created {
        info!("New user {} ({})", context.username, context.user_id);
    }

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(SignupResponse {
            token,
            created,
            context,
        }),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let ctx = caller(&state, &claims).await?;
    Ok(Json(ctx))
}

pub fn create_token(secret: &str, user_id: &str, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// The caller's current identity, read fresh so session moves made from
/// another device are seen.
pub(crate) async fn caller(state: &AppStateInner, claims: &Claims) -> Result<UserContext, StatusCode> {
    load_context(state.backend.as_ref(), &claims.sub)
        .await
        .map_err(to_status)
}
