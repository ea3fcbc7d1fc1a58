use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use cramr_types::api::PictureResponse;

use crate::auth::AppState;

/// Profile picture of any user, falling back to the URL from signup when no
/// photo row exists.
pub async fn picture(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let photo = state.backend.user_photo(&user_id).await.map_err(|e| {
        error!("Error loading photo for {}: {:#}", user_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let image_url = match photo {
        Some(photo) => photo.image_file,
        None => {
            let user = state.backend.user(&user_id).await.map_err(|e| {
                error!("Error loading user {}: {:#}", user_id, e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            user.ok_or(StatusCode::NOT_FOUND)?.image_url
        }
    };

    Ok(Json(PictureResponse { user_id, image_url }))
}
