use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use cramr_types::api::{AddCourseRequest, Claims, CourseSearchQuery, DeleteCourseQuery, DeleteCourseResponse};

use crate::auth::AppState;
use crate::error::to_status;

pub async fn search_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseSearchQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let titles = state
        .enrollment
        .search_courses(&query.q)
        .await
        .map_err(to_status)?;
    Ok(Json(titles))
}

pub async fn sessions_for_course(
    State(state): State<AppState>,
    Path(course): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let sessions = state
        .sessions
        .sessions_for_course(&course)
        .await
        .map_err(to_status)?;
    Ok(Json(sessions))
}

pub async fn course_activity(
    State(state): State<AppState>,
    Path(course): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let activity = state
        .sessions
        .course_activity(&course)
        .await
        .map_err(to_status)?;
    Ok(Json(activity))
}

pub async fn my_courses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let courses = state
        .enrollment
        .get_courses(&claims.sub)
        .await
        .map_err(to_status)?;
    Ok(Json(courses))
}

pub async fn add_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCourseRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.course.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let added = state
        .enrollment
        .add_course_to_user(&claims.sub, &req.course)
        .await
        .map_err(to_status)?;

    Ok(if added { StatusCode::CREATED } else { StatusCode::OK })
}

/// Echoes `position` back so the client can drop the matching list row.
pub async fn delete_course(
    State(state): State<AppState>,
    Path(course): Path<String>,
    Query(query): Query<DeleteCourseQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let position = state
        .enrollment
        .delete_course_from_user(&claims.sub, &course, query.position)
        .await
        .map_err(to_status)?;
    Ok(Json(DeleteCourseResponse { course, position }))
}
