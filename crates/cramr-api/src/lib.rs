pub mod auth;
pub mod courses;
pub mod error;
pub mod invites;
pub mod middleware;
pub mod push;
pub mod sessions;
pub mod users;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use auth::AppState;
use middleware::require_auth;

/// All HTTP routes. Only `/health`, `/auth/signup` and the push socket
/// (which checks its own token) are reachable without a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/auth/signup", post(auth::signup))
        .route("/push", get(push::push_upgrade));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/me/courses", get(courses::my_courses).post(courses::add_course))
        .route("/me/courses/{course}", delete(courses::delete_course))
        .route("/courses", get(courses::search_courses))
        .route("/courses/{course}/sessions", get(courses::sessions_for_course))
        .route("/courses/{course}/activity", get(courses::course_activity))
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/{session_id}", get(sessions::get_session))
        .route("/sessions/{session_id}/exists", get(sessions::session_exists))
        .route("/sessions/{session_id}/users", get(sessions::session_users))
        .route("/sessions/{session_id}/join", post(sessions::join_session))
        .route("/sessions/{session_id}/leave", post(sessions::leave_session))
        .route("/invites", post(invites::send_invite))
        .route("/invites/handle", post(invites::handle_invite))
        .route("/invites/accept", post(invites::accept_invite))
        .route("/users/{user_id}/picture", get(users::picture))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
