use serde::{Deserialize, Serialize};

use crate::events::{InviteOutcome, InvitePrompt, PushPayload};
use crate::models::UserContext;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the push socket.
/// `sub` is the social user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

/// Identity already verified by the social login provider.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub token: String,
    pub created: bool,
    pub context: UserContext,
}

// -- Courses --

#[derive(Debug, Deserialize)]
pub struct CourseSearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCourseRequest {
    pub course: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCourseQuery {
    pub position: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteCourseResponse {
    pub course: String,
    pub position: Option<i64>,
}

// -- Sessions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSessionRequest {
    pub course: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionExistsResponse {
    pub exists: bool,
}

// -- Invites --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendInviteRequest {
    pub target_user_id: String,
    pub course: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendInviteResponse {
    pub outcome: InviteOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandleInviteRequest {
    pub payload: PushPayload,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptInviteRequest {
    pub prompt: InvitePrompt,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct PictureResponse {
    pub user_id: String,
    pub image_url: String,
}
