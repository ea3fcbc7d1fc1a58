use serde::{Deserialize, Serialize};

use crate::models::Session;

/// Name of the push channel a user's devices subscribe to.
pub fn push_channel(user_id: &str) -> String {
    format!("a{}", user_id)
}

/// Payload delivered on a user's push channel when they are invited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub alert: String,
    pub seshid: String,
    #[serde(rename = "courseName")]
    pub course_name: String,
    pub message: String,
}

/// Result of sending an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteOutcome {
    /// Published; `delivered` is false when no device was listening.
    Sent { delivered: bool },
    /// The target is already a member of the inviter's session.
    AlreadyInSession,
}

/// What the invited user is asked after the invite has been validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "prompt", rename_all = "snake_case")]
pub enum InvitePrompt {
    /// The session still exists: join or dismiss.
    Join {
        session_id: String,
        course: String,
        message: String,
    },
    /// The session is gone: offer to create a new one for the course.
    Create { course: String },
}

impl InvitePrompt {
    pub fn course(&self) -> &str {
        match self {
            Self::Join { course, .. } | Self::Create { course } => course,
        }
    }
}

/// How an accepted invite ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum InviteResolution {
    Joined { session: Session },
    /// The session vanished between prompt and accept.
    SessionGone { course: String },
    /// The user chose to start a new session for the course.
    CreateRequested { course: String },
}

/// Lifecycle of an incoming invite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InviteState {
    Received { payload: PushPayload },
    Validated { prompt: InvitePrompt },
    Accepted { resolution: InviteResolution },
    Dismissed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_is_prefixed_user_id() {
        assert_eq!(push_channel("10153"), "a10153");
    }

    #[test]
    fn payload_uses_push_field_names() {
        let payload = PushPayload {
            alert: "Ada invited you to work on Algorithms".into(),
            seshid: "s1".into(),
            course_name: "CS 161: Algorithms".into(),
            message: "Ada invited you to work on Algorithms".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["courseName"], "CS 161: Algorithms");
        assert_eq!(json["seshid"], "s1");
    }

    #[test]
    fn prompt_exposes_course() {
        let prompt = InvitePrompt::Create {
            course: "CS 161: Algorithms".into(),
        };
        assert_eq!(prompt.course(), "CS 161: Algorithms");
    }
}
