use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the user an operation runs on behalf of.
///
/// `session_id` is empty when the user is not in a study session. The same
/// record is what a device pins in its local cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub username: String,
    pub session_id: String,
    pub image_url: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    /// The session the user currently belongs to, if any.
    pub fn current_session(&self) -> Option<&str> {
        if self.session_id.is_empty() {
            None
        } else {
            Some(&self.session_id)
        }
    }

    pub fn is_signed_in(&self) -> bool {
        !self.user_id.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub session_id: Option<String>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoTag {
    pub latitude: f64,
    pub longitude: f64,
}

/// A live study session for one course.
///
/// `active_users` holds user ids in join order and never repeats an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub course: String,
    pub description: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_time: DateTime<Utc>,
    pub active_users: Vec<String>,
}

impl Session {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.active_users.iter().any(|u| u == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMember {
    pub username: String,
    pub user_id: String,
}

/// Counters shown next to a course in the course list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseActivity {
    pub sessions: usize,
    pub people: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPhoto {
    pub image_name: String,
    pub image_file: String,
}

impl UserPhoto {
    pub fn for_user(user_id: &str, image_file: impl Into<String>) -> Self {
        Self {
            image_name: format!("Profile pic of {}", user_id),
            image_file: image_file.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_id_means_no_session() {
        let mut ctx = UserContext::new("u1", "Ada");
        assert_eq!(ctx.current_session(), None);

        ctx.session_id = "s1".into();
        assert_eq!(ctx.current_session(), Some("s1"));
    }

    #[test]
    fn default_context_is_signed_out() {
        assert!(!UserContext::default().is_signed_in());
        assert!(UserContext::new("u1", "Ada").is_signed_in());
    }

    #[test]
    fn photo_name_embeds_user_id() {
        let photo = UserPhoto::for_user("42", "https://img/42.png");
        assert_eq!(photo.image_name, "Profile pic of 42");
    }
}
