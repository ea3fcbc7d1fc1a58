//! Database row types. These map directly to SQLite rows and are kept apart
//! from the cramr-types models so the schema can change independently.

use chrono::{DateTime, Utc};
use tracing::warn;

use cramr_types::models::{Session, User, UserPhoto};

pub struct UserRow {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub session_id: Option<String>,
    pub image_url: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> User {
        let created_at = parse_timestamp(&self.created_at, &self.user_id);
        User {
            user_id: self.user_id,
            username: self.username,
            email: self.email,
            session_id: self.session_id.filter(|s| !s.is_empty()),
            image_url: self.image_url,
            created_at,
        }
    }
}

pub struct SessionRow {
    pub id: String,
    pub course: String,
    pub description: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_time: String,
    /// Member ids in join order.
    pub members: Vec<String>,
}

impl SessionRow {
    pub fn into_session(self) -> Session {
        let start_time = parse_timestamp(&self.start_time, &self.id);
        Session {
            id: self.id,
            course: self.course,
            description: self.description,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            start_time,
            active_users: self.members,
        }
    }
}

pub struct PhotoRow {
    pub image_name: String,
    pub user_id: String,
    pub image_file: String,
}

impl From<PhotoRow> for UserPhoto {
    fn from(row: PhotoRow) -> Self {
        UserPhoto {
            image_name: row.image_name,
            image_file: row.image_file,
        }
    }
}

/// Outcome of adding a member to a session that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Added,
    AlreadyMember,
}

/// Outcome of removing a member from a session that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// False when the user was not a member.
    pub removed: bool,
    /// True when the session had no members left and was deleted.
    pub session_deleted: bool,
}

fn parse_timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; it is UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on '{}': {}", raw, owner, e);
            DateTime::default()
        })
}
