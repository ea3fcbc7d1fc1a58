use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::error;

use cramr_db::Database;
use cramr_types::models::{CourseActivity, Session, SessionMember, User, UserPhoto};

pub use cramr_db::models::{JoinOutcome, LeaveOutcome};

/// Fields of a session supplied by its creator.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub course: String,
    pub description: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Remote collections the app reads and writes: Users, Courses,
/// EnrolledCourses and Sessions.
///
/// Membership writes are atomic per call, so concurrent joins on one session
/// never overwrite each other.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Creates the user on first login. Returns false if they already existed.
    async fn signup(&self, user_id: &str, username: &str, email: &str, image_url: &str) -> Result<bool>;

    async fn user(&self, user_id: &str) -> Result<Option<User>>;

    async fn user_photo(&self, user_id: &str) -> Result<Option<UserPhoto>>;

    /// Creates a session whose only member is `creator`.
    async fn create_session(&self, creator: &str, new: NewSession) -> Result<Session>;

    async fn session(&self, session_id: &str) -> Result<Option<Session>>;

    async fn session_exists(&self, session_id: &str) -> Result<bool>;

    async fn sessions_for_course(&self, course: &str) -> Result<Vec<Session>>;

    /// `None` when the session does not exist.
    async fn add_member(&self, session_id: &str, user_id: &str) -> Result<Option<JoinOutcome>>;

    /// Deletes the session when its last member leaves.
    /// `None` when the session does not exist.
    async fn remove_member(&self, session_id: &str, user_id: &str) -> Result<Option<LeaveOutcome>>;

    /// `None` when the session does not exist.
    async fn session_members(&self, session_id: &str) -> Result<Option<Vec<SessionMember>>>;

    async fn course_activity(&self, course: &str) -> Result<CourseActivity>;

    /// Returns false if the course was already enrolled.
    async fn enroll(&self, user_id: &str, course: &str) -> Result<bool>;

    /// Returns false if the course was not enrolled.
    async fn unenroll(&self, user_id: &str, course: &str) -> Result<bool>;

    async fn enrolled_courses(&self, user_id: &str) -> Result<Vec<String>>;

    async fn course_titles(&self) -> Result<Vec<String>>;

    async fn import_courses(&self, titles: Vec<String>) -> Result<usize>;
}

/// [`Backend`] over the local SQLite database. Every call runs on the
/// blocking pool so the async runtime never waits on SQLite.
#[derive(Clone)]
pub struct SqliteBackend {
    db: Arc<Database>,
}

impl SqliteBackend {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                anyhow!("spawn_blocking join error: {}", e)
            })?
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn signup(&self, user_id: &str, username: &str, email: &str, image_url: &str) -> Result<bool> {
        let (user_id, username, email, image_url) =
            (user_id.to_string(), username.to_string(), email.to_string(), image_url.to_string());
        self.blocking(move |db| db.upsert_user(&user_id, &username, &email, &image_url))
            .await
    }

    async fn user(&self, user_id: &str) -> Result<Option<User>> {
        let user_id = user_id.to_string();
        let row = self.blocking(move |db| db.get_user(&user_id)).await?;
        Ok(row.map(|r| r.into_user()))
    }

    async fn user_photo(&self, user_id: &str) -> Result<Option<UserPhoto>> {
        let user_id = user_id.to_string();
        let row = self.blocking(move |db| db.get_user_photo(&user_id)).await?;
        Ok(row.map(UserPhoto::from))
    }

    async fn create_session(&self, creator: &str, new: NewSession) -> Result<Session> {
        let creator = creator.to_string();
        let row = self
            .blocking(move |db| {
                db.insert_session(
                    &creator,
                    &new.course,
                    &new.description,
                    &new.location,
                    new.latitude,
                    new.longitude,
                )
            })
            .await?;
        Ok(row.into_session())
    }

    async fn session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        let row = self.blocking(move |db| db.get_session(&session_id)).await?;
        Ok(row.map(|r| r.into_session()))
    }

    async fn session_exists(&self, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();
        self.blocking(move |db| db.session_exists(&session_id)).await
    }

    async fn sessions_for_course(&self, course: &str) -> Result<Vec<Session>> {
        let course = course.to_string();
        let rows = self.blocking(move |db| db.sessions_for_course(&course)).await?;
        Ok(rows.into_iter().map(|r| r.into_session()).collect())
    }

    async fn add_member(&self, session_id: &str, user_id: &str) -> Result<Option<JoinOutcome>> {
        let (session_id, user_id) = (session_id.to_string(), user_id.to_string());
        self.blocking(move |db| db.add_session_member(&session_id, &user_id))
            .await
    }

    async fn remove_member(&self, session_id: &str, user_id: &str) -> Result<Option<LeaveOutcome>> {
        let (session_id, user_id) = (session_id.to_string(), user_id.to_string());
        self.blocking(move |db| db.remove_session_member(&session_id, &user_id))
            .await
    }

    async fn session_members(&self, session_id: &str) -> Result<Option<Vec<SessionMember>>> {
        let session_id = session_id.to_string();
        let names = self
            .blocking(move |db| db.session_member_names(&session_id))
            .await?;
        Ok(names.map(|members| {
            members
                .into_iter()
                .map(|(username, user_id)| SessionMember { username, user_id })
                .collect()
        }))
    }

    async fn course_activity(&self, course: &str) -> Result<CourseActivity> {
        let course = course.to_string();
        let (sessions, people) = self.blocking(move |db| db.course_activity(&course)).await?;
        Ok(CourseActivity { sessions, people })
    }

    async fn enroll(&self, user_id: &str, course: &str) -> Result<bool> {
        let (user_id, course) = (user_id.to_string(), course.to_string());
        self.blocking(move |db| db.enroll_course(&user_id, &course)).await
    }

    async fn unenroll(&self, user_id: &str, course: &str) -> Result<bool> {
        let (user_id, course) = (user_id.to_string(), course.to_string());
        self.blocking(move |db| db.unenroll_course(&user_id, &course)).await
    }

    async fn enrolled_courses(&self, user_id: &str) -> Result<Vec<String>> {
        let user_id = user_id.to_string();
        self.blocking(move |db| db.enrolled_courses(&user_id)).await
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        self.blocking(|db| db.course_titles()).await
    }

    async fn import_courses(&self, titles: Vec<String>) -> Result<usize> {
        self.blocking(move |db| db.insert_courses(&titles)).await
    }
}
