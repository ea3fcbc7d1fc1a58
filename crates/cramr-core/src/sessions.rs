use std::sync::Arc;

use tracing::{debug, error, info, warn};

use cramr_types::models::{CourseActivity, GeoTag, Session, SessionMember, UserContext};

use crate::backend::{Backend, JoinOutcome, NewSession};
use crate::context::Reachability;
use crate::error::{CramrError, Result};

/// Create, join and leave study sessions.
///
/// The caller's `session_id` is only updated once the backend has confirmed
/// the write.
#[derive(Clone)]
pub struct SessionController {
    backend: Arc<dyn Backend>,
    reachability: Reachability,
}

impl SessionController {
    pub fn new(backend: Arc<dyn Backend>, reachability: Reachability) -> Self {
        Self {
            backend,
            reachability,
        }
    }

    /// Starts a session for `course` with the caller as its only member.
    /// The store moves the caller out of whatever session it holds them in.
    pub async fn create_session(
        &self,
        ctx: &mut UserContext,
        course: &str,
        description: &str,
        location: &str,
        geo_tag: GeoTag,
    ) -> Result<Session> {
        if !ctx.is_signed_in() {
            return Err(CramrError::MissingUser);
        }
        self.reachability.ensure_online()?;

        let new = NewSession {
            course: course.to_string(),
            description: description.to_string(),
            location: location.to_string(),
            latitude: geo_tag.latitude,
            longitude: geo_tag.longitude,
        };
        let session = self
            .backend
            .create_session(&ctx.user_id, new)
            .await
            .map_err(|e| backend_failure("create_session", e))?;

        ctx.session_id = session.id.clone();
        info!("{} created session {} for {}", ctx.user_id, session.id, course);
        Ok(session)
    }

    /// Adds the caller to `session_id`. Joining a session the caller is
    /// already in changes nothing. Other memberships are dropped by the store
    /// in the same write, so a stale `ctx` cannot leave the caller in two
    /// sessions.
    pub async fn join_session(&self, ctx: &mut UserContext, session_id: &str) -> Result<Session> {
        if !ctx.is_signed_in() {
            return Err(CramrError::MissingUser);
        }
        self.reachability.ensure_online()?;

        let outcome = self
            .backend
            .add_member(session_id, &ctx.user_id)
            .await
            .map_err(|e| backend_failure("join_session", e))?
            .ok_or_else(|| CramrError::SessionNotFound(session_id.to_string()))?;

        match outcome {
            JoinOutcome::Added => info!("{} joined session {}", ctx.user_id, session_id),
            JoinOutcome::AlreadyMember => debug!("{} already in session {}", ctx.user_id, session_id),
        }

        ctx.session_id = session_id.to_string();

        self.backend
            .session(session_id)
            .await
            .map_err(|e| backend_failure("join_session", e))?
            .ok_or_else(|| CramrError::SessionNotFound(session_id.to_string()))
    }

    /// Removes the caller from `session_id`; the last member out deletes it.
    /// Leaving a session that is already gone only clears the caller's state.
    pub async fn leave_session(&self, ctx: &mut UserContext, session_id: &str) -> Result<()> {
        if !ctx.is_signed_in() {
            return Err(CramrError::MissingUser);
        }
        self.reachability.ensure_online()?;

        self.leave_membership(&ctx.user_id, session_id).await?;
        if ctx.session_id == session_id {
            ctx.session_id.clear();
        }
        Ok(())
    }

    async fn leave_membership(&self, user_id: &str, session_id: &str) -> Result<()> {
        let outcome = self
            .backend
            .remove_member(session_id, user_id)
            .await
            .map_err(|e| backend_failure("leave_session", e))?;

        match outcome {
            Some(outcome) if outcome.session_deleted => {
                info!("{} left session {}, session deleted", user_id, session_id)
            }
            Some(_) => info!("{} left session {}", user_id, session_id),
            None => warn!("{} left session {} which no longer exists", user_id, session_id),
        }
        Ok(())
    }

    /// False exactly when the session record has been removed.
    pub async fn session_exists(&self, session_id: &str) -> Result<bool> {
        self.backend
            .session_exists(session_id)
            .await
            .map_err(|e| backend_failure("session_exists", e))
    }

    pub async fn session_info(&self, session_id: &str) -> Result<Option<Session>> {
        self.backend
            .session(session_id)
            .await
            .map_err(|e| backend_failure("session_info", e))
    }

    pub async fn sessions_for_course(&self, course: &str) -> Result<Vec<Session>> {
        self.backend
            .sessions_for_course(course)
            .await
            .map_err(|e| backend_failure("sessions_for_course", e))
    }

    /// Members of a session as `(username, user_id)` pairs, in join order.
    pub async fn session_users(&self, session_id: &str) -> Result<Vec<SessionMember>> {
        self.backend
            .session_members(session_id)
            .await
            .map_err(|e| backend_failure("session_users", e))?
            .ok_or_else(|| CramrError::SessionNotFound(session_id.to_string()))
    }

    pub async fn is_user_in_session(&self, user_id: &str, session_id: &str) -> Result<bool> {
        let session = self
            .session_info(session_id)
            .await?
            .ok_or_else(|| CramrError::SessionNotFound(session_id.to_string()))?;
        Ok(session.has_member(user_id))
    }

    pub async fn course_activity(&self, course: &str) -> Result<CourseActivity> {
        self.backend
            .course_activity(course)
            .await
            .map_err(|e| backend_failure("course_activity", e))
    }
}

pub(crate) fn backend_failure(op: &str, e: anyhow::Error) -> CramrError {
    error!("Error in {}: {:#}", op, e);
    CramrError::Backend(e)
}
