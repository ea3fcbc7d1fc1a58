use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use cramr_db::LocalCache;
use cramr_push::PushHub;
use cramr_types::events::{InviteOutcome, InviteResolution, PushPayload};
use cramr_types::models::{GeoTag, Session, UserContext};

use crate::backend::Backend;
use crate::context::Reachability;
use crate::enrollment::EnrollmentController;
use crate::error::{CramrError, Result};
use crate::invites::{Invite, InviteService};
use crate::sessions::SessionController;
use crate::watch::{MembershipWatcher, RefreshSignal};

/// What a signed-in device holds: the pinned identity, its enrolled-course
/// list, and the controllers acting on its behalf.
///
/// The identity is re-pinned after every confirmed change.
pub struct CramrApp {
    ctx: UserContext,
    cache: LocalCache,
    backend: Arc<dyn Backend>,
    sessions: SessionController,
    enrollment: EnrollmentController,
    invites: InviteService,
    course_list: Vec<String>,
    refresh: RefreshSignal,
}

impl CramrApp {
    /// Restores the pinned identity from `cache`.
    pub fn new(
        backend: Arc<dyn Backend>,
        hub: PushHub,
        cache: LocalCache,
        reachability: Reachability,
    ) -> Result<Self> {
        let ctx = cache.load()?;
        let sessions = SessionController::new(backend.clone(), reachability.clone());
        let enrollment = EnrollmentController::new(backend.clone(), reachability);
        let invites = InviteService::new(sessions.clone(), enrollment.clone(), hub);

        Ok(Self {
            ctx,
            cache,
            backend,
            sessions,
            enrollment,
            invites,
            course_list: Vec::new(),
            refresh: RefreshSignal::new(),
        })
    }

    pub fn context(&self) -> &UserContext {
        &self.ctx
    }

    pub fn sessions(&self) -> &SessionController {
        &self.sessions
    }

    pub fn course_list(&self) -> &[String] {
        &self.course_list
    }

    pub fn refresh_signal(&self) -> RefreshSignal {
        self.refresh.clone()
    }

    /// Signs the social identity up (first login only) and pins it.
    pub async fn sign_in(
        &mut self,
        user_id: &str,
        username: &str,
        email: &str,
        image_url: &str,
    ) -> Result<()> {
        let created = self.backend.signup(user_id, username, email, image_url).await?;
        self.ctx = crate::context::load_context(self.backend.as_ref(), user_id).await?;
        self.cache.pin(&self.ctx)?;
        info!("{} signed in (new account: {})", user_id, created);

        self.refresh_courses().await?;
        Ok(())
    }

    /// Reloads the enrolled-course list from the backend.
    pub async fn refresh_courses(&mut self) -> Result<&[String]> {
        let _guard = self.refresh.begin();
        self.course_list = self.enrollment.get_courses(&self.ctx.user_id).await?;
        Ok(&self.course_list)
    }

    pub async fn add_course(&mut self, course: &str) -> Result<()> {
        self.enrollment.add_course_to_user(&self.ctx.user_id, course).await?;
        self.remember_course(course);
        Ok(())
    }

    pub async fn drop_course<P>(&mut self, course: &str, position_hint: P) -> Result<P> {
        let hint = self
            .enrollment
            .delete_course_from_user(&self.ctx.user_id, course, position_hint)
            .await?;
        self.course_list.retain(|c| c != course);
        Ok(hint)
    }

    pub async fn search_courses(&self, text: &str) -> Result<Vec<String>> {
        self.enrollment.search_courses(text).await
    }

    pub async fn create_session(
        &mut self,
        course: &str,
        description: &str,
        location: &str,
        geo_tag: GeoTag,
    ) -> Result<Session> {
        let result = self
            .sessions
            .create_session(&mut self.ctx, course, description, location, geo_tag)
            .await;
        self.pin_after(result)
    }

    pub async fn join_session(&mut self, session_id: &str) -> Result<Session> {
        let result = self.sessions.join_session(&mut self.ctx, session_id).await;
        self.pin_after(result)
    }

    /// Leaves the current session, if any.
    pub async fn leave_session(&mut self) -> Result<()> {
        let Some(current) = self.ctx.current_session().map(str::to_owned) else {
            return Ok(());
        };
        self.sessions.leave_session(&mut self.ctx, &current).await?;
        self.cache.clear_session()?;
        Ok(())
    }

    pub async fn invite(&self, target_user_id: &str, course: &str) -> Result<InviteOutcome> {
        self.invites.send_invite(&self.ctx, target_user_id, course).await
    }

    /// Validates an incoming push and returns the invite awaiting a choice.
    pub async fn receive_invite(&self, payload: PushPayload) -> Result<Invite> {
        let mut invite = Invite::received(payload);
        invite.validate(&self.invites, &self.ctx).await?;
        Ok(invite)
    }

    pub async fn accept_invite(&mut self, invite: &mut Invite) -> Result<InviteResolution> {
        let course = invite.prompt().map(|p| p.course().to_string());
        let result = invite.accept(&self.invites, &mut self.ctx).await;
        let resolution = self.pin_after(result)?;

        if let (Some(course), InviteResolution::Joined { .. }) = (course, &resolution) {
            self.remember_course(&course);
        }
        Ok(resolution)
    }

    /// Starts polling the current session's members.
    pub fn watch_session(&self, period: Duration) -> Result<MembershipWatcher> {
        let session_id = self
            .ctx
            .current_session()
            .ok_or(CramrError::NotInSession)?
            .to_string();
        Ok(MembershipWatcher::spawn(self.sessions.clone(), session_id, period))
    }

    fn remember_course(&mut self, course: &str) {
        if !self.course_list.iter().any(|c| c == course) {
            self.course_list.push(course.to_string());
        }
    }

    /// Pins the context once the operation has been confirmed.
    fn pin_after<T>(&self, result: Result<T>) -> Result<T> {
        let value = result?;
        self.cache.pin(&self.ctx)?;
        Ok(value)
    }
}
