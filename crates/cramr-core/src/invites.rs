use tracing::{info, warn};

use cramr_push::PushHub;
use cramr_types::courses::course_name;
use cramr_types::events::{
    InviteOutcome, InvitePrompt, InviteResolution, InviteState, PushPayload, push_channel,
};
use cramr_types::models::UserContext;

use crate::enrollment::EnrollmentController;
use crate::error::{CramrError, Result};
use crate::sessions::SessionController;

/// Sends invites to friends and resolves the invites a user receives.
#[derive(Clone)]
pub struct InviteService {
    sessions: SessionController,
    enrollment: EnrollmentController,
    hub: PushHub,
}

impl InviteService {
    pub fn new(sessions: SessionController, enrollment: EnrollmentController, hub: PushHub) -> Self {
        Self {
            sessions,
            enrollment,
            hub,
        }
    }

    /// Invites `target_user_id` to the caller's current session.
    pub async fn send_invite(
        &self,
        ctx: &UserContext,
        target_user_id: &str,
        course: &str,
    ) -> Result<InviteOutcome> {
        if !ctx.is_signed_in() {
            return Err(CramrError::MissingUser);
        }
        let session_id = ctx.current_session().ok_or(CramrError::NotInSession)?;

        if self.sessions.is_user_in_session(target_user_id, session_id).await? {
            info!("{} is already in session {}, no invite sent", target_user_id, session_id);
            return Ok(InviteOutcome::AlreadyInSession);
        }

        let message = format!("{} invited you to work on {}", ctx.username, course_name(course));
        let payload = PushPayload {
            alert: message.clone(),
            seshid: session_id.to_string(),
            course_name: course.to_string(),
            message,
        };

        let delivered = self.hub.publish(&push_channel(target_user_id), payload).await;
        info!(
            "{} invited {} to session {} (delivered: {})",
            ctx.user_id, target_user_id, session_id, delivered
        );
        Ok(InviteOutcome::Sent { delivered })
    }

    /// Re-checks the invite's session, which may have been deleted since the
    /// invite was sent.
    pub async fn handle_incoming_invite(
        &self,
        ctx: &UserContext,
        payload: &PushPayload,
    ) -> Result<InvitePrompt> {
        if self.sessions.session_exists(&payload.seshid).await? {
            Ok(InvitePrompt::Join {
                session_id: payload.seshid.clone(),
                course: payload.course_name.clone(),
                message: payload.message.clone(),
            })
        } else {
            info!("{} opened an invite to vanished session {}", ctx.user_id, payload.seshid);
            Ok(InvitePrompt::Create {
                course: payload.course_name.clone(),
            })
        }
    }

    /// Acts on the user's "accept". Joining enrolls the user in the course
    /// first and moves them out of any other session.
    pub async fn accept_invite(
        &self,
        ctx: &mut UserContext,
        prompt: &InvitePrompt,
    ) -> Result<InviteResolution> {
        match prompt {
            InvitePrompt::Join {
                session_id, course, ..
            } => {
                self.enrollment.add_course_to_user(&ctx.user_id, course).await?;

                if !self.sessions.session_exists(session_id).await? {
                    return Ok(InviteResolution::SessionGone {
                        course: course.clone(),
                    });
                }

                match self.sessions.join_session(ctx, session_id).await {
                    Ok(session) => Ok(InviteResolution::Joined { session }),
                    Err(CramrError::SessionNotFound(_)) => {
                        warn!("Session {} vanished while {} was joining", session_id, ctx.user_id);
                        Ok(InviteResolution::SessionGone {
                            course: course.clone(),
                        })
                    }
                    Err(e) => Err(e),
                }
            }
            InvitePrompt::Create { course } => Ok(InviteResolution::CreateRequested {
                course: course.clone(),
            }),
        }
    }
}

/// An incoming invite moving through
/// `Received -> Validated -> Accepted | Dismissed`.
#[derive(Debug, Clone, PartialEq)]
pub struct Invite {
    state: InviteState,
}

impl Invite {
    pub fn received(payload: PushPayload) -> Self {
        Self {
            state: InviteState::Received { payload },
        }
    }

    pub fn state(&self) -> &InviteState {
        &self.state
    }

    /// The prompt to show, once validated.
    pub fn prompt(&self) -> Option<&InvitePrompt> {
        match &self.state {
            InviteState::Validated { prompt } => Some(prompt),
            _ => None,
        }
    }

    pub async fn validate(&mut self, service: &InviteService, ctx: &UserContext) -> Result<InvitePrompt> {
        let InviteState::Received { payload } = &self.state else {
            return Err(self.invalid("validated"));
        };
        let prompt = service.handle_incoming_invite(ctx, payload).await?;
        self.state = InviteState::Validated {
            prompt: prompt.clone(),
        };
        Ok(prompt)
    }

    pub async fn accept(
        &mut self,
        service: &InviteService,
        ctx: &mut UserContext,
    ) -> Result<InviteResolution> {
        let InviteState::Validated { prompt } = &self.state else {
            return Err(self.invalid("accepted"));
        };
        let resolution = service.accept_invite(ctx, prompt).await?;
        self.state = InviteState::Accepted {
            resolution: resolution.clone(),
        };
        Ok(resolution)
    }

    pub fn dismiss(&mut self) -> Result<()> {
        if !matches!(self.state, InviteState::Validated { .. }) {
            return Err(self.invalid("dismissed"));
        }
        self.state = InviteState::Dismissed;
        Ok(())
    }

    fn invalid(&self, to: &'static str) -> CramrError {
        let from = match self.state {
            InviteState::Received { .. } => "received",
            InviteState::Validated { .. } => "validated",
            InviteState::Accepted { .. } => "accepted",
            InviteState::Dismissed => "dismissed",
        };
        CramrError::InvalidInviteState { from, to }
    }
}
