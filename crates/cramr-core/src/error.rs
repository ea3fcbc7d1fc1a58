use thiserror::Error;

pub type Result<T> = std::result::Result<T, CramrError>;

#[derive(Debug, Error)]
pub enum CramrError {
    /// Checked before every mutating call; nothing was sent.
    #[error("not connected to a network")]
    Offline,

    #[error("no signed-in user")]
    MissingUser,

    #[error("session {0} no longer exists")]
    SessionNotFound(String),

    #[error("user is not in a session")]
    NotInSession,

    #[error("invite cannot go from {from} to {to}")]
    InvalidInviteState {
        from: &'static str,
        to: &'static str,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
