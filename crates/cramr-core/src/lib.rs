//! Cramr core: the session lifecycle, enrollment and invite flows.
//!
//! Every operation takes the acting user's [`UserContext`] explicitly and
//! talks to storage through the [`Backend`] trait.
//!
//! [`UserContext`]: cramr_types::models::UserContext

pub mod app;
pub mod backend;
pub mod context;
pub mod enrollment;
pub mod error;
pub mod invites;
pub mod sessions;
pub mod watch;

pub use backend::{Backend, NewSession, SqliteBackend};
pub use context::{Reachability, load_context};
pub use enrollment::EnrollmentController;
pub use error::{CramrError, Result};
pub use invites::{Invite, InviteService};
pub use sessions::SessionController;

#[cfg(test)]
pub(crate) mod testing;
