use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use cramr_types::models::UserContext;

use crate::backend::Backend;
use crate::error::{CramrError, Result};

/// Shared network reachability flag, consulted before every mutating call.
#[derive(Clone, Debug)]
pub struct Reachability {
    online: Arc<AtomicBool>,
}

impl Default for Reachability {
    fn default() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl Reachability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    pub fn ensure_online(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            warn!("Network unreachable, aborting mutation");
            Err(CramrError::Offline)
        }
    }
}

/// Builds the context for a stored user.
pub async fn load_context(backend: &dyn Backend, user_id: &str) -> Result<UserContext> {
    let user = backend.user(user_id).await?.ok_or(CramrError::MissingUser)?;
    Ok(UserContext {
        user_id: user.user_id,
        username: user.username,
        session_id: user.session_id.unwrap_or_default(),
        image_url: user.image_url,
    })
}
