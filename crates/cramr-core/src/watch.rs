//! Background refresh helpers: a poller that keeps a session's member list
//! current, and a signal for waiting until a refresh has finished.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cramr_types::models::SessionMember;

use crate::error::CramrError;
use crate::sessions::SessionController;

/// Default period between member-list refreshes while a session is open.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls a session's members until cancelled or the session disappears.
/// Dropping the watcher stops the poll.
pub struct MembershipWatcher {
    members: watch::Receiver<Vec<SessionMember>>,
    cancel: CancellationToken,
}

impl MembershipWatcher {
    pub fn spawn(sessions: SessionController, session_id: String, period: Duration) -> Self {
        let (tx, members) = watch::channel(Vec::new());
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        match sessions.session_users(&session_id).await {
                            Ok(latest) => {
                                tx.send_if_modified(|current| {
                                    if *current == latest {
                                        false
                                    } else {
                                        *current = latest;
                                        true
                                    }
                                });
                            }
                            Err(CramrError::SessionNotFound(_)) => {
                                info!("Session {} closed, stopping member poll", session_id);
                                break;
                            }
                            // Keep the last snapshot and try again next tick
                            Err(e) => warn!("Member poll for {} failed: {}", session_id, e),
                        }
                    }
                }
            }
            debug!("Member poll for {} stopped", session_id);
        });

        Self { members, cancel }
    }

    /// Latest known members.
    pub fn members(&self) -> Vec<SessionMember> {
        self.members.borrow().clone()
    }

    /// Receiver that wakes on every change. `changed()` errors once the poll
    /// has stopped.
    pub fn subscribe(&self) -> watch::Receiver<Vec<SessionMember>> {
        self.members.clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for MembershipWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Marks a data refresh in flight so other tasks can wait for it to finish
/// instead of spinning on a flag.
#[derive(Clone)]
pub struct RefreshSignal {
    busy: Arc<watch::Sender<bool>>,
}

impl Default for RefreshSignal {
    fn default() -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            busy: Arc::new(busy),
        }
    }
}

impl RefreshSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a refresh as started; it ends when the guard is dropped.
    pub fn begin(&self) -> RefreshGuard {
        self.busy.send_replace(true);
        RefreshGuard {
            busy: self.busy.clone(),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        *self.busy.borrow()
    }

    /// Completes once no refresh is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.busy.subscribe();
        // The sender lives in self, so this only ends once idle
        let _ = rx.wait_for(|busy| !*busy).await;
    }
}

pub struct RefreshGuard {
    busy: Arc<watch::Sender<bool>>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.busy.send_replace(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Reachability;
    use crate::testing::{backend_with_users, ctx};
    use cramr_types::models::GeoTag;

    #[tokio::test]
    async fn watcher_tracks_joins_and_stops_when_session_ends() {
        let backend = backend_with_users(&[("a", "Ada"), ("b", "Bob")]).await;
        let sessions = SessionController::new(backend, Reachability::new());
        let mut a = ctx("a", "Ada");
        let mut b = ctx("b", "Bob");
        let s = sessions.create_session(&mut a, "CS106A", "", "", GeoTag::default()).await.unwrap();

        let watcher = MembershipWatcher::spawn(sessions.clone(), s.id.clone(), Duration::from_millis(20));
        let mut rx = watcher.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(watcher.members().len(), 1);

        sessions.join_session(&mut b, &s.id).await.unwrap();
        rx.changed().await.unwrap();
        let names: Vec<_> = watcher.members().into_iter().map(|m| m.username).collect();
        assert_eq!(names, vec!["Ada", "Bob"]);

        sessions.leave_session(&mut a, &s.id).await.unwrap();
        sessions.leave_session(&mut b, &s.id).await.unwrap();
        // The poll may still see Bob alone before noticing the session is gone
        while rx.changed().await.is_ok() {}
        assert!(rx.has_changed().is_err());
    }

    #[tokio::test]
    async fn stopping_the_watcher_ends_the_poll() {
        let backend = backend_with_users(&[("a", "Ada")]).await;
        let sessions = SessionController::new(backend, Reachability::new());
        let mut a = ctx("a", "Ada");
        let s = sessions.create_session(&mut a, "CS106A", "", "", GeoTag::default()).await.unwrap();

        let watcher = MembershipWatcher::spawn(sessions, s.id, Duration::from_millis(10));
        let mut rx = watcher.subscribe();
        watcher.stop();

        // Sender is dropped when the task exits
        while rx.changed().await.is_ok() {}
        assert!(rx.has_changed().is_err());
    }

    #[tokio::test]
    async fn wait_idle_returns_after_refresh_finishes() {
        let signal = RefreshSignal::new();
        let guard = signal.begin();
        assert!(signal.is_refreshing());

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait_idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(!signal.is_refreshing());
    }

    #[tokio::test]
    async fn wait_idle_is_immediate_without_refresh() {
        RefreshSignal::new().wait_idle().await;
    }
}
