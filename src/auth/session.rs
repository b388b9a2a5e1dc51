use std::sync::Arc;

use tokio::sync::watch;

use super::SessionUser;

/// Shared view of the signed in user.
///
/// Cloned handles observe the same state. Every publish replaces the previous
/// value, the last writer wins.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<watch::Sender<Option<SessionUser>>>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Session {
        let (state, _) = watch::channel(None);
        Session {
            state: Arc::new(state),
        }
    }

    pub fn current(&self) -> Option<SessionUser> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.state.subscribe()
    }

    pub fn publish(&self, user: Option<SessionUser>) {
        match &user {
            Some(user) => tracing::debug!("session user: {} ({})", user.identity.uid, user.role),
            None => tracing::debug!("session cleared"),
        }
        self.state.send_replace(user);
    }
}
