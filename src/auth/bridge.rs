use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::{Identity, IdentityProvider, Session, SessionUser};
use crate::data::user::db::UserDbExt;
use crate::data::DataClient;
use crate::error::AuthError;
use crate::role::Role;

/// Keeps a [Session] in sync with the identity provider and the stored user
/// roles.
pub struct AuthBridge {
    provider: Arc<dyn IdentityProvider>,
    data: DataClient,
    session: Session,
}

impl AuthBridge {
    pub fn new(provider: Arc<dyn IdentityProvider>, data: DataClient, session: Session) -> AuthBridge {
        AuthBridge {
            provider,
            data,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Signs in with `credential` and publishes the user.
    ///
    /// A stored role always wins. Without a stored user, `role` registers one;
    /// without either the user is published as [Role::Unknown] and nothing is
    /// stored.
    #[tracing::instrument(skip(self, credential))]
    pub async fn login_or_register(
        &self,
        credential: &str,
        role: Option<Role>,
    ) -> Result<SessionUser, AuthError> {
        let result = self.resolve_login(credential, role).await;

        match result {
            Ok(user) => {
                self.session.publish(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::error!("Login failed: {}", e);
                Err(e)
            }
        }
    }

    async fn resolve_login(
        &self,
        credential: &str,
        role: Option<Role>,
    ) -> Result<SessionUser, AuthError> {
        let identity = self.provider.sign_in(credential).await?;
        let stored = self.data.get_user(&identity.uid).await?;

        let role = match (stored, role.filter(|it| *it != Role::Unassigned)) {
            (Some(user), _) => user.role,
            (None, Some(role)) => self.data.register_user(&identity.uid, role).await?.role,
            (None, None) => Role::Unknown,
        };

        Ok(SessionUser::new(identity, role))
    }

    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Err(e) = self.provider.sign_out().await {
            tracing::error!("Logout failed: {}", e);
            return Err(e);
        }

        self.session.publish(None);
        Ok(())
    }

    /// Re-resolves the role for a provider session change and publishes the
    /// result. Users without a stored record and failed lookups clear the
    /// session.
    pub async fn on_session_change(&self, identity: Option<Identity>) -> Option<SessionUser> {
        let user = match identity {
            None => None,
            Some(identity) => match self.data.get_user(&identity.uid).await {
                Ok(Some(stored)) => Some(SessionUser::new(identity, stored.role)),
                Ok(None) => {
                    tracing::debug!("no stored user for {}", identity.uid);
                    None
                }
                Err(e) => {
                    tracing::error!("Unable to resolve role for {}: {}", identity.uid, e);
                    None
                }
            },
        };

        self.session.publish(user.clone());
        user
    }

    /// Spawns the task following provider session changes. It runs until the
    /// provider goes away or the handle is aborted.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let bridge = Arc::clone(self);
        let mut events = self.provider.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(identity) => {
                        bridge.on_session_change(identity).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("missed {} session changes", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("session listener stopped");
        })
    }
}
