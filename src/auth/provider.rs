use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use super::token::IdTokenVerifier;
use super::Identity;
use crate::error::AuthError;

/// Number of undelivered session changes kept per subscriber.
pub const SESSION_EVENT_CAPACITY: usize = 16;

/// Source of signed in identities.
///
/// Every change of the signed in identity (sign in, sign out, credential
/// refresh) is sent to subscribers as `Some(identity)` or `None`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, credential: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    fn current(&self) -> Option<Identity>;

    fn subscribe(&self) -> broadcast::Receiver<Option<Identity>>;
}

/// Provider accepting ID tokens produced by the platform's sign in flow.
pub struct IdTokenProvider {
    verifier: IdTokenVerifier,
    current: watch::Sender<Option<Identity>>,
    events: broadcast::Sender<Option<Identity>>,
}

impl IdTokenProvider {
    pub fn new(verifier: IdTokenVerifier) -> IdTokenProvider {
        let (current, _) = watch::channel(None);
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        IdTokenProvider {
            verifier,
            current,
            events,
        }
    }

    fn change(&self, identity: Option<Identity>) {
        self.current.send_replace(identity.clone());
        // No subscribers is fine.
        let _ = self.events.send(identity);
    }
}

#[async_trait]
impl IdentityProvider for IdTokenProvider {
    async fn sign_in(&self, credential: &str) -> Result<Identity, AuthError> {
        let identity = Identity::from(self.verifier.verify(credential)?);
        tracing::info!("User {} signed in", identity.uid);

        self.change(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(identity) = self.current() {
            tracing::info!("User {} signed out", identity.uid);
        }

        self.change(None);
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<Option<Identity>> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::testing;

    fn provider() -> IdTokenProvider {
        IdTokenProvider::new(IdTokenVerifier::new(testing::PROJECT_ID, testing::key()))
    }

    #[tokio::test]
    async fn sign_in_and_out_are_broadcast() {
        let provider = provider();
        let mut events = provider.subscribe();

        let identity = provider.sign_in(&testing::token("uid-1")).await.unwrap();
        assert_eq!(provider.current(), Some(identity.clone()));
        assert_eq!(events.recv().await.unwrap(), Some(identity));

        provider.sign_out().await.unwrap();
        assert_eq!(provider.current(), None);
        assert_eq!(events.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejected_credential_keeps_session() {
        let provider = provider();
        let identity = provider.sign_in(&testing::token("uid-1")).await.unwrap();
        let mut events = provider.subscribe();

        assert!(provider.sign_in("garbage").await.is_err());
        assert_eq!(provider.current(), Some(identity));
        assert!(events.try_recv().is_err());
    }
}
