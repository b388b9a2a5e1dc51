use serde::{Deserialize, Serialize};

use crate::role::Role;

pub mod bridge;
pub mod provider;
pub mod session;
pub mod token;

pub use bridge::AuthBridge;
pub use provider::{IdTokenProvider, IdentityProvider};
pub use session::Session;
pub use token::{IdTokenClaims, IdTokenVerifier};

/// User as known to the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

impl Identity {
    pub fn new(uid: impl ToString) -> Identity {
        Identity {
            uid: uid.to_string(),
            ..Default::default()
        }
    }
}

/// Signed in identity together with its stored role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(flatten)]
    pub identity: Identity,
    pub role: Role,
}

impl SessionUser {
    pub fn new(identity: Identity, role: Role) -> SessionUser {
        SessionUser { identity, role }
    }

    pub fn uid(&self) -> &str {
        &self.identity.uid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_user_flattens_identity() {
        let mut identity = Identity::new("uid-1");
        identity.email = Some("ana@example.com".to_string());
        let user = SessionUser::new(identity, Role::named("teacher"));

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "uid": "uid-1",
                "email": "ana@example.com",
                "displayName": null,
                "photoUrl": null,
                "emailVerified": false,
                "role": "teacher",
            })
        );
    }
}
