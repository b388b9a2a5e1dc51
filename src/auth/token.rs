use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Validation};
use serde::{Deserialize, Serialize};

use super::Identity;
use crate::error::AuthError;
use crate::security::VerificationKey;

pub fn issuer(project_id: &str) -> String {
    format!("https://securetoken.google.com/{}", project_id)
}

/// Claims of a platform issued ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    #[serde(with = "jwt_numeric_date")]
    pub iat: DateTime<Utc>,
    #[serde(with = "jwt_numeric_date")]
    pub exp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl From<IdTokenClaims> for Identity {
    fn from(claims: IdTokenClaims) -> Self {
        Identity {
            uid: claims.sub,
            email: claims.email,
            display_name: claims.name,
            photo_url: claims.picture,
            email_verified: claims.email_verified,
        }
    }
}

/// Checks ID token signature, audience, issuer and expiry for one project.
#[derive(Clone)]
pub struct IdTokenVerifier {
    key: VerificationKey,
    validation: Validation,
}

impl IdTokenVerifier {
    pub fn new(project_id: &str, key: VerificationKey) -> IdTokenVerifier {
        let mut validation = Validation::new(key.algorithm);
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[issuer(project_id)]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        IdTokenVerifier { key, validation }
    }

    pub fn verify(&self, token: &str) -> Result<IdTokenClaims, AuthError> {
        let claims = decode::<IdTokenClaims>(token, &self.key.key, &self.validation)?.claims;

        if claims.sub.is_empty() {
            return Err(AuthError::MissingSubject);
        }

        tracing::debug!("verified ID token for user: {}", claims.sub);
        Ok(claims)
    }
}

mod jwt_numeric_date {
    // Based on: https://github.com/Keats/jsonwebtoken/blob/master/examples/custom_chrono.rs

    //! Custom serialization of DateTime<Utc> to conform to the JWT spec (RFC 7519 section 2, "Numeric Date")
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(date.timestamp())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Utc.timestamp_opt(i64::deserialize(deserializer)?, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom("Invalid Unix timestamp value."))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use chrono::Duration;

    fn verifier() -> IdTokenVerifier {
        IdTokenVerifier::new(PROJECT_ID, key())
    }

    #[test]
    fn valid_token_yields_identity() {
        let claims = claims("uid-1");
        let verified = verifier().verify(&sign(&claims)).expect("valid token");
        assert_eq!(verified, claims);

        let identity = Identity::from(verified);
        assert_eq!(identity.uid, "uid-1");
        assert_eq!(identity.email.as_deref(), Some("uid-1@example.com"));
        assert_eq!(identity.display_name.as_deref(), Some("UID-1"));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let mut claims = claims("uid-1");
        claims.aud = "other-project".to_string();
        assert!(matches!(
            verifier().verify(&sign(&claims)),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let mut claims = claims("uid-1");
        claims.iss = issuer("other-project");
        assert!(matches!(
            verifier().verify(&sign(&claims)),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = claims("uid-1");
        claims.iat = claims.iat - Duration::hours(3);
        claims.exp = claims.iat + Duration::hours(1);
        assert!(matches!(
            verifier().verify(&sign(&claims)),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = IdTokenVerifier::new(PROJECT_ID, VerificationKey::secret("another-secret"));
        assert!(other.verify(&token("uid-1")).is_err());
    }

    #[test]
    fn empty_subject_is_rejected() {
        let claims = claims("");
        assert!(matches!(
            verifier().verify(&sign(&claims)),
            Err(AuthError::MissingSubject)
        ));
    }
}
