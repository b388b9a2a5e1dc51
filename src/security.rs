use std::path::{Path, PathBuf};
use std::{env, fs};

use jsonwebtoken::{Algorithm, DecodingKey};

use crate::error::ConfigurationError;

const ID_TOKEN_PUBLIC: &str = "id_token.pem.pub";
const ID_TOKEN_SECRET_VAR: &str = "ID_TOKEN_SECRET";

/// Key ID tokens are checked against.
#[derive(Clone)]
pub struct VerificationKey {
    pub algorithm: Algorithm,
    pub key: DecodingKey,
}

impl VerificationKey {
    pub fn rsa_pem(pem: impl AsRef<[u8]>) -> Result<VerificationKey, ConfigurationError> {
        Ok(VerificationKey {
            algorithm: Algorithm::RS256,
            key: DecodingKey::from_rsa_pem(pem.as_ref()).map_err(ConfigurationError::InvalidKey)?,
        })
    }

    pub fn secret(secret: impl AsRef<[u8]>) -> VerificationKey {
        VerificationKey {
            algorithm: Algorithm::HS256,
            key: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationKey({:?})", self.algorithm)
    }
}

#[derive(Debug, Clone)]
pub struct Security {
    pub id_token_key: VerificationKey,
}

#[inline]
fn security_dir() -> PathBuf {
    PathBuf::from(env::var("SECURITY_DIR").unwrap_or("./security".to_string()))
}

impl Security {
    pub fn load() -> Result<Security, ConfigurationError> {
        Security::load_from(security_dir(), env::var(ID_TOKEN_SECRET_VAR).ok())
    }

    /// Prefers the RSA public key in `dir`, falling back to a shared secret.
    pub fn load_from(
        dir: impl AsRef<Path>,
        secret: Option<String>,
    ) -> Result<Security, ConfigurationError> {
        let dir = dir.as_ref();

        tracing::info!("Loading ID token verification key...");
        let id_token_key = match fs::read(dir.join(ID_TOKEN_PUBLIC)) {
            Ok(pem) => {
                tracing::info!("Loaded RS256 public key.");
                VerificationKey::rsa_pem(pem)?
            }
            Err(_) => match secret.filter(|it| !it.is_empty()) {
                Some(secret) => {
                    tracing::warn!(
                        "'{}' not found, verifying ID tokens with {}.",
                        dir.join(ID_TOKEN_PUBLIC).display(),
                        ID_TOKEN_SECRET_VAR
                    );
                    VerificationKey::secret(secret)
                }
                None => return Err(ConfigurationError::MissingVerificationKey(dir.to_path_buf())),
            },
        };

        Ok(Security { id_token_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;

    fn empty_dir() -> PathBuf {
        env::temp_dir().join(format!("classtask-security-{}", util::auto_id()))
    }

    #[test]
    fn secret_is_used_without_key_file() {
        let security =
            Security::load_from(empty_dir(), Some("dev-secret".to_string())).expect("secret key");
        assert_eq!(security.id_token_key.algorithm, Algorithm::HS256);
    }

    #[test]
    fn missing_key_material_is_an_error() {
        assert!(matches!(
            Security::load_from(empty_dir(), None),
            Err(ConfigurationError::MissingVerificationKey(_))
        ));
        assert!(matches!(
            Security::load_from(empty_dir(), Some(String::new())),
            Err(ConfigurationError::MissingVerificationKey(_))
        ));
    }

    #[test]
    fn malformed_pem_is_rejected() {
        let dir = empty_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(ID_TOKEN_PUBLIC), "not a key").unwrap();

        assert!(matches!(
            Security::load_from(&dir, None),
            Err(ConfigurationError::InvalidKey(_))
        ));

        fs::remove_dir_all(dir).ok();
    }
}
