//! Data access and session handling for the classroom task application.
//!
//! Documents live in a [DocumentStore](data::DocumentStore) addressed by
//! collection and id, signed in users come from an
//! [IdentityProvider](auth::IdentityProvider). [create] wires both together
//! from configuration.

use std::sync::Arc;

use mongodb::Client;
use tokio::task::JoinHandle;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::auth::{AuthBridge, IdTokenProvider, IdTokenVerifier, Session};
use crate::config::{Config, StoreBackend};
use crate::data::{DataClient, MemoryStore, MongoStore};
use crate::error::{BackendError, ConfigurationError};
use crate::security::Security;

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod role;
pub mod security;
pub mod util;

/// Initialized backend.
pub struct Backend {
    pub config: Config,
    pub data: DataClient,
    pub auth: Arc<AuthBridge>,
    listener: JoinHandle<()>,
}

impl Backend {
    pub fn session(&self) -> &Session {
        self.auth.session()
    }

    /// Stops following provider session changes.
    pub fn shutdown(self) {
        self.listener.abort();
    }
}

pub async fn create(log_level: Option<Level>) -> Result<Backend, BackendError> {
    if let Some(l) = log_level {
        let subscriber = FmtSubscriber::builder().with_max_level(l).finish();

        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Unable to set global logger: {}", err);
        };
    }

    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let c = match Config::load() {
        Ok(c) => {
            tracing::info!("Configuration loaded.");
            c
        }
        Err(ConfigurationError::NotFound(_)) => {
            let c = Config::default();
            if c.save().is_err() {
                tracing::warn!("Unable to save generated configuration.");
            }
            c
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            return Err(other.into());
        }
    };
    tracing::debug!(
        project_id = %c.platform.project_id,
        auth_domain = %c.platform.auth_domain,
        "Platform settings"
    );

    tracing::info!("Initializing security information...");
    let security = Security::load()?;

    let data = match c.store {
        StoreBackend::Mongodb => {
            tracing::info!("Connecting to MongoDB: {}", c.mongodb_uri);
            let client = Client::with_uri_str(c.mongodb_uri.as_str()).await?;

            tracing::info!("Using MongoDB database: {}", c.mongodb_db);
            let db = client.database(c.mongodb_db.as_str());

            if let Err(e) = db.list_collection_names(None).await {
                tracing::error!("Unable to connect to MongoDB.");
                return Err(e.into());
            }

            DataClient::new(Arc::new(MongoStore::new(db)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store, nothing will be persisted.");
            DataClient::new(Arc::new(MemoryStore::new()))
        }
    };

    let verifier = IdTokenVerifier::new(&c.platform.project_id, security.id_token_key);
    let provider = Arc::new(IdTokenProvider::new(verifier));

    tracing::info!("Starting session listener...");
    let auth = Arc::new(AuthBridge::new(provider, data.clone(), Session::new()));
    let listener = auth.listen();

    Ok(Backend {
        config: c,
        data,
        auth,
        listener,
    })
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use super::*;
    use crate::auth::token::testing;
    use crate::data::user::db::UserDbExt;
    use crate::role::Role;

    #[tokio::test]
    async fn memory_backend_starts_from_configuration() {
        let root = env::temp_dir().join(format!("classtask-backend-{}", util::auto_id()));
        let config_dir = root.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("settings.yml"),
            format!("store: memory\nplatform:\n  project_id: {}\n", testing::PROJECT_ID),
        )
        .unwrap();

        env::set_var("CONFIG_DIR", &config_dir);
        env::set_var("SECURITY_DIR", root.join("security"));
        env::set_var(
            "ID_TOKEN_SECRET",
            String::from_utf8(testing::SECRET.to_vec()).unwrap(),
        );

        let backend = create(None).await.expect("backend should start");
        assert_eq!(backend.config.platform.project_id, testing::PROJECT_ID);

        backend
            .data
            .register_user("uid-1", Role::named("teacher"))
            .await
            .unwrap();
        let user = backend
            .auth
            .login_or_register(&testing::token("uid-1"), None)
            .await
            .unwrap();

        assert_eq!(user.role, Role::named("teacher"));
        assert_eq!(backend.session().current(), Some(user));

        backend.shutdown();
        fs::remove_dir_all(root).ok();
    }
}
