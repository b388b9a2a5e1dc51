use crate::error::ConfigurationError;
use crate::util;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub static CONFIG_FILE_NAMES: &[&str] = &["settings.yml", "settings.yaml"];

#[inline]
fn env_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_default()
}

fn default_api_key() -> String {
    env_or_empty("FIREBASE_API_KEY")
}

fn default_auth_domain() -> String {
    env_or_empty("FIREBASE_AUTH_DOMAIN")
}

fn default_project_id() -> String {
    env_or_empty("FIREBASE_PROJECT_ID")
}

fn default_storage_bucket() -> String {
    env_or_empty("FIREBASE_STORAGE_BUCKET")
}

fn default_messaging_sender_id() -> String {
    env_or_empty("FIREBASE_MESSAGING_SENDER_ID")
}

fn default_app_id() -> String {
    env_or_empty("FIREBASE_APP_ID")
}

fn default_mongodb_uri() -> String {
    env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string())
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or("classtask".to_string())
}

/// Client settings of the hosted platform. Values aren't validated here, a
/// missing one only shows up once the platform rejects something (for
/// example an ID token audience that doesn't match `project_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_auth_domain")]
    pub auth_domain: String,
    #[serde(default = "default_project_id")]
    pub project_id: String,
    #[serde(default = "default_storage_bucket")]
    pub storage_bucket: String,
    #[serde(default = "default_messaging_sender_id")]
    pub messaging_sender_id: String,
    #[serde(default = "default_app_id")]
    pub app_id: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig {
            api_key: default_api_key(),
            auth_domain: default_auth_domain(),
            project_id: default_project_id(),
            storage_bucket: default_storage_bucket(),
            messaging_sender_id: default_messaging_sender_id(),
            app_id: default_app_id(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub store: StoreBackend,
    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join(CONFIG_FILE_NAMES[0]),
            platform: PlatformConfig::default(),
            store: StoreBackend::default(),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    pub fn load() -> Result<Config, ConfigurationError> {
        Config::load_from(config_dir())
    }

    pub fn load_from(dir: impl AsRef<Path>) -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(dir.as_ref(), CONFIG_FILE_NAMES, Path::exists)
            .ok_or_else(|| ConfigurationError::NotFound(dir.as_ref().to_path_buf()))?;

        let file = File::open(&config_file)?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.file_path = config_file;

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn platform_values_read_from_yaml() {
        let yaml = r#"
platform:
  api_key: key
  auth_domain: demo.firebaseapp.com
  project_id: demo
  storage_bucket: demo.appspot.com
  messaging_sender_id: "1234"
  app_id: "1:1234:web:abcd"
store: memory
mongodb_uri: mongodb://db:27017
mongodb_db: tests
"#;
        let config: Config = serde_yaml::from_str(yaml).expect("valid config");

        assert_eq!(
            config.platform,
            PlatformConfig {
                api_key: "key".to_string(),
                auth_domain: "demo.firebaseapp.com".to_string(),
                project_id: "demo".to_string(),
                storage_bucket: "demo.appspot.com".to_string(),
                messaging_sender_id: "1234".to_string(),
                app_id: "1:1234:web:abcd".to_string(),
            }
        );
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.mongodb_uri, "mongodb://db:27017");
        assert_eq!(config.mongodb_db, "tests");
    }

    #[test]
    fn store_defaults_to_mongodb() {
        let config: Config = serde_yaml::from_str("mongodb_db: other").expect("valid config");
        assert_eq!(config.store, StoreBackend::Mongodb);
        assert_eq!(config.mongodb_db, "other");
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = env::temp_dir().join(format!("classtask-config-{}", util::auto_id()));

        assert!(matches!(
            Config::load_from(&dir),
            Err(ConfigurationError::NotFound(_))
        ));

        let mut config = Config::default();
        config.file_path = dir.join("settings.yml");
        config.store = StoreBackend::Memory;
        config.platform.project_id = "saved-project".to_string();
        config.save().expect("unable to save config");

        let loaded = Config::load_from(&dir).expect("unable to load saved config");
        assert_eq!(loaded.store, StoreBackend::Memory);
        assert_eq!(loaded.platform.project_id, "saved-project");
        assert_eq!(loaded.file_path(), dir.join("settings.yml").as_path());

        std::fs::remove_dir_all(dir).ok();
    }
}
