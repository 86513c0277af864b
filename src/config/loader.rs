use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::AppConfig;
use crate::error::{DistribError, ErrorCode, Result};
use crate::storage::BackendType;

pub const CONFIG_PATH_VAR: &str = "DISTRIB_CONFIG";
pub const ROUTER_VAR: &str = "AUTOBAHN_ROUTER";
pub const REALM_VAR: &str = "AUTOBAHN_REALM";
pub const STORAGE_TYPE_VAR: &str = "DISTRIB_STORAGE_TYPE";
pub const DATABASE_URL_VAR: &str = "DISTRIB_DATABASE_URL";
pub const MEMORY_SEED_VAR: &str = "DISTRIB_MEMORY_SEED";
pub const LOG_FILE_VAR: &str = "DISTRIB_LOG_FILE";

/// Source of environment variables and files for config loading
pub trait ConfigEnv {
    fn var(&self, key: &str) -> Option<String>;

    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Config file used when none is named explicitly
    fn default_config_path(&self) -> Option<PathBuf>;
}

/// The process environment and file system
pub struct RealEnv;

impl ConfigEnv for RealEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn default_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("distrib-exec").join("config.toml"))
    }
}

/// In-memory environment for tests
#[derive(Debug, Default, Clone)]
pub struct MockEnv {
    vars: HashMap<String, String>,
    files: HashMap<PathBuf, String>,
    default_path: Option<PathBuf>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.files.insert(path.into(), content.to_string());
        self
    }

    pub fn with_default_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_path = Some(path.into());
        self
    }
}

impl ConfigEnv for MockEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn default_config_path(&self) -> Option<PathBuf> {
        self.default_path.clone()
    }
}

/// Load configuration from the real environment
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    load_config_with(&RealEnv, explicit)
}

/// Load configuration through `env`.
///
/// An explicitly named file (argument or `DISTRIB_CONFIG`) must exist; the
/// default location is optional.
pub fn load_config_with<E: ConfigEnv>(env: &E, explicit: Option<&Path>) -> Result<AppConfig> {
    let named = explicit
        .map(Path::to_path_buf)
        .or_else(|| env.var(CONFIG_PATH_VAR).map(PathBuf::from));

    let mut config = match named {
        Some(path) => {
            let content = env.read_file(&path).map_err(|e| {
                DistribError::config_with_source(
                    ErrorCode::CONFIG_NOT_FOUND,
                    format!("cannot read config file {}", path.display()),
                    e,
                )
            })?;
            parse(&path, &content)?
        }
        None => match env.default_config_path() {
            Some(path) => match env.read_file(&path) {
                Ok(content) => parse(&path, &content)?,
                Err(e) if e.kind() == io::ErrorKind::NotFound => AppConfig::default(),
                Err(e) => {
                    return Err(DistribError::config_with_source(
                        ErrorCode::CONFIG_NOT_FOUND,
                        format!("cannot read config file {}", path.display()),
                        e,
                    ))
                }
            },
            None => AppConfig::default(),
        },
    };

    apply_env(env, &mut config)?;
    Ok(config)
}

fn parse(path: &Path, content: &str) -> Result<AppConfig> {
    debug!("Loading configuration from {}", path.display());
    toml::from_str(content).map_err(|e| {
        DistribError::config_with_source(
            ErrorCode::CONFIG_PARSE_ERROR,
            format!("invalid config file {}", path.display()),
            e,
        )
    })
}

fn apply_env<E: ConfigEnv>(env: &E, config: &mut AppConfig) -> Result<()> {
    if let Some(router) = env.var(ROUTER_VAR) {
        config.router.url = router;
    }
    if let Some(realm) = env.var(REALM_VAR) {
        config.router.realm = realm;
    }
    if let Some(kind) = env.var(STORAGE_TYPE_VAR) {
        config.storage.backend = BackendType::parse(&kind).ok_or_else(|| {
            DistribError::config(format!("{STORAGE_TYPE_VAR}: unknown storage type '{kind}'"))
        })?;
    }
    if let Some(url) = env.var(DATABASE_URL_VAR) {
        config.storage.mysql.url = Some(url);
    }
    if let Some(seed) = env.var(MEMORY_SEED_VAR) {
        config.storage.memory.persistence_path = Some(PathBuf::from(seed));
        config.storage.memory.persist_to_disk = true;
    }
    if let Some(log_file) = env.var(LOG_FILE_VAR) {
        config.log_file = Some(PathBuf::from(log_file));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_without_any_source() {
        let config = load_config_with(&MockEnv::new(), None).unwrap();
        assert_eq!(config.router.url, "ws://localhost:8080/ws");
        assert_eq!(config.router.realm, "realm1");
        assert_eq!(config.storage.backend, BackendType::MySql);
        assert_eq!(config.request.dist_suffix, ".SP.");
    }

    #[test]
    fn test_missing_default_file_is_ignored() {
        let env = MockEnv::new().with_default_path("/home/ops/.config/distrib-exec/config.toml");
        assert!(load_config_with(&env, None).is_ok());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = load_config_with(&MockEnv::new(), Some(Path::new("/etc/distrib.toml")))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
    }

    #[test]
    fn test_file_then_env_precedence() {
        let env = MockEnv::new()
            .with_file(
                "/etc/distrib.toml",
                r#"
                log_file = "/var/log/distrib_exec.log"

                [router]
                url = "ws://router.internal:8080/ws"
                realm = "cibeez"
                timeout = "90s"

                [request]
                bee_id = 9
                dist_suffix = ".TA."
                "#,
            )
            .with_env(CONFIG_PATH_VAR, "/etc/distrib.toml")
            .with_env(REALM_VAR, "staging");

        let config = load_config_with(&env, None).unwrap();
        assert_eq!(config.router.url, "ws://router.internal:8080/ws");
        assert_eq!(config.router.realm, "staging");
        assert_eq!(config.router.timeout, Duration::from_secs(90));
        assert_eq!(config.request.bee_id, 9);
        assert_eq!(config.request.dist_suffix, ".TA.");
        assert!(config.request.notify_customers);
        assert_eq!(
            config.log_file.as_deref(),
            Some(Path::new("/var/log/distrib_exec.log"))
        );
    }

    #[test]
    fn test_env_selects_memory_store() {
        let env = MockEnv::new()
            .with_env(STORAGE_TYPE_VAR, "memory")
            .with_env(MEMORY_SEED_VAR, "/tmp/store.json");

        let config = load_config_with(&env, None).unwrap();
        assert_eq!(config.storage.backend, BackendType::Memory);
        assert_eq!(
            config.storage.memory.persistence_path.as_deref(),
            Some(Path::new("/tmp/store.json"))
        );
        assert!(config.storage.memory.persist_to_disk);
    }

    #[test]
    fn test_unknown_storage_type_is_rejected() {
        let env = MockEnv::new().with_env(STORAGE_TYPE_VAR, "redis");
        assert!(load_config_with(&env, None).is_err());
    }

    #[test]
    fn test_invalid_toml_reports_parse_error() {
        let env = MockEnv::new().with_file("/etc/distrib.toml", "[router\nurl = ");
        let err = load_config_with(&env, Some(Path::new("/etc/distrib.toml"))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
    }
}
