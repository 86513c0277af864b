//! Application configuration
//!
//! Values are layered, lowest priority first:
//!
//! 1. Hardcoded defaults
//! 2. TOML config file (`--config`, `DISTRIB_CONFIG`, or
//!    `<config dir>/distrib-exec/config.toml`)
//! 3. Environment variables
//! 4. Command line flags (applied by [`crate::cli`])
//!
//! # Example file
//!
//! ```toml
//! log_file = "/var/log/distrib_exec.log"
//!
//! [router]
//! url = "ws://localhost:8080/ws"
//! realm = "realm1"
//! timeout = "10m"
//!
//! [storage]
//! backend = "mysql"
//! [storage.mysql]
//! url = "mysql://dss@127.0.0.1:3306/dss"
//!
//! [request]
//! bee_id = 2
//! dist_suffix = ".SP."
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{DistribError, ErrorCode, Result};
use crate::rpc::RoutingRequest;
use crate::storage::StorageConfig;

pub use loader::{load_config, load_config_with, ConfigEnv, MockEnv, RealEnv};

/// Complete configuration of one invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Payload defaults for the routing call
    #[serde(default)]
    pub request: RoutingRequest,

    /// Append log events to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Where and how the routing procedure is invoked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_router_url")]
    pub url: String,

    #[serde(default = "default_realm")]
    pub realm: String,

    #[serde(default = "default_procedure")]
    pub procedure: String,

    /// Upper bound on the whole routing call
    #[serde(with = "humantime_serde", default = "default_rpc_timeout")]
    pub timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            url: default_router_url(),
            realm: default_realm(),
            procedure: default_procedure(),
            timeout: default_rpc_timeout(),
        }
    }
}

fn default_router_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_realm() -> String {
    "realm1".to_string()
}

fn default_procedure() -> String {
    "cbz.distro.setup".to_string()
}

fn default_rpc_timeout() -> Duration {
    Duration::from_secs(600)
}

impl AppConfig {
    /// Check values the layers cannot check on their own
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.router.url).map_err(|e| {
            DistribError::config_with_source(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("invalid router url '{}'", self.router.url),
                e,
            )
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(DistribError::config(format!(
                "router url must use ws:// or wss://, got '{}'",
                self.router.url
            )));
        }
        if self.router.realm.trim().is_empty() {
            return Err(DistribError::config("router realm is empty"));
        }
        if self.request.dist_suffix.trim().is_empty() {
            return Err(DistribError::config("distributor suffix is empty"));
        }
        Ok(())
    }
}
