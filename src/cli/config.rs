//! Gateway configuration file
//!
//! ```json
//! {
//!   "users": [{"name": "user", "accountProp": "email", "passwordProp": "password"}],
//!   "entities": ["post", "comment"],
//!   "publishVersionDiffs": true,
//!   "sessionTtlSecs": 2592000,
//!   "logFilter": "info",
//!   "seed": {"post": [{"id": "p1", "title": "hello"}]}
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::standards::DEFAULT_SESSION_TTL_SECS;

/// A user entity and the properties holding its credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub name: String,
    #[serde(default = "default_account_prop")]
    pub account_prop: String,
    #[serde(default = "default_password_prop")]
    pub password_prop: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default)]
    pub users: Vec<UserConfig>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default = "default_publish_version_diffs")]
    pub publish_version_diffs: bool,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Initial entities per entity name, inserted through the dispatcher
    #[serde(default)]
    pub seed: HashMap<String, Vec<Value>>,
}

fn default_account_prop() -> String {
    "email".to_string()
}

fn default_password_prop() -> String {
    "password".to_string()
}

fn default_publish_version_diffs() -> bool {
    true
}

fn default_session_ttl_secs() -> i64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            entities: Vec::new(),
            publish_version_diffs: default_publish_version_diffs(),
            session_ttl_secs: default_session_ttl_secs(),
            log_filter: default_log_filter(),
            seed: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config {}: {}", path.display(), e)))?;

        let config: GatewayConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Names must be non-empty and unique across users and entities
    pub fn validate(&self) -> CliResult<()> {
        let mut seen = HashSet::new();

        let user_names = self.users.iter().map(|u| u.name.as_str());
        for name in user_names.chain(self.entities.iter().map(String::as_str)) {
            if name.is_empty() {
                return Err(CliError::config_error("Entity names must not be empty"));
            }
            if !seen.insert(name) {
                return Err(CliError::config_error(format!("Duplicate entity name \"{}\"", name)));
            }
        }

        for user in &self.users {
            if user.account_prop.is_empty() || user.password_prop.is_empty() {
                return Err(CliError::config_error(format!(
                    "User entity \"{}\" needs non-empty accountProp and passwordProp",
                    user.name
                )));
            }
        }

        if self.session_ttl_secs <= 0 {
            return Err(CliError::config_error("sessionTtlSecs must be positive"));
        }

        if let Some(unknown) = self.seed.keys().find(|name| !seen.contains(name.as_str())) {
            return Err(CliError::config_error(format!(
                "Seed refers to unknown entity name \"{}\"",
                unknown
            )));
        }

        Ok(())
    }
}
