//! Configuration types for the droplet manager
//!
//! Configuration is read from environment variables once at startup and
//! passed by reference to every component afterwards. A missing API token
//! fails here, never on an individual request.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// DigitalOcean API v2 base URL
pub const DEFAULT_API_BASE: &str = "https://api.digitalocean.com/v2";

const ENV_TOKEN: &str = "DO_API_TOKEN";
const ENV_PREFIX: &str = "AI_MANAGER_";

/// Main droplet manager configuration
#[derive(Clone)]
pub struct ManagerConfig {
    /// Cloud API settings
    pub api: ApiConfig,

    /// Droplet to manage
    pub droplet: DropletConfig,

    /// Zone file reconciliation settings
    pub zone: ZoneConfig,

    /// Live or dry-run
    pub mode: RunMode,

    /// Log level for the daemon
    pub log_level: String,
}

/// Cloud API connection settings
#[derive(Clone)]
pub struct ApiConfig {
    /// Bearer token
    /// ⚠️ NEVER log this value
    pub token: String,

    /// API base URL (without trailing slash)
    pub base_url: String,

    /// Timeout for every outbound request (seconds)
    pub http_timeout_secs: u64,
}

/// Fixed creation parameters for the managed droplet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropletConfig {
    /// Droplet name, the uniqueness key
    pub name: String,
    /// Region slug (e.g. "tor1")
    pub region: String,
    /// Size slug
    pub size: String,
    /// Image slug or snapshot id
    pub image: String,
    /// SSH key ids or fingerprints
    pub ssh_keys: Vec<String>,
    /// Tags applied at creation
    pub tags: Vec<String>,
}

/// Zone file settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConfig {
    /// Path to the BIND zone file
    pub file: PathBuf,
    /// Hostname label of the managed A record (e.g. "ai")
    pub record_name: String,
    /// Command (argv) that reloads the DNS service
    pub reload_command: Vec<String>,
}

/// Whether mutating API calls are actually sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Send create/delete requests
    #[default]
    Live,
    /// Log create/delete requests without sending them
    DryRun,
}

impl ManagerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset. The result is validated before it
    /// is returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let token = lookup(ENV_TOKEN)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "{ENV_TOKEN} is required. Set it via: export {ENV_TOKEN}=your_token"
                ))
            })?;

        let http_timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                Error::config(format!(
                    "{ENV_PREFIX}HTTP_TIMEOUT_SECS must be a number of seconds. Got: {raw}"
                ))
            })?,
            None => default_http_timeout_secs(),
        };

        let mode = match get("MODE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("live") => RunMode::Live,
            Some("dry-run") => RunMode::DryRun,
            Some(other) => {
                return Err(Error::config(format!(
                    "{ENV_PREFIX}MODE '{other}' is not valid. Valid modes: live, dry-run"
                )));
            }
        };

        let config = Self {
            api: ApiConfig {
                token,
                base_url: get("API_BASE")
                    .map(|v| v.trim_end_matches('/').to_string())
                    .unwrap_or_else(default_api_base),
                http_timeout_secs,
            },
            droplet: DropletConfig {
                name: get("DROPLET_NAME").unwrap_or_else(|| "ai-instance".to_string()),
                region: get("REGION").unwrap_or_else(|| "tor1".to_string()),
                size: get("SIZE").unwrap_or_else(|| "gpu-6000adax1-48gb".to_string()),
                image: get("IMAGE").unwrap_or_else(|| "192399134".to_string()),
                ssh_keys: split_list(get("SSH_KEYS").as_deref().unwrap_or("48954231")),
                tags: split_list(get("TAGS").as_deref().unwrap_or("gpu")),
            },
            zone: ZoneConfig {
                file: get("ZONE_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/etc/bind/db.key-net.ru")),
                record_name: get("ZONE_NAME").unwrap_or_else(|| "ai".to_string()),
                reload_command: get("RELOAD_COMMAND")
                    .map(|v| v.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_else(|| {
                        vec![
                            "systemctl".to_string(),
                            "restart".to_string(),
                            "bind9".to_string(),
                        ]
                    }),
            },
            mode,
            log_level: get("LOG_LEVEL").unwrap_or_else(default_log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.token.is_empty() {
            return Err(Error::config(format!("{ENV_TOKEN} cannot be empty")));
        }

        if !self.api.base_url.starts_with("https://") && !self.api.base_url.starts_with("http://")
        {
            return Err(Error::config(format!(
                "{ENV_PREFIX}API_BASE must use HTTP or HTTPS scheme. Got: {}",
                self.api.base_url
            )));
        }

        if !(1..=300).contains(&self.api.http_timeout_secs) {
            return Err(Error::config(format!(
                "{ENV_PREFIX}HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.api.http_timeout_secs
            )));
        }

        self.droplet.validate()?;
        self.zone.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(Error::config(format!(
                "{ENV_PREFIX}LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ))),
        }
    }
}

// Hides the API token
impl std::fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("api", &self.api)
            .field("droplet", &self.droplet)
            .field("zone", &self.zone)
            .field("mode", &self.mode)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

impl DropletConfig {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("DROPLET_NAME", &self.name),
            ("REGION", &self.region),
            ("SIZE", &self.size),
            ("IMAGE", &self.image),
        ] {
            if value.is_empty() {
                return Err(Error::config(format!("{ENV_PREFIX}{field} cannot be empty")));
            }
        }

        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
        {
            return Err(Error::config(format!(
                "Droplet name contains invalid characters: '{}'",
                self.name
            )));
        }

        Ok(())
    }
}

impl ZoneConfig {
    fn validate(&self) -> Result<()> {
        if self.file.as_os_str().is_empty() {
            return Err(Error::config(format!("{ENV_PREFIX}ZONE_FILE cannot be empty")));
        }

        let label = &self.record_name;
        if label.len() > 63 {
            return Err(Error::config(format!(
                "Zone record label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Zone record label contains invalid characters. Label: '{label}'. \
                Valid: alphanumeric and hyphen only."
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Zone record label cannot start or end with hyphen. Label: '{label}'"
            )));
        }

        if self.reload_command.is_empty() {
            return Err(Error::config(format!(
                "{ENV_PREFIX}RELOAD_COMMAND cannot be empty"
            )));
        }

        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}
