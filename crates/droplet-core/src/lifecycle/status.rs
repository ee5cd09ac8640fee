//! Status surface consumed by a presentation layer
//!
//! Wire contract: `{"status": "<provider status>"}` or `{"status": "off"}`.
//! A failed lookup still reports `"off"` for compatibility, but also carries
//! an `error` field so callers can tell it apart from a real absence.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::{DropletController, DropletState};

/// Body of the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// "off" or the provider status string
    pub status: String,

    /// Set when the droplet state could not be determined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    /// Whether the reported status is "off"
    pub fn is_off(&self) -> bool {
        self.status == DropletState::Off.as_str()
    }
}

/// Boolean/string facade over [`DropletController`]
///
/// Failures are logged with context and degrade to `false` / `"off"`.
#[derive(Clone)]
pub struct StatusSurface {
    controller: Arc<DropletController>,
}

impl StatusSurface {
    pub fn new(controller: Arc<DropletController>) -> Self {
        Self { controller }
    }

    pub async fn get_status(&self) -> StatusResponse {
        match self.controller.current_status().await {
            Ok(state) => StatusResponse {
                status: state.as_str().to_string(),
                error: None,
            },
            Err(e) => {
                error!(
                    "Status lookup for droplet '{}' failed: {}",
                    self.controller.droplet_name(),
                    e
                );
                StatusResponse {
                    status: DropletState::Off.as_str().to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn start(&self) -> bool {
        match self.controller.ensure_running().await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    "Failed to start droplet '{}': {}",
                    self.controller.droplet_name(),
                    e
                );
                false
            }
        }
    }

    pub async fn stop(&self) -> bool {
        match self.controller.ensure_stopped().await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    "Failed to stop droplet '{}': {}",
                    self.controller.droplet_name(),
                    e
                );
                false
            }
        }
    }
}
