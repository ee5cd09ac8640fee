//! Droplet lifecycle controller
//!
//! The controller enforces "at most one droplet with the configured name"
//! and performs the create/destroy transitions.
//!
//! ## State Model
//!
//! ```text
//!              ensure_running()                 provider-driven
//!   ┌─────┐  (NotFound → create)  ┌─────────┐  ───────────────►  ┌────────┐
//!   │ Off │ ────────────────────► │   new   │                    │ active │
//!   └─────┘ ◄──────────────────── └─────────┘ ◄───────────────── └────────┘
//!              ensure_stopped()      (Found → delete by id)
//! ```
//!
//! `Off` is synthesized when no droplet with the name exists. Every other
//! state is the literal provider status string.
//!
//! ## Idempotency
//!
//! The controller never remembers droplet identity between calls; it
//! re-resolves by name every time. Repeated `ensure_running()` calls never
//! create a second droplet once the first is visible in the list, and
//! repeated `ensure_stopped()` calls never issue a second delete.
//!
//! ## Races
//!
//! Check-then-act runs under an in-process mutex, so concurrent calls on one
//! controller are serialized. Two separate processes can still both observe
//! "not found" and both submit a create; nothing here guards against that.

pub mod status;

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DropletConfig;
use crate::error::{Error, Result};
use crate::traits::{CloudApi, Droplet, DropletSpec};

pub use status::{StatusResponse, StatusSurface};

/// Result of resolving a droplet by name
///
/// Absence and failure are distinct: a failed lookup must never be acted on
/// as if the droplet did not exist.
#[derive(Debug)]
pub enum Lookup {
    /// A droplet with the name exists
    Found(Droplet),
    /// The list succeeded and contained no droplet with the name
    NotFound,
    /// The list call failed; the state is unknown
    Failed(Error),
}

impl Lookup {
    /// Convert into `Result<Option<Droplet>>`, turning `Failed` into an error
    pub fn into_result(self) -> Result<Option<Droplet>> {
        match self {
            Lookup::Found(droplet) => Ok(Some(droplet)),
            Lookup::NotFound => Ok(None),
            Lookup::Failed(e) => Err(e),
        }
    }
}

/// Logical droplet state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropletState {
    /// No droplet with the configured name exists
    Off,
    /// Literal provider status ("new", "active", ...)
    Reported(String),
}

impl DropletState {
    /// Status string as shown to callers
    pub fn as_str(&self) -> &str {
        match self {
            DropletState::Off => "off",
            DropletState::Reported(status) => status,
        }
    }
}

impl std::fmt::Display for DropletState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A droplet already existed; nothing was sent
    AlreadyRunning {
        /// Id of the existing droplet
        id: u64,
        /// Its provider status
        status: String,
    },
    /// The provider accepted the create request
    CreateAccepted,
    /// No droplet existed; nothing was sent
    AlreadyStopped,
    /// The provider accepted the delete request
    DeleteAccepted {
        /// Id of the deleted droplet
        id: u64,
    },
}

/// Resolve a droplet by exact name
///
/// Returns the first match. Names are assumed unique; a duplicate is only
/// logged.
pub async fn find_by_name(api: &dyn CloudApi, name: &str) -> Lookup {
    let droplets = match api.list_droplets().await {
        Ok(droplets) => droplets,
        Err(e) => {
            warn!(
                "Droplet lookup for '{}' via {} failed: {}",
                name,
                api.provider_name(),
                e
            );
            return Lookup::Failed(e);
        }
    };

    let mut matches = droplets.into_iter().filter(|d| d.name == name);
    match matches.next() {
        Some(droplet) => {
            let extra = matches.count();
            if extra > 0 {
                warn!(
                    "Found {} additional droplet(s) named '{}'; using id {}",
                    extra, name, droplet.id
                );
            }
            debug!(
                "Droplet '{}' found: id={} status={}",
                name, droplet.id, droplet.status
            );
            Lookup::Found(droplet)
        }
        None => {
            debug!("No droplet named '{}'", name);
            Lookup::NotFound
        }
    }
}

/// Droplet lifecycle controller
///
/// ## Lifecycle
///
/// 1. Create with [`DropletController::new()`] from the validated configuration
/// 2. Call [`ensure_running()`](DropletController::ensure_running),
///    [`ensure_stopped()`](DropletController::ensure_stopped) or
///    [`current_status()`](DropletController::current_status) as often as needed
pub struct DropletController {
    /// Cloud API client
    api: Arc<dyn CloudApi>,

    /// Creation parameters (name is the uniqueness key)
    droplet: DropletConfig,

    /// Serializes check-then-act sequences
    transition_lock: Mutex<()>,
}

impl DropletController {
    /// Create a new controller
    pub fn new(api: Arc<dyn CloudApi>, droplet: DropletConfig) -> Self {
        Self {
            api,
            droplet,
            transition_lock: Mutex::new(()),
        }
    }

    /// Name of the managed droplet
    pub fn droplet_name(&self) -> &str {
        &self.droplet.name
    }

    /// Resolve the managed droplet
    pub async fn find(&self) -> Lookup {
        find_by_name(self.api.as_ref(), &self.droplet.name).await
    }

    /// Make sure a droplet with the configured name exists
    ///
    /// - Found → no request is sent, `Transition::AlreadyRunning`
    /// - Not found → create request, `Transition::CreateAccepted` on HTTP 202
    /// - Lookup failed → error, no create is sent
    ///
    /// Success means the provider accepted the request, not that the droplet
    /// is running yet.
    pub async fn ensure_running(&self) -> Result<Transition> {
        let _guard = self.transition_lock.lock().await;

        match self.find().await {
            Lookup::Found(droplet) => {
                info!(
                    "Droplet '{}' already exists (id={}, status={}), not creating another",
                    droplet.name, droplet.id, droplet.status
                );
                Ok(Transition::AlreadyRunning {
                    id: droplet.id,
                    status: droplet.status,
                })
            }
            Lookup::NotFound => {
                let spec = DropletSpec::from(&self.droplet);
                info!(
                    "Requesting droplet creation: name={} region={} size={} image={}",
                    spec.name, spec.region, spec.size, spec.image
                );
                self.api.create_droplet(&spec).await?;
                info!("Create request for '{}' accepted", spec.name);
                Ok(Transition::CreateAccepted)
            }
            Lookup::Failed(e) => Err(e),
        }
    }

    /// Make sure no droplet with the configured name exists
    ///
    /// - Found → delete by id, `Transition::DeleteAccepted` on HTTP 204
    /// - Not found → no request is sent, `Transition::AlreadyStopped`
    /// - Lookup failed → error, no delete is sent
    pub async fn ensure_stopped(&self) -> Result<Transition> {
        let _guard = self.transition_lock.lock().await;

        match self.find().await {
            Lookup::Found(droplet) => {
                info!("Requesting deletion of droplet '{}' (id={})", droplet.name, droplet.id);
                self.api.delete_droplet(droplet.id).await?;
                info!("Delete request for droplet id={} accepted", droplet.id);
                Ok(Transition::DeleteAccepted { id: droplet.id })
            }
            Lookup::NotFound => {
                info!("Droplet '{}' does not exist, nothing to stop", self.droplet.name);
                Ok(Transition::AlreadyStopped)
            }
            Lookup::Failed(e) => Err(e),
        }
    }

    /// Current logical state of the managed droplet
    ///
    /// Lookup failures are returned as errors, not as `Off`.
    pub async fn current_status(&self) -> Result<DropletState> {
        Ok(match self.find().await.into_result()? {
            Some(droplet) => DropletState::Reported(droplet.status),
            None => DropletState::Off,
        })
    }
}
