//! Zone reconciler
//!
//! Keeps the managed A record and the SOA serial of a BIND zone file in step
//! with the droplet's live address.
//!
//! ## Flow
//!
//! 1. Resolve the droplet by name, take its public IPv4
//! 2. Lock the zone file, parse it into a [`ZoneDocument`]
//! 3. Advance the serial in memory, point the A record at the address
//! 4. If the A record did not change: stop, nothing is written
//! 5. Otherwise write the file atomically and reload the DNS service
//!
//! The serial never changes on its own. Repeated runs with an unchanged
//! address leave the file and the DNS service untouched.
//!
//! ## Failure
//!
//! Any I/O or reload failure ends the run with an error. The file is either
//! fully replaced or left as it was; there is no retry.

pub mod document;
pub mod lock;
pub mod serial;

use chrono::{NaiveDate, Utc};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::ZoneConfig;
use crate::error::{Error, Result};
use crate::lifecycle::find_by_name;
use crate::traits::{CloudApi, DnsReloader};

pub use document::{AddressChange, ZoneDocument, ZoneLine};
pub use lock::ZoneLock;
pub use serial::ZoneSerial;

/// How long a run waits for another holder of the zone lock
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// File rewritten and DNS service reloaded
    Updated {
        /// Address the record pointed at before
        previous: String,
        /// Address now in the file
        current: Ipv4Addr,
        /// New serial, if the file has a serial line
        serial: Option<ZoneSerial>,
    },
    /// Record already pointed at the address; nothing written
    Unchanged {
        address: Ipv4Addr,
    },
    /// The zone file has no A record for the hostname; nothing written
    RecordMissing,
    /// The droplet is absent or has no IPv4 address; nothing written
    NoAddress,
}

/// Zone reconciler
pub struct ZoneReconciler {
    /// Cloud API client
    api: Arc<dyn CloudApi>,

    /// Name of the droplet whose address is published
    droplet_name: String,

    /// Zone file path and record label
    zone: ZoneConfig,

    /// DNS service reload action
    reloader: Arc<dyn DnsReloader>,

    /// Maximum wait for the zone lock
    lock_timeout: Duration,
}

impl ZoneReconciler {
    /// Create a new reconciler
    pub fn new(
        api: Arc<dyn CloudApi>,
        droplet_name: impl Into<String>,
        zone: ZoneConfig,
        reloader: Arc<dyn DnsReloader>,
    ) -> Self {
        Self {
            api,
            droplet_name: droplet_name.into(),
            zone,
            reloader,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Override how long to wait for the zone lock
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Path of the managed zone file
    pub fn zone_file(&self) -> &Path {
        &self.zone.file
    }

    /// Public IPv4 of the managed droplet
    ///
    /// `Ok(None)` if the droplet does not exist or has no IPv4 address yet.
    /// A failed lookup is an error.
    pub async fn current_address(&self) -> Result<Option<Ipv4Addr>> {
        let droplet = find_by_name(self.api.as_ref(), &self.droplet_name)
            .await
            .into_result()?;

        Ok(match droplet {
            Some(droplet) => {
                let address = droplet.public_ipv4();
                if address.is_none() {
                    debug!(
                        "Droplet '{}' (status={}) has no IPv4 address yet",
                        droplet.name, droplet.status
                    );
                }
                address
            }
            None => None,
        })
    }

    /// Resolve the droplet address and reconcile the zone file with it
    ///
    /// This is the entry point for periodic runs.
    pub async fn sync(&self) -> Result<ReconcileOutcome> {
        match self.current_address().await? {
            Some(address) => self.reconcile(address).await,
            None => {
                info!(
                    "No address for droplet '{}', zone file left untouched",
                    self.droplet_name
                );
                Ok(ReconcileOutcome::NoAddress)
            }
        }
    }

    /// Reconcile the zone file with `address`, dating the serial today (UTC)
    pub async fn reconcile(&self, address: Ipv4Addr) -> Result<ReconcileOutcome> {
        self.reconcile_on(address, Utc::now().date_naive()).await
    }

    /// Reconcile the zone file with `address`, dating the serial `today`
    pub async fn reconcile_on(
        &self,
        address: Ipv4Addr,
        today: NaiveDate,
    ) -> Result<ReconcileOutcome> {
        // Lock and write the file the path resolves to, so a symlinked zone
        // path keeps pointing at the updated file
        let path = &fs::canonicalize(&self.zone.file)
            .await
            .map_err(|e| Error::zone_file(&self.zone.file, format!("Failed to resolve: {e}")))?;
        let _lock = ZoneLock::acquire(path, self.lock_timeout).await?;

        let text = fs::read_to_string(path)
            .await
            .map_err(|e| Error::zone_file(path, format!("Failed to read: {e}")))?;

        let mut document = ZoneDocument::parse(&text, &self.zone.record_name)?;
        let serial = document.bump_serial(today);

        let previous = match document.set_address(address) {
            AddressChange::Unchanged => {
                info!(
                    "Record '{}' already points at {}, no update needed",
                    self.zone.record_name, address
                );
                return Ok(ReconcileOutcome::Unchanged { address });
            }
            AddressChange::Missing => {
                warn!(
                    "Zone file {} has no A record for '{}', nothing to update",
                    path.display(),
                    self.zone.record_name
                );
                return Ok(ReconcileOutcome::RecordMissing);
            }
            AddressChange::Changed { previous } => previous,
        };

        match serial {
            Some((old, new)) => info!("Zone serial {} -> {}", old, new),
            None => warn!(
                "Zone file {} has no serial line; secondaries will not notice the change",
                path.display()
            ),
        }

        write_atomic(path, &document.render()).await?;
        info!(
            "Zone file {} updated: {} {} -> {}",
            path.display(),
            self.zone.record_name,
            previous,
            address
        );

        self.reloader.reload().await?;
        info!("DNS service reloaded ({})", self.reloader.describe());

        Ok(ReconcileOutcome::Updated {
            previous,
            current: address,
            serial: serial.map(|(_, new)| new),
        })
    }
}

/// Replace `path` with `content` via a temporary file and rename
///
/// Permissions of the existing file are carried over.
async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = temp_path(path);

    {
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            Error::zone_file(
                path,
                format!("Failed to create temp file {}: {}", temp_path.display(), e),
            )
        })?;

        file.write_all(content.as_bytes()).await.map_err(|e| {
            Error::zone_file(
                path,
                format!("Failed to write temp file {}: {}", temp_path.display(), e),
            )
        })?;

        file.sync_all().await.map_err(|e| {
            Error::zone_file(
                path,
                format!("Failed to sync temp file {}: {}", temp_path.display(), e),
            )
        })?;
    }

    if let Err(e) = copy_ownership(path, &temp_path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(Error::zone_file(
            path,
            format!("Failed to rename {}: {}", temp_path.display(), e),
        ));
    }

    debug!("Zone file written: {}", path.display());
    Ok(())
}

/// Give `temp_path` the owner, group and mode of `path`
///
/// The DNS server usually reads the zone through its group, so a replacement
/// owned by the writing user would be unreadable to it.
async fn copy_ownership(path: &Path, temp_path: &Path) -> Result<()> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| Error::zone_file(path, format!("Failed to read metadata: {}", e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        // chown before chmod: changing the owner can clear setuid/setgid bits
        std::os::unix::fs::chown(temp_path, Some(metadata.uid()), Some(metadata.gid())).map_err(
            |e| {
                Error::zone_file(
                    path,
                    format!(
                        "Failed to set owner {}:{} on {}: {}",
                        metadata.uid(),
                        metadata.gid(),
                        temp_path.display(),
                        e
                    ),
                )
            },
        )?;
    }

    fs::set_permissions(temp_path, metadata.permissions())
        .await
        .map_err(|e| {
            Error::zone_file(
                path,
                format!("Failed to set permissions on {}: {}", temp_path.display(), e),
            )
        })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
