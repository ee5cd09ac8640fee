//! Exclusive advisory lock around a zone file
//!
//! The lock is an `flock(2)` on a sidecar `<zone file>.lock` file, so it
//! survives the zone file itself being replaced by rename. It is released
//! when the guard is dropped (or the process exits).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Delay between lock attempts while another holder is active
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(unix)]
type Held = nix::fcntl::Flock<std::fs::File>;

// Advisory locking is only wired up on unix; elsewhere the lock is in name only.
#[cfg(not(unix))]
type Held = std::fs::File;

/// Held exclusive lock on a zone file
///
/// The `flock` is released when the guard is dropped.
pub struct ZoneLock {
    _held: Held,
    path: PathBuf,
}

impl std::fmt::Debug for ZoneLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneLock").field("path", &self.path).finish()
    }
}

impl ZoneLock {
    /// Acquire the lock for `zone_path`, waiting at most `timeout`
    pub async fn acquire(zone_path: &Path, timeout: Duration) -> Result<Self> {
        let path = lock_path(zone_path);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .await
            .map_err(|e| {
                Error::zone_file(
                    zone_path,
                    format!("Failed to open lock file {}: {}", path.display(), e),
                )
            })?
            .into_std()
            .await;

        let deadline = Instant::now() + timeout;
        loop {
            match try_lock_exclusive(file) {
                Ok(held) => {
                    tracing::trace!("Acquired zone lock {}", path.display());
                    return Ok(Self { _held: held, path });
                }
                Err((returned, None)) if Instant::now() < deadline => {
                    tracing::debug!("Zone lock {} is held, waiting", path.display());
                    file = returned;
                    tokio::time::sleep(RETRY_INTERVAL).await;
                }
                Err((_, None)) => {
                    return Err(Error::zone_file(
                        zone_path,
                        format!(
                            "Timed out after {:?} waiting for lock {}",
                            timeout,
                            path.display()
                        ),
                    ));
                }
                Err((_, Some(e))) => {
                    return Err(Error::zone_file(
                        zone_path,
                        format!("Failed to lock {}: {}", path.display(), e),
                    ));
                }
            }
        }
    }

    /// Path of the sidecar lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ZoneLock {
    fn drop(&mut self) {
        tracing::trace!("Releasing zone lock {}", self.path.display());
    }
}

/// `<zone file>.lock` next to the zone file
fn lock_path(zone_path: &Path) -> PathBuf {
    let mut name = zone_path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// One non-blocking attempt
///
/// On failure the file is handed back for the next attempt, with `None` when
/// another holder has the lock and `Some` for any other error.
#[cfg(unix)]
fn try_lock_exclusive(
    file: std::fs::File,
) -> std::result::Result<Held, (std::fs::File, Option<std::io::Error>)> {
    use nix::errno::Errno;
    use nix::fcntl::{Flock, FlockArg};

    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(held) => Ok(held),
        Err((file, errno)) if errno == Errno::EWOULDBLOCK => Err((file, None)),
        Err((file, errno)) => Err((file, Some(std::io::Error::from(errno)))),
    }
}

#[cfg(not(unix))]
fn try_lock_exclusive(
    file: std::fs::File,
) -> std::result::Result<Held, (std::fs::File, Option<std::io::Error>)> {
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            lock_path(Path::new("/etc/bind/db.key-net.ru")),
            PathBuf::from("/etc/bind/db.key-net.ru.lock")
        );
    }

    #[tokio::test]
    async fn lock_is_reacquirable_after_drop() {
        let dir = tempdir().unwrap();
        let zone = dir.path().join("db.example");

        let first = ZoneLock::acquire(&zone, Duration::from_secs(1)).await.unwrap();
        assert!(first.path().exists());
        drop(first);

        let second = ZoneLock::acquire(&zone, Duration::from_secs(1)).await;
        assert!(second.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn second_holder_times_out() {
        let dir = tempdir().unwrap();
        let zone = dir.path().join("db.example");

        let _held = ZoneLock::acquire(&zone, Duration::from_secs(1)).await.unwrap();
        let err = ZoneLock::acquire(&zone, Duration::from_millis(250))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ZoneFile { .. }));
        assert!(err.to_string().contains("Timed out"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn waiter_acquires_once_holder_releases() {
        let dir = tempdir().unwrap();
        let zone = dir.path().join("db.example");

        let held = ZoneLock::acquire(&zone, Duration::from_secs(1)).await.unwrap();
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            drop(held);
        });

        let second = ZoneLock::acquire(&zone, Duration::from_secs(5)).await;
        assert!(second.is_ok());
        release.await.unwrap();
    }
}
