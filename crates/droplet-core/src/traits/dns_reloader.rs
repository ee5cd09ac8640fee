// # DNS Reloader Trait
//
// Defines the "reload DNS service" action run after a zone file commit.
//
// ## Implementations
//
// - `CommandReloader`: runs a configured command (default `systemctl restart bind9`)

use async_trait::async_trait;

/// Trait for applying a committed zone file to the running DNS service
///
/// The reconciler treats any error as fatal for the run; implementations must
/// not retry on their own.
#[async_trait]
pub trait DnsReloader: Send + Sync {
    /// Reload the DNS service
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The service accepted the new zone
    /// - `Err(Error::Reload)`: The action failed or exited non-zero
    async fn reload(&self) -> Result<(), crate::Error>;

    /// Short description for logs (e.g. the command line)
    fn describe(&self) -> String;
}
