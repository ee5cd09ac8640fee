// # Cloud API Trait
//
// Defines the interface to the remote compute-instance API.
//
// ## Implementations
//
// - DigitalOcean: `droplet-provider-digitalocean` crate
//
// ## Usage
//
// ```rust,ignore
// use droplet_core::CloudApi;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let api = /* CloudApi implementation */;
//
//     for droplet in api.list_droplets().await? {
//         println!("{} ({}): {}", droplet.name, droplet.id, droplet.status);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::config::DropletConfig;

/// A droplet as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Droplet {
    /// Provider-assigned id, required for destroy
    pub id: u64,
    /// Droplet name
    pub name: String,
    /// Provider status string ("new", "active", "off", "archive")
    pub status: String,
    /// Network attachments
    #[serde(default)]
    pub networks: Networks,
}

/// Network attachments of a droplet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Networks {
    /// IPv4 attachments, in provider order
    #[serde(default)]
    pub v4: Vec<NetworkV4>,
}

/// A single IPv4 attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkV4 {
    /// Address as reported by the provider
    pub ip_address: String,
    /// "public" or "private"
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Droplet {
    /// The address the managed A record should point at
    ///
    /// The first public IPv4 attachment wins; if none is marked public the
    /// first parseable IPv4 attachment is used.
    pub fn public_ipv4(&self) -> Option<Ipv4Addr> {
        let parsed = || {
            self.networks
                .v4
                .iter()
                .filter_map(|n| n.ip_address.parse::<Ipv4Addr>().ok().map(|ip| (n, ip)))
        };

        parsed()
            .find(|(n, _)| n.kind == "public")
            .or_else(|| parsed().next())
            .map(|(_, ip)| ip)
    }
}

/// SSH key reference: numeric ids are sent as numbers, anything else as a fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SshKeyRef {
    Id(u64),
    Fingerprint(String),
}

impl From<&str> for SshKeyRef {
    fn from(raw: &str) -> Self {
        raw.parse()
            .map(SshKeyRef::Id)
            .unwrap_or_else(|_| SshKeyRef::Fingerprint(raw.to_string()))
    }
}

/// Creation request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropletSpec {
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub ssh_keys: Vec<SshKeyRef>,
    pub backups: bool,
    pub ipv6: bool,
    pub monitoring: bool,
    pub tags: Vec<String>,
}

impl From<&DropletConfig> for DropletSpec {
    fn from(config: &DropletConfig) -> Self {
        Self {
            name: config.name.clone(),
            region: config.region.clone(),
            size: config.size.clone(),
            image: config.image.clone(),
            ssh_keys: config.ssh_keys.iter().map(|k| SshKeyRef::from(k.as_str())).collect(),
            backups: false,
            ipv6: false,
            monitoring: true,
            tags: config.tags.clone(),
        }
    }
}

/// Trait for cloud API implementations
///
/// Implementations are thin and stateless: one logical API operation per
/// call, no retries, no caching. Idempotency is NOT provided here; the
/// `DropletController` checks existence before creating or deleting.
///
/// # Errors
///
/// - `Error::Transport` when the API cannot be reached (including timeouts)
/// - `Error::UnexpectedStatus` when the response status is not the expected one
/// - `Error::Decode` when a response body cannot be parsed
///
/// Callers must treat any error as "state unknown", never as "absent".
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// List all droplets visible to the credential
    async fn list_droplets(&self) -> Result<Vec<Droplet>, crate::Error>;

    /// Submit a creation request
    ///
    /// Succeeds iff the provider accepted the request (HTTP 202). Acceptance
    /// says nothing about the droplet reaching a running state.
    async fn create_droplet(&self, spec: &DropletSpec) -> Result<(), crate::Error>;

    /// Delete a droplet by id
    ///
    /// Succeeds iff the provider answered HTTP 204.
    async fn delete_droplet(&self, id: u64) -> Result<(), crate::Error>;

    /// Provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
