//! Test doubles and common utilities for contract tests
//!
//! The doubles count every call so tests can assert which requests were
//! (and were not) sent.

#![allow(dead_code)]

use droplet_core::config::{DropletConfig, ZoneConfig};
use droplet_core::error::{Error, Result};
use droplet_core::traits::{CloudApi, DnsReloader, Droplet, DropletSpec, NetworkV4, Networks};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An in-memory cloud API that records calls
///
/// A successful create makes a droplet with status "new" visible to later
/// list calls; a successful delete removes it.
pub struct MockCloudApi {
    droplets: Mutex<Vec<Droplet>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    deleted_ids: Mutex<Vec<u64>>,
    created_specs: Mutex<Vec<DropletSpec>>,
    fail_list: AtomicBool,
    fail_mutations: AtomicBool,
    list_delay: Duration,
    next_id: AtomicUsize,
}

impl MockCloudApi {
    pub fn new(droplets: Vec<Droplet>) -> Self {
        Self {
            droplets: Mutex::new(droplets),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            deleted_ids: Mutex::new(Vec::new()),
            created_specs: Mutex::new(Vec::new()),
            fail_list: AtomicBool::new(false),
            fail_mutations: AtomicBool::new(false),
            list_delay: Duration::ZERO,
            next_id: AtomicUsize::new(9000),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Delay every list call (widens the check-then-act window)
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    /// Make list calls fail with a transport error
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make create/delete calls fail with an unexpected status
    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn deleted_ids(&self) -> Vec<u64> {
        self.deleted_ids.lock().unwrap().clone()
    }

    pub fn created_specs(&self) -> Vec<DropletSpec> {
        self.created_specs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CloudApi for MockCloudApi {
    async fn list_droplets(&self) -> Result<Vec<Droplet>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::transport("connection refused"));
        }
        Ok(self.droplets.lock().unwrap().clone())
    }

    async fn create_droplet(&self, spec: &DropletSpec) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Error::unexpected_status("create droplet", 422, "size unavailable"));
        }
        self.created_specs.lock().unwrap().push(spec.clone());

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
        self.droplets.lock().unwrap().push(Droplet {
            id,
            name: spec.name.clone(),
            status: "new".to_string(),
            networks: Networks::default(),
        });
        Ok(())
    }

    async fn delete_droplet(&self, id: u64) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Error::unexpected_status("delete droplet", 500, "internal error"));
        }
        self.deleted_ids.lock().unwrap().push(id);
        self.droplets.lock().unwrap().retain(|d| d.id != id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A reloader that counts calls and can be told to fail
#[derive(Default)]
pub struct MockReloader {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockReloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let reloader = Self::default();
        reloader.fail.store(true, Ordering::SeqCst);
        reloader
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsReloader for MockReloader {
    async fn reload(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::reload("`systemctl restart bind9` exited with exit status: 1"));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "mock reload".to_string()
    }
}

/// Droplet with a private and a public IPv4 attachment
pub fn droplet(id: u64, name: &str, status: &str, public_ip: Option<&str>) -> Droplet {
    let mut v4 = vec![NetworkV4 {
        ip_address: "10.118.0.5".to_string(),
        kind: "private".to_string(),
    }];
    if let Some(ip) = public_ip {
        v4.push(NetworkV4 {
            ip_address: ip.to_string(),
            kind: "public".to_string(),
        });
    }

    Droplet {
        id,
        name: name.to_string(),
        status: status.to_string(),
        networks: Networks { v4 },
    }
}

/// Creation parameters of the production GPU droplet
pub fn droplet_config() -> DropletConfig {
    DropletConfig {
        name: "ai-instance".to_string(),
        region: "tor1".to_string(),
        size: "gpu-6000adax1-48gb".to_string(),
        image: "192399134".to_string(),
        ssh_keys: vec!["48954231".to_string()],
        tags: vec!["gpu".to_string()],
    }
}

pub fn zone_config(file: &Path) -> ZoneConfig {
    ZoneConfig {
        file: file.to_path_buf(),
        record_name: "ai".to_string(),
        reload_command: vec!["true".to_string()],
    }
}

/// Minimal zone file with a serial line and the managed A record
pub fn zone_text(serial: &str, address: &str) -> String {
    format!(
        "$ORIGIN key-net.ru.\n\
$TTL 86400\n\
@\tIN\tSOA\tns1.key-net.ru. hostmaster.key-net.ru. (\n\
\t\t{serial} ; serial\n\
\t\t3600 ; refresh\n\
\t\t1800 ; retry\n\
\t\t604800 ; expire\n\
\t\t86400 ) ; minimum\n\
@\tIN\tNS\tns1.key-net.ru.\n\
ns1\tIN\tA\t198.51.100.53\n\
ai IN A {address}\n\
gpu\tIN\tCNAME\tai\n"
    )
}

/// Shared handle helper: keep a typed Arc for assertions and a trait object for the component
pub fn shared<T: CloudApi + 'static>(api: T) -> (Arc<T>, Arc<dyn CloudApi>) {
    let typed = Arc::new(api);
    let dynamic: Arc<dyn CloudApi> = typed.clone();
    (typed, dynamic)
}
