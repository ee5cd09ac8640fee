//! Core traits for the droplet manager
//!
//! This module defines the seams to the outside world.
//!
//! - [`CloudApi`]: List, create and delete droplets
//! - [`DnsReloader`]: Apply a rewritten zone file to the DNS service

pub mod cloud_api;
pub mod dns_reloader;

pub use cloud_api::{CloudApi, Droplet, DropletSpec, NetworkV4, Networks, SshKeyRef};
pub use dns_reloader::DnsReloader;
