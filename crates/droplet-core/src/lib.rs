// # droplet-core
//
// Core library for the GPU droplet manager.
//
// ## Architecture Overview
//
// - **CloudApi**: Trait for listing, creating and deleting droplets
// - **DnsReloader**: Trait for applying a rewritten zone file
// - **DropletController**: Idempotent start/stop/status of the named droplet
// - **StatusSurface**: Boolean/string facade for a presentation layer
// - **ZoneReconciler**: Points the zone's A record at the droplet and bumps the serial
//
// ## Design Principles
//
// 1. **Re-resolve by name**: No droplet identity is cached between calls
// 2. **Unknown is not absent**: A failed lookup never triggers a create or delete
// 3. **No serial churn**: The zone file is only written when the address changes
// 4. **Library-First**: The daemon only wires configuration to these types

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod reload;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{ManagerConfig, RunMode};
pub use error::{Error, Result};
pub use lifecycle::{
    DropletController, DropletState, Lookup, StatusResponse, StatusSurface, Transition,
};
pub use reload::CommandReloader;
pub use traits::{CloudApi, DnsReloader, Droplet, DropletSpec};
pub use zone::{ReconcileOutcome, ZoneReconciler, ZoneSerial};
