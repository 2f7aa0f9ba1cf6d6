//! Core data model for the gatekeeper access-control reconciler.
//!
//! Every other crate in the workspace builds on the types defined here:
//! device and card identifiers, the closed [`Permission`] variant, the
//! per-card [`Card`] record, the configured [`Device`] with its door slots,
//! and the device-keyed [`Acl`] map.

pub mod acl;
pub mod card;
pub mod constants;
pub mod device;
pub mod error;
pub mod types;

pub use acl::{Acl, CardSet};
pub use card::{Card, Doors};
pub use device::Device;
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
