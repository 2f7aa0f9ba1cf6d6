//! ACL engine for fleets of access controllers.
//!
//! Each controller stores its own card records. This crate reconciles a
//! centrally authored ACL with what the controllers actually hold, changes
//! individual cards' door permissions, and converts ACLs to and from the
//! tabular form people edit in spreadsheets.
//!
//! # Modules
//!
//! - [`doors`]: door name ⇄ `(device, door)` resolution
//! - [`diff`]: desired vs. actual comparison
//! - [`fetch`]: reading card records from controllers
//! - [`reconcile`]: applying an ACL across devices concurrently
//! - [`report`]: per-device reports, summaries and consolidation
//! - [`access`]: grant, revoke and show for a single card
//! - [`table`]: table parsing and generation, TSV and fixed-width text
//!
//! # Example
//!
//! ```no_run
//! use gatekeeper_acl::{ReconcileConfig, put_acl, table::{DuplicatePolicy, parse_tsv}};
//! use gatekeeper_core::Device;
//! use gatekeeper_device::MockController;
//! use std::sync::Arc;
//!
//! # async fn example(devices: Vec<Device>) -> gatekeeper_acl::Result<()> {
//! let file = std::fs::File::open("acl.tsv")?;
//! let parsed = parse_tsv(file, &devices, DuplicatePolicy::Lenient)?;
//! for warning in &parsed.warnings {
//!     eprintln!("{warning}");
//! }
//!
//! let (api, _handle) = MockController::new();
//! let outcome = put_acl(Arc::new(api), parsed.acl, ReconcileConfig::default()).await;
//! println!("{}", serde_json::to_string_pretty(&outcome.consolidate()).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod diff;
pub mod doors;
pub mod error;
pub mod fetch;
pub mod reconcile;
pub mod report;
pub mod table;

pub use access::{CardAccess, FailurePolicy};
pub use diff::{ConsolidatedDiff, Diff, SystemDiff, compare, compare_acl};
pub use doors::{DoorRef, DoorResolver};
pub use error::{AclError, DeviceFailure, Result};
pub use fetch::{fetch_acl, fetch_cards};
pub use reconcile::{ReconcileConfig, ReconcileOutcome, apply, put_acl};
pub use report::{Category, ConsolidatedReport, Report, Summary, consolidate, summarize};
pub use table::{DuplicatePolicy, Parsed, Table, make_table, parse_table};
