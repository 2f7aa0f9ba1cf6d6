//! Controller API abstraction for the gatekeeper reconciler.
//!
//! This crate defines the seam between the ACL engine and the physical
//! access-control controllers. The wire protocol itself lives elsewhere;
//! the engine only needs the five card operations of [`ControllerApi`].
//!
//! # Design Philosophy
//!
//! - **Async-first**: every call is a request/response round trip that may
//!   block or time out, expressed as a `Send` future so calls can run inside
//!   spawned Tokio tasks.
//! - **Shared, not exclusive**: methods take `&self`; one API value serves
//!   every device and is shared across reconcile tasks behind an `Arc`.
//! - **Errors vs. refusals**: transport failures are [`DeviceError`]s; a
//!   controller that refuses a write returns `Ok(false)`.
//!
//! # Example
//!
//! ```no_run
//! use gatekeeper_core::{CardNumber, DeviceId};
//! use gatekeeper_device::{ControllerApi, Result};
//!
//! async fn has_card<A: ControllerApi>(api: &A, device: DeviceId, card: u32) -> Result<bool> {
//!     Ok(api.card_by_id(device, CardNumber::new(card)).await?.is_some())
//! }
//! ```
//!
//! # Mock Implementation
//!
//! [`mock::MockController`] keeps per-device card slots in memory and can be
//! told to refuse writes, raise errors or drop off the network, which is how
//! the engine's partial-failure behaviour is tested.

pub mod error;
pub mod mock;
pub mod traits;

pub use error::{DeviceError, Result};
pub use mock::{MockController, MockControllerHandle};
pub use traits::ControllerApi;
