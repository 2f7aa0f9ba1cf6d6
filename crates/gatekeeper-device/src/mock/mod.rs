//! Mock controller implementation for testing and development.
//!
//! This module provides an in-memory controller fleet that can be driven
//! programmatically without any network access.

pub mod controller;

pub use controller::{Fault, MockController, MockControllerHandle, Operation};
