//! Controller API trait definition.
//!
//! Methods return `impl Future + Send` rather than using bare `async fn` so
//! that generic callers can move calls into spawned Tokio tasks. Implementors
//! are free to write the methods as `async fn`.

use crate::error::Result;
use gatekeeper_core::{Card, CardNumber, DeviceId};
use std::future::Future;

/// Card-level operations exposed by a fleet of access controllers.
///
/// One value addresses every controller; the target is picked by the
/// `device` argument on each call.
///
/// # Object Safety
///
/// This trait is NOT object-safe because its methods return opaque
/// `impl Future` types. Use generic type parameters:
///
/// ```no_run
/// use gatekeeper_core::DeviceId;
/// use gatekeeper_device::{ControllerApi, Result};
///
/// async fn count_all<A: ControllerApi>(api: &A, devices: &[DeviceId]) -> Result<u32> {
///     let mut total = 0;
///     for device in devices {
///         total += api.card_count(*device).await?;
///     }
///     Ok(total)
/// }
/// ```
pub trait ControllerApi: Send + Sync {
    /// Number of card records stored on the controller.
    fn card_count(&self, device: DeviceId) -> impl Future<Output = Result<u32>> + Send;

    /// Card stored at a 1-based index slot.
    ///
    /// Slots may be empty (a deleted record leaves a hole), in which case
    /// `Ok(None)` is returned.
    fn card_by_index(
        &self,
        device: DeviceId,
        index: u32,
    ) -> impl Future<Output = Result<Option<Card>>> + Send;

    /// Card record for a card number, if the controller holds one.
    fn card_by_id(
        &self,
        device: DeviceId,
        card: CardNumber,
    ) -> impl Future<Output = Result<Option<Card>>> + Send;

    /// Insert or overwrite a card record.
    ///
    /// Returns `Ok(false)` if the controller answered but refused the write.
    fn put_card(&self, device: DeviceId, card: Card) -> impl Future<Output = Result<bool>> + Send;

    /// Delete a card record.
    ///
    /// Returns `Ok(false)` if the controller answered but refused the delete.
    fn delete_card(
        &self,
        device: DeviceId,
        card: CardNumber,
    ) -> impl Future<Output = Result<bool>> + Send;
}
