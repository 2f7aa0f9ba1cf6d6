//! Reading the actual card records held by controllers.

use crate::{AclError, Result};
use gatekeeper_core::{Acl, CardSet, Device, DeviceId};
use gatekeeper_device::{ControllerApi, DeviceError};
use tracing::debug;

/// Consecutive empty index slots tolerated before a fetch gives up.
pub const DEFAULT_MAX_EMPTY_SLOTS: u32 = 1024;

/// Fetch every card record stored on one controller.
///
/// Walks index slots from 1 until the number of records the controller
/// reports has been found. Empty slots (left behind by deletes) are skipped
/// and do not count towards the total.
///
/// # Errors
///
/// Returns `AclError::Device` if any controller call fails, or if
/// `max_empty_slots` consecutive empty slots are seen before the reported
/// count is reached.
pub async fn fetch_cards<A: ControllerApi>(
    api: &A,
    device: DeviceId,
    max_empty_slots: u32,
) -> Result<CardSet> {
    let count = api
        .card_count(device)
        .await
        .map_err(|e| AclError::device(device, e))?;

    let mut cards = CardSet::new();
    let mut found = 0u32;
    let mut empty = 0u32;
    let mut index = 1u32;

    while found < count {
        match api
            .card_by_index(device, index)
            .await
            .map_err(|e| AclError::device(device, e))?
        {
            Some(card) => {
                cards.insert(card.card_number, card);
                found += 1;
                empty = 0;
            }
            None => {
                empty += 1;
                if empty >= max_empty_slots {
                    return Err(AclError::device(
                        device,
                        DeviceError::invalid_data(format!(
                            "found {found} of {count} cards before {empty} consecutive empty slots at index {index}"
                        )),
                    ));
                }
            }
        }

        index = index.checked_add(1).ok_or_else(|| {
            AclError::device(device, DeviceError::invalid_data("card index overflow"))
        })?;
    }

    debug!(device = %device, cards = cards.len(), slots = index - 1, "Fetched device cards");
    Ok(cards)
}

/// Fetch the actual ACL of every configured device.
///
/// Devices are read one after another and the first failure aborts the
/// whole fetch.
///
/// # Errors
///
/// Returns the first `AclError::Device` raised by any controller.
pub async fn fetch_acl<A: ControllerApi>(api: &A, devices: &[Device]) -> Result<Acl> {
    let mut acl = Acl::for_devices(devices);

    for device in devices {
        let cards = fetch_cards(api, device.id, DEFAULT_MAX_EMPTY_SLOTS).await?;
        acl.insert_device(device.id, cards);
    }

    Ok(acl)
}
