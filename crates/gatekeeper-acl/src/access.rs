//! Per-card permission changes: grant, revoke and show.

use crate::{AclError, DeviceFailure, DoorResolver, Result};
use gatekeeper_core::{Card, CardNumber, DateRange, Device, DeviceId, Permission};
use gatekeeper_device::ControllerApi;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// What to do when one device fails during a grant or revoke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing device and return its error.
    #[default]
    FailFast,
    /// Visit every device and return all failures together.
    Continue,
}

/// Grant, revoke and look up one card's door permissions across devices.
///
/// Door names are resolved against the device configuration when the value
/// is built, so ambiguous configurations are rejected before any device is
/// contacted. Changes already written to earlier devices are never rolled
/// back when a later device fails.
///
/// # Examples
///
/// ```no_run
/// use gatekeeper_acl::CardAccess;
/// use gatekeeper_core::{CardNumber, DateRange, Device};
/// use gatekeeper_core::types::parse_date;
/// use gatekeeper_device::MockController;
///
/// # async fn example(devices: Vec<Device>) -> gatekeeper_acl::Result<()> {
/// let (api, _handle) = MockController::new();
/// let access = CardAccess::new(&api, &devices)?;
///
/// let window = DateRange::checked(parse_date("2020-01-01")?, parse_date("2020-12-31")?)?;
/// access.grant(CardNumber::new(65538), window, &["Garage"]).await?;
/// access.revoke(CardNumber::new(65538), &["Front Door"]).await?;
///
/// for (door, window) in access.show(CardNumber::new(65538)).await? {
///     println!("{door}: {window}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CardAccess<'a, A> {
    api: &'a A,
    devices: &'a [Device],
    resolver: DoorResolver,
    policy: FailurePolicy,
}

impl<'a, A: ControllerApi> CardAccess<'a, A> {
    /// # Errors
    ///
    /// Returns a configuration error if door names are not unique.
    pub fn new(api: &'a A, devices: &'a [Device]) -> Result<Self> {
        Ok(Self {
            api,
            devices,
            resolver: DoorResolver::new(devices)?,
            policy: FailurePolicy::default(),
        })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn resolver(&self) -> &DoorResolver {
        &self.resolver
    }

    /// Allow a card through the named doors.
    ///
    /// On each device with at least one named door the card is fetched (or
    /// created with the requested window if absent), the doors are set to
    /// allowed and the card is written back. A card with no access anywhere
    /// on the device takes the requested window outright; an active card's
    /// window only ever widens.
    ///
    /// # Errors
    ///
    /// Returns `AclError::UnknownDoor` before any device call if a name does
    /// not resolve, and a core error if the window ends before it starts.
    /// Device failures are returned according to the failure policy.
    pub async fn grant<S: AsRef<str>>(
        &self,
        card: CardNumber,
        window: DateRange,
        doors: &[S],
    ) -> Result<()> {
        DateRange::checked(window.from, window.to)?;
        let grouped = self.resolver.expand(doors)?;

        let mut failures = Vec::new();
        for (device, doors) in grouped {
            if let Err(e) = self.grant_device(device, card, window, &doors).await {
                self.on_failure(device, e, &mut failures)?;
            }
        }

        finish(failures)
    }

    async fn grant_device(
        &self,
        device: DeviceId,
        card: CardNumber,
        window: DateRange,
        doors: &BTreeSet<u8>,
    ) -> Result<()> {
        let mut record = self
            .api
            .card_by_id(device, card)
            .await
            .map_err(|e| AclError::device(device, e))?
            .unwrap_or_else(|| Card::revoked(card, window));

        let revoked = !record.has_access();
        if revoked || record.from > window.from {
            record.from = window.from;
        }
        if revoked || record.to < window.to {
            record.to = window.to;
        }

        for door in doors {
            record.doors.set(*door, Permission::Allowed)?;
        }

        debug!(device = %device, card = %card, ?doors, window = %record.window(), "Granting access");
        self.write(device, record).await?;
        info!(device = %device, card = %card, "Access granted");
        Ok(())
    }

    /// Deny a card through the named doors.
    ///
    /// The card's window is left alone. A device that does not hold the card
    /// is skipped.
    ///
    /// # Errors
    ///
    /// As for [`grant`](Self::grant).
    pub async fn revoke<S: AsRef<str>>(&self, card: CardNumber, doors: &[S]) -> Result<()> {
        let grouped = self.resolver.expand(doors)?;

        let mut failures = Vec::new();
        for (device, doors) in grouped {
            if let Err(e) = self.revoke_device(device, card, &doors).await {
                self.on_failure(device, e, &mut failures)?;
            }
        }

        finish(failures)
    }

    async fn revoke_device(
        &self,
        device: DeviceId,
        card: CardNumber,
        doors: &BTreeSet<u8>,
    ) -> Result<()> {
        let Some(mut record) = self
            .api
            .card_by_id(device, card)
            .await
            .map_err(|e| AclError::device(device, e))?
        else {
            debug!(device = %device, card = %card, "Card not on device, nothing to revoke");
            return Ok(());
        };

        for door in doors {
            record.doors.set(*door, Permission::Denied)?;
        }

        debug!(device = %device, card = %card, ?doors, "Revoking access");
        self.write(device, record).await?;
        info!(device = %device, card = %card, "Access revoked");
        Ok(())
    }

    /// Doors a card can open, with the card's window on that door's device.
    ///
    /// Windows are reported per device: a card held by two devices with
    /// different windows shows each device's own window on its doors.
    ///
    /// # Errors
    ///
    /// Returns `AclError::Device` for the first device that cannot be read.
    pub async fn show(&self, card: CardNumber) -> Result<BTreeMap<String, DateRange>> {
        let mut doors = BTreeMap::new();

        for device in self.devices {
            let Some(record) = self
                .api
                .card_by_id(device.id, card)
                .await
                .map_err(|e| AclError::device(device.id, e))?
            else {
                continue;
            };

            for (door, permission) in record.doors.iter() {
                if !permission.is_granted() {
                    continue;
                }
                if let Some(name) = self.resolver.name_of(device.id, door) {
                    doors.insert(name.to_string(), record.window());
                }
            }
        }

        Ok(doors)
    }

    async fn write(&self, device: DeviceId, record: Card) -> Result<()> {
        let card = record.card_number;
        let ok = self
            .api
            .put_card(device, record)
            .await
            .map_err(|e| AclError::device(device, e))?;

        if !ok {
            return Err(AclError::WriteRejected { device, card });
        }
        Ok(())
    }

    fn on_failure(
        &self,
        device: DeviceId,
        error: AclError,
        failures: &mut Vec<DeviceFailure>,
    ) -> Result<()> {
        match self.policy {
            FailurePolicy::FailFast => Err(error),
            FailurePolicy::Continue => {
                warn!(device = %device, error = %error, "Device failed, continuing");
                failures.push(DeviceFailure::new(device, error));
                Ok(())
            }
        }
    }
}

fn finish(failures: Vec<DeviceFailure>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(AclError::Devices(failures))
    }
}
