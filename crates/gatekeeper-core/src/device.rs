use crate::{DeviceId, Result, constants::MAX_DOORS, error::Error};
use serde::{Deserialize, Serialize};

/// A configured access-control controller and its door-slot names.
///
/// Slot `i` of `doors` names door `i + 1`. A blank (or whitespace-only) slot
/// marks an unused door. Door names are validated for uniqueness across the
/// whole configuration by the door resolver, not here.
///
/// # Examples
///
/// ```
/// use gatekeeper_core::{Device, DeviceId};
///
/// let device = Device::new(
///     DeviceId::new(12345).unwrap(),
///     ["Front Door", "Side Door", "", "Workshop"],
/// )
/// .unwrap();
///
/// assert_eq!(device.door_name(2), Some("Side Door"));
/// assert_eq!(device.door_name(3), None);
/// assert_eq!(device.named_doors().count(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDevice")]
pub struct Device {
    pub id: DeviceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub doors: Vec<String>,
}

#[derive(Deserialize)]
struct RawDevice {
    id: DeviceId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    doors: Vec<String>,
}

impl TryFrom<RawDevice> for Device {
    type Error = Error;

    fn try_from(raw: RawDevice) -> Result<Self> {
        let mut device = Device::new(raw.id, raw.doors)?;
        device.name = raw.name;
        Ok(device)
    }
}

impl Device {
    /// Create a device with validation of the door-slot count.
    ///
    /// # Errors
    /// Returns `Error::TooManyDoors` if more than [`MAX_DOORS`] slots are given.
    pub fn new<I, S>(id: DeviceId, doors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let doors: Vec<String> = doors.into_iter().map(Into::into).collect();
        if doors.len() > MAX_DOORS {
            return Err(Error::TooManyDoors {
                device: id.to_string(),
                count: doors.len(),
                max: MAX_DOORS,
            });
        }

        Ok(Self {
            id,
            name: None,
            doors,
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Trimmed name of a 1-based door slot, or `None` if the slot is unused.
    #[must_use]
    pub fn door_name(&self, door: u8) -> Option<&str> {
        let ix = usize::from(door).checked_sub(1)?;
        self.doors
            .get(ix)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
    }

    /// Iterate `(door, name)` for every non-blank slot, in slot order.
    pub fn named_doors(&self) -> impl Iterator<Item = (u8, &str)> + '_ {
        (1u8..)
            .zip(self.doors.iter())
            .map(|(door, name)| (door, name.trim()))
            .filter(|(_, name)| !name.is_empty())
    }

    /// Returns `true` if at least one slot is named.
    #[must_use]
    pub fn has_doors(&self) -> bool {
        self.named_doors().next().is_some()
    }
}
