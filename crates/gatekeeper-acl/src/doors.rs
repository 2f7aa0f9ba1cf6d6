//! Door name resolution.
//!
//! Door names are unique across the whole device configuration once
//! normalized (lower-cased, whitespace removed). The resolver checks that
//! once, up front, and then maps names to `(device, door)` slots and back.

use crate::{AclError, Result};
use gatekeeper_core::{Device, DeviceId, constants::ALL_DOORS, normalize_name};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A door slot on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoorRef {
    pub device: DeviceId,
    /// 1-based door number.
    pub door: u8,
}

#[derive(Debug, Clone)]
struct Entry {
    slot: DoorRef,
    name: String,
}

/// Validated door name ⇄ slot mapping for a device configuration.
///
/// # Examples
///
/// ```
/// use gatekeeper_acl::DoorResolver;
/// use gatekeeper_core::{Device, DeviceId};
///
/// let devices = vec![
///     Device::new(DeviceId::new(12345).unwrap(), ["Front Door", "Side Door"]).unwrap(),
///     Device::new(DeviceId::new(54321).unwrap(), ["D1", ""]).unwrap(),
/// ];
/// let resolver = DoorResolver::new(&devices).unwrap();
///
/// let slot = resolver.resolve("side door").unwrap();
/// assert_eq!(slot.device.as_u32(), 12345);
/// assert_eq!(slot.door, 2);
/// assert!(resolver.resolve("Cellar").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DoorResolver {
    /// Entries ordered by device ID, then door number.
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl DoorResolver {
    /// Build the mapping, rejecting names defined more than once.
    ///
    /// # Errors
    ///
    /// Returns `AclError::AmbiguousDoor` if a normalized name appears on two
    /// devices and `AclError::DuplicateDoor` if it appears twice on one.
    pub fn new(devices: &[Device]) -> Result<Self> {
        let mut ordered: Vec<&Device> = devices.iter().collect();
        ordered.sort_by_key(|device| device.id);

        let mut resolver = Self::default();
        for device in ordered {
            for (door, name) in device.named_doors() {
                let key = normalize_name(name);
                if let Some(&ix) = resolver.by_name.get(&key) {
                    let existing = resolver.entries[ix].slot.device;
                    if existing == device.id {
                        return Err(AclError::DuplicateDoor {
                            door: name.to_string(),
                            device: device.id,
                        });
                    }
                    return Err(AclError::AmbiguousDoor {
                        door: name.to_string(),
                        first: existing,
                        second: device.id,
                    });
                }

                resolver.by_name.insert(key, resolver.entries.len());
                resolver.entries.push(Entry {
                    slot: DoorRef {
                        device: device.id,
                        door,
                    },
                    name: name.to_string(),
                });
            }
        }

        Ok(resolver)
    }

    /// Slot for a door name, matched case- and whitespace-insensitively.
    pub fn resolve(&self, name: &str) -> Option<DoorRef> {
        self.by_name
            .get(&normalize_name(name))
            .map(|&ix| self.entries[ix].slot)
    }

    /// Every configured door name, ordered by device ID then door number.
    pub fn resolve_all(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Every configured `(slot, name)` pair, ordered as [`resolve_all`](Self::resolve_all).
    pub fn slots(&self) -> impl Iterator<Item = (DoorRef, &str)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.slot, entry.name.as_str()))
    }

    /// Configured name of a door slot.
    pub fn name_of(&self, device: DeviceId, door: u8) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.slot.device == device && entry.slot.door == door)
            .map(|entry| entry.name.as_str())
    }

    /// Resolve a list of door names and group the slots by device.
    ///
    /// `ALL` (any case) expands to every configured door. Every name is
    /// resolved before anything is returned, so an unknown name fails the
    /// whole list.
    ///
    /// # Errors
    ///
    /// Returns `AclError::UnknownDoor` naming the first unresolvable door.
    pub fn expand<S: AsRef<str>>(&self, names: &[S]) -> Result<BTreeMap<DeviceId, BTreeSet<u8>>> {
        let mut grouped: BTreeMap<DeviceId, BTreeSet<u8>> = BTreeMap::new();

        if names
            .iter()
            .any(|name| name.as_ref().trim().eq_ignore_ascii_case(ALL_DOORS))
        {
            for entry in &self.entries {
                grouped
                    .entry(entry.slot.device)
                    .or_default()
                    .insert(entry.slot.door);
            }
            return Ok(grouped);
        }

        for name in names {
            let name = name.as_ref();
            let slot = self
                .resolve(name)
                .ok_or_else(|| AclError::UnknownDoor(name.trim().to_string()))?;
            grouped.entry(slot.device).or_default().insert(slot.door);
        }

        Ok(grouped)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
