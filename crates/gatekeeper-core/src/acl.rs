use crate::{Card, CardNumber, Device, DeviceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One device's cards, keyed by card number.
pub type CardSet = BTreeMap<CardNumber, Card>;

/// Access control list: device ID to that device's card set.
///
/// The same type carries both the desired (authored) state and a device's
/// actual (fetched) state. Ordered maps keep every rendering of an ACL
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl(BTreeMap<DeviceId, CardSet>);

impl Acl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An ACL with an empty card set for every device.
    #[must_use]
    pub fn for_devices(devices: &[Device]) -> Self {
        Self(
            devices
                .iter()
                .map(|device| (device.id, CardSet::new()))
                .collect(),
        )
    }

    /// Replace a device's whole card set.
    pub fn insert_device(&mut self, device: DeviceId, cards: CardSet) -> Option<CardSet> {
        self.0.insert(device, cards)
    }

    /// Insert a card into a device's card set, creating the set if needed.
    pub fn insert_card(&mut self, device: DeviceId, card: Card) -> Option<Card> {
        self.0
            .entry(device)
            .or_default()
            .insert(card.card_number, card)
    }

    #[must_use]
    pub fn cards(&self, device: DeviceId) -> Option<&CardSet> {
        self.0.get(&device)
    }

    pub fn cards_mut(&mut self, device: DeviceId) -> Option<&mut CardSet> {
        self.0.get_mut(&device)
    }

    #[must_use]
    pub fn contains_device(&self, device: DeviceId) -> bool {
        self.0.contains_key(&device)
    }

    /// Device IDs in ascending order.
    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, &CardSet)> {
        self.0.iter().map(|(id, cards)| (*id, cards))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(DeviceId, CardSet)> for Acl {
    fn from_iter<T: IntoIterator<Item = (DeviceId, CardSet)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Acl {
    type Item = (DeviceId, CardSet);
    type IntoIter = std::collections::btree_map::IntoIter<DeviceId, CardSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Prints one line per device followed by one indented line per card.
///
/// ```text
/// 12345
///   65537 2020-01-02 2020-10-31 Y N N N
/// ```
impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (device, cards) in &self.0 {
            writeln!(f, "{device}")?;
            for card in cards.values() {
                writeln!(f, "  {card}")?;
            }
        }
        Ok(())
    }
}
