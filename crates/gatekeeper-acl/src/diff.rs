//! Desired vs. actual card set comparison.

use gatekeeper_core::{Acl, Card, CardNumber, CardSet, DeviceId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Classification of one device's cards.
///
/// Every card number in the union of both sides lands in exactly one list.
/// `unchanged`, `updated` and `added` hold the desired record; `deleted`
/// holds the actual record. Lists are in ascending card-number order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub unchanged: Vec<Card>,
    pub updated: Vec<Card>,
    pub added: Vec<Card>,
    pub deleted: Vec<Card>,
}

impl Diff {
    /// Returns `true` if applying the diff would touch the device.
    pub fn has_changes(&self) -> bool {
        !(self.updated.is_empty() && self.added.is_empty() && self.deleted.is_empty())
    }

    /// Total number of cards classified.
    pub fn len(&self) -> usize {
        self.unchanged.len() + self.updated.len() + self.added.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify a device's cards as unchanged, updated, added or deleted.
///
/// # Examples
///
/// ```
/// use gatekeeper_acl::compare;
/// use gatekeeper_core::{Card, CardNumber, CardSet, Doors};
/// use gatekeeper_core::types::parse_date;
///
/// let card = |n: u32| {
///     Card::new(
///         CardNumber::new(n),
///         parse_date("2020-01-01").unwrap(),
///         parse_date("2020-12-31").unwrap(),
///         Doors::from([true, false, false, false]),
///     )
/// };
///
/// let actual: CardSet = [card(1), card(3)].into_iter().map(|c| (c.card_number, c)).collect();
/// let desired: CardSet = [card(1), card(2)].into_iter().map(|c| (c.card_number, c)).collect();
///
/// let diff = compare(&actual, &desired);
/// assert_eq!(diff.unchanged, vec![card(1)]);
/// assert_eq!(diff.added, vec![card(2)]);
/// assert_eq!(diff.deleted, vec![card(3)]);
/// ```
pub fn compare(actual: &CardSet, desired: &CardSet) -> Diff {
    let cards: BTreeSet<CardNumber> = actual.keys().chain(desired.keys()).copied().collect();
    let mut diff = Diff::default();

    for card in cards {
        match (actual.get(&card), desired.get(&card)) {
            (Some(u), Some(v)) if u == v => diff.unchanged.push(v.clone()),
            (Some(_), Some(v)) => diff.updated.push(v.clone()),
            (None, Some(v)) => diff.added.push(v.clone()),
            (Some(u), None) => diff.deleted.push(u.clone()),
            (None, None) => {}
        }
    }

    diff
}

/// Per-device diffs for a whole system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SystemDiff(BTreeMap<DeviceId, Diff>);

/// Compare two ACLs device by device.
///
/// Covers the union of devices in both ACLs; a device missing from one side
/// is compared against an empty card set.
pub fn compare_acl(actual: &Acl, desired: &Acl) -> SystemDiff {
    let empty = CardSet::new();
    let devices: BTreeSet<DeviceId> = actual.devices().chain(desired.devices()).collect();

    SystemDiff(
        devices
            .into_iter()
            .map(|device| {
                let p = actual.cards(device).unwrap_or(&empty);
                let q = desired.cards(device).unwrap_or(&empty);
                (device, compare(p, q))
            })
            .collect(),
    )
}

impl SystemDiff {
    pub fn get(&self, device: DeviceId) -> Option<&Diff> {
        self.0.get(&device)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, &Diff)> {
        self.0.iter().map(|(device, diff)| (*device, diff))
    }

    pub fn has_changes(&self) -> bool {
        self.0.values().any(Diff::has_changes)
    }

    /// Merge the per-device diffs into one view keyed by card number.
    ///
    /// A card that is both updated and added (on different devices) is
    /// listed as updated only. A card is listed as unchanged only if it is
    /// unchanged on every device holding it.
    pub fn consolidate(&self) -> ConsolidatedDiff {
        let mut flags: BTreeMap<CardNumber, DiffFlags> = BTreeMap::new();

        for diff in self.0.values() {
            for card in &diff.unchanged {
                flags.entry(card.card_number).or_default().unchanged = true;
            }
            for card in &diff.updated {
                flags.entry(card.card_number).or_default().updated = true;
            }
            for card in &diff.added {
                flags.entry(card.card_number).or_default().added = true;
            }
            for card in &diff.deleted {
                flags.entry(card.card_number).or_default().deleted = true;
            }
        }

        let mut consolidated = ConsolidatedDiff::default();
        for (card, f) in flags {
            if f.unchanged && !(f.updated || f.added || f.deleted) {
                consolidated.unchanged.push(card);
            }
            if f.updated {
                consolidated.updated.push(card);
            }
            if f.added && !f.updated {
                consolidated.added.push(card);
            }
            if f.deleted {
                consolidated.deleted.push(card);
            }
        }

        consolidated
    }
}

impl FromIterator<(DeviceId, Diff)> for SystemDiff {
    fn from_iter<T: IntoIterator<Item = (DeviceId, Diff)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct DiffFlags {
    unchanged: bool,
    updated: bool,
    added: bool,
    deleted: bool,
}

/// Cross-device summary of a [`SystemDiff`], as ascending card numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidatedDiff {
    pub unchanged: Vec<CardNumber>,
    pub updated: Vec<CardNumber>,
    pub added: Vec<CardNumber>,
    pub deleted: Vec<CardNumber>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gatekeeper_core::Doors;

    fn id(n: u32) -> DeviceId {
        DeviceId::new(n).unwrap()
    }

    fn card(number: u32, doors: [bool; 4]) -> Card {
        Card::new(
            CardNumber::new(number),
            NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
            Doors::from(doors),
        )
    }

    fn set(cards: &[Card]) -> CardSet {
        cards.iter().map(|c| (c.card_number, c.clone())).collect()
    }

    fn numbers(cards: &[Card]) -> Vec<u32> {
        cards.iter().map(|c| c.card_number.as_u32()).collect()
    }

    fn diff(unchanged: &[u32], updated: &[u32], added: &[u32], deleted: &[u32]) -> Diff {
        let cards = |ns: &[u32]| -> Vec<Card> {
            ns.iter().map(|n| card(*n, [false, false, true, false])).collect()
        };
        Diff {
            unchanged: cards(unchanged),
            updated: cards(updated),
            added: cards(added),
            deleted: cards(deleted),
        }
    }

    fn card_numbers(ns: &[u32]) -> Vec<CardNumber> {
        ns.iter().copied().map(CardNumber::new).collect()
    }

    #[test]
    fn test_compare_classifies_every_card() {
        let actual = set(&[
            card(65537, [true, false, false, false]),
            card(65538, [true, false, true, false]),
            card(65539, [false, false, false, false]),
        ]);
        let desired = set(&[
            card(65537, [true, false, false, false]),
            card(65538, [true, false, false, false]),
            card(65540, [false, true, false, false]),
        ]);

        let diff = compare(&actual, &desired);

        assert_eq!(numbers(&diff.unchanged), vec![65537]);
        assert_eq!(numbers(&diff.updated), vec![65538]);
        assert_eq!(numbers(&diff.added), vec![65540]);
        assert_eq!(numbers(&diff.deleted), vec![65539]);
        assert_eq!(diff.updated[0], desired[&CardNumber::new(65538)]);
        assert_eq!(diff.deleted[0], actual[&CardNumber::new(65539)]);
        assert!(diff.has_changes());
    }

    #[test]
    fn test_compare_window_change_is_update() {
        let actual = set(&[card(1, [true; 4])]);
        let mut changed = card(1, [true; 4]);
        changed.to = NaiveDate::from_ymd_opt(2021, 6, 30).unwrap();

        let diff = compare(&actual, &set(&[changed]));
        assert_eq!(numbers(&diff.updated), vec![1]);
    }

    #[test]
    fn test_compare_sorts_ascending() {
        let desired = set(&[card(30, [true; 4]), card(10, [true; 4]), card(20, [true; 4])]);
        let diff = compare(&CardSet::new(), &desired);

        assert_eq!(numbers(&diff.added), vec![10, 20, 30]);
        assert!(!compare(&desired, &desired).has_changes());
    }

    #[test]
    fn test_compare_acl_covers_device_union() {
        let mut actual = Acl::new();
        actual.insert_card(id(1), card(1, [true; 4]));
        let mut desired = Acl::new();
        desired.insert_card(id(2), card(2, [true; 4]));

        let system = compare_acl(&actual, &desired);

        assert_eq!(numbers(&system.get(id(1)).unwrap().deleted), vec![1]);
        assert_eq!(numbers(&system.get(id(2)).unwrap().added), vec![2]);
        assert_eq!(system.iter().count(), 2);
    }

    #[test]
    fn test_consolidate_single_device() {
        let system: SystemDiff = [(
            id(12345),
            diff(
                &[923321456, 233214569],
                &[823321456, 233214568],
                &[723321456, 233214567],
                &[623321456, 233214566],
            ),
        )]
        .into_iter()
        .collect();

        assert_eq!(
            system.consolidate(),
            ConsolidatedDiff {
                unchanged: card_numbers(&[233214569, 923321456]),
                updated: card_numbers(&[233214568, 823321456]),
                added: card_numbers(&[233214567, 723321456]),
                deleted: card_numbers(&[233214566, 623321456]),
            }
        );
    }

    #[test]
    fn test_consolidate_multiple_devices() {
        let system: SystemDiff = [
            (id(12345), diff(&[923321456], &[823321456], &[723321456], &[623321456])),
            (id(54321), diff(&[233214569], &[233214568], &[233214567], &[233214566])),
        ]
        .into_iter()
        .collect();

        let consolidated = system.consolidate();
        assert_eq!(consolidated.unchanged, card_numbers(&[233214569, 923321456]));
        assert_eq!(consolidated.updated, card_numbers(&[233214568, 823321456]));
        assert_eq!(consolidated.added, card_numbers(&[233214567, 723321456]));
        assert_eq!(consolidated.deleted, card_numbers(&[233214566, 623321456]));
    }

    #[test]
    fn test_consolidate_updated_takes_precedence_over_added() {
        let system: SystemDiff = [(
            id(12345),
            diff(
                &[923321456, 233214569],
                &[823321456, 233214568],
                &[823321456, 233214567],
                &[623321456, 233214566],
            ),
        )]
        .into_iter()
        .collect();

        let consolidated = system.consolidate();
        assert_eq!(consolidated.updated, card_numbers(&[233214568, 823321456]));
        assert_eq!(consolidated.added, card_numbers(&[233214567]));
    }

    #[test]
    fn test_consolidate_unchanged_only_when_untouched_everywhere() {
        let system: SystemDiff = [
            (id(1), diff(&[100], &[], &[], &[])),
            (id(2), diff(&[], &[], &[], &[100])),
        ]
        .into_iter()
        .collect();

        let consolidated = system.consolidate();
        assert!(consolidated.unchanged.is_empty());
        assert_eq!(consolidated.deleted, card_numbers(&[100]));
    }
}
