//! Per-device reconcile reports and their cross-device views.

use gatekeeper_core::{CardNumber, DeviceId};
use gatekeeper_device::DeviceError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome category of one card in a [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Unchanged,
    Updated,
    Added,
    Deleted,
    /// Controller refused the write without raising an error.
    Failed,
    /// Controller call raised an error.
    Errored,
}

/// Error captured for an errored card.
#[derive(Debug, thiserror::Error)]
#[error("card {card}: {error}")]
pub struct CardError {
    pub card: CardNumber,
    #[source]
    pub error: DeviceError,
}

/// What happened when a diff was applied to one device.
///
/// Each card number appears in exactly one list. `errors` holds one entry
/// per `errored` card.
#[derive(Debug, Default)]
pub struct Report {
    pub unchanged: Vec<CardNumber>,
    pub updated: Vec<CardNumber>,
    pub added: Vec<CardNumber>,
    pub deleted: Vec<CardNumber>,
    pub failed: Vec<CardNumber>,
    pub errored: Vec<CardNumber>,
    pub errors: Vec<CardError>,
}

impl Report {
    pub fn cards(&self, category: Category) -> &[CardNumber] {
        match category {
            Category::Unchanged => &self.unchanged,
            Category::Updated => &self.updated,
            Category::Added => &self.added,
            Category::Deleted => &self.deleted,
            Category::Failed => &self.failed,
            Category::Errored => &self.errored,
        }
    }

    pub(crate) fn cards_mut(&mut self, category: Category) -> &mut Vec<CardNumber> {
        match category {
            Category::Unchanged => &mut self.unchanged,
            Category::Updated => &mut self.updated,
            Category::Added => &mut self.added,
            Category::Deleted => &mut self.deleted,
            Category::Failed => &mut self.failed,
            Category::Errored => &mut self.errored,
        }
    }

    /// Record a card under a category.
    pub fn record(&mut self, card: CardNumber, category: Category) {
        self.cards_mut(category).push(card);
    }

    /// Record a card whose controller call raised an error.
    pub fn record_error(&mut self, card: CardNumber, error: DeviceError) {
        self.errored.push(card);
        self.errors.push(CardError { card, error });
    }

    /// Returns `true` if no card failed or errored.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.errored.is_empty()
    }

    /// Sort every list by card number.
    pub(crate) fn sort(&mut self) {
        for category in [
            Category::Unchanged,
            Category::Updated,
            Category::Added,
            Category::Deleted,
            Category::Failed,
            Category::Errored,
        ] {
            self.cards_mut(category).sort_unstable();
        }
        self.errors.sort_by_key(|e| e.card);
    }

    pub fn summary(&self) -> Summary {
        Summary {
            unchanged: self.unchanged.len(),
            updated: self.updated.len(),
            added: self.added.len(),
            deleted: self.deleted.len(),
            failed: self.failed.len(),
            errored: self.errored.len(),
        }
    }
}

/// Per-category card counts of one [`Report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub unchanged: usize,
    pub updated: usize,
    pub added: usize,
    pub deleted: usize,
    pub failed: usize,
    pub errored: usize,
}

/// Card counts for every device.
pub fn summarize(reports: &BTreeMap<DeviceId, Report>) -> BTreeMap<DeviceId, Summary> {
    reports
        .iter()
        .map(|(device, report)| (*device, report.summary()))
        .collect()
}

/// Cross-device view of a set of reports, as ascending card numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidatedReport {
    pub unchanged: Vec<CardNumber>,
    pub updated: Vec<CardNumber>,
    pub added: Vec<CardNumber>,
    pub deleted: Vec<CardNumber>,
    pub failed: Vec<CardNumber>,
    pub errored: Vec<CardNumber>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    unchanged: bool,
    updated: bool,
    added: bool,
    deleted: bool,
    failed: bool,
    errored: bool,
}

impl Flags {
    fn changed(&self) -> bool {
        self.updated || self.added || self.deleted || self.failed || self.errored
    }
}

/// Merge per-device reports into one view keyed by card number.
///
/// Flags are OR-ed across devices, except that a card flagged as updated on
/// any device is not listed as added. Other overlaps (e.g. added on one
/// device and deleted on another) list the card under both. A card is
/// unchanged only if it is unchanged on every device that reports it.
pub fn consolidate(reports: &BTreeMap<DeviceId, Report>) -> ConsolidatedReport {
    let mut flags: BTreeMap<CardNumber, Flags> = BTreeMap::new();

    for report in reports.values() {
        for card in &report.unchanged {
            flags.entry(*card).or_default().unchanged = true;
        }
        for card in &report.updated {
            flags.entry(*card).or_default().updated = true;
        }
        for card in &report.added {
            flags.entry(*card).or_default().added = true;
        }
        for card in &report.deleted {
            flags.entry(*card).or_default().deleted = true;
        }
        for card in &report.failed {
            flags.entry(*card).or_default().failed = true;
        }
        for card in &report.errored {
            flags.entry(*card).or_default().errored = true;
        }
    }

    let mut consolidated = ConsolidatedReport::default();
    for (card, f) in flags {
        if f.unchanged && !f.changed() {
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
        if f.failed {
            consolidated.failed.push(card);
        }
        if f.errored {
            consolidated.errored.push(card);
        }
    }

    consolidated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> DeviceId {
        DeviceId::new(n).unwrap()
    }

    fn cards(ns: &[u32]) -> Vec<CardNumber> {
        ns.iter().copied().map(CardNumber::new).collect()
    }

    fn report(updated: &[u32], added: &[u32], deleted: &[u32], failed: &[u32], errored: &[u32]) -> Report {
        let mut report = Report {
            updated: cards(updated),
            added: cards(added),
            deleted: cards(deleted),
            failed: cards(failed),
            ..Default::default()
        };
        for card in cards(errored) {
            report.record_error(card, DeviceError::timeout(1000));
        }
        report
    }

    #[test]
    fn test_consolidate_merges_devices() {
        let reports = BTreeMap::from([
            (id(12345), report(&[3], &[1], &[5], &[], &[])),
            (id(54321), report(&[4], &[2], &[], &[6], &[7])),
        ]);

        let consolidated = consolidate(&reports);

        assert_eq!(consolidated.updated, cards(&[3, 4]));
        assert_eq!(consolidated.added, cards(&[1, 2]));
        assert_eq!(consolidated.deleted, cards(&[5]));
        assert_eq!(consolidated.failed, cards(&[6]));
        assert_eq!(consolidated.errored, cards(&[7]));
    }

    #[test]
    fn test_consolidate_updated_hides_added() {
        let reports = BTreeMap::from([
            (id(12345), report(&[], &[100], &[], &[], &[])),
            (id(54321), report(&[100], &[], &[], &[], &[])),
        ]);

        let consolidated = consolidate(&reports);

        assert_eq!(consolidated.updated, cards(&[100]));
        assert!(consolidated.added.is_empty());
    }

    #[test]
    fn test_consolidate_added_and_deleted_both_listed() {
        let reports = BTreeMap::from([
            (id(12345), report(&[], &[100], &[], &[], &[])),
            (id(54321), report(&[], &[], &[100], &[], &[])),
        ]);

        let consolidated = consolidate(&reports);

        assert_eq!(consolidated.added, cards(&[100]));
        assert_eq!(consolidated.deleted, cards(&[100]));
    }

    #[test]
    fn test_consolidate_unchanged() {
        let mut quiet = report(&[], &[], &[], &[], &[]);
        quiet.unchanged = cards(&[8, 9]);
        let mut busy = report(&[], &[], &[], &[9], &[]);
        busy.unchanged = cards(&[10]);

        let consolidated = consolidate(&BTreeMap::from([(id(1), quiet), (id(2), busy)]));

        assert_eq!(consolidated.unchanged, cards(&[8, 10]));
        assert_eq!(consolidated.failed, cards(&[9]));
    }

    #[test]
    fn test_summarize_counts() {
        let reports = BTreeMap::from([(id(12345), report(&[1, 2], &[3], &[], &[4], &[5, 6]))]);

        let summary = summarize(&reports);

        assert_eq!(
            summary[&id(12345)],
            Summary {
                unchanged: 0,
                updated: 2,
                added: 1,
                deleted: 0,
                failed: 1,
                errored: 2,
            }
        );
    }

    #[test]
    fn test_summary_json_uses_lowercase_fields() {
        let reports = BTreeMap::from([(id(12345), report(&[], &[1], &[], &[], &[]))]);
        let json = serde_json::to_value(summarize(&reports)).unwrap();

        assert_eq!(json["12345"]["added"], 1);
        assert_eq!(json["12345"]["errored"], 0);

        let json = serde_json::to_value(consolidate(&reports)).unwrap();
        assert_eq!(json["added"], serde_json::json!([1]));
        assert_eq!(json["errored"], serde_json::json!([]));
    }

    #[test]
    fn test_report_record_and_sort() {
        let mut report = Report::default();
        report.record(CardNumber::new(9), Category::Added);
        report.record(CardNumber::new(3), Category::Added);
        report.record_error(CardNumber::new(7), DeviceError::communication("closed"));
        report.sort();

        assert_eq!(report.cards(Category::Added), cards(&[3, 9]).as_slice());
        assert_eq!(report.errors[0].to_string(), "card 7: Communication error: closed");
        assert!(!report.is_clean());
    }
}
