//! Property-based tests for the diff, report and table engines.

mod common;

use chrono::{Days, NaiveDate};
use common::{DEVICE_A, DEVICE_B, id, mock_fleet};
use gatekeeper_acl::{
    CardAccess, Category, DuplicatePolicy, Report, compare, consolidate, make_table, parse_table,
};
use gatekeeper_core::{Acl, Card, CardNumber, CardSet, DateRange, DeviceId, Doors, Permission};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn arb_window() -> impl Strategy<Value = DateRange> {
    (0u64..365, 0u64..365).prop_map(|(start, len)| {
        let from = base_date() + Days::new(start);
        DateRange::new(from, from + Days::new(len))
    })
}

fn arb_permission() -> impl Strategy<Value = Permission> {
    prop_oneof![
        Just(Permission::Denied),
        Just(Permission::Allowed),
        (2u8..=254).prop_map(|n| Permission::parse(&n.to_string()).unwrap()),
    ]
}

fn arb_card(number: u32) -> impl Strategy<Value = Card> {
    (arb_window(), prop::array::uniform4(arb_permission())).prop_map(move |(window, doors)| {
        Card::new(CardNumber::new(number), window.from, window.to, Doors::from(doors))
    })
}

/// Card sets drawn from a small number space so that sets overlap.
fn arb_card_set() -> impl Strategy<Value = CardSet> {
    prop::collection::btree_set(1u32..20, 0..10).prop_flat_map(|numbers| {
        numbers
            .into_iter()
            .map(arb_card)
            .collect::<Vec<_>>()
            .prop_map(|cards| cards.into_iter().map(|c| (c.card_number, c)).collect())
    })
}

const CATEGORIES: [Category; 6] = [
    Category::Unchanged,
    Category::Updated,
    Category::Added,
    Category::Deleted,
    Category::Failed,
    Category::Errored,
];

/// Card number to category, one entry per card.
fn arb_outcomes() -> impl Strategy<Value = BTreeMap<u32, Category>> {
    prop::collection::btree_map(1u32..15, prop::sample::select(CATEGORIES.to_vec()), 0..12)
}

fn report(outcomes: &BTreeMap<u32, Category>) -> Report {
    let mut report = Report::default();
    for (number, category) in outcomes {
        report.record(CardNumber::new(*number), *category);
    }
    report
}

fn numbers(cards: &[Card]) -> BTreeSet<CardNumber> {
    cards.iter().map(|c| c.card_number).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_compare_partitions_union(actual in arb_card_set(), desired in arb_card_set()) {
        let diff = compare(&actual, &desired);

        let union: BTreeSet<CardNumber> = actual.keys().chain(desired.keys()).copied().collect();
        let buckets = [&diff.unchanged, &diff.updated, &diff.added, &diff.deleted];

        let total: usize = buckets.iter().map(|b| b.len()).sum();
        prop_assert_eq!(total, union.len());

        let mut seen = BTreeSet::new();
        for bucket in buckets {
            for card in bucket.iter() {
                prop_assert!(seen.insert(card.card_number));
            }
        }
        prop_assert_eq!(seen, union);

        let added: BTreeSet<CardNumber> =
            desired.keys().filter(|k| !actual.contains_key(k)).copied().collect();
        let deleted: BTreeSet<CardNumber> =
            actual.keys().filter(|k| !desired.contains_key(k)).copied().collect();
        prop_assert_eq!(numbers(&diff.added), added);
        prop_assert_eq!(numbers(&diff.deleted), deleted);
        prop_assert_eq!(compare(&desired, &desired).has_changes(), false);
    }

    #[test]
    fn prop_consolidate_never_added_and_updated(
        a in arb_outcomes(),
        b in arb_outcomes(),
    ) {
        let mut reports = BTreeMap::new();
        reports.insert(id(DEVICE_A), report(&a));
        reports.insert(id(DEVICE_B), report(&b));

        let consolidated = consolidate(&reports);

        let added: BTreeSet<_> = consolidated.added.iter().collect();
        for card in &consolidated.updated {
            prop_assert!(!added.contains(card));
        }

        let changed: BTreeSet<CardNumber> = a
            .iter()
            .chain(&b)
            .filter(|(_, category)| **category != Category::Unchanged)
            .map(|(number, _)| CardNumber::new(*number))
            .collect();
        for card in &consolidated.unchanged {
            prop_assert!(!changed.contains(card));
        }
    }

    #[test]
    fn prop_table_round_trip(a in arb_card_set(), b in arb_card_set()) {
        let devices = common::devices();
        // Every row becomes a card on every device, so give both devices the
        // same card numbers and windows before generating the table.
        let mut acl = Acl::for_devices(&devices);
        for card in a.values() {
            let mut twin = card.clone();
            twin.doors = b.get(&card.card_number).map_or_else(Doors::denied, |c| c.doors);
            acl.insert_card(id(DEVICE_A), card.clone());
            acl.insert_card(id(DEVICE_B), twin);
        }

        let table = make_table(&acl, &devices).unwrap();
        let parsed = parse_table(&table, &devices, DuplicatePolicy::Strict).unwrap();

        prop_assert_eq!(parsed.acl, acl);
        prop_assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn prop_grant_idempotent_and_never_narrows(
        existing in arb_card(65538),
        requested in arb_window(),
        door in prop::sample::select(vec!["Front Door", "Side Door", "Garage", "Workshop"]),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let mut seed = Acl::new();
            seed.insert_card(id(DEVICE_A), existing.clone());
            let (api, handle) = mock_fleet(&seed).await;
            let devices = common::devices();
            let access = CardAccess::new(&api, &devices).unwrap();
            let device: DeviceId = id(DEVICE_A);

            access.grant(existing.card_number, requested, &[door]).await.unwrap();
            let once = handle.cards(device).await[&existing.card_number].clone();

            access.grant(existing.card_number, requested, &[door]).await.unwrap();
            let twice = handle.cards(device).await[&existing.card_number].clone();

            prop_assert_eq!(&once, &twice);
            prop_assert!(once.from <= requested.from);
            prop_assert!(once.to >= requested.to);
            if existing.has_access() {
                prop_assert!(once.from <= existing.from);
                prop_assert!(once.to >= existing.to);
            } else {
                prop_assert_eq!(once.window(), requested);
            }
            Ok(())
        })?;
    }
}
