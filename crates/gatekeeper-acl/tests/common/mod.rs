//! Common test utilities for the ACL engine integration tests.
//!
//! Fixtures use two reference controllers:
//!
//! - `12345` with doors `Front Door`, `Side Door`, `Garage`, `Workshop`
//! - `54321` with doors `D1`, `D2`, `D3`, `D4`

#![allow(dead_code)]

use chrono::NaiveDate;
use gatekeeper_core::{Acl, Card, CardNumber, CardSet, DateRange, Device, DeviceId, Doors};
use gatekeeper_device::{MockController, MockControllerHandle};

pub const DEVICE_A: u32 = 12345;
pub const DEVICE_B: u32 = 54321;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn id(n: u32) -> DeviceId {
    DeviceId::new(n).expect("non-zero device id")
}

pub fn date(s: &str) -> NaiveDate {
    gatekeeper_core::types::parse_date(s).expect("valid test date")
}

pub fn window(from: &str, to: &str) -> DateRange {
    DateRange::new(date(from), date(to))
}

pub fn devices() -> Vec<Device> {
    vec![
        Device::new(id(DEVICE_A), ["Front Door", "Side Door", "Garage", "Workshop"])
            .expect("valid device")
            .with_name("Main building"),
        Device::new(id(DEVICE_B), ["D1", "D2", "D3", "D4"]).expect("valid device"),
    ]
}

pub fn card(number: u32, from: &str, to: &str, doors: [bool; 4]) -> Card {
    Card::new(CardNumber::new(number), date(from), date(to), Doors::from(doors))
}

pub fn card_set(cards: &[Card]) -> CardSet {
    cards.iter().map(|c| (c.card_number, c.clone())).collect()
}

pub fn numbers(cards: &[CardNumber]) -> Vec<u32> {
    cards.iter().map(CardNumber::as_u32).collect()
}

/// Mock fleet with both reference devices registered, optionally seeded.
pub async fn mock_fleet(seed: &Acl) -> (MockController, MockControllerHandle) {
    let (api, handle) = MockController::new();
    handle.add_device(id(DEVICE_A)).await;
    handle.add_device(id(DEVICE_B)).await;

    for (device, cards) in seed.iter() {
        for card in cards.values() {
            handle.add_card(device, card.clone()).await;
        }
    }

    (api, handle)
}

pub fn row(fields: &[&str]) -> Vec<String> {
    fields.iter().map(ToString::to_string).collect()
}
