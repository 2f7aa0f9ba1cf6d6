//! Tabular form of an ACL.
//!
//! A [`Table`] is a header plus rows of text fields. It sits between an
//! [`Acl`] and the TSV and fixed-width text renderings:
//!
//! ```text
//! Card Number  From        To          Front Door  Side Door  D1
//! 65537        2020-01-02  2020-10-31  Y           N          N
//! ```
//!
//! The header holds the three required columns and one column per named
//! door. Door columns may appear in any order when parsing; generated
//! tables order them by device ID, then door number.

mod text;
mod tsv;

pub use text::make_flat_file;
pub use tsv::{make_tsv, parse_tsv};

use crate::{AclError, DoorResolver, Result};
use chrono::NaiveDate;
use gatekeeper_core::{
    Acl, Card, CardNumber, DateRange, Device, DeviceId, Doors, Permission,
    constants::{COLUMN_CARD_NUMBER, COLUMN_FROM, COLUMN_TO, DATE_FORMAT, REQUIRED_COLUMNS},
    normalize_name,
    types::format_date,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::warn;

/// Header plus rows of text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: Vec<String>, records: Vec<Vec<String>>) -> Self {
        Self { header, records }
    }
}

/// How parsing treats a card number that occurs on more than one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail on the first repeated card number.
    #[default]
    Strict,
    /// Keep the first row for the card and ignore the rest, with a warning.
    Lenient,
}

/// Warning for a card number repeated on several rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCard {
    pub card: CardNumber,
    /// Row that was kept.
    pub row: usize,
    /// Rows that were ignored.
    pub ignored: Vec<usize>,
}

impl fmt::Display for DuplicateCard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rows: Vec<String> = self.ignored.iter().map(ToString::to_string).collect();
        write!(
            f,
            "Duplicate card number {} (kept row {}, ignored rows {})",
            self.card,
            self.row,
            rows.join(", ")
        )
    }
}

/// Result of parsing a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    pub acl: Acl,
    /// One entry per duplicated card number, in card-number order.
    pub warnings: Vec<DuplicateCard>,
}

/// Column positions of a parsed header.
#[derive(Debug)]
struct HeaderIndex {
    card_number: usize,
    from: usize,
    to: usize,
    /// Per device with named doors: `(door, column, column name)`.
    doors: BTreeMap<DeviceId, Vec<(u8, usize, String)>>,
}

impl HeaderIndex {
    fn parse(header: &[String], devices: &[Device]) -> Result<Self> {
        let mut columns: HashMap<String, usize> = HashMap::new();

        for (ix, cell) in header.iter().enumerate() {
            let key = normalize_name(cell);
            if key.is_empty() {
                continue;
            }
            if columns.insert(key, ix).is_some() {
                return Err(AclError::DuplicateColumn(cell.trim().to_string()));
            }
        }

        let required = |name: &str| {
            columns
                .get(&normalize_name(name))
                .copied()
                .ok_or_else(|| AclError::MissingColumn(name.to_string()))
        };

        let card_number = required(COLUMN_CARD_NUMBER)?;
        let from = required(COLUMN_FROM)?;
        let to = required(COLUMN_TO)?;

        let mut doors = BTreeMap::new();
        for device in devices {
            let mut slots = Vec::new();
            for (door, name) in device.named_doors() {
                let column = columns.get(&normalize_name(name)).copied().ok_or_else(|| {
                    AclError::MissingDoorColumn {
                        name: name.to_string(),
                        device: device.id,
                        door,
                    }
                })?;
                slots.push((door, column, header[column].trim().to_string()));
            }
            if !slots.is_empty() {
                doors.insert(device.id, slots);
            }
        }

        Ok(Self {
            card_number,
            from,
            to,
            doors,
        })
    }
}

fn field<'r>(record: &'r [String], column: usize, row: usize, name: &str) -> Result<&'r str> {
    record
        .get(column)
        .map(|value| value.trim())
        .ok_or_else(|| AclError::MissingField {
            row,
            field: name.to_string(),
        })
}

fn parse_date_field(record: &[String], column: usize, row: usize, name: &str) -> Result<NaiveDate> {
    let value = field(record, column, row, name)?;
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| AclError::invalid_field(row, name, value, e))
}

/// Parse a table into a per-device ACL.
///
/// Every configured device gets an entry in the ACL. Each row yields one
/// card for every device with at least one named door. Rows are numbered
/// from 1, not counting the header.
///
/// # Errors
///
/// - Configuration errors if door names are not unique.
/// - `AclError::DuplicateColumn`, `AclError::MissingColumn` or
///   `AclError::MissingDoorColumn` for a bad header.
/// - `AclError::InvalidField` or `AclError::MissingField` for a bad row.
/// - `AclError::DuplicateCard` for a repeated card number under
///   [`DuplicatePolicy::Strict`].
///
/// # Examples
///
/// ```
/// use gatekeeper_acl::table::{DuplicatePolicy, Table, parse_table};
/// use gatekeeper_core::{CardNumber, Device, DeviceId};
///
/// let devices = vec![Device::new(DeviceId::new(12345).unwrap(), ["Front Door", "Side Door"]).unwrap()];
/// let table = Table::new(
///     vec!["Card Number".into(), "From".into(), "To".into(), "Side Door".into(), "Front Door".into()],
///     vec![vec!["65537".into(), "2020-01-02".into(), "2020-10-31".into(), "N".into(), "Y".into()]],
/// );
///
/// let parsed = parse_table(&table, &devices, DuplicatePolicy::Strict).unwrap();
/// let card = &parsed.acl.cards(devices[0].id).unwrap()[&CardNumber::new(65537)];
/// assert_eq!(card.to_string(), "65537 2020-01-02 2020-10-31 Y N N N");
/// ```
pub fn parse_table(table: &Table, devices: &[Device], policy: DuplicatePolicy) -> Result<Parsed> {
    DoorResolver::new(devices)?;
    let index = HeaderIndex::parse(&table.header, devices)?;

    let mut acl = Acl::for_devices(devices);
    let mut seen: HashMap<CardNumber, usize> = HashMap::new();
    let mut duplicates: BTreeMap<CardNumber, DuplicateCard> = BTreeMap::new();

    for (ix, record) in table.records.iter().enumerate() {
        let row = ix + 1;

        let value = field(record, index.card_number, row, COLUMN_CARD_NUMBER)?;
        let card_number = value
            .parse::<u32>()
            .map(CardNumber::new)
            .map_err(|e| AclError::invalid_field(row, COLUMN_CARD_NUMBER, value, e))?;

        if let Some(&first) = seen.get(&card_number) {
            match policy {
                DuplicatePolicy::Strict => {
                    return Err(AclError::DuplicateCard {
                        card: card_number,
                        row,
                    });
                }
                DuplicatePolicy::Lenient => {
                    warn!(card = %card_number, row, kept = first, "Ignoring duplicate card number");
                    duplicates
                        .entry(card_number)
                        .or_insert_with(|| DuplicateCard {
                            card: card_number,
                            row: first,
                            ignored: Vec::new(),
                        })
                        .ignored
                        .push(row);
                    continue;
                }
            }
        }

        let from = parse_date_field(record, index.from, row, COLUMN_FROM)?;
        let to = parse_date_field(record, index.to, row, COLUMN_TO)?;

        let mut cards = Vec::with_capacity(index.doors.len());
        for (device, slots) in &index.doors {
            let mut doors = Doors::denied();
            for (door, column, name) in slots {
                let value = field(record, *column, row, name)?;
                let permission = Permission::parse(value)
                    .map_err(|e| AclError::invalid_field(row, name.as_str(), value, e))?;
                doors.set(*door, permission)?;
            }
            cards.push((*device, Card::new(card_number, from, to, doors)));
        }
        seen.insert(card_number, row);

        for (device, card) in cards {
            acl.insert_card(device, card);
        }
    }

    Ok(Parsed {
        acl,
        warnings: duplicates.into_values().collect(),
    })
}

/// Render an ACL as a table.
///
/// Each card number becomes one row, merged across the devices holding it:
/// the window runs from the earliest `From` to the latest `To`, and each
/// device's door permissions fill that device's columns. Doors on devices
/// that do not hold the card read `N`. Rows are sorted by card number.
///
/// # Errors
///
/// Returns a configuration error if door names are not unique,
/// `AclError::MissingDeviceAcl` if a configured device has no entry in
/// `acl`, `AclError::MissingDoorColumn` if a named door has no column, or
/// `AclError::UnnamedDoor` if a card grants access through a door slot
/// that has no name.
pub fn make_table(acl: &Acl, devices: &[Device]) -> Result<Table> {
    let resolver = DoorResolver::new(devices)?;

    let mut header: Vec<String> = vec![
        COLUMN_CARD_NUMBER.to_string(),
        COLUMN_FROM.to_string(),
        COLUMN_TO.to_string(),
    ];
    header.extend(resolver.resolve_all().map(ToString::to_string));

    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .skip(REQUIRED_COLUMNS)
        .map(|(ix, name)| (normalize_name(name), ix - REQUIRED_COLUMNS))
        .collect();
    let door_columns = columns.len();

    let mut ordered: Vec<&Device> = devices.iter().collect();
    ordered.sort_by_key(|device| device.id);

    let mut rows: BTreeMap<CardNumber, (DateRange, Vec<Permission>)> = BTreeMap::new();
    for device in ordered {
        let cards = acl
            .cards(device.id)
            .ok_or(AclError::MissingDeviceAcl(device.id))?;

        let mut slots = HashMap::new();
        for (door, name) in device.named_doors() {
            let column = columns.get(&normalize_name(name)).copied().ok_or_else(|| {
                AclError::MissingDoorColumn {
                    name: name.to_string(),
                    device: device.id,
                    door,
                }
            })?;
            slots.insert(door, column);
        }

        for card in cards.values() {
            let (window, permissions) = rows
                .entry(card.card_number)
                .or_insert_with(|| (card.window(), vec![Permission::Denied; door_columns]));
            *window = window.union(card.window());

            for (door, permission) in card.doors.iter() {
                if !permission.is_granted() {
                    continue;
                }
                let column = slots.get(&door).ok_or(AclError::UnnamedDoor {
                    card: card.card_number,
                    device: device.id,
                    door,
                })?;
                permissions[*column] = permission;
            }
        }
    }

    let records = rows
        .into_iter()
        .map(|(card, (window, permissions))| {
            let mut record = vec![
                card.to_string(),
                format_date(window.from),
                format_date(window.to),
            ];
            record.extend(permissions.iter().map(ToString::to_string));
            record
        })
        .collect();

    Ok(Table { header, records })
}
