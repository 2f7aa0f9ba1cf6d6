//! Shared constants for the access-control data model.
//!
//! # Tabular Format
//!
//! The tabular representation of an ACL always starts with three required
//! columns followed by one column per named door:
//!
//! ```text
//! Card Number  From        To          Front Door  Side Door  Garage  Workshop
//! 65537        2020-01-02  2020-10-31  Y           N          N       N
//! ```
//!
//! Column names are matched after [`normalize_name`](crate::types::normalize_name),
//! so `"Card Number"`, `"card number"` and `"CARDNUMBER"` are the same column.

// ============================================================================
// Device Layout
// ============================================================================

/// Maximum number of door slots on a single controller.
///
/// Cards carry one permission per slot; unused slots are always denied.
pub const MAX_DOORS: usize = 4;

// ============================================================================
// Permissions
// ============================================================================

/// Smallest valid time profile ID.
///
/// Profile IDs 0 and 1 are reserved by the controllers for "denied" and
/// "always allowed".
pub const MIN_PROFILE_ID: u8 = 2;

/// Largest valid time profile ID.
pub const MAX_PROFILE_ID: u8 = 254;

/// Text rendering of an always-allowed door.
pub const PERMISSION_ALLOWED: &str = "Y";

/// Text rendering of a denied door.
pub const PERMISSION_DENIED: &str = "N";

// ============================================================================
// Dates
// ============================================================================

/// ISO 8601 calendar date format used for validity windows.
///
/// # Examples
///
/// ```
/// use gatekeeper_core::constants::DATE_FORMAT;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::parse_from_str("2020-01-02", DATE_FORMAT).unwrap();
/// assert_eq!(date.format(DATE_FORMAT).to_string(), "2020-01-02");
/// ```
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Table Columns
// ============================================================================

/// Header of the required card number column.
pub const COLUMN_CARD_NUMBER: &str = "Card Number";

/// Header of the required validity start column.
pub const COLUMN_FROM: &str = "From";

/// Header of the required validity end column.
pub const COLUMN_TO: &str = "To";

/// Number of required columns preceding the door columns.
pub const REQUIRED_COLUMNS: usize = 3;

/// Door-list wildcard that expands to every configured door.
pub const ALL_DOORS: &str = "ALL";
