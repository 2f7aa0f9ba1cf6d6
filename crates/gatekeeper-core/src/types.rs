use crate::{
    Result,
    constants::{DATE_FORMAT, MAX_PROFILE_ID, MIN_PROFILE_ID, PERMISSION_ALLOWED, PERMISSION_DENIED},
    error::Error,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller serial number.
///
/// Device IDs are process-unique and never zero (zero is the broadcast
/// address on the controllers' wire protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DeviceId(u32);

impl DeviceId {
    /// Create a new device ID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceId` if the ID is zero.
    pub fn new(id: u32) -> Result<Self> {
        if id == 0 {
            return Err(Error::InvalidDeviceId("device ID must be non-zero".to_string()));
        }
        Ok(DeviceId(id))
    }

    /// Get the raw serial number.
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidDeviceId(s.to_string()))?;
        DeviceId::new(id)
    }
}

impl TryFrom<u32> for DeviceId {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self> {
        DeviceId::new(id)
    }
}

impl From<DeviceId> for u32 {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// Card number, the key of a card record within one device's ACL.
///
/// Card numbers are unsigned 32-bit integers. They are unique per device,
/// not globally: the same card number normally appears on every device the
/// card holder may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardNumber(u32);

impl CardNumber {
    #[must_use]
    pub const fn new(number: u32) -> Self {
        CardNumber(number)
    }

    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let number: u32 = s
            .trim()
            .parse()
            .map_err(|e| Error::InvalidCardNumber(format!("'{s}' ({e})")))?;
        Ok(CardNumber(number))
    }
}

impl From<u32> for CardNumber {
    fn from(number: u32) -> Self {
        CardNumber(number)
    }
}

/// Reference to a time profile defined on the controller (2-254).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ProfileId(u8);

impl ProfileId {
    /// Create a new time profile ID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidProfileId` if the ID is outside 2-254.
    pub fn new(id: u8) -> Result<Self> {
        if !(MIN_PROFILE_ID..=MAX_PROFILE_ID).contains(&id) {
            return Err(Error::InvalidProfileId {
                value: u32::from(id),
                min: MIN_PROFILE_ID,
                max: MAX_PROFILE_ID,
            });
        }
        Ok(ProfileId(id))
    }

    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ProfileId {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self> {
        ProfileId::new(id)
    }
}

impl From<ProfileId> for u8 {
    fn from(id: ProfileId) -> Self {
        id.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access permission for a single door.
///
/// Serialized as `false` (denied), `true` (allowed) or the profile ID.
/// Deserialization also accepts the tabular text forms understood by
/// [`Permission::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawPermission", into = "RawPermission")]
pub enum Permission {
    /// No access through this door.
    #[default]
    Denied,
    /// Access at any time within the card's validity window.
    Allowed,
    /// Access governed by a time profile defined on the controller.
    TimeProfile(ProfileId),
}

impl Permission {
    /// Returns `true` for anything other than [`Permission::Denied`].
    #[inline]
    #[must_use]
    pub fn is_granted(self) -> bool {
        !matches!(self, Permission::Denied)
    }

    /// Parse the tabular cell encoding: `Y`, `N` or a profile ID.
    ///
    /// `true` and `false` are accepted as shorthand for `Y` and `N`.
    ///
    /// # Errors
    /// Returns `Error::InvalidPermission` for any other text and
    /// `Error::InvalidProfileId` for out-of-range numbers.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatekeeper_core::Permission;
    ///
    /// assert_eq!(Permission::parse("Y").unwrap(), Permission::Allowed);
    /// assert_eq!(Permission::parse(" n ").unwrap(), Permission::Denied);
    /// assert_eq!(Permission::parse("29").unwrap().to_string(), "29");
    /// assert_eq!(Permission::parse("true").unwrap(), Permission::Allowed);
    /// assert!(Permission::parse("maybe").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let value = s.trim();

        if value.eq_ignore_ascii_case(PERMISSION_ALLOWED) || value.eq_ignore_ascii_case("true") {
            return Ok(Permission::Allowed);
        }

        if value.eq_ignore_ascii_case(PERMISSION_DENIED) || value.eq_ignore_ascii_case("false") {
            return Ok(Permission::Denied);
        }

        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            let id: u32 = value
                .parse()
                .map_err(|_| Error::InvalidPermission(value.to_string()))?;
            let id = u8::try_from(id).map_err(|_| Error::InvalidProfileId {
                value: id,
                min: MIN_PROFILE_ID,
                max: MAX_PROFILE_ID,
            })?;
            return Ok(Permission::TimeProfile(ProfileId::new(id)?));
        }

        Err(Error::InvalidPermission(value.to_string()))
    }
}

/// Wire forms of a [`Permission`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPermission {
    Flag(bool),
    Profile(u64),
    Text(String),
}

impl TryFrom<RawPermission> for Permission {
    type Error = Error;

    fn try_from(raw: RawPermission) -> Result<Self> {
        match raw {
            RawPermission::Flag(allowed) => Ok(Permission::from(allowed)),
            RawPermission::Profile(id) => {
                let id = u8::try_from(id).map_err(|_| Error::InvalidProfileId {
                    value: u32::try_from(id).unwrap_or(u32::MAX),
                    min: MIN_PROFILE_ID,
                    max: MAX_PROFILE_ID,
                })?;
                Ok(Permission::TimeProfile(ProfileId::new(id)?))
            }
            RawPermission::Text(text) => Permission::parse(&text),
        }
    }
}

impl From<Permission> for RawPermission {
    fn from(permission: Permission) -> Self {
        match permission {
            Permission::Denied => RawPermission::Flag(false),
            Permission::Allowed => RawPermission::Flag(true),
            Permission::TimeProfile(id) => RawPermission::Profile(u64::from(id.as_u8())),
        }
    }
}

impl From<bool> for Permission {
    fn from(allowed: bool) -> Self {
        if allowed {
            Permission::Allowed
        } else {
            Permission::Denied
        }
    }
}

impl From<ProfileId> for Permission {
    fn from(profile: ProfileId) -> Self {
        Permission::TimeProfile(profile)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Permission::Denied => write!(f, "{PERMISSION_DENIED}"),
            Permission::Allowed => write!(f, "{PERMISSION_ALLOWED}"),
            Permission::TimeProfile(id) => write!(f, "{id}"),
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Permission::parse(s)
    }
}

/// Inclusive calendar-date validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    #[must_use]
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Create a window, rejecting one whose start is after its end.
    ///
    /// # Errors
    /// Returns `Error::InvalidDateRange` if `from > to`.
    pub fn checked(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidDateRange {
                from: format_date(from),
                to: format_date(to),
            });
        }
        Ok(Self { from, to })
    }

    /// Smallest window covering both `self` and `other`.
    #[must_use]
    pub fn union(self, other: DateRange) -> DateRange {
        DateRange {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", format_date(self.from), format_date(self.to))
    }
}

/// Parse an ISO 8601 calendar date (`YYYY-MM-DD`).
///
/// # Errors
/// Returns `Error::InvalidDate` if the text is not a valid date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let value = s.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| Error::InvalidDate {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Format a calendar date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Normalize a door or column name for comparison.
///
/// Lower-cases and strips all whitespace, so `"Front Door"`, `"front door"`
/// and `"FrontDoor\t"` compare equal.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("12345", 12345)]
    #[case(" 54321 ", 54321)]
    #[case("405419896", 405_419_896)]
    fn test_device_id_valid(#[case] input: &str, #[case] expected: u32) {
        let id: DeviceId = input.parse().unwrap();
        assert_eq!(id.as_u32(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("abc")]
    #[case("4294967296")]
    fn test_device_id_invalid(#[case] input: &str) {
        let result: Result<DeviceId> = input.parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_device_id_serde_rejects_zero() {
        assert!(serde_json::from_str::<DeviceId>("0").is_err());
        assert_eq!(
            serde_json::from_str::<DeviceId>("12345").unwrap().as_u32(),
            12345
        );
    }

    #[rstest]
    #[case("65537", 65537)]
    #[case("0", 0)]
    #[case("4294967295", u32::MAX)]
    fn test_card_number_valid(#[case] input: &str, #[case] expected: u32) {
        let card: CardNumber = input.parse().unwrap();
        assert_eq!(card.as_u32(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("4294967296")]
    #[case("12a")]
    fn test_card_number_invalid(#[case] input: &str) {
        assert!(input.parse::<CardNumber>().is_err());
    }

    #[rstest]
    #[case(2)]
    #[case(100)]
    #[case(254)]
    fn test_profile_id_valid(#[case] id: u8) {
        assert_eq!(ProfileId::new(id).unwrap().as_u8(), id);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(255)]
    fn test_profile_id_invalid(#[case] id: u8) {
        assert!(matches!(
            ProfileId::new(id),
            Err(Error::InvalidProfileId { .. })
        ));
    }

    #[rstest]
    #[case("Y", Permission::Allowed)]
    #[case("y", Permission::Allowed)]
    #[case("N", Permission::Denied)]
    #[case(" N ", Permission::Denied)]
    #[case("2", Permission::TimeProfile(ProfileId(2)))]
    #[case("254", Permission::TimeProfile(ProfileId(254)))]
    #[case("true", Permission::Allowed)]
    #[case("FALSE", Permission::Denied)]
    fn test_permission_parse(#[case] input: &str, #[case] expected: Permission) {
        assert_eq!(Permission::parse(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("X")]
    #[case("yes")]
    #[case("truthy")]
    #[case("1")]
    #[case("255")]
    #[case("1000")]
    fn test_permission_parse_invalid(#[case] input: &str) {
        assert!(Permission::parse(input).is_err());
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(Permission::Denied.to_string(), "N");
        assert_eq!(Permission::Allowed.to_string(), "Y");
        assert_eq!(
            Permission::TimeProfile(ProfileId::new(29).unwrap()).to_string(),
            "29"
        );
    }

    #[test]
    fn test_permission_from_bool() {
        assert_eq!(Permission::from(true), Permission::Allowed);
        assert_eq!(Permission::from(false), Permission::Denied);
        assert!(!Permission::from(false).is_granted());
        assert!(Permission::TimeProfile(ProfileId(7)).is_granted());
    }

    #[rstest]
    #[case("true", Permission::Allowed)]
    #[case("false", Permission::Denied)]
    #[case("29", Permission::TimeProfile(ProfileId(29)))]
    #[case(r#""Y""#, Permission::Allowed)]
    #[case(r#""n""#, Permission::Denied)]
    #[case(r#""7""#, Permission::TimeProfile(ProfileId(7)))]
    fn test_permission_deserialize(#[case] json: &str, #[case] expected: Permission) {
        assert_eq!(serde_json::from_str::<Permission>(json).unwrap(), expected);
    }

    #[rstest]
    #[case("1")]
    #[case("255")]
    #[case("-3")]
    #[case(r#""maybe""#)]
    #[case("null")]
    fn test_permission_deserialize_invalid(#[case] json: &str) {
        assert!(serde_json::from_str::<Permission>(json).is_err());
    }

    #[test]
    fn test_permission_serialize_round_trip() {
        let permissions = [
            Permission::Denied,
            Permission::Allowed,
            Permission::TimeProfile(ProfileId(29)),
        ];
        let json = serde_json::to_string(&permissions).unwrap();
        assert_eq!(json, "[false,true,29]");

        let back: [Permission; 3] = serde_json::from_str(&json).unwrap();
        assert_eq!(back, permissions);
    }

    #[test]
    fn test_date_range_union() {
        let a = DateRange::new(parse_date("2020-02-03").unwrap(), parse_date("2020-11-30").unwrap());
        let b = DateRange::new(parse_date("2020-01-01").unwrap(), parse_date("2020-10-31").unwrap());

        let merged = a.union(b);
        assert_eq!(merged.from, parse_date("2020-01-01").unwrap());
        assert_eq!(merged.to, parse_date("2020-11-30").unwrap());
        assert_eq!(merged.to_string(), "2020-01-01 2020-11-30");
    }

    #[test]
    fn test_date_range_checked() {
        let from = parse_date("2020-12-31").unwrap();
        let to = parse_date("2020-01-01").unwrap();
        assert!(DateRange::checked(from, to).is_err());
        assert!(DateRange::checked(to, from).is_ok());
    }

    #[rstest]
    #[case("2020-13-01")]
    #[case("2020/01/01")]
    #[case("")]
    fn test_parse_date_invalid(#[case] input: &str) {
        assert!(matches!(parse_date(input), Err(Error::InvalidDate { .. })));
    }

    #[rstest]
    #[case("Front Door", "frontdoor")]
    #[case("  Card Number ", "cardnumber")]
    #[case("Front\t", "front")]
    #[case("GARAGE", "garage")]
    fn test_normalize_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(input), expected);
    }
}
