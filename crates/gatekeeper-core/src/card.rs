use crate::{
    CardNumber, DateRange, Permission, Result,
    constants::MAX_DOORS,
    error::Error,
    types::format_date,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-door permissions of a card, indexed by 1-based door slot.
///
/// Always holds [`MAX_DOORS`] slots; slots a device leaves unused stay
/// [`Permission::Denied`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Doors([Permission; MAX_DOORS]);

impl Doors {
    /// All doors denied.
    #[must_use]
    pub fn denied() -> Self {
        Doors([Permission::Denied; MAX_DOORS])
    }

    /// Build from an array of permissions in slot order.
    #[must_use]
    pub fn from_array(permissions: [Permission; MAX_DOORS]) -> Self {
        Doors(permissions)
    }

    /// Permission for a 1-based door slot.
    ///
    /// # Errors
    /// Returns `Error::DoorOutOfRange` for door 0 or a door above [`MAX_DOORS`].
    pub fn get(&self, door: u8) -> Result<Permission> {
        let ix = Self::index(door)?;
        Ok(self.0[ix])
    }

    /// Set the permission for a 1-based door slot.
    ///
    /// # Errors
    /// Returns `Error::DoorOutOfRange` for door 0 or a door above [`MAX_DOORS`].
    pub fn set(&mut self, door: u8, permission: Permission) -> Result<()> {
        let ix = Self::index(door)?;
        self.0[ix] = permission;
        Ok(())
    }

    /// Iterate `(door, permission)` pairs with 1-based door numbers.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Permission)> + '_ {
        (1u8..).zip(self.0.iter().copied())
    }

    /// Returns `true` if at least one door is not denied.
    #[must_use]
    pub fn any_granted(&self) -> bool {
        self.0.iter().any(|p| p.is_granted())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Permission] {
        &self.0
    }

    fn index(door: u8) -> Result<usize> {
        let ix = usize::from(door);
        if ix == 0 || ix > MAX_DOORS {
            return Err(Error::DoorOutOfRange {
                door,
                max: MAX_DOORS,
            });
        }
        Ok(ix - 1)
    }
}

impl From<[bool; MAX_DOORS]> for Doors {
    fn from(doors: [bool; MAX_DOORS]) -> Self {
        Doors(doors.map(Permission::from))
    }
}

impl From<[Permission; MAX_DOORS]> for Doors {
    fn from(doors: [Permission; MAX_DOORS]) -> Self {
        Doors(doors)
    }
}

impl fmt::Display for Doors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut separator = "";
        for permission in &self.0 {
            write!(f, "{separator}{permission}")?;
            separator = " ";
        }
        Ok(())
    }
}

/// One card record as stored on one controller.
///
/// Equality is deep: two cards are equal only if number, validity window
/// and every door permission match.
///
/// # Examples
///
/// ```
/// use gatekeeper_core::{Card, CardNumber, Doors};
/// use gatekeeper_core::types::parse_date;
///
/// let card = Card::new(
///     CardNumber::new(65537),
///     parse_date("2020-01-02").unwrap(),
///     parse_date("2020-10-31").unwrap(),
///     Doors::from([true, false, false, false]),
/// );
///
/// assert!(card.has_access());
/// assert_eq!(card.to_string(), "65537 2020-01-02 2020-10-31 Y N N N");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub card_number: CardNumber,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub doors: Doors,
}

impl Card {
    #[must_use]
    pub fn new(card_number: CardNumber, from: NaiveDate, to: NaiveDate, doors: Doors) -> Self {
        Self {
            card_number,
            from,
            to,
            doors,
        }
    }

    /// A card with the given window and every door denied.
    #[must_use]
    pub fn revoked(card_number: CardNumber, window: DateRange) -> Self {
        Self::new(card_number, window.from, window.to, Doors::denied())
    }

    /// Returns `false` when every door is denied ("no access").
    #[must_use]
    pub fn has_access(&self) -> bool {
        self.doors.any_granted()
    }

    #[must_use]
    pub fn window(&self) -> DateRange {
        DateRange::new(self.from, self.to)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.card_number,
            format_date(self.from),
            format_date(self.to),
            self.doors
        )
    }
}
