use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Identifier errors
    #[error("Invalid device ID: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid card number: {0}")]
    InvalidCardNumber(String),

    #[error("Time profile ID must be {min}-{max}, got {value}")]
    InvalidProfileId { value: u32, min: u8, max: u8 },

    // Value errors
    #[error("Invalid permission '{0}' (expected Y, N or a time profile ID)")]
    InvalidPermission(String),

    #[error("Invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange { from: String, to: String },

    // Device configuration errors
    #[error("Door {door} is out of range (1-{max})")]
    DoorOutOfRange { door: u8, max: usize },

    #[error("Device {device} defines {count} doors, maximum is {max}")]
    TooManyDoors {
        device: String,
        count: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
