//! Error types for the ACL engine.
//!
//! Variants fall into three groups: configuration errors raised before any
//! device I/O, parse errors for tabular input, and device errors from the
//! controller API. [`AclError::is_config`], [`AclError::is_parse`] and
//! [`AclError::is_device`] classify an error by group.

use gatekeeper_core::{CardNumber, DeviceId};
use gatekeeper_device::DeviceError;

/// Result type alias for ACL engine operations.
pub type Result<T> = std::result::Result<T, AclError>;

/// Errors raised by the ACL engine.
#[derive(Debug, thiserror::Error)]
pub enum AclError {
    // ========================================================================
    // Configuration
    // ========================================================================
    /// The same door name is configured on two different devices.
    #[error("Ambiguous reference to door '{door}': defined for both devices {first} and {second}")]
    AmbiguousDoor {
        door: String,
        first: DeviceId,
        second: DeviceId,
    },

    /// The same door name is configured twice on one device.
    #[error("Door '{door}' is defined more than once on device {device}")]
    DuplicateDoor { door: String, device: DeviceId },

    /// A door name that no configured device defines.
    #[error("Door '{0}' is not defined in the device configuration")]
    UnknownDoor(String),

    /// A configured device has no entry in the ACL being rendered.
    #[error("ACL missing for device {0}")]
    MissingDeviceAcl(DeviceId),

    /// A configured door has no column in a table header.
    #[error("Missing column for door '{name}' (device {device}, door {door})")]
    MissingDoorColumn {
        name: String,
        device: DeviceId,
        door: u8,
    },

    /// A card grants access through a door slot that has no name, so a
    /// table cannot represent it.
    #[error("Card {card} has access through unnamed door {door} on device {device}")]
    UnnamedDoor {
        card: CardNumber,
        device: DeviceId,
        door: u8,
    },

    // ========================================================================
    // Parse
    // ========================================================================
    /// A required column is absent from a table header.
    #[error("Missing '{0}' column")]
    MissingColumn(String),

    /// Two header cells name the same column.
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// A field could not be parsed. Rows are numbered from 1, excluding the header.
    #[error("Row {row}: invalid {field} '{value}': {reason}")]
    InvalidField {
        row: usize,
        field: String,
        value: String,
        reason: String,
    },

    /// A row is shorter than the header.
    #[error("Row {row}: missing {field}")]
    MissingField { row: usize, field: String },

    /// A card number occurs on more than one row.
    #[error("Duplicate card number {card} (row {row})")]
    DuplicateCard { card: CardNumber, row: usize },

    /// The table has no header row.
    #[error("Table has no header row")]
    EmptyTable,

    /// Malformed TSV input or a failed TSV write.
    #[error("TSV error: {0}")]
    Tsv(#[from] csv::Error),

    /// I/O error while writing a rendered table.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Device
    // ========================================================================
    /// A controller call failed.
    #[error("Device {device}: {source}")]
    Device {
        device: DeviceId,
        #[source]
        source: DeviceError,
    },

    /// A controller answered but refused to store a card.
    #[error("Failed to update access rights for card '{card}' on device '{device}'")]
    WriteRejected { device: DeviceId, card: CardNumber },

    /// A per-device reconcile task panicked.
    #[error("Reconcile task for device {device} panicked: {message}")]
    TaskPanicked { device: DeviceId, message: String },

    /// One or more devices failed while the operation continued past them.
    #[error("{} device(s) failed: {}", .0.len(), summarize_failures(.0))]
    Devices(Vec<DeviceFailure>),

    /// Invalid value in the data model.
    #[error(transparent)]
    Core(#[from] gatekeeper_core::Error),
}

impl AclError {
    /// Wrap a controller error with the device it came from.
    pub fn device(device: DeviceId, source: DeviceError) -> Self {
        Self::Device { device, source }
    }

    pub fn invalid_field(
        row: usize,
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidField {
            row,
            field: field.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousDoor { .. }
                | Self::DuplicateDoor { .. }
                | Self::UnknownDoor(_)
                | Self::MissingDeviceAcl(_)
                | Self::MissingDoorColumn { .. }
                | Self::UnnamedDoor { .. }
        )
    }

    /// Returns `true` for errors in tabular input.
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn(_)
                | Self::DuplicateColumn(_)
                | Self::InvalidField { .. }
                | Self::MissingField { .. }
                | Self::DuplicateCard { .. }
                | Self::EmptyTable
                | Self::Tsv(_)
        )
    }

    /// Returns `true` for errors raised by, or about, a controller.
    pub fn is_device(&self) -> bool {
        matches!(
            self,
            Self::Device { .. } | Self::WriteRejected { .. } | Self::TaskPanicked { .. } | Self::Devices(_)
        )
    }
}

/// A device-level failure collected while other devices carried on.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DeviceFailure {
    pub device: DeviceId,
    #[source]
    pub error: AclError,
}

impl DeviceFailure {
    pub fn new(device: DeviceId, error: AclError) -> Self {
        Self { device, error }
    }
}

fn summarize_failures(failures: &[DeviceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
