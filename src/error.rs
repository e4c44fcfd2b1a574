//! Error types for the codec
//!
//! Only the encode side and the register helpers return errors: a request
//! that cannot be expressed on the wire is refused before any bytes are
//! built. The decode side never errors; every raw buffer classifies into
//! a [`crate::response::DecodedResponse`] instead.

use thiserror::Error;

/// Result type for lxp-protocol operations
pub type LxpResult<T> = std::result::Result<T, LxpError>;

/// Errors raised while building frames or composing register values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LxpError {
    /// Request parameters that cannot be expressed on the wire
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serial identifiers that are not exactly 10 bytes
    #[error("Invalid serial number: {0}")]
    InvalidSerial(String),

    /// Bit window that does not fit a 16-bit register
    #[error("Invalid bit range: offset {offset} + width {width} exceeds 16 bits")]
    InvalidBitRange {
        /// Bit offset of the rejected window
        offset: u8,
        /// Width of the rejected window
        width: u8,
    },

    /// Addressing mode incompatible with the selected framing
    #[error("Addressing mismatch: {0}")]
    AddressingMismatch(String),
}

// Helper constructors, same shape as the string-carrying variants
impl LxpError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        LxpError::InvalidRequest(msg.into())
    }

    pub fn invalid_serial(msg: impl Into<String>) -> Self {
        LxpError::InvalidSerial(msg.into())
    }

    pub fn addressing_mismatch(msg: impl Into<String>) -> Self {
        LxpError::AddressingMismatch(msg.into())
    }
}
