//! # LXP Protocol: Inverter Register Frame Codec
//!
//! A bidirectional codec for the serial-over-TCP register protocol spoken
//! by LuxPower-style solar inverter / battery controllers behind
//! TCP-to-RS485 bridges. The crate builds request frames, classifies raw
//! response buffers, and verifies frame integrity. Everything else
//! (sockets, timeouts, retries, register meaning) belongs to the caller.
//!
//! Real hardware speaks two incompatible wire framings, both supported
//! behind one interface and selected by explicit configuration:
//!
//! | Framing | Addressing | Numeric fields | CRC trailer |
//! |---------|------------|----------------|-------------|
//! | Standard | single address byte | big-endian | CRC16, little-endian |
//! | Proprietary (LXP) | two 10-byte ASCII serials | little-endian | CRC16, little-endian |
//!
//! ## Supported operations
//!
//! | Code | Operation | Encode | Decode |
//! |------|-----------|--------|--------|
//! | 0x03 | Read Holding Registers | ✅ | ✅ |
//! | 0x04 | Read Input Registers | ✅ | ✅ |
//! | 0x06 | Write Single Register | ✅ | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ | ✅ |
//!
//! ## Quick start
//!
//! ```rust
//! use lxp_protocol::{Addressing, DeviceAddress, Framing, Operation, RegisterBank};
//!
//! let framing = Framing::Standard;
//! let addressing = Addressing::Standard(DeviceAddress::new(1));
//!
//! // Read two input registers starting at register 7
//! let frame = framing
//!     .encode(
//!         &addressing,
//!         &Operation::ReadRegisters {
//!             bank: RegisterBank::Input,
//!             start: 7,
//!             count: 2,
//!         },
//!     )
//!     .expect("valid request");
//! assert_eq!(&frame[..6], &[0x01, 0x04, 0x00, 0x07, 0x00, 0x02]);
//!
//! // Classify whatever the transport handed back
//! let response = framing.decode(&frame_from_device());
//! if response.kind.is_success() {
//!     // Values are keyed by offset from the request's start register
//!     let absolute = response.values_from(7);
//!     assert_eq!(absolute.get(&7), Some(&123));
//! }
//! # fn frame_from_device() -> Vec<u8> {
//! #     let mut f = vec![0x01, 0x04, 0x04, 0x00, 0x7B, 0x01, 0xC8];
//! #     let crc = lxp_protocol::crc16(&f);
//! #     f.extend_from_slice(&crc.to_le_bytes());
//! #     f
//! # }
//! ```
//!
//! The codec is pure and stateless: every entry point is a total function
//! from an input buffer to an immutable result, with no I/O and no shared
//! state, so it is safe to call from any number of threads. A
//! [`ResponseKind::Truncated`] classification is the caller's signal to
//! keep reading from the transport.

// ============================================================================
// Core modules
// ============================================================================

/// Bit-field extraction/composition for packed registers
pub mod bitfield;

/// Protocol constants: function codes, exception codes, frame sizes
pub mod constants;

/// CRC16 engine shared by both framings
pub mod crc;

/// Error types for frame construction and register helpers
pub mod error;

/// Proprietary (LXP) framing codec
pub mod proprietary;

/// Logical operations, addressing and framing selection
pub mod protocol;

/// Decoded response classification
pub mod response;

/// Standard (Modbus RTU) framing codec
pub mod standard;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Core types ===
pub use protocol::{
    Addressing, DeviceAddress, Framing, Operation, RegisterBank, SerialNumber, SerialPair,
};

// === Codecs ===
pub use proprietary::LxpCodec;
pub use standard::StandardCodec;

// === Responses ===
pub use response::{exception_description, DecodedResponse, ResponseKind};

// === Error handling ===
pub use error::{LxpError, LxpResult};

// === Register helpers ===
pub use bitfield::{get_bits, set_bits, BitField};

// === Frame integrity ===
pub use crc::{crc16, verify_trailing_crc};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compare a response buffer against the request that produced it
///
/// Misconfigured bridges are observed to echo requests byte-for-byte
/// instead of forwarding them to the device. The decoder cannot detect
/// this, since it has no access to the originating request, so the
/// transport layer runs this check before trusting a classification.
pub fn is_echo(request: &[u8], response: &[u8]) -> bool {
    !request.is_empty() && request == response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_echo() {
        let request = [0x01, 0x04, 0x00, 0x07, 0x00, 0x02, 0x00, 0x00];
        assert!(is_echo(&request, &request.clone()));
        assert!(!is_echo(&request, &request[..6]));
        // Empty exchanges are not echoes
        assert!(!is_echo(&[], &[]));
    }

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
