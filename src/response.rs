//! Decoded response classification shared by both codecs
//!
//! Every raw buffer classifies into exactly one [`DecodedResponse`]; no
//! input, however short or corrupted, makes the decoders panic.
//! Classification stops at the first structural problem it can prove, and
//! register values are never surfaced past a failed CRC check.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::constants::{
    CRC_LEN, EXCEPTION_ACKNOWLEDGE, EXCEPTION_DEVICE_BUSY, EXCEPTION_DEVICE_FAILURE,
    EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_DATA_VALUE, EXCEPTION_ILLEGAL_FUNCTION,
    MIN_RESPONSE_LEN,
};
use crate::crc::crc16;
use crate::protocol::SerialNumber;

/// Classification of a raw response buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseKind {
    /// Frame valid, payload decoded
    Success,
    /// Device rejected the operation with a protocol exception
    Exception,
    /// CRC trailer does not match the frame contents
    ChecksumMismatch,
    /// Buffer shorter than the minimum viable response; keep reading
    Truncated,
    /// Function code this codec does not decode
    UnsupportedFunction,
    /// Structurally inconsistent frame despite a valid CRC
    Malformed,
}

impl ResponseKind {
    /// Whether the payload in `values` can be trusted
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseKind::Success)
    }

    /// Whether the caller should collect more bytes before reclassifying
    pub fn needs_more_data(&self) -> bool {
        matches!(self, ResponseKind::Truncated)
    }
}

/// Decoded response: constructed once per raw buffer, immutable
///
/// Block reads key `values` by **offset from the request's start
/// register**: the wire does not repeat the start address, and the codec
/// keeps no memory of the request. Callers retain the start register and
/// re-key with [`Self::values_from`] when they need absolute numbers.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedResponse {
    /// Classification of the buffer
    pub kind: ResponseKind,
    /// Device address byte, when the buffer carried one
    pub address: Option<u8>,
    /// Function code with the exception flag stripped
    pub function: Option<u8>,
    /// Register values keyed by offset from the request's start register
    pub values: BTreeMap<u16, u16>,
    /// Exception code reported by the device (taxonomy in [`exception_description`])
    pub exception_code: Option<u8>,
    /// Register (or start register) echoed by write responses
    pub register: Option<u16>,
    /// Serial number reported in a 10-byte read payload (Proprietary framing)
    pub reported_serial: Option<SerialNumber>,
    /// Human-readable diagnostic
    pub info: String,
}

impl DecodedResponse {
    fn empty(kind: ResponseKind, info: String) -> Self {
        Self {
            kind,
            address: None,
            function: None,
            values: BTreeMap::new(),
            exception_code: None,
            register: None,
            reported_serial: None,
            info,
        }
    }

    pub(crate) fn truncated(len: usize) -> Self {
        Self::empty(
            ResponseKind::Truncated,
            format!(
                "buffer of {} bytes is shorter than the {}-byte minimum response",
                len, MIN_RESPONSE_LEN
            ),
        )
    }

    pub(crate) fn checksum_mismatch(address: u8, function: u8, expected: u16, received: u16) -> Self {
        let mut response = Self::empty(
            ResponseKind::ChecksumMismatch,
            format!(
                "CRC mismatch: expected 0x{:04X}, got 0x{:04X}",
                expected, received
            ),
        );
        response.address = Some(address);
        response.function = Some(function);
        response
    }

    pub(crate) fn exception(address: u8, function: u8, code: u8) -> Self {
        let mut response = Self::empty(
            ResponseKind::Exception,
            format!(
                "device exception {} ({}) for function {}",
                code,
                exception_description(code),
                function
            ),
        );
        response.address = Some(address);
        response.function = Some(function);
        response.exception_code = Some(code);
        response
    }

    pub(crate) fn malformed(address: u8, function: u8, info: String) -> Self {
        let mut response = Self::empty(ResponseKind::Malformed, info);
        response.address = Some(address);
        response.function = Some(function);
        response
    }

    pub(crate) fn unsupported(address: u8, function: u8) -> Self {
        let mut response = Self::empty(
            ResponseKind::UnsupportedFunction,
            format!("unsupported function code 0x{:02X}", function),
        );
        response.address = Some(address);
        response.function = Some(function);
        response
    }

    pub(crate) fn success(
        address: u8,
        function: u8,
        values: BTreeMap<u16, u16>,
        register: Option<u16>,
        reported_serial: Option<SerialNumber>,
        info: String,
    ) -> Self {
        Self {
            kind: ResponseKind::Success,
            address: Some(address),
            function: Some(function),
            values,
            exception_code: None,
            register,
            reported_serial,
            info,
        }
    }

    /// Re-key block-read values by absolute register number
    ///
    /// `start` is the start register of the request that produced this
    /// response. Offsets past the end of the register space saturate.
    pub fn values_from(&self, start: u16) -> BTreeMap<u16, u16> {
        self.values
            .iter()
            .map(|(offset, value)| (start.saturating_add(*offset), *value))
            .collect()
    }
}

/// Verify the little-endian CRC trailer of a response buffer
///
/// Shared gate for both decoders: returns the `ChecksumMismatch`
/// classification on failure so parsing stops before any payload is
/// touched. Callers guarantee `buf.len() >= MIN_RESPONSE_LEN`.
pub(crate) fn verify_frame_crc(buf: &[u8], address: u8, function: u8) -> Option<DecodedResponse> {
    let split = buf.len() - CRC_LEN;
    let expected = crc16(&buf[..split]);
    let received = u16::from_le_bytes([buf[split], buf[split + 1]]);
    if expected != received {
        warn!(
            "frame [{}] failed CRC verification: expected 0x{:04X}, got 0x{:04X}",
            hex::encode(buf),
            expected,
            received
        );
        return Some(DecodedResponse::checksum_mismatch(
            address, function, expected, received,
        ));
    }
    None
}

/// Human-readable description for a device exception code
///
/// The codec passes the numeric code through; this table is for
/// diagnostics and user messages.
pub fn exception_description(code: u8) -> &'static str {
    match code {
        EXCEPTION_ILLEGAL_FUNCTION => "Illegal Function",
        EXCEPTION_ILLEGAL_DATA_ADDRESS => "Illegal Data Address",
        EXCEPTION_ILLEGAL_DATA_VALUE => "Illegal Data Value",
        EXCEPTION_DEVICE_FAILURE => "Device Failure",
        EXCEPTION_ACKNOWLEDGE => "Acknowledge",
        EXCEPTION_DEVICE_BUSY => "Device Busy",
        _ => "Unknown Exception",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_descriptions() {
        let expected = [
            (0x01, "Illegal Function"),
            (0x02, "Illegal Data Address"),
            (0x03, "Illegal Data Value"),
            (0x04, "Device Failure"),
            (0x05, "Acknowledge"),
            (0x06, "Device Busy"),
        ];
        for (code, description) in expected {
            assert_eq!(exception_description(code), description);
        }
        assert_eq!(exception_description(0x42), "Unknown Exception");
    }

    #[test]
    fn test_kind_helpers() {
        assert!(ResponseKind::Success.is_success());
        assert!(!ResponseKind::Exception.is_success());
        assert!(ResponseKind::Truncated.needs_more_data());
        assert!(!ResponseKind::Malformed.needs_more_data());
    }

    #[test]
    fn test_values_from_rekeys_by_absolute_register() {
        let mut values = BTreeMap::new();
        values.insert(0u16, 123);
        values.insert(1u16, 456);
        let response =
            DecodedResponse::success(1, 4, values, None, None, "read 2 registers".to_string());

        let absolute = response.values_from(115);
        assert_eq!(absolute.get(&115), Some(&123));
        assert_eq!(absolute.get(&116), Some(&456));
    }

    #[test]
    fn test_values_from_saturates_at_register_ceiling() {
        let mut values = BTreeMap::new();
        values.insert(0u16, 1);
        values.insert(1u16, 2);
        let response = DecodedResponse::success(1, 3, values, None, None, String::new());

        let absolute = response.values_from(u16::MAX);
        // Both offsets clamp to the last register number
        assert_eq!(absolute.len(), 1);
        assert_eq!(absolute.get(&u16::MAX), Some(&2));
    }

    #[test]
    fn test_exception_carries_code_and_description() {
        let response = DecodedResponse::exception(1, 4, 2);
        assert_eq!(response.kind, ResponseKind::Exception);
        assert_eq!(response.exception_code, Some(2));
        assert!(response.info.contains("Illegal Data Address"));
    }
}
