//! Proprietary (LXP) framing codec
//!
//! Firmware variants that refuse plain single-address frames expect the
//! LXP layout instead: the frame still opens with one nominal address byte
//! and the function code, but the real addressing unit is a fixed 10-byte
//! ASCII serial region, and every numeric field is little-endian, the
//! exact opposite of the Standard framing. The CRC trailer is shared.
//!
//! A serial region of all ASCII zeros (`"0000000000"`) is the query
//! broadcast: it addresses no specific device and asks the device to
//! report its own serial number, which arrives as a 10-byte read payload.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::constants::{
    CRC_LEN, EXCEPTION_FLAG, FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS,
    FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER, LXP_NOMINAL_ADDRESS, MIN_RESPONSE_LEN,
    SERIAL_LEN, WRITE_ECHO_LEN,
};
use crate::crc::push_crc;
use crate::error::LxpResult;
use crate::protocol::{Operation, SerialNumber, SerialPair};
use crate::response::{verify_frame_crc, DecodedResponse};

/// Stateless codec for the Proprietary framing
pub struct LxpCodec;

impl LxpCodec {
    /// Encode `op` addressed to `serials`, returning a transport-ready frame
    ///
    /// The serial region carries the inverter serial; use
    /// [`SerialPair::query`] to broadcast a serial-number query instead of
    /// addressing a specific device.
    pub fn encode(serials: &SerialPair, op: &Operation) -> LxpResult<Vec<u8>> {
        op.validate()?;
        let frame = match op {
            Operation::ReadRegisters { bank, start, count } => {
                Self::build_read(&serials.inverter, bank.function_code(), *start, *count)
            }
            Operation::WriteRegister { register, value } => {
                Self::build_write_single(&serials.inverter, *register, *value)
            }
            Operation::WriteRegisters { start, values } => {
                Self::build_write_multiple(&serials.inverter, *start, values)
            }
        };
        debug!(
            dongle = %serials.dongle,
            inverter = %serials.inverter,
            function = op.function_code(),
            len = frame.len(),
            "built proprietary frame"
        );
        Ok(frame)
    }

    fn header(function: u8, serial: &SerialNumber, tail: usize) -> Vec<u8> {
        let mut frame = Vec::with_capacity(2 + SERIAL_LEN + tail + CRC_LEN);
        frame.push(LXP_NOMINAL_ADDRESS);
        frame.push(function);
        frame.extend_from_slice(serial.as_bytes());
        frame
    }

    fn build_read(serial: &SerialNumber, function: u8, start: u16, count: u16) -> Vec<u8> {
        let mut frame = Self::header(function, serial, 4);
        frame.extend_from_slice(&start.to_le_bytes());
        frame.extend_from_slice(&count.to_le_bytes());
        push_crc(&mut frame);
        frame
    }

    fn build_write_single(serial: &SerialNumber, register: u16, value: u16) -> Vec<u8> {
        let mut frame = Self::header(FC_WRITE_SINGLE_REGISTER, serial, 4);
        frame.extend_from_slice(&register.to_le_bytes());
        frame.extend_from_slice(&value.to_le_bytes());
        push_crc(&mut frame);
        frame
    }

    fn build_write_multiple(serial: &SerialNumber, start: u16, values: &[u16]) -> Vec<u8> {
        let mut frame = Self::header(FC_WRITE_MULTIPLE_REGISTERS, serial, 5 + values.len() * 2);
        frame.extend_from_slice(&start.to_le_bytes());
        frame.extend_from_slice(&(values.len() as u16).to_le_bytes());
        frame.push((values.len() * 2) as u8);
        for value in values {
            frame.extend_from_slice(&value.to_le_bytes());
        }
        push_crc(&mut frame);
        frame
    }

    /// Classify a raw response buffer
    ///
    /// Same state machine as the Standard decoder with little-endian
    /// numeric fields. Read payloads of exactly 10 bytes additionally
    /// decode as a device-reported ASCII serial number.
    pub fn decode(buf: &[u8]) -> DecodedResponse {
        if buf.len() < MIN_RESPONSE_LEN {
            trace!(len = buf.len(), "proprietary response truncated");
            return DecodedResponse::truncated(buf.len());
        }

        let address = buf[0];
        let fc_byte = buf[1];

        if fc_byte & EXCEPTION_FLAG != 0 {
            let function = fc_byte & !EXCEPTION_FLAG;
            if let Some(mismatch) = verify_frame_crc(buf, address, function) {
                return mismatch;
            }
            return DecodedResponse::exception(address, function, buf[2]);
        }

        if let Some(mismatch) = verify_frame_crc(buf, address, fc_byte) {
            return mismatch;
        }

        match fc_byte {
            FC_READ_HOLDING_REGISTERS | FC_READ_INPUT_REGISTERS => {
                Self::decode_read(buf, address, fc_byte)
            }
            FC_WRITE_SINGLE_REGISTER => Self::decode_write_single(buf, address),
            FC_WRITE_MULTIPLE_REGISTERS => Self::decode_write_multiple(buf, address),
            other => {
                warn!(
                    function = other,
                    "unsupported function code in proprietary response"
                );
                DecodedResponse::unsupported(address, other)
            }
        }
    }

    fn decode_read(buf: &[u8], address: u8, function: u8) -> DecodedResponse {
        let byte_count = buf[2] as usize;
        if 3 + byte_count + CRC_LEN > buf.len() {
            return DecodedResponse::malformed(
                address,
                function,
                format!(
                    "declared {} data bytes but buffer holds {}",
                    byte_count,
                    buf.len()
                ),
            );
        }

        let data = &buf[3..3 + byte_count];
        let mut values = BTreeMap::new();
        for i in 0..byte_count / 2 {
            values.insert(i as u16, u16::from_le_bytes([data[i * 2], data[i * 2 + 1]]));
        }

        // A 10-byte payload is how devices answer the serial-number query
        let reported_serial = if byte_count == SERIAL_LEN {
            let mut raw = [0u8; SERIAL_LEN];
            raw.copy_from_slice(data);
            let serial = SerialNumber::from_wire(raw);
            trace!(serial = %serial, "decoded device-reported serial number");
            Some(serial)
        } else {
            None
        };

        let info = match &reported_serial {
            Some(serial) => format!("read {} registers (device serial {})", values.len(), serial),
            None => format!("read {} registers", values.len()),
        };
        DecodedResponse::success(address, function, values, None, reported_serial, info)
    }

    fn decode_write_single(buf: &[u8], address: u8) -> DecodedResponse {
        if buf.len() < WRITE_ECHO_LEN {
            return DecodedResponse::malformed(
                address,
                FC_WRITE_SINGLE_REGISTER,
                format!(
                    "write echo of {} bytes is shorter than the {}-byte minimum",
                    buf.len(),
                    WRITE_ECHO_LEN
                ),
            );
        }

        let register = u16::from_le_bytes([buf[2], buf[3]]);
        let value = u16::from_le_bytes([buf[4], buf[5]]);
        DecodedResponse::success(
            address,
            FC_WRITE_SINGLE_REGISTER,
            BTreeMap::new(),
            Some(register),
            None,
            format!("wrote value {} to register {}", value, register),
        )
    }

    fn decode_write_multiple(buf: &[u8], address: u8) -> DecodedResponse {
        if buf.len() < WRITE_ECHO_LEN {
            return DecodedResponse::malformed(
                address,
                FC_WRITE_MULTIPLE_REGISTERS,
                format!(
                    "write echo of {} bytes is shorter than the {}-byte minimum",
                    buf.len(),
                    WRITE_ECHO_LEN
                ),
            );
        }

        let start = u16::from_le_bytes([buf[2], buf[3]]);
        let count = u16::from_le_bytes([buf[4], buf[5]]);
        DecodedResponse::success(
            address,
            FC_WRITE_MULTIPLE_REGISTERS,
            BTreeMap::new(),
            Some(start),
            None,
            format!("wrote {} registers starting at {}", count, start),
        )
    }

    /// Expected length of the response frame beginning at `buf[0]`
    ///
    /// Counterpart of [`crate::standard::StandardCodec::expected_len`] for
    /// transports that must find frame boundaries in a byte stream.
    pub fn expected_len(buf: &[u8]) -> Option<usize> {
        if buf.len() < 3 {
            return None;
        }
        let fc_byte = buf[1];
        if fc_byte & EXCEPTION_FLAG != 0 {
            return Some(MIN_RESPONSE_LEN);
        }
        match fc_byte {
            FC_READ_HOLDING_REGISTERS | FC_READ_INPUT_REGISTERS => {
                Some(3 + buf[2] as usize + CRC_LEN)
            }
            FC_WRITE_SINGLE_REGISTER | FC_WRITE_MULTIPLE_REGISTERS => Some(WRITE_ECHO_LEN),
            _ => None,
        }
    }
}
