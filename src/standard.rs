//! Standard framing codec (classic Modbus RTU layout)
//!
//! Requests open with a single device address byte; all numeric fields are
//! big-endian except the CRC trailer, which is little-endian. The mixed
//! endianness is the wire contract of the protocol, not a choice made
//! here.
//!
//! Block-read responses do not repeat the start register, so decoded
//! values are keyed by offset `0..n-1`; the caller maps them back with the
//! start register it sent (see [`DecodedResponse::values_from`]).

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::constants::{
    CRC_LEN, EXCEPTION_FLAG, FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS,
    FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER, MIN_RESPONSE_LEN,
    STANDARD_FIXED_REQUEST_LEN, WRITE_ECHO_LEN,
};
use crate::crc::push_crc;
use crate::error::LxpResult;
use crate::protocol::{DeviceAddress, Operation};
use crate::response::{verify_frame_crc, DecodedResponse};

/// Stateless codec for the Standard framing
pub struct StandardCodec;

impl StandardCodec {
    /// Encode `op` addressed to `address`, returning a transport-ready frame
    pub fn encode(address: DeviceAddress, op: &Operation) -> LxpResult<Vec<u8>> {
        op.validate()?;
        let frame = match op {
            Operation::ReadRegisters { bank, start, count } => {
                Self::build_read(address, bank.function_code(), *start, *count)
            }
            Operation::WriteRegister { register, value } => {
                Self::build_write_single(address, *register, *value)
            }
            Operation::WriteRegisters { start, values } => {
                Self::build_write_multiple(address, *start, values)
            }
        };
        debug!(
            address = address.get(),
            function = op.function_code(),
            len = frame.len(),
            "built standard frame"
        );
        Ok(frame)
    }

    fn build_read(address: DeviceAddress, function: u8, start: u16, count: u16) -> Vec<u8> {
        let mut frame = Vec::with_capacity(STANDARD_FIXED_REQUEST_LEN);
        frame.push(address.get());
        frame.push(function);
        frame.extend_from_slice(&start.to_be_bytes());
        frame.extend_from_slice(&count.to_be_bytes());
        push_crc(&mut frame);
        frame
    }

    fn build_write_single(address: DeviceAddress, register: u16, value: u16) -> Vec<u8> {
        let mut frame = Vec::with_capacity(STANDARD_FIXED_REQUEST_LEN);
        frame.push(address.get());
        frame.push(FC_WRITE_SINGLE_REGISTER);
        frame.extend_from_slice(&register.to_be_bytes());
        frame.extend_from_slice(&value.to_be_bytes());
        push_crc(&mut frame);
        frame
    }

    fn build_write_multiple(address: DeviceAddress, start: u16, values: &[u16]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(7 + values.len() * 2 + CRC_LEN);
        frame.push(address.get());
        frame.push(FC_WRITE_MULTIPLE_REGISTERS);
        frame.extend_from_slice(&start.to_be_bytes());
        frame.extend_from_slice(&(values.len() as u16).to_be_bytes());
        frame.push((values.len() * 2) as u8);
        for value in values {
            frame.extend_from_slice(&value.to_be_bytes());
        }
        push_crc(&mut frame);
        frame
    }

    /// Classify a raw response buffer
    ///
    /// Never panics: buffers shorter than the minimum response classify as
    /// truncated, and everything else resolves to a tagged
    /// [`DecodedResponse`].
    pub fn decode(buf: &[u8]) -> DecodedResponse {
        if buf.len() < MIN_RESPONSE_LEN {
            trace!(len = buf.len(), "standard response truncated");
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
                warn!(function = other, "unsupported function code in standard response");
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

        let mut values = BTreeMap::new();
        for i in 0..byte_count / 2 {
            let at = 3 + i * 2;
            values.insert(i as u16, u16::from_be_bytes([buf[at], buf[at + 1]]));
        }
        trace!(
            address,
            function,
            registers = values.len(),
            "decoded standard read response"
        );

        let info = format!("read {} registers", values.len());
        DecodedResponse::success(address, function, values, None, None, info)
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

        let register = u16::from_be_bytes([buf[2], buf[3]]);
        let value = u16::from_be_bytes([buf[4], buf[5]]);
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

        let start = u16::from_be_bytes([buf[2], buf[3]]);
        let count = u16::from_be_bytes([buf[4], buf[5]]);
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
    /// Lets the transport split a stream that carries more than one frame
    /// per read before classifying: `None` means the header is still
    /// incomplete. Excess bytes after the returned length belong to the
    /// next frame.
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
