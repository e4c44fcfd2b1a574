//! Protocol definitions: logical operations, addressing, framing selection
//!
//! An [`Operation`] describes what the caller wants independent of wire
//! layout; [`Framing`] plus [`Addressing`] pick one of the two codecs by
//! explicit configuration. The two framings share no wire layout, so they
//! stay independent implementations behind this one dispatch point; the
//! codec never infers the framing from the shape of received data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::constants::{
    DEFAULT_DEVICE_ADDRESS, FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS,
    FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER, MAX_READ_REGISTERS,
    MAX_WRITE_REGISTERS, SERIAL_LEN, SERIAL_PLACEHOLDER,
};
use crate::error::{LxpError, LxpResult};
use crate::proprietary::LxpCodec;
use crate::response::DecodedResponse;
use crate::standard::StandardCodec;

/// Register bank targeted by a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterBank {
    /// Holding registers, read with FC03
    Holding,
    /// Input registers, read with FC04
    Input,
}

impl RegisterBank {
    /// Function code used to read this bank
    pub fn function_code(&self) -> u8 {
        match self {
            RegisterBank::Holding => FC_READ_HOLDING_REGISTERS,
            RegisterBank::Input => FC_READ_INPUT_REGISTERS,
        }
    }
}

/// A logical register operation, independent of wire framing
///
/// Operations are immutable inputs to the codecs; register values are
/// opaque u16s here; meaning, scaling and bit packing live in the
/// register tables of the calling layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Read a contiguous block of registers
    ReadRegisters {
        /// Bank to read from
        bank: RegisterBank,
        /// First register
        start: u16,
        /// Number of registers, 1..=125
        count: u16,
    },
    /// Write one register
    WriteRegister {
        /// Target register
        register: u16,
        /// Value to write
        value: u16,
    },
    /// Write a contiguous block of registers
    WriteRegisters {
        /// First register
        start: u16,
        /// Values to write, 1..=123 of them
        values: Vec<u16>,
    },
}

impl Operation {
    /// Function code this operation is encoded with
    pub fn function_code(&self) -> u8 {
        match self {
            Operation::ReadRegisters { bank, .. } => bank.function_code(),
            Operation::WriteRegister { .. } => FC_WRITE_SINGLE_REGISTER,
            Operation::WriteRegisters { .. } => FC_WRITE_MULTIPLE_REGISTERS,
        }
    }

    /// Reject parameters that cannot be expressed on the wire
    pub(crate) fn validate(&self) -> LxpResult<()> {
        match self {
            Operation::ReadRegisters { count, .. } => {
                if *count == 0 || *count > MAX_READ_REGISTERS {
                    return Err(LxpError::invalid_request(format!(
                        "read count {} outside 1..={}",
                        count, MAX_READ_REGISTERS
                    )));
                }
            }
            Operation::WriteRegister { .. } => {}
            Operation::WriteRegisters { values, .. } => {
                if values.is_empty() || values.len() > MAX_WRITE_REGISTERS as usize {
                    return Err(LxpError::invalid_request(format!(
                        "write count {} outside 1..={}",
                        values.len(),
                        MAX_WRITE_REGISTERS
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Single-byte device address used by the Standard framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Wrap a raw address byte
    pub const fn new(address: u8) -> Self {
        Self(address)
    }

    /// Derive the address from a caller-supplied serial identifier
    ///
    /// Byte 0 of the identifier is the address by convention; an empty
    /// identifier or a leading zero byte falls back to address 1.
    pub fn from_serial(serial: &[u8]) -> Self {
        match serial.first() {
            Some(&byte) if byte != 0 => Self(byte),
            _ => Self(DEFAULT_DEVICE_ADDRESS),
        }
    }

    /// The raw address byte
    pub const fn get(&self) -> u8 {
        self.0
    }
}

impl From<u8> for DeviceAddress {
    fn from(address: u8) -> Self {
        Self::new(address)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed 10-byte ASCII serial number used by the Proprietary framing
///
/// Stored as the raw wire bytes. [`fmt::Display`] renders printable ASCII
/// (32–126) as-is and anything else as `'?'`, so a noisy byte never makes
/// a reported serial undisplayable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialNumber([u8; SERIAL_LEN]);

impl SerialNumber {
    /// Broadcast / query-serial sentinel
    ///
    /// The all-zero ASCII serial `"0000000000"` addresses no specific
    /// device; it asks the device to report its own serial number.
    pub const QUERY: SerialNumber = SerialNumber(*b"0000000000");

    /// Build from exactly [`SERIAL_LEN`] raw bytes
    pub fn new(bytes: &[u8]) -> LxpResult<Self> {
        let raw: [u8; SERIAL_LEN] = bytes.try_into().map_err(|_| {
            LxpError::invalid_serial(format!(
                "expected {} bytes, got {}",
                SERIAL_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(raw))
    }

    /// Wrap a decoded wire segment
    pub(crate) const fn from_wire(bytes: [u8; SERIAL_LEN]) -> Self {
        Self(bytes)
    }

    /// Reassemble a serial from five consecutive registers
    ///
    /// Devices report their serial number in five registers holding two
    /// ASCII bytes each, high byte first.
    pub fn from_registers(registers: &[u16]) -> LxpResult<Self> {
        if registers.len() != SERIAL_LEN / 2 {
            return Err(LxpError::invalid_serial(format!(
                "expected {} registers, got {}",
                SERIAL_LEN / 2,
                registers.len()
            )));
        }
        let mut bytes = [0u8; SERIAL_LEN];
        for (i, register) in registers.iter().enumerate() {
            bytes[i * 2] = (register >> 8) as u8;
            bytes[i * 2 + 1] = (register & 0xFF) as u8;
        }
        Ok(Self(bytes))
    }

    /// Whether this is the query-serial broadcast sentinel
    pub fn is_query(&self) -> bool {
        self.0 == Self::QUERY.0
    }

    /// Raw bytes as carried on the wire
    pub const fn as_bytes(&self) -> &[u8; SERIAL_LEN] {
        &self.0
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            let c = if (32..=126).contains(&byte) {
                byte as char
            } else {
                SERIAL_PLACEHOLDER
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl FromStr for SerialNumber {
    type Err = LxpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.as_bytes())
    }
}

/// Bridge (dongle) and target-device serial pair for Proprietary addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialPair {
    /// Serial of the TCP-to-RS485 bridge dongle
    pub dongle: SerialNumber,
    /// Serial of the target inverter
    pub inverter: SerialNumber,
}

impl SerialPair {
    /// Pair up a dongle and an inverter serial
    pub const fn new(dongle: SerialNumber, inverter: SerialNumber) -> Self {
        Self { dongle, inverter }
    }

    /// Pair addressing no specific device: the query-serial broadcast
    pub const fn query() -> Self {
        Self {
            dongle: SerialNumber::QUERY,
            inverter: SerialNumber::QUERY,
        }
    }
}

/// Addressing input for frame construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Addressing {
    /// Single-byte address for the Standard framing
    Standard(DeviceAddress),
    /// Dual-serial addressing for the Proprietary framing
    Serial(SerialPair),
}

/// Wire framing, selected by explicit caller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Framing {
    /// Classic Modbus RTU layout: address byte, big-endian fields
    Standard,
    /// LXP layout: dual-serial addressing, little-endian fields
    Proprietary,
}

impl Framing {
    /// Encode `op` for this framing, returning a transport-ready frame
    ///
    /// The Standard framing accepts serial addressing by reducing the
    /// inverter serial to its first byte (the firmware convention for
    /// bridges that only forward single-address frames). The Proprietary
    /// framing requires a serial pair.
    pub fn encode(&self, addressing: &Addressing, op: &Operation) -> LxpResult<Vec<u8>> {
        match (self, addressing) {
            (Framing::Standard, Addressing::Standard(address)) => {
                StandardCodec::encode(*address, op)
            }
            (Framing::Standard, Addressing::Serial(pair)) => {
                let address = DeviceAddress::from_serial(pair.inverter.as_bytes());
                trace!(
                    address = address.get(),
                    inverter = %pair.inverter,
                    "derived standard address from inverter serial"
                );
                StandardCodec::encode(address, op)
            }
            (Framing::Proprietary, Addressing::Serial(pair)) => LxpCodec::encode(pair, op),
            (Framing::Proprietary, Addressing::Standard(_)) => Err(LxpError::addressing_mismatch(
                "proprietary framing requires serial-pair addressing",
            )),
        }
    }

    /// Classify a raw response buffer received for this framing
    pub fn decode(&self, buf: &[u8]) -> DecodedResponse {
        match self {
            Framing::Standard => StandardCodec::decode(buf),
            Framing::Proprietary => LxpCodec::decode(buf),
        }
    }
}
