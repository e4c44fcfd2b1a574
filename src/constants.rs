//! Protocol constants shared by both wire framings
//!
//! Register limits are inherited from the classic RS485 ADU limit of the
//! Standard framing: a 256-byte ADU minus address (1) and CRC (2) leaves a
//! 253-byte payload section. The Proprietary framing reuses the same
//! limits: its register payload section is laid out identically, only the
//! header differs.

// ============================================================================
// Frame Size Constants
// ============================================================================

/// CRC trailer length, both framings
pub const CRC_LEN: usize = 2;

/// Minimum viable response
///
/// address(1) + function(1) + exception-code-or-byte-count(1) + CRC(2).
/// Anything shorter cannot be classified and is reported as truncated.
pub const MIN_RESPONSE_LEN: usize = 5;

/// Fixed length of the ASCII serial-number fields in the Proprietary framing
pub const SERIAL_LEN: usize = 10;

/// Standard framing read / write-single request length
///
/// address(1) + function(1) + register(2) + quantity-or-value(2) + CRC(2)
pub const STANDARD_FIXED_REQUEST_LEN: usize = 8;

/// Proprietary framing read / write-single request length
///
/// address(1) + function(1) + serial(10) + register(2) + quantity-or-value(2) + CRC(2)
pub const LXP_FIXED_REQUEST_LEN: usize = 18;

/// Write echo response length, both framings
///
/// address(1) + function(1) + register(2) + value-or-count(2) + CRC(2)
pub const WRITE_ECHO_LEN: usize = 8;

// ============================================================================
// Register Operation Limits
// ============================================================================

/// Maximum registers per read request (FC03/FC04)
///
/// Calculation for the response: function(1) + byte count(1) + N × 2 ≤ 253,
/// therefore N ≤ 125.
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum registers per write-multiple request (FC16)
///
/// Calculation for the request: function(1) + start(2) + quantity(2)
/// + byte count(1) + N × 2 ≤ 253, therefore N ≤ 123.
pub const MAX_WRITE_REGISTERS: u16 = 123;

// ============================================================================
// Function Codes
// ============================================================================

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Exception responses set the high bit of the function code byte
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Device Failure
pub const EXCEPTION_DEVICE_FAILURE: u8 = 0x04;

/// Acknowledge
pub const EXCEPTION_ACKNOWLEDGE: u8 = 0x05;

/// Device Busy
pub const EXCEPTION_DEVICE_BUSY: u8 = 0x06;

// ============================================================================
// Addressing
// ============================================================================

/// Fallback device address when a serial identifier is empty or starts with 0
pub const DEFAULT_DEVICE_ADDRESS: u8 = 1;

/// Nominal address byte opening every Proprietary frame
///
/// Kept for structural symmetry with the Standard framing; the real
/// addressing unit is the 10-byte serial region.
pub const LXP_NOMINAL_ADDRESS: u8 = 1;

/// Replacement for non-printable bytes when rendering reported serials
pub const SERIAL_PLACEHOLDER: char = '?';
