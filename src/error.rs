//! # Voltage Modbus Codec Error Handling
//!
//! Every failure the codec can report is a variant of [`ModbusError`]. Errors are
//! never corrected or retried inside the codec: they are returned to the caller,
//! which usually is a transport or a client session.
//!
//! ## Error Categories
//!
//! ### Encode-side validation
//! - **Invalid Quantity**: read/write quantity outside the per-function limits
//! - **Invalid Data**: malformed values (coil echo not 0xFF00/0x0000, bad hex, ...)
//! - **Configuration**: generator configured with an unusable unit id or mode
//!
//! ### Decode-side protocol errors
//! - **Truncated Frame**: declared lengths disagree with the bytes received
//! - **Checksum Mismatch**: CRC (RTU) or LRC (ASCII) validation failures
//! - **Unsupported Function**: function codes this codec does not implement
//! - **Unexpected Function**: a valid response to a different request
//! - **Frame**: envelope violations (bad MBAP protocol id, ASCII delimiters)
//! - **Exception Responses**: standard Modbus exception codes from devices
//!
//! ## Usage
//!
//! ```rust
//! use voltage_modbus_codec::{FrameGenerator, FramingMode, ModbusError};
//!
//! let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();
//! // Illegal Data Address exception for Read Holding Registers
//! match generator.decode_response(&[0x01, 0x83, 0x02, 0xC0, 0xF1], None, None) {
//!     Err(ModbusError::Exception { function, code, message }) => {
//!         assert_eq!(function, 0x03);
//!         assert_eq!(code, 0x02);
//!         println!("Device exception: {}", message);
//!     }
//!     other => panic!("unexpected result: {:?}", other),
//! }
//! ```

use thiserror::Error;

/// Result type alias for codec operations
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Modbus codec error types
///
/// Each variant carries enough context to diagnose the offending frame without
/// keeping the frame itself around.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModbusError {
    /// Quantity outside the range the function code allows
    ///
    /// # Examples
    /// - Reading 3000 coils (max 2000)
    /// - Reading 200 holding registers (max 125)
    /// - Zero quantity in a read request
    /// - Starting address + quantity beyond 65535
    #[error("Invalid quantity for function {function:02X}: {quantity} (allowed 1-{max})")]
    InvalidQuantity { function: u8, quantity: u16, max: u16 },

    /// Function code outside the set this codec implements
    #[error("Unsupported function code: 0x{code:02X}")]
    UnsupportedFunction { code: u8 },

    /// Declared length and received length disagree
    ///
    /// # Examples
    /// - RTU frame shorter than unit id + function code + CRC
    /// - Byte count field larger than the remaining payload
    /// - MBAP length field not matching the bytes that follow it
    #[error("Truncated frame: {message}")]
    TruncatedFrame { message: String },

    /// Checksum validation failure (CRC-16 for RTU, LRC for ASCII)
    ///
    /// `expected` is the value computed over the received bytes, `actual` the
    /// value found in the trailer.
    #[error("Checksum mismatch: expected={expected:04X}, actual={actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Modbus exception response
    ///
    /// Signalled by the device with the high bit of the function code set.
    /// `function` is the original function code with the high bit cleared.
    ///
    /// # Standard Exception Codes
    /// - 0x01: Illegal Function
    /// - 0x02: Illegal Data Address
    /// - 0x03: Illegal Data Value
    /// - 0x04: Server Device Failure
    /// - 0x05: Acknowledge
    /// - 0x06: Server Device Busy
    /// - 0x08: Memory Parity Error
    /// - 0x0A: Gateway Path Unavailable
    /// - 0x0B: Gateway Target Device Failed to Respond
    #[error("Modbus exception: function={function:02X}, code={code:02X} ({message})")]
    Exception { function: u8, code: u8, message: String },

    /// Well-formed response for a function other than the one requested
    #[error("Unexpected function in response: expected={expected:02X}, actual={actual:02X}")]
    UnexpectedFunction { expected: u8, actual: u8 },

    /// Serial response sent by a unit other than the one addressed
    #[error("Unexpected unit in response: expected={expected}, actual={actual}")]
    UnexpectedUnit { expected: u8, actual: u8 },

    /// Envelope format violations
    ///
    /// # Examples
    /// - MBAP protocol identifier other than 0
    /// - ASCII frame without leading ':' or trailing CR LF
    #[error("Frame error: {message}")]
    Frame { message: String },

    /// Invalid data value
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Generator configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ModbusError {
    /// Create an invalid quantity error
    pub fn invalid_quantity(function: u8, quantity: u16, max: u16) -> Self {
        Self::InvalidQuantity { function, quantity, max }
    }

    /// Create an unsupported function error
    pub fn unsupported_function(code: u8) -> Self {
        Self::UnsupportedFunction { code }
    }

    /// Create a truncated frame error
    pub fn truncated<S: Into<String>>(message: S) -> Self {
        Self::TruncatedFrame { message: message.into() }
    }

    /// Create a checksum mismatch error
    ///
    /// # Arguments
    ///
    /// * `expected` - Checksum computed over the received bytes
    /// * `actual` - Checksum carried in the frame trailer
    pub fn checksum_mismatch(expected: u16, actual: u16) -> Self {
        Self::ChecksumMismatch { expected, actual }
    }

    /// Create a Modbus exception error
    ///
    /// Maps standard exception codes to human-readable messages.
    pub fn exception(function: u8, code: u8) -> Self {
        let message = match code {
            0x01 => "Illegal Function",
            0x02 => "Illegal Data Address",
            0x03 => "Illegal Data Value",
            0x04 => "Server Device Failure",
            0x05 => "Acknowledge",
            0x06 => "Server Device Busy",
            0x08 => "Memory Parity Error",
            0x0A => "Gateway Path Unavailable",
            0x0B => "Gateway Target Device Failed to Respond",
            _ => "Unknown Exception",
        }
        .to_string();

        Self::Exception { function, code, message }
    }

    /// Create an unexpected function error
    pub fn unexpected_function(expected: u8, actual: u8) -> Self {
        Self::UnexpectedFunction { expected, actual }
    }

    /// Create an unexpected unit error
    pub fn unexpected_unit(expected: u8, actual: u8) -> Self {
        Self::UnexpectedUnit { expected, actual }
    }

    /// Create a frame error
    pub fn frame<S: Into<String>>(message: S) -> Self {
        Self::Frame { message: message.into() }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData { message: message.into() }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Check if the error might go away when the transport retries the exchange
    ///
    /// Corrupted or cut-off frames and busy devices are worth another attempt;
    /// validation failures and unsupported functions are not.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use voltage_modbus_codec::ModbusError;
    ///
    /// assert!(ModbusError::checksum_mismatch(0x1234, 0x5678).is_recoverable());
    /// assert!(!ModbusError::unsupported_function(0x2B).is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ChecksumMismatch { .. } => true,
            Self::TruncatedFrame { .. } => true,
            Self::Exception { code, .. } => {
                // Acknowledge, Busy
                matches!(code, 0x05 | 0x06)
            }
            _ => false,
        }
    }

    /// Check if the error came from decoding what a device sent
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFunction { .. }
                | Self::TruncatedFrame { .. }
                | Self::ChecksumMismatch { .. }
                | Self::Exception { .. }
                | Self::UnexpectedFunction { .. }
                | Self::UnexpectedUnit { .. }
                | Self::Frame { .. }
        )
    }

    /// Check if the error was raised before any byte was produced
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantity { .. } | Self::InvalidData { .. } | Self::Configuration { .. }
        )
    }

    /// Exception code reported by the device, if this is an exception response
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            Self::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Convert from serde JSON errors (configuration loading)
impl From<serde_json::Error> for ModbusError {
    fn from(err: serde_json::Error) -> Self {
        Self::configuration(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ModbusError::checksum_mismatch(0xF69B, 0x8341);
        assert!(err.is_recoverable());
        assert!(err.is_protocol_error());

        let err = ModbusError::exception(0x03, 0x02);
        assert!(!err.is_recoverable());
        assert!(err.is_protocol_error());
        assert_eq!(err.exception_code(), Some(0x02));

        let err = ModbusError::unexpected_unit(1, 5);
        assert!(err.is_protocol_error());
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Unexpected unit in response: expected=1, actual=5");

        let err = ModbusError::invalid_quantity(0x01, 3000, 2000);
        assert!(err.is_validation_error());
        assert!(!err.is_protocol_error());
    }

    #[test]
    fn test_error_display() {
        let err = ModbusError::checksum_mismatch(0x1234, 0x5678);
        let msg = format!("{}", err);
        assert!(msg.contains("Checksum mismatch"));
        assert!(msg.contains("1234"));
        assert!(msg.contains("5678"));

        let err = ModbusError::exception(0x01, 0x06);
        assert!(err.is_recoverable());
        assert!(format!("{}", err).contains("Server Device Busy"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u8>("not json").unwrap_err();
        let err: ModbusError = json_err.into();
        assert!(matches!(err, ModbusError::Configuration { .. }));
    }
}
