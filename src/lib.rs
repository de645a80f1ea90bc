//! # Voltage Modbus Codec - Modbus RTU/TCP/ASCII Frame Generator
//!
//! Builds Modbus request frames and parses response frames without touching a
//! serial port or socket. A transport hands the codec the bytes it received
//! and gets back either a frame to send or a decoded value.
//!
//! ## Features
//!
//! - **Bit-exact framing**: RTU (CRC-16), TCP (MBAP header) and ASCII (LRC)
//! - **Typed requests and responses**: one enum variant per function code
//! - **All-or-nothing decoding**: a malformed frame never yields partial data
//! - **Thread-safe**: a generator holds only immutable configuration
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Encode | Decode |
//! |------|----------|--------|--------|
//! | 0x01 | Read Coils | ✅ | ✅ |
//! | 0x02 | Read Discrete Inputs | ✅ | ✅ |
//! | 0x03 | Read Holding Registers | ✅ | ✅ |
//! | 0x04 | Read Input Registers | ✅ | ✅ |
//! | 0x05 | Write Single Coil | ✅ | ✅ |
//! | 0x06 | Write Single Register | ✅ | ✅ |
//! | 0x0F | Write Multiple Coils | ✅ | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ | ✅ |
//!
//! ## Quick Start
//!
//! ```rust
//! use voltage_modbus_codec::{FrameGenerator, FramingMode, ModbusFunction, ModbusResult};
//!
//! fn main() -> ModbusResult<()> {
//!     let generator = FrameGenerator::new(FramingMode::Rtu, 1)?;
//!
//!     // Read 8 coils starting at 100
//!     let frame = generator.read_coils(100, 8)?;
//!     println!("Read Coils frame: {}", hex::encode(&frame));
//!
//!     // Slave 1 answers with one byte of coil states
//!     let reply = [0x01, 0x01, 0x01, 0xCD, 0x90, 0x1D];
//!     let coils = generator.decode_response(&reply, Some(ModbusFunction::ReadCoils), Some(8))?;
//!     println!("Decoded: {}", coils);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Transport    │  (not part of this crate)
//! └─────────────────┘
//!          │ bytes
//! ┌─────────────────┐    ┌─────────────────┐
//! │ Frame Generator │───►│    Checksums    │
//! │ (RTU/TCP/ASCII) │    │   (CRC / LRC)   │
//! └─────────────────┘    └─────────────────┘
//!          │ PDU
//! ┌─────────────────┐
//! │    PDU Codec    │
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Request/Response│
//! └─────────────────┘
//! ```

/// Core error types and result handling
pub mod error;

/// Modbus protocol definitions: function codes, requests, responses
pub mod protocol;

/// Function-specific payload encoding and decoding
pub mod pdu;

/// CRC-16 and LRC checksums
pub mod checksum;

/// Transport envelopes and the frame generator
pub mod frame;

/// Frame generator configuration
pub mod config;

/// Callback logging for encoded and decoded frames
pub mod logging;

/// Validation and formatting helpers
pub mod utils;

// Re-export main types for convenience
pub use error::{ModbusError, ModbusResult};
pub use protocol::{ModbusFunction, ModbusException, ModbusRequest, ModbusResponse, UnitId};
pub use frame::{FrameEnvelope, FrameGenerator, RequestFrame, ResponseFrame};
pub use config::{FrameGeneratorConfig, FramingMode};
pub use checksum::{crc16, lrc, validate_crc};
pub use logging::{CallbackLogger, LogCallback, LogLevel, LoggingMode};

/// Maximum number of coils/discrete inputs in a single read
pub const MAX_READ_COILS: u16 = 2000;

/// Maximum number of registers in a single read
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum number of coils in a single Write Multiple Coils request
pub const MAX_WRITE_COILS: u16 = 1968;

/// Maximum number of registers in a single Write Multiple Registers request
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// Maximum Modbus TCP frame size (MBAP header + PDU)
pub const MAX_TCP_FRAME_SIZE: usize = 260;

/// Maximum Modbus RTU frame size
pub const MAX_RTU_FRAME_SIZE: usize = 256;

/// Maximum Modbus ASCII frame size in characters (':' + 2 x 255 hex digits + CR LF)
pub const MAX_ASCII_FRAME_SIZE: usize = 513;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("Voltage Modbus Codec v{} - Modbus RTU/TCP/ASCII frame generator", VERSION)
}
