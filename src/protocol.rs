/// Modbus protocol definitions and data structures
///
/// This module contains the core Modbus protocol definitions: function codes,
/// exception codes, and the request/response types the codec converts to and
/// from bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::{ModbusError, ModbusResult};

/// Modbus address type (0-65535)
pub type ModbusAddress = u16;

/// Modbus value type (16-bit register value)
pub type ModbusValue = u16;

/// Modbus slave/unit identifier (1-247, 0 for broadcast)
pub type UnitId = u8;

/// Coil value on the wire for ON
pub const COIL_ON: u16 = 0xFF00;

/// Coil value on the wire for OFF
pub const COIL_OFF: u16 = 0x0000;

/// Bit marking an exception response in the function code byte
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Modbus function codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModbusFunction {
    /// Read Coils (0x01)
    ReadCoils = 0x01,
    /// Read Discrete Inputs (0x02)
    ReadDiscreteInputs = 0x02,
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = 0x03,
    /// Read Input Registers (0x04)
    ReadInputRegisters = 0x04,
    /// Write Single Coil (0x05)
    WriteSingleCoil = 0x05,
    /// Write Single Register (0x06)
    WriteSingleRegister = 0x06,
    /// Write Multiple Coils (0x0F)
    WriteMultipleCoils = 0x0F,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = 0x10,
}

impl ModbusFunction {
    /// Convert from u8 to ModbusFunction
    pub fn from_u8(value: u8) -> ModbusResult<Self> {
        match value {
            0x01 => Ok(ModbusFunction::ReadCoils),
            0x02 => Ok(ModbusFunction::ReadDiscreteInputs),
            0x03 => Ok(ModbusFunction::ReadHoldingRegisters),
            0x04 => Ok(ModbusFunction::ReadInputRegisters),
            0x05 => Ok(ModbusFunction::WriteSingleCoil),
            0x06 => Ok(ModbusFunction::WriteSingleRegister),
            0x0F => Ok(ModbusFunction::WriteMultipleCoils),
            0x10 => Ok(ModbusFunction::WriteMultipleRegisters),
            _ => Err(ModbusError::unsupported_function(value)),
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Check if this is a read function
    pub fn is_read_function(self) -> bool {
        matches!(self,
            ModbusFunction::ReadCoils |
            ModbusFunction::ReadDiscreteInputs |
            ModbusFunction::ReadHoldingRegisters |
            ModbusFunction::ReadInputRegisters
        )
    }

    /// Check if this is a write function
    pub fn is_write_function(self) -> bool {
        !self.is_read_function()
    }

    /// Check if this function addresses single-bit data (coils, discrete inputs)
    pub fn is_bit_function(self) -> bool {
        matches!(self,
            ModbusFunction::ReadCoils |
            ModbusFunction::ReadDiscreteInputs |
            ModbusFunction::WriteSingleCoil |
            ModbusFunction::WriteMultipleCoils
        )
    }

    /// Largest quantity a single request may carry for this function
    pub fn max_quantity(self) -> u16 {
        match self {
            ModbusFunction::ReadCoils | ModbusFunction::ReadDiscreteInputs => crate::MAX_READ_COILS,
            ModbusFunction::ReadHoldingRegisters | ModbusFunction::ReadInputRegisters => crate::MAX_READ_REGISTERS,
            ModbusFunction::WriteSingleCoil | ModbusFunction::WriteSingleRegister => 1,
            ModbusFunction::WriteMultipleCoils => crate::MAX_WRITE_COILS,
            ModbusFunction::WriteMultipleRegisters => crate::MAX_WRITE_REGISTERS,
        }
    }

    /// Human-readable function name
    pub fn name(self) -> &'static str {
        match self {
            ModbusFunction::ReadCoils => "Read Coils",
            ModbusFunction::ReadDiscreteInputs => "Read Discrete Inputs",
            ModbusFunction::ReadHoldingRegisters => "Read Holding Registers",
            ModbusFunction::ReadInputRegisters => "Read Input Registers",
            ModbusFunction::WriteSingleCoil => "Write Single Coil",
            ModbusFunction::WriteSingleRegister => "Write Single Register",
            ModbusFunction::WriteMultipleCoils => "Write Multiple Coils",
            ModbusFunction::WriteMultipleRegisters => "Write Multiple Registers",
        }
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), *self as u8)
    }
}

impl TryFrom<u8> for ModbusFunction {
    type Error = ModbusError;

    fn try_from(value: u8) -> ModbusResult<Self> {
        Self::from_u8(value)
    }
}

/// Modbus exception codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModbusException {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    ServerDeviceFailure = 0x04,
    Acknowledge = 0x05,
    ServerDeviceBusy = 0x06,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0A,
    GatewayTargetDeviceFailedToRespond = 0x0B,
}

impl ModbusException {
    /// Convert from u8 to ModbusException
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(ModbusException::IllegalFunction),
            0x02 => Some(ModbusException::IllegalDataAddress),
            0x03 => Some(ModbusException::IllegalDataValue),
            0x04 => Some(ModbusException::ServerDeviceFailure),
            0x05 => Some(ModbusException::Acknowledge),
            0x06 => Some(ModbusException::ServerDeviceBusy),
            0x08 => Some(ModbusException::MemoryParityError),
            0x0A => Some(ModbusException::GatewayPathUnavailable),
            0x0B => Some(ModbusException::GatewayTargetDeviceFailedToRespond),
            _ => None,
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get human-readable description
    pub fn description(self) -> &'static str {
        match self {
            ModbusException::IllegalFunction => "The function code received in the query is not an allowable action for the server",
            ModbusException::IllegalDataAddress => "The data address received in the query is not an allowable address for the server",
            ModbusException::IllegalDataValue => "A value contained in the query data field is not an allowable value for server",
            ModbusException::ServerDeviceFailure => "An unrecoverable error occurred while the server was attempting to perform the requested action",
            ModbusException::Acknowledge => "The server has accepted the request and is processing it, but a long duration of time will be required to do so",
            ModbusException::ServerDeviceBusy => "The server is engaged in processing a long-duration program command",
            ModbusException::MemoryParityError => "The server attempted to read record file, but detected a parity error in the memory",
            ModbusException::GatewayPathUnavailable => "Gateway was unable to allocate an internal communication path",
            ModbusException::GatewayTargetDeviceFailedToRespond => "No response was obtained from the target device",
        }
    }
}

impl fmt::Display for ModbusException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modbus Exception 0x{:02X}: {}", self.to_u8(), self.description())
    }
}

/// Modbus request
///
/// One variant per supported function code. Quantities are validated when the
/// request is encoded, so an out-of-range request never reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModbusRequest {
    ReadCoils { address: ModbusAddress, quantity: u16 },
    ReadDiscreteInputs { address: ModbusAddress, quantity: u16 },
    ReadHoldingRegisters { address: ModbusAddress, quantity: u16 },
    ReadInputRegisters { address: ModbusAddress, quantity: u16 },
    WriteSingleCoil { address: ModbusAddress, value: bool },
    WriteSingleRegister { address: ModbusAddress, value: ModbusValue },
    WriteMultipleCoils { address: ModbusAddress, values: Vec<bool> },
    WriteMultipleRegisters { address: ModbusAddress, values: Vec<ModbusValue> },
}

impl ModbusRequest {
    /// Create a read request for one of the four read functions
    pub fn new_read(function: ModbusFunction, address: ModbusAddress, quantity: u16) -> ModbusResult<Self> {
        match function {
            ModbusFunction::ReadCoils => Ok(Self::ReadCoils { address, quantity }),
            ModbusFunction::ReadDiscreteInputs => Ok(Self::ReadDiscreteInputs { address, quantity }),
            ModbusFunction::ReadHoldingRegisters => Ok(Self::ReadHoldingRegisters { address, quantity }),
            ModbusFunction::ReadInputRegisters => Ok(Self::ReadInputRegisters { address, quantity }),
            other => Err(ModbusError::invalid_data(format!("{} is not a read function", other))),
        }
    }

    /// Function code of this request
    pub fn function(&self) -> ModbusFunction {
        match self {
            Self::ReadCoils { .. } => ModbusFunction::ReadCoils,
            Self::ReadDiscreteInputs { .. } => ModbusFunction::ReadDiscreteInputs,
            Self::ReadHoldingRegisters { .. } => ModbusFunction::ReadHoldingRegisters,
            Self::ReadInputRegisters { .. } => ModbusFunction::ReadInputRegisters,
            Self::WriteSingleCoil { .. } => ModbusFunction::WriteSingleCoil,
            Self::WriteSingleRegister { .. } => ModbusFunction::WriteSingleRegister,
            Self::WriteMultipleCoils { .. } => ModbusFunction::WriteMultipleCoils,
            Self::WriteMultipleRegisters { .. } => ModbusFunction::WriteMultipleRegisters,
        }
    }

    /// Starting address of this request
    pub fn address(&self) -> ModbusAddress {
        match self {
            Self::ReadCoils { address, .. }
            | Self::ReadDiscreteInputs { address, .. }
            | Self::ReadHoldingRegisters { address, .. }
            | Self::ReadInputRegisters { address, .. }
            | Self::WriteSingleCoil { address, .. }
            | Self::WriteSingleRegister { address, .. }
            | Self::WriteMultipleCoils { address, .. }
            | Self::WriteMultipleRegisters { address, .. } => *address,
        }
    }

    /// Number of coils/registers this request touches
    ///
    /// Saturates at `u16::MAX` for oversized write lists so that validation
    /// reports them as out of range.
    pub fn quantity(&self) -> u16 {
        match self {
            Self::ReadCoils { quantity, .. }
            | Self::ReadDiscreteInputs { quantity, .. }
            | Self::ReadHoldingRegisters { quantity, .. }
            | Self::ReadInputRegisters { quantity, .. } => *quantity,
            Self::WriteSingleCoil { .. } | Self::WriteSingleRegister { .. } => 1,
            Self::WriteMultipleCoils { values, .. } => u16::try_from(values.len()).unwrap_or(u16::MAX),
            Self::WriteMultipleRegisters { values, .. } => u16::try_from(values.len()).unwrap_or(u16::MAX),
        }
    }

    /// Validate quantity and address range against the function's limits
    pub fn validate(&self) -> ModbusResult<()> {
        let function = self.function();
        crate::utils::validation::validate_quantity(function, self.quantity())?;
        crate::utils::validation::validate_address_range(function, self.address(), self.quantity())
    }
}

/// Decoded Modbus response
///
/// The variant always matches the function code found in the response frame.
/// Exception responses are never represented here; they are reported as
/// [`ModbusError::Exception`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModbusResponse {
    ReadCoils(Vec<bool>),
    ReadDiscreteInputs(Vec<bool>),
    ReadHoldingRegisters(Vec<ModbusValue>),
    ReadInputRegisters(Vec<ModbusValue>),
    WriteSingleCoil { address: ModbusAddress, value: bool },
    WriteSingleRegister { address: ModbusAddress, value: ModbusValue },
    WriteMultipleCoils { address: ModbusAddress, quantity: u16 },
    WriteMultipleRegisters { address: ModbusAddress, quantity: u16 },
}

impl ModbusResponse {
    /// Function code of this response
    pub fn function(&self) -> ModbusFunction {
        match self {
            Self::ReadCoils(_) => ModbusFunction::ReadCoils,
            Self::ReadDiscreteInputs(_) => ModbusFunction::ReadDiscreteInputs,
            Self::ReadHoldingRegisters(_) => ModbusFunction::ReadHoldingRegisters,
            Self::ReadInputRegisters(_) => ModbusFunction::ReadInputRegisters,
            Self::WriteSingleCoil { .. } => ModbusFunction::WriteSingleCoil,
            Self::WriteSingleRegister { .. } => ModbusFunction::WriteSingleRegister,
            Self::WriteMultipleCoils { .. } => ModbusFunction::WriteMultipleCoils,
            Self::WriteMultipleRegisters { .. } => ModbusFunction::WriteMultipleRegisters,
        }
    }

    /// Bit values of a coil or discrete input response
    pub fn bits(&self) -> Option<&[bool]> {
        match self {
            Self::ReadCoils(bits) | Self::ReadDiscreteInputs(bits) => Some(bits),
            _ => None,
        }
    }

    /// Register values of a holding or input register response
    pub fn registers(&self) -> Option<&[ModbusValue]> {
        match self {
            Self::ReadHoldingRegisters(registers) | Self::ReadInputRegisters(registers) => Some(registers),
            _ => None,
        }
    }

    /// Check whether this response confirms the given write request
    ///
    /// Single writes must echo address and value; multiple writes must echo
    /// address and quantity. Read requests never match.
    pub fn confirms(&self, request: &ModbusRequest) -> bool {
        match (self, request) {
            (
                Self::WriteSingleCoil { address, value },
                ModbusRequest::WriteSingleCoil { address: req_address, value: req_value },
            ) => address == req_address && value == req_value,
            (
                Self::WriteSingleRegister { address, value },
                ModbusRequest::WriteSingleRegister { address: req_address, value: req_value },
            ) => address == req_address && value == req_value,
            (Self::WriteMultipleCoils { address, quantity }, ModbusRequest::WriteMultipleCoils { .. })
            | (Self::WriteMultipleRegisters { address, quantity }, ModbusRequest::WriteMultipleRegisters { .. }) => {
                *address == request.address() && *quantity == request.quantity()
            }
            _ => false,
        }
    }
}

impl fmt::Display for ModbusResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadCoils(bits) | Self::ReadDiscreteInputs(bits) => {
                write!(f, "{}: {:?}", self.function().name(), bits)
            }
            Self::ReadHoldingRegisters(registers) | Self::ReadInputRegisters(registers) => {
                write!(f, "{}: {:?}", self.function().name(), registers)
            }
            Self::WriteSingleCoil { address, value } => {
                write!(f, "Write Single Coil: address={}, value={}", address, if *value { "ON" } else { "OFF" })
            }
            Self::WriteSingleRegister { address, value } => {
                write!(f, "Write Single Register: address={}, value={} (0x{:04X})", address, value, value)
            }
            Self::WriteMultipleCoils { address, quantity } | Self::WriteMultipleRegisters { address, quantity } => {
                write!(f, "{}: address={}, quantity={}", self.function().name(), address, quantity)
            }
        }
    }
}

/// Data conversion utilities
pub mod data_utils {
    use super::*;

    /// Number of bytes needed to carry `bit_count` packed bits
    pub fn packed_len(bit_count: usize) -> usize {
        (bit_count + 7) / 8
    }

    /// Convert register values to bytes (big-endian)
    pub fn registers_to_bytes(registers: &[u16]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(registers.len() * 2);
        for &register in registers {
            bytes.extend_from_slice(&register.to_be_bytes());
        }
        bytes
    }

    /// Convert bytes to register values (big-endian)
    pub fn bytes_to_registers(bytes: &[u8]) -> ModbusResult<Vec<u16>> {
        if bytes.len() % 2 != 0 {
            return Err(ModbusError::invalid_data("Byte array length must be even"));
        }

        Ok(bytes
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect())
    }

    /// Pack boolean values into bytes, least-significant bit first
    pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
        let mut bytes = vec![0u8; packed_len(bits.len())];

        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }

        bytes
    }

    /// Unpack bytes into boolean values, least-significant bit first
    ///
    /// Bits beyond the end of `bytes` read as `false`.
    pub fn unpack_bits(bytes: &[u8], bit_count: usize) -> Vec<bool> {
        (0..bit_count)
            .map(|i| {
                bytes
                    .get(i / 8)
                    .map_or(false, |byte| byte & (1 << (i % 8)) != 0)
            })
            .collect()
    }

    /// Convert u32 to two u16 registers (big-endian)
    pub fn u32_to_registers(value: u32) -> [u16; 2] {
        [(value >> 16) as u16, value as u16]
    }

    /// Convert two u16 registers to u32 (big-endian)
    pub fn registers_to_u32(registers: &[u16]) -> ModbusResult<u32> {
        if registers.len() < 2 {
            return Err(ModbusError::invalid_data("Need at least 2 registers for u32"));
        }
        Ok(((registers[0] as u32) << 16) | (registers[1] as u32))
    }

    /// Convert f32 to two u16 registers (IEEE 754, big-endian)
    pub fn f32_to_registers(value: f32) -> [u16; 2] {
        u32_to_registers(value.to_bits())
    }

    /// Convert two u16 registers to f32 (IEEE 754, big-endian)
    pub fn registers_to_f32(registers: &[u16]) -> ModbusResult<f32> {
        let u32_value = registers_to_u32(registers)?;
        Ok(f32::from_bits(u32_value))
    }
}
