/// Utility functions shared by the codec layers
///
/// Range validation used by both the PDU codec and the generator
/// configuration, plus hex formatting for frame dumps.

use crate::error::{ModbusError, ModbusResult};
use crate::protocol::ModbusFunction;

/// Data validation utilities
pub mod validation {
    use super::*;

    /// Highest individually addressable unit id on a serial line
    pub const MAX_UNIT_ID: u8 = 247;

    /// Validate a serial unit id (0 for broadcast, 1-247)
    pub fn validate_unit_id(unit_id: u8) -> ModbusResult<()> {
        if unit_id > MAX_UNIT_ID {
            return Err(ModbusError::configuration(format!(
                "Invalid unit ID: {} (must be 0-{})",
                unit_id, MAX_UNIT_ID
            )));
        }
        Ok(())
    }

    /// Validate the quantity of a request against its function's limit
    pub fn validate_quantity(function: ModbusFunction, quantity: u16) -> ModbusResult<()> {
        let max = function.max_quantity();
        if quantity == 0 || quantity > max {
            return Err(ModbusError::invalid_quantity(function.to_u8(), quantity, max));
        }
        Ok(())
    }

    /// Validate that `start..start + count` stays inside the 16-bit address space
    pub fn validate_address_range(function: ModbusFunction, start: u16, count: u16) -> ModbusResult<()> {
        let end = start as u32 + count as u32;
        if end > 0x1_0000 {
            let room = (0x1_0000 - start as u32).min(u16::MAX as u32) as u16;
            return Err(ModbusError::invalid_quantity(function.to_u8(), count, room));
        }
        Ok(())
    }
}

/// Formatting and display utilities
pub mod format {
    use super::*;

    /// Format byte array as spaced uppercase hex ("01 03 04")
    pub fn bytes_to_hex(bytes: &[u8]) -> String {
        bytes.iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format byte array as compact lowercase hex ("010304")
    pub fn bytes_to_compact_hex(bytes: &[u8]) -> String {
        hex::encode(bytes)
    }

    /// Format register values as hex
    pub fn registers_to_hex(registers: &[u16]) -> String {
        registers.iter()
            .map(|r| format!("{:04X}", r))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse a hex dump, ignoring whitespace ("01 03 04 00 0A")
    pub fn parse_hex(text: &str) -> ModbusResult<Vec<u8>> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        hex::decode(&compact)
            .map_err(|e| ModbusError::invalid_data(format!("Invalid hex dump '{}': {}", text, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(validation::validate_unit_id(0).is_ok());
        assert!(validation::validate_unit_id(247).is_ok());
        assert!(validation::validate_unit_id(248).is_err());

        assert!(validation::validate_quantity(ModbusFunction::ReadCoils, 2000).is_ok());
        assert_eq!(
            validation::validate_quantity(ModbusFunction::ReadCoils, 3000),
            Err(ModbusError::InvalidQuantity { function: 0x01, quantity: 3000, max: 2000 })
        );
        assert!(validation::validate_quantity(ModbusFunction::ReadHoldingRegisters, 0).is_err());

        assert!(validation::validate_address_range(ModbusFunction::ReadCoils, 65535, 1).is_ok());
        assert_eq!(
            validation::validate_address_range(ModbusFunction::ReadCoils, 65535, 2),
            Err(ModbusError::InvalidQuantity { function: 0x01, quantity: 2, max: 1 })
        );
    }

    #[test]
    fn test_format() {
        assert_eq!(format::bytes_to_hex(&[0x01, 0x03, 0xAB]), "01 03 AB");
        assert_eq!(format::bytes_to_compact_hex(&[0x01, 0x03, 0xAB]), "0103ab");
        assert_eq!(format::registers_to_hex(&[0x000A, 0xBEEF]), "000A BEEF");
        assert_eq!(format::parse_hex("01 03 04\n00 0a").unwrap(), vec![0x01, 0x03, 0x04, 0x00, 0x0A]);
        assert!(format::parse_hex("0G").is_err());
    }
}
