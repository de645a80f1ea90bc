//! Frame generator configuration
//!
//! The configuration is fixed when a [`FrameGenerator`](crate::FrameGenerator)
//! is built and never changes afterwards. It can be written by hand or loaded
//! from JSON:
//!
//! ```rust
//! use voltage_modbus_codec::{FrameGeneratorConfig, FramingMode};
//!
//! let config = FrameGeneratorConfig::from_json(r#"{ "mode": "tcp", "unit_id": 255 }"#).unwrap();
//! assert_eq!(config.mode, FramingMode::Tcp);
//! assert_eq!(config.transaction_id, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModbusResult;
use crate::protocol::UnitId;
use crate::utils::validation;

/// Transport envelope around the PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// Serial binary framing: unit id, PDU, CRC-16
    #[default]
    Rtu,
    /// Network framing: MBAP header, PDU, no checksum
    Tcp,
    /// Serial text framing: ':', hex digits of unit id, PDU and LRC, CR LF
    Ascii,
}

impl FramingMode {
    /// Check if this mode runs over a serial line with unit id addressing
    pub fn is_serial(self) -> bool {
        matches!(self, FramingMode::Rtu | FramingMode::Ascii)
    }

    /// Short protocol tag used in log lines
    pub fn as_str(self) -> &'static str {
        match self {
            FramingMode::Rtu => "RTU",
            FramingMode::Tcp => "TCP",
            FramingMode::Ascii => "ASCII",
        }
    }
}

impl fmt::Display for FramingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of a frame generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameGeneratorConfig {
    /// Envelope applied to every frame
    pub mode: FramingMode,
    /// Unit/slave identifier placed in every request
    pub unit_id: UnitId,
    /// MBAP transaction identifier used by `encode_request` in TCP mode
    pub transaction_id: u16,
    /// Verify CRC/LRC trailers when decoding serial frames
    pub verify_checksum: bool,
}

impl Default for FrameGeneratorConfig {
    fn default() -> Self {
        Self {
            mode: FramingMode::Rtu,
            unit_id: 1,
            transaction_id: 1,
            verify_checksum: true,
        }
    }
}

impl FrameGeneratorConfig {
    /// Create a configuration for the given mode and unit id
    pub fn new(mode: FramingMode, unit_id: UnitId) -> Self {
        Self {
            mode,
            unit_id,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> ModbusResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> ModbusResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration
    ///
    /// Serial modes accept unit id 0 (broadcast) and 1-247. Modbus TCP
    /// gateways use the whole byte, so any unit id is accepted there.
    pub fn validate(&self) -> ModbusResult<()> {
        if self.mode.is_serial() {
            validation::validate_unit_id(self.unit_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModbusError;

    #[test]
    fn test_default_config() {
        let config = FrameGeneratorConfig::default();
        assert_eq!(config.mode, FramingMode::Rtu);
        assert_eq!(config.unit_id, 1);
        assert!(config.verify_checksum);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unit_id_validation() {
        assert!(FrameGeneratorConfig::new(FramingMode::Rtu, 0).validate().is_ok());
        assert!(matches!(
            FrameGeneratorConfig::new(FramingMode::Ascii, 248).validate(),
            Err(ModbusError::Configuration { .. })
        ));
        assert!(FrameGeneratorConfig::new(FramingMode::Tcp, 255).validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = FrameGeneratorConfig {
            mode: FramingMode::Ascii,
            unit_id: 17,
            transaction_id: 9,
            verify_checksum: false,
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"ascii\""));
        assert_eq!(FrameGeneratorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_errors() {
        assert!(matches!(
            FrameGeneratorConfig::from_json(r#"{ "mode": "udp" }"#),
            Err(ModbusError::Configuration { .. })
        ));
        assert!(matches!(
            FrameGeneratorConfig::from_json(r#"{ "mode": "rtu", "unit_id": 250 }"#),
            Err(ModbusError::Configuration { .. })
        ));
    }
}
