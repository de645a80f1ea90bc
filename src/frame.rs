//! Frame generation and parsing
//!
//! A [`FrameGenerator`] turns [`ModbusRequest`] values into ready-to-send
//! frames and received frames into [`ModbusResponse`] values, without doing
//! any I/O. The framing mode picks one [`FrameEnvelope`] at construction:
//!
//! ```text
//! RTU:   [unit][function][payload...][crc_lo][crc_hi]
//! TCP:   [tid_hi][tid_lo][0x00][0x00][len_hi][len_lo][unit][function][payload...]
//! ASCII: ':' hex([unit][function][payload...][lrc]) CR LF
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use voltage_modbus_codec::{FrameGenerator, FramingMode, ModbusFunction, ModbusResponse};
//!
//! let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();
//!
//! let frame = generator.read_holding_registers(100, 2).unwrap();
//! assert_eq!(frame, vec![0x01, 0x03, 0x00, 0x64, 0x00, 0x02, 0x85, 0xD4]);
//!
//! let reply = [0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x0B, 0x9B, 0xF6];
//! let response = generator
//!     .decode_response(&reply, Some(ModbusFunction::ReadHoldingRegisters), Some(2))
//!     .unwrap();
//! assert_eq!(response, ModbusResponse::ReadHoldingRegisters(vec![10, 11]));
//! ```

use std::borrow::Cow;
use std::fmt;

use tracing::{debug, trace};

use crate::checksum::{self, CRC_LEN};
use crate::config::{FrameGeneratorConfig, FramingMode};
use crate::error::{ModbusError, ModbusResult};
use crate::logging::CallbackLogger;
use crate::pdu;
use crate::protocol::{ModbusAddress, ModbusFunction, ModbusRequest, ModbusResponse, ModbusValue, UnitId};
use crate::utils::format::bytes_to_hex;
use crate::{MAX_ASCII_FRAME_SIZE, MAX_RTU_FRAME_SIZE, MAX_TCP_FRAME_SIZE};

/// Modbus TCP Application Protocol header size (without unit id)
pub const MBAP_HEADER_SIZE: usize = 6;

/// Modbus protocol identifier carried in every MBAP header
pub const MBAP_PROTOCOL_ID: u16 = 0;

const ASCII_START: u8 = b':';
const ASCII_END: [u8; 2] = [b'\r', b'\n'];

/// Addressing fields placed around a PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub unit_id: UnitId,
    /// Only carried by TCP frames
    pub transaction_id: u16,
}

fn check_frame_size(mode: FramingMode, frame: &[u8], max: usize) -> ModbusResult<()> {
    if frame.len() > max {
        return Err(ModbusError::frame(format!(
            "{} frame of {} bytes exceeds the maximum of {}",
            mode,
            frame.len(),
            max
        )));
    }
    Ok(())
}

/// A frame with its envelope removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwrapped<'a> {
    pub unit_id: UnitId,
    pub transaction_id: Option<u16>,
    /// Function code followed by payload
    pub pdu: Cow<'a, [u8]>,
}

/// Transport envelope around a PDU
///
/// Implementations are stateless; everything they need is fixed when the
/// generator is built.
pub trait FrameEnvelope: Send + Sync + fmt::Debug {
    /// Framing mode this envelope implements
    fn mode(&self) -> FramingMode;

    /// Wrap a PDU into a complete frame
    fn wrap(&self, header: EnvelopeHeader, pdu: &[u8]) -> Vec<u8>;

    /// Validate and strip the envelope of a received frame
    fn unwrap<'a>(&self, frame: &'a [u8]) -> ModbusResult<Unwrapped<'a>>;
}

/// RTU envelope: unit id prefix, CRC-16 trailer
#[derive(Debug, Clone, Copy)]
pub struct RtuEnvelope {
    pub verify_checksum: bool,
}

impl FrameEnvelope for RtuEnvelope {
    fn mode(&self) -> FramingMode {
        FramingMode::Rtu
    }

    fn wrap(&self, header: EnvelopeHeader, pdu: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(1 + pdu.len() + CRC_LEN);
        frame.push(header.unit_id);
        frame.extend_from_slice(pdu);

        let crc = checksum::crc16(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    fn unwrap<'a>(&self, frame: &'a [u8]) -> ModbusResult<Unwrapped<'a>> {
        check_frame_size(FramingMode::Rtu, frame, MAX_RTU_FRAME_SIZE)?;
        if frame.len() < 2 + CRC_LEN {
            return Err(ModbusError::truncated(format!(
                "RTU frame of {} bytes is shorter than unit id, function code and CRC",
                frame.len()
            )));
        }

        let data_len = frame.len() - CRC_LEN;
        if self.verify_checksum {
            let received = u16::from_le_bytes([frame[data_len], frame[data_len + 1]]);
            let calculated = checksum::crc16(&frame[..data_len]);
            if received != calculated {
                return Err(ModbusError::checksum_mismatch(calculated, received));
            }
        }

        Ok(Unwrapped {
            unit_id: frame[0],
            transaction_id: None,
            pdu: Cow::Borrowed(&frame[1..data_len]),
        })
    }
}

/// TCP envelope: MBAP header, no checksum
#[derive(Debug, Clone, Copy)]
pub struct TcpEnvelope;

impl FrameEnvelope for TcpEnvelope {
    fn mode(&self) -> FramingMode {
        FramingMode::Tcp
    }

    fn wrap(&self, header: EnvelopeHeader, pdu: &[u8]) -> Vec<u8> {
        // Length counts the unit id and the PDU
        let length = (1 + pdu.len()) as u16;

        let mut frame = Vec::with_capacity(MBAP_HEADER_SIZE + 1 + pdu.len());
        frame.extend_from_slice(&header.transaction_id.to_be_bytes());
        frame.extend_from_slice(&MBAP_PROTOCOL_ID.to_be_bytes());
        frame.extend_from_slice(&length.to_be_bytes());
        frame.push(header.unit_id);
        frame.extend_from_slice(pdu);
        frame
    }

    fn unwrap<'a>(&self, frame: &'a [u8]) -> ModbusResult<Unwrapped<'a>> {
        check_frame_size(FramingMode::Tcp, frame, MAX_TCP_FRAME_SIZE)?;
        if frame.len() < MBAP_HEADER_SIZE + 2 {
            return Err(ModbusError::truncated(format!(
                "TCP frame of {} bytes is shorter than MBAP header and function code",
                frame.len()
            )));
        }

        let transaction_id = u16::from_be_bytes([frame[0], frame[1]]);
        let protocol_id = u16::from_be_bytes([frame[2], frame[3]]);
        let length = u16::from_be_bytes([frame[4], frame[5]]) as usize;

        if protocol_id != MBAP_PROTOCOL_ID {
            return Err(ModbusError::frame(format!("Invalid MBAP protocol ID: {}", protocol_id)));
        }

        let remaining = frame.len() - MBAP_HEADER_SIZE;
        if length != remaining {
            return Err(ModbusError::truncated(format!(
                "MBAP length {} does not match {} bytes after the header",
                length, remaining
            )));
        }

        Ok(Unwrapped {
            unit_id: frame[MBAP_HEADER_SIZE],
            transaction_id: Some(transaction_id),
            pdu: Cow::Borrowed(&frame[MBAP_HEADER_SIZE + 1..]),
        })
    }
}

/// ASCII envelope: ':' start, uppercase hex, LRC, CR LF
#[derive(Debug, Clone, Copy)]
pub struct AsciiEnvelope {
    pub verify_checksum: bool,
}

impl FrameEnvelope for AsciiEnvelope {
    fn mode(&self) -> FramingMode {
        FramingMode::Ascii
    }

    fn wrap(&self, header: EnvelopeHeader, pdu: &[u8]) -> Vec<u8> {
        let mut raw = Vec::with_capacity(pdu.len() + 2);
        raw.push(header.unit_id);
        raw.extend_from_slice(pdu);
        raw.push(checksum::lrc(&raw));

        let mut frame = Vec::with_capacity(1 + raw.len() * 2 + ASCII_END.len());
        frame.push(ASCII_START);
        frame.extend_from_slice(hex::encode_upper(&raw).as_bytes());
        frame.extend_from_slice(&ASCII_END);
        frame
    }

    fn unwrap<'a>(&self, frame: &'a [u8]) -> ModbusResult<Unwrapped<'a>> {
        check_frame_size(FramingMode::Ascii, frame, MAX_ASCII_FRAME_SIZE)?;
        // ':' + unit id, function code and LRC as hex + CR LF
        if frame.len() < 1 + 3 * 2 + ASCII_END.len() {
            return Err(ModbusError::truncated(format!(
                "ASCII frame of {} bytes is too short",
                frame.len()
            )));
        }
        if frame[0] != ASCII_START {
            return Err(ModbusError::frame("Invalid ASCII frame start character"));
        }
        if !frame.ends_with(&ASCII_END) {
            return Err(ModbusError::frame("Invalid ASCII frame end characters"));
        }

        let digits = &frame[1..frame.len() - ASCII_END.len()];
        if digits.len() % 2 != 0 {
            return Err(ModbusError::frame("Odd number of hex digits in ASCII frame"));
        }

        let mut raw = hex::decode(digits)
            .map_err(|e| ModbusError::frame(format!("Invalid hex in ASCII frame: {}", e)))?;

        let received = raw.pop().unwrap_or_default();
        if self.verify_checksum {
            let calculated = checksum::lrc(&raw);
            if received != calculated {
                return Err(ModbusError::checksum_mismatch(calculated as u16, received as u16));
            }
        }

        let unit_id = raw.remove(0);
        Ok(Unwrapped {
            unit_id,
            transaction_id: None,
            pdu: Cow::Owned(raw),
        })
    }
}

/// Decoded response with the envelope fields it arrived in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub unit_id: UnitId,
    /// Present for TCP frames only
    pub transaction_id: Option<u16>,
    pub response: ModbusResponse,
}

/// Decoded request with the envelope fields it arrived in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub unit_id: UnitId,
    /// Present for TCP frames only
    pub transaction_id: Option<u16>,
    pub request: ModbusRequest,
}

fn envelope_for(config: &FrameGeneratorConfig) -> Box<dyn FrameEnvelope> {
    match config.mode {
        FramingMode::Rtu => Box::new(RtuEnvelope { verify_checksum: config.verify_checksum }),
        FramingMode::Tcp => Box::new(TcpEnvelope),
        FramingMode::Ascii => Box::new(AsciiEnvelope { verify_checksum: config.verify_checksum }),
    }
}

/// Modbus frame generator and parser
///
/// Holds only its configuration, so one instance can be shared between
/// threads and every call is independent of the previous ones.
pub struct FrameGenerator {
    config: FrameGeneratorConfig,
    envelope: Box<dyn FrameEnvelope>,
    logger: CallbackLogger,
}

impl fmt::Debug for FrameGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameGenerator")
            .field("config", &self.config)
            .field("envelope", &self.envelope)
            .field("logging", &self.logger.is_enabled())
            .finish()
    }
}

impl FrameGenerator {
    /// Create a generator for the given mode and unit id
    pub fn new(mode: FramingMode, unit_id: UnitId) -> ModbusResult<Self> {
        Self::from_config(FrameGeneratorConfig::new(mode, unit_id))
    }

    /// Create a generator from a full configuration
    pub fn from_config(config: FrameGeneratorConfig) -> ModbusResult<Self> {
        config.validate()?;
        let envelope = envelope_for(&config);
        debug!(mode = %config.mode, unit_id = config.unit_id, "Frame generator created");

        Ok(Self {
            config,
            envelope,
            logger: CallbackLogger::disabled(),
        })
    }

    /// Attach a callback logger reporting every encoded and decoded frame
    pub fn with_logger(mut self, logger: CallbackLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Framing mode
    pub fn mode(&self) -> FramingMode {
        self.envelope.mode()
    }

    /// Unit id placed in requests
    pub fn unit_id(&self) -> UnitId {
        self.config.unit_id
    }

    /// Configuration the generator was built with
    pub fn config(&self) -> &FrameGeneratorConfig {
        &self.config
    }

    /// Encode a request into a complete frame
    ///
    /// TCP frames carry the configured transaction id.
    pub fn encode_request(&self, request: &ModbusRequest) -> ModbusResult<Vec<u8>> {
        self.encode_request_with_transaction(request, self.config.transaction_id)
    }

    /// Encode a request with an explicit MBAP transaction id
    ///
    /// The transaction id is ignored by serial modes. Serial unit id 0 is a
    /// broadcast, which Modbus permits for writes only.
    pub fn encode_request_with_transaction(
        &self,
        request: &ModbusRequest,
        transaction_id: u16,
    ) -> ModbusResult<Vec<u8>> {
        let function = request.function();
        if self.is_broadcast() && function.is_read_function() {
            return Err(ModbusError::configuration(format!(
                "{} cannot be broadcast to unit id 0",
                function
            )));
        }

        let pdu = pdu::encode_request(request)?;
        let frame = self.envelope.wrap(self.header(transaction_id), &pdu);

        self.log_packet("TX", &frame);
        self.logger.log_request(self.config.unit_id, request, &frame);
        Ok(frame)
    }

    /// Build the frame a device sends back to confirm a write request
    ///
    /// Returns `None` for read requests and for serial broadcasts, which no
    /// device answers. Decoding the returned frame yields a response that
    /// [`confirms`](ModbusResponse::confirms) the request.
    pub fn expected_echo(&self, request: &ModbusRequest) -> ModbusResult<Option<Vec<u8>>> {
        let echo = pdu::encode_echo(request)?;
        if self.is_broadcast() {
            return Ok(None);
        }
        Ok(echo.map(|echo| self.envelope.wrap(self.header(self.config.transaction_id), &echo)))
    }

    /// Decode a response frame
    ///
    /// # Arguments
    ///
    /// * `frame` - Complete received frame, envelope included
    /// * `expected_function` - Function of the request being answered, if known
    /// * `expected_count` - Requested coil/register count; trims the padding
    ///   bits of coil and discrete input responses
    pub fn decode_response(
        &self,
        frame: &[u8],
        expected_function: Option<ModbusFunction>,
        expected_count: Option<u16>,
    ) -> ModbusResult<ModbusResponse> {
        self.decode_frame(frame, expected_function, expected_count)
            .map(|decoded| decoded.response)
    }

    /// Decode a response frame, keeping unit id and transaction id
    ///
    /// Serial replies must come from the configured unit. TCP replies are
    /// matched by transaction id, so their unit id is passed through.
    pub fn decode_frame(
        &self,
        frame: &[u8],
        expected_function: Option<ModbusFunction>,
        expected_count: Option<u16>,
    ) -> ModbusResult<ResponseFrame> {
        self.log_packet("RX", frame);

        let result = self.envelope.unwrap(frame).and_then(|unwrapped| {
            if self.mode().is_serial() && !self.is_broadcast() && unwrapped.unit_id != self.config.unit_id {
                return Err(ModbusError::unexpected_unit(self.config.unit_id, unwrapped.unit_id));
            }
            let response = pdu::decode_response(&unwrapped.pdu, expected_function, expected_count)?;
            Ok(ResponseFrame {
                unit_id: unwrapped.unit_id,
                transaction_id: unwrapped.transaction_id,
                response,
            })
        });

        match &result {
            Ok(decoded) => self.logger.log_response(decoded.unit_id, &decoded.response, frame),
            Err(error) => {
                debug!(mode = %self.mode(), %error, "Failed to decode response");
                self.logger.log_decode_error(error, frame);
            }
        }
        result
    }

    /// Parse a request frame, as a device or bus monitor receives it
    pub fn parse_request(&self, frame: &[u8]) -> ModbusResult<RequestFrame> {
        self.log_packet("RX", frame);

        let unwrapped = self.envelope.unwrap(frame)?;
        let request = pdu::decode_request(&unwrapped.pdu)?;
        Ok(RequestFrame {
            unit_id: unwrapped.unit_id,
            transaction_id: unwrapped.transaction_id,
            request,
        })
    }

    /// Read Coils (0x01) request frame
    pub fn read_coils(&self, address: ModbusAddress, count: u16) -> ModbusResult<Vec<u8>> {
        self.encode_request(&ModbusRequest::ReadCoils { address, quantity: count })
    }

    /// Read Discrete Inputs (0x02) request frame
    pub fn read_discrete_inputs(&self, address: ModbusAddress, count: u16) -> ModbusResult<Vec<u8>> {
        self.encode_request(&ModbusRequest::ReadDiscreteInputs { address, quantity: count })
    }

    /// Read Holding Registers (0x03) request frame
    pub fn read_holding_registers(&self, address: ModbusAddress, count: u16) -> ModbusResult<Vec<u8>> {
        self.encode_request(&ModbusRequest::ReadHoldingRegisters { address, quantity: count })
    }

    /// Read Input Registers (0x04) request frame
    pub fn read_input_registers(&self, address: ModbusAddress, count: u16) -> ModbusResult<Vec<u8>> {
        self.encode_request(&ModbusRequest::ReadInputRegisters { address, quantity: count })
    }

    /// Write Single Coil (0x05) request frame
    pub fn write_coil(&self, address: ModbusAddress, value: bool) -> ModbusResult<Vec<u8>> {
        self.encode_request(&ModbusRequest::WriteSingleCoil { address, value })
    }

    /// Write Single Register (0x06) request frame
    pub fn write_register(&self, address: ModbusAddress, value: ModbusValue) -> ModbusResult<Vec<u8>> {
        self.encode_request(&ModbusRequest::WriteSingleRegister { address, value })
    }

    /// Write Multiple Coils (0x0F) request frame
    pub fn write_coils(&self, address: ModbusAddress, values: &[bool]) -> ModbusResult<Vec<u8>> {
        self.encode_request(&ModbusRequest::WriteMultipleCoils { address, values: values.to_vec() })
    }

    /// Write Multiple Registers (0x10) request frame
    pub fn write_registers(&self, address: ModbusAddress, values: &[ModbusValue]) -> ModbusResult<Vec<u8>> {
        self.encode_request(&ModbusRequest::WriteMultipleRegisters { address, values: values.to_vec() })
    }

    fn is_broadcast(&self) -> bool {
        self.mode().is_serial() && self.config.unit_id == 0
    }

    fn header(&self, transaction_id: u16) -> EnvelopeHeader {
        EnvelopeHeader {
            unit_id: self.config.unit_id,
            transaction_id,
        }
    }

    fn log_packet(&self, direction: &str, frame: &[u8]) {
        trace!(
            "[MODBUS-{}] {} unit:{} {}",
            self.mode(),
            direction,
            self.config.unit_id,
            bytes_to_hex(frame)
        );
    }
}
