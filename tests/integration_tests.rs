//! Integration Tests for Voltage Modbus Codec
//!
//! These tests drive the frame generator the way a transport would: encode a
//! request, hand the bytes to a (mock) device, decode what comes back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use voltage_modbus_codec::utils::format::parse_hex;
use voltage_modbus_codec::*;

/// Mock RTU device answering canned frames
#[derive(Debug, Default)]
pub struct MockRtuDevice {
    responses: HashMap<Vec<u8>, Vec<u8>>,
}

impl MockRtuDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a response for a given request frame
    pub fn set_response(&mut self, request: Vec<u8>, response: Vec<u8>) {
        self.responses.insert(request, response);
    }

    /// Simulate processing a request
    pub fn process_request(&self, request: &[u8]) -> Result<Vec<u8>, String> {
        self.responses
            .get(request)
            .cloned()
            .ok_or_else(|| format!("No response configured for request: {:02X?}", request))
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn frame_bytes(text: &str) -> Vec<u8> {
    parse_hex(text).unwrap()
}

/// Read Coils request from slave 1 and its reply, end to end
#[test]
fn test_rtu_read_coils_exchange() {
    init_logging();
    let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();

    let request = generator.read_coils(100, 8).unwrap();
    assert_eq!(request, frame_bytes("01 01 00 64 00 08 7C 13"));

    let mut device = MockRtuDevice::new();
    device.set_response(request.clone(), frame_bytes("01 01 01 CD 90 1D"));

    let reply = device.process_request(&request).unwrap();
    let coils = generator
        .decode_response(&reply, Some(ModbusFunction::ReadCoils), Some(8))
        .unwrap();

    let expected: Vec<bool> = [1, 0, 1, 1, 0, 0, 1, 1].iter().map(|&b| b == 1).collect();
    assert_eq!(coils, ModbusResponse::ReadCoils(expected));
}

/// A reply from a different slave on the same line is not accepted
#[test]
fn test_rtu_reply_from_wrong_slave() {
    let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();
    let request = generator.read_holding_registers(0, 1).unwrap();

    let mut reply = frame_bytes("05 03 02 00 0A");
    let crc = crc16(&reply);
    reply.extend_from_slice(&crc.to_le_bytes());

    let mut device = MockRtuDevice::new();
    device.set_response(request.clone(), reply);

    let reply = device.process_request(&request).unwrap();
    let err = generator
        .decode_response(&reply, Some(ModbusFunction::ReadHoldingRegisters), Some(1))
        .unwrap_err();
    assert_eq!(err, ModbusError::UnexpectedUnit { expected: 1, actual: 5 });
    assert!(err.is_protocol_error());
}

/// Read Holding Registers reply decodes to [10, 11]
#[test]
fn test_rtu_read_holding_registers() {
    let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();

    let frame = frame_bytes("01 03 04 00 0A 00 0B 9B F6");
    let response = generator.decode_response(&frame, None, None).unwrap();
    assert_eq!(response, ModbusResponse::ReadHoldingRegisters(vec![10, 11]));
    assert_eq!(response.registers(), Some(&[10u16, 11][..]));
}

/// CRC over `01 03 04 00 0A 00 0B` with poly 0xA001, init 0xFFFF
#[test]
fn test_crc_worked_example() {
    let data = frame_bytes("01 03 04 00 0A 00 0B");
    assert_eq!(crc16(&data).to_le_bytes(), [0x9B, 0xF6]);
    assert!(validate_crc(&frame_bytes("01 03 04 00 0A 00 0B 9B F6")));
}

/// Sample frames carrying `41 83` / `81 88` trailers are not valid CRC-16/MODBUS
#[test]
fn test_invalid_sample_trailers_rejected() {
    let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();

    let registers = frame_bytes("01 03 04 00 0A 00 0B 41 83");
    assert!(matches!(
        generator.decode_response(&registers, None, None),
        Err(ModbusError::ChecksumMismatch { expected: 0xF69B, actual: 0x8341 })
    ));

    let coils = frame_bytes("01 01 01 CD 81 88");
    assert!(matches!(
        generator.decode_response(&coils, None, Some(8)),
        Err(ModbusError::ChecksumMismatch { .. })
    ));

    // With verification disabled the payload is decoded as received
    let lenient = FrameGenerator::from_config(FrameGeneratorConfig {
        verify_checksum: false,
        ..FrameGeneratorConfig::default()
    })
    .unwrap();
    assert_eq!(
        lenient.decode_response(&registers, None, None).unwrap(),
        ModbusResponse::ReadHoldingRegisters(vec![10, 11])
    );
    assert_eq!(
        lenient.decode_response(&coils, None, Some(8)).unwrap(),
        ModbusResponse::ReadCoils(vec![true, false, true, true, false, false, true, true])
    );
}

/// Write Single Coil payload ends with the 0xFF00 / 0x0000 sentinels
#[test]
fn test_write_single_coil_sentinels() {
    for mode in [FramingMode::Rtu, FramingMode::Tcp] {
        let generator = FrameGenerator::new(mode, 1).unwrap();
        let on = generator.write_coil(7, true).unwrap();
        let off = generator.write_coil(7, false).unwrap();

        // Strip the CRC for RTU; TCP frames end with the payload
        let payload_end = |frame: &[u8]| {
            let end = if mode == FramingMode::Rtu { frame.len() - 2 } else { frame.len() };
            frame[end - 2..end].to_vec()
        };
        assert_eq!(payload_end(&on), vec![0xFF, 0x00]);
        assert_eq!(payload_end(&off), vec![0x00, 0x00]);
    }
}

/// Quantity beyond the per-function maximum produces no bytes
#[test]
fn test_invalid_quantity() {
    let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();

    let result = generator.read_coils(0, 3000);
    assert_eq!(
        result,
        Err(ModbusError::InvalidQuantity { function: 0x01, quantity: 3000, max: 2000 })
    );
    assert!(generator.read_input_registers(0, 126).is_err());
    assert!(generator.read_discrete_inputs(0, 0).is_err());
    assert!(generator.write_registers(0, &[0u16; 124]).is_err());
}

/// Every trailing-byte corruption is caught
#[test]
fn test_corrupted_trailing_byte() {
    let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();
    let good = frame_bytes("01 03 04 00 0A 00 0B 9B F6");

    for flip in [0x01u8, 0x80, 0xFF] {
        let mut frame = good.clone();
        let last = frame.len() - 1;
        frame[last] ^= flip;
        assert!(matches!(
            generator.decode_response(&frame, None, None),
            Err(ModbusError::ChecksumMismatch { .. })
        ));
    }
}

/// High-bit function codes are exceptions, never responses
#[test]
fn test_exception_response() {
    let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();

    let frame = frame_bytes("01 83 02 C0 F1");
    let err = generator
        .decode_response(&frame, Some(ModbusFunction::ReadHoldingRegisters), Some(2))
        .unwrap_err();
    assert_eq!(
        err,
        ModbusError::Exception {
            function: 0x03,
            code: 0x02,
            message: "Illegal Data Address".to_string(),
        }
    );
    assert_eq!(ModbusException::from_u8(err.exception_code().unwrap()), Some(ModbusException::IllegalDataAddress));
}

/// Write requests decode their expected echo back to the same address/value
#[test]
fn test_echo_roundtrip_all_modes() {
    let requests = vec![
        ModbusRequest::WriteSingleCoil { address: 100, value: true },
        ModbusRequest::WriteSingleCoil { address: 0, value: false },
        ModbusRequest::WriteSingleRegister { address: 100, value: 1234 },
        ModbusRequest::WriteMultipleCoils { address: 19, values: vec![true, false, true, true] },
        ModbusRequest::WriteMultipleRegisters { address: 1, values: vec![10, 258, 65535] },
    ];

    for mode in [FramingMode::Rtu, FramingMode::Tcp, FramingMode::Ascii] {
        let generator = FrameGenerator::new(mode, 5).unwrap();
        for request in &requests {
            let echo = generator.expected_echo(request).unwrap().unwrap();
            let decoded = generator
                .decode_frame(&echo, Some(request.function()), None)
                .unwrap();
            assert_eq!(decoded.unit_id, 5);
            assert!(decoded.response.confirms(request), "{} echo for {:?}", mode, request);
        }
    }
}

/// Requests parse back from their own frames in every mode
#[test]
fn test_parse_request_all_modes() {
    let request = ModbusRequest::WriteMultipleRegisters { address: 40, values: vec![1, 2, 3] };

    for mode in [FramingMode::Rtu, FramingMode::Tcp, FramingMode::Ascii] {
        let generator = FrameGenerator::new(mode, 9).unwrap();
        let frame = generator.encode_request_with_transaction(&request, 77).unwrap();
        let parsed = generator.parse_request(&frame).unwrap();

        assert_eq!(parsed.request, request);
        assert_eq!(parsed.unit_id, 9);
        let expected_tid = if mode == FramingMode::Tcp { Some(77) } else { None };
        assert_eq!(parsed.transaction_id, expected_tid);
    }
}

/// Unsupported function codes fail decoding
#[test]
fn test_unsupported_function() {
    let generator = FrameGenerator::new(FramingMode::Rtu, 1).unwrap();

    // Read Device Identification (0x2B) response header
    let mut frame = frame_bytes("01 2B 0E 01");
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());

    assert_eq!(
        generator.decode_response(&frame, None, None),
        Err(ModbusError::UnsupportedFunction { code: 0x2B })
    );
}

/// Generator configured from JSON
#[test]
fn test_generator_from_json_config() {
    let config = FrameGeneratorConfig::from_json(r#"{ "mode": "tcp", "unit_id": 1, "transaction_id": 42 }"#).unwrap();
    let generator = FrameGenerator::from_config(config).unwrap();

    let frame = generator.read_holding_registers(100, 2).unwrap();
    assert_eq!(frame, frame_bytes("00 2A 00 00 00 06 01 03 00 64 00 02"));
}

/// Callback logger sees every encoded and decoded frame
#[test]
fn test_generator_logging() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let callback: LogCallback = Box::new(move |_, message| sink.lock().unwrap().push(message.to_string()));

    let generator = FrameGenerator::new(FramingMode::Rtu, 1)
        .unwrap()
        .with_logger(voltage_modbus_codec::custom_logger!(callback, LogLevel::Debug, LoggingMode::Raw));

    generator.write_register(100, 1234).unwrap();
    let _ = generator.decode_response(&frame_bytes("01 03 04 00 0A 00 0B 41 83"), None, None);

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Modbus Request -> Raw: 01 06 00 64 04 D2 4A 88");
    assert!(lines[1].contains("Checksum mismatch"));
}

/// Log facade logger works alongside env_logger
#[test]
fn test_facade_logger() {
    init_logging();
    let generator = FrameGenerator::new(FramingMode::Ascii, 1)
        .unwrap()
        .with_logger(CallbackLogger::facade());

    let frame = generator.read_input_registers(8, 1).unwrap();
    assert_eq!(frame.first(), Some(&b':'));
    assert!(frame.ends_with(b"\r\n"));
}

/// One generator shared across tasks on a multi-threaded runtime
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_encode_decode() {
    let generator = Arc::new(FrameGenerator::new(FramingMode::Rtu, 1).unwrap());

    let mut handles = Vec::new();
    for i in 0..32u16 {
        let generator = Arc::clone(&generator);
        handles.push(tokio::spawn(async move {
            let request = ModbusRequest::WriteSingleRegister { address: i, value: i * 3 };
            let frame = generator.encode_request(&request).unwrap();
            let response = generator
                .decode_response(&frame, Some(ModbusFunction::WriteSingleRegister), None)
                .unwrap();
            assert!(response.confirms(&request));
            frame
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let frame = handle.await.unwrap();
        assert_eq!(frame[3], i as u8);
        assert!(validate_crc(&frame));
    }
}
