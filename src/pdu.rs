//! Protocol Data Unit codec
//!
//! Converts [`ModbusRequest`] values into function-specific payloads and
//! response payloads back into [`ModbusResponse`] values. Nothing here knows
//! about unit ids, checksums or MBAP headers; see [`crate::frame`] for that.
//!
//! ## Payload layouts
//!
//! | Function | Request | Response |
//! |----------|---------|----------|
//! | 0x01-0x04 | address, quantity | byte count, data |
//! | 0x05 | address, 0xFF00/0x0000 | echo of request |
//! | 0x06 | address, value | echo of request |
//! | 0x0F | address, quantity, byte count, packed bits | address, quantity |
//! | 0x10 | address, quantity, byte count, registers | address, quantity |
//!
//! All 16-bit fields are big-endian.

use tracing::debug;

use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{
    data_utils, ModbusFunction, ModbusRequest, ModbusResponse, COIL_OFF, COIL_ON, EXCEPTION_FLAG,
};

/// Encode a request into its PDU (function code followed by payload)
///
/// The request is validated first; an invalid request produces no bytes.
pub fn encode_request(request: &ModbusRequest) -> ModbusResult<Vec<u8>> {
    request.validate()?;

    let mut pdu = Vec::with_capacity(pdu_capacity(request));
    pdu.push(request.function().to_u8());

    match request {
        ModbusRequest::ReadCoils { address, quantity }
        | ModbusRequest::ReadDiscreteInputs { address, quantity }
        | ModbusRequest::ReadHoldingRegisters { address, quantity }
        | ModbusRequest::ReadInputRegisters { address, quantity } => {
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&quantity.to_be_bytes());
        }

        ModbusRequest::WriteSingleCoil { address, value } => {
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&coil_to_wire(*value).to_be_bytes());
        }

        ModbusRequest::WriteSingleRegister { address, value } => {
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&value.to_be_bytes());
        }

        ModbusRequest::WriteMultipleCoils { address, values } => {
            let packed = data_utils::pack_bits(values);
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&request.quantity().to_be_bytes());
            pdu.push(packed.len() as u8);
            pdu.extend_from_slice(&packed);
        }

        ModbusRequest::WriteMultipleRegisters { address, values } => {
            let bytes = data_utils::registers_to_bytes(values);
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&request.quantity().to_be_bytes());
            pdu.push(bytes.len() as u8);
            pdu.extend_from_slice(&bytes);
        }
    }

    Ok(pdu)
}

/// Build the response PDU a device sends back to confirm a write request
///
/// Returns `None` for read requests, which are answered with data rather than
/// an echo.
pub fn encode_echo(request: &ModbusRequest) -> ModbusResult<Option<Vec<u8>>> {
    match request {
        ModbusRequest::ReadCoils { .. }
        | ModbusRequest::ReadDiscreteInputs { .. }
        | ModbusRequest::ReadHoldingRegisters { .. }
        | ModbusRequest::ReadInputRegisters { .. } => Ok(None),

        // Single writes are echoed verbatim
        ModbusRequest::WriteSingleCoil { .. } | ModbusRequest::WriteSingleRegister { .. } => {
            encode_request(request).map(Some)
        }

        ModbusRequest::WriteMultipleCoils { address, .. }
        | ModbusRequest::WriteMultipleRegisters { address, .. } => {
            request.validate()?;
            let mut pdu = Vec::with_capacity(5);
            pdu.push(request.function().to_u8());
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&request.quantity().to_be_bytes());
            Ok(Some(pdu))
        }
    }
}

/// Decode a response PDU
///
/// # Arguments
///
/// * `pdu` - Function code followed by the response payload
/// * `expected_function` - Function of the request being answered, if known
/// * `expected_count` - Number of coils/registers requested; coil responses
///   are padded to whole bytes, so this is what trims the padding bits.
///   Without it every transmitted bit is returned.
///
/// # Errors
///
/// Exception responses (function code with the high bit set) are returned as
/// [`ModbusError::Exception`]. Decoding is all-or-nothing.
pub fn decode_response(
    pdu: &[u8],
    expected_function: Option<ModbusFunction>,
    expected_count: Option<u16>,
) -> ModbusResult<ModbusResponse> {
    let (&code, body) = pdu
        .split_first()
        .ok_or_else(|| ModbusError::truncated("Empty PDU"))?;

    if code & EXCEPTION_FLAG != 0 {
        return Err(decode_exception(code, body));
    }

    let function = ModbusFunction::from_u8(code)?;
    if let Some(expected) = expected_function {
        if expected != function {
            return Err(ModbusError::unexpected_function(expected.to_u8(), code));
        }
    }

    match function {
        ModbusFunction::ReadCoils => decode_bits(body, expected_count).map(ModbusResponse::ReadCoils),
        ModbusFunction::ReadDiscreteInputs => {
            decode_bits(body, expected_count).map(ModbusResponse::ReadDiscreteInputs)
        }
        ModbusFunction::ReadHoldingRegisters => {
            decode_registers(body, expected_count).map(ModbusResponse::ReadHoldingRegisters)
        }
        ModbusFunction::ReadInputRegisters => {
            decode_registers(body, expected_count).map(ModbusResponse::ReadInputRegisters)
        }
        ModbusFunction::WriteSingleCoil => {
            let (address, raw) = decode_pair(function, body)?;
            Ok(ModbusResponse::WriteSingleCoil { address, value: coil_from_wire(raw)? })
        }
        ModbusFunction::WriteSingleRegister => {
            let (address, value) = decode_pair(function, body)?;
            Ok(ModbusResponse::WriteSingleRegister { address, value })
        }
        ModbusFunction::WriteMultipleCoils => {
            let (address, quantity) = decode_pair(function, body)?;
            Ok(ModbusResponse::WriteMultipleCoils { address, quantity })
        }
        ModbusFunction::WriteMultipleRegisters => {
            let (address, quantity) = decode_pair(function, body)?;
            Ok(ModbusResponse::WriteMultipleRegisters { address, quantity })
        }
    }
}

/// Decode a request PDU back into a [`ModbusRequest`]
///
/// Used by monitors and device simulators that receive requests rather than
/// responses. The decoded request is validated like an encoded one.
pub fn decode_request(pdu: &[u8]) -> ModbusResult<ModbusRequest> {
    let (&code, body) = pdu
        .split_first()
        .ok_or_else(|| ModbusError::truncated("Empty PDU"))?;
    let function = ModbusFunction::from_u8(code)?;

    let request = match function {
        ModbusFunction::ReadCoils
        | ModbusFunction::ReadDiscreteInputs
        | ModbusFunction::ReadHoldingRegisters
        | ModbusFunction::ReadInputRegisters => {
            let (address, quantity) = decode_pair(function, body)?;
            ModbusRequest::new_read(function, address, quantity)?
        }
        ModbusFunction::WriteSingleCoil => {
            let (address, raw) = decode_pair(function, body)?;
            ModbusRequest::WriteSingleCoil { address, value: coil_from_wire(raw)? }
        }
        ModbusFunction::WriteSingleRegister => {
            let (address, value) = decode_pair(function, body)?;
            ModbusRequest::WriteSingleRegister { address, value }
        }
        ModbusFunction::WriteMultipleCoils => {
            let (address, quantity, data) = split_multiple_write(function, body)?;
            if data.len() != data_utils::packed_len(quantity as usize) {
                return Err(ModbusError::truncated(format!(
                    "{} coils need {} bytes, byte count is {}",
                    quantity,
                    data_utils::packed_len(quantity as usize),
                    data.len()
                )));
            }
            ModbusRequest::WriteMultipleCoils {
                address,
                values: data_utils::unpack_bits(data, quantity as usize),
            }
        }
        ModbusFunction::WriteMultipleRegisters => {
            let (address, quantity, data) = split_multiple_write(function, body)?;
            if data.len() != quantity as usize * 2 {
                return Err(ModbusError::truncated(format!(
                    "{} registers need {} bytes, byte count is {}",
                    quantity,
                    quantity as usize * 2,
                    data.len()
                )));
            }
            ModbusRequest::WriteMultipleRegisters {
                address,
                values: data_utils::bytes_to_registers(data)?,
            }
        }
    };

    request.validate()?;
    Ok(request)
}

fn pdu_capacity(request: &ModbusRequest) -> usize {
    match request {
        ModbusRequest::WriteMultipleCoils { values, .. } => 6 + data_utils::packed_len(values.len()),
        ModbusRequest::WriteMultipleRegisters { values, .. } => 6 + values.len() * 2,
        _ => 5,
    }
}

fn coil_to_wire(value: bool) -> u16 {
    if value { COIL_ON } else { COIL_OFF }
}

fn coil_from_wire(raw: u16) -> ModbusResult<bool> {
    match raw {
        COIL_ON => Ok(true),
        COIL_OFF => Ok(false),
        other => Err(ModbusError::invalid_data(format!(
            "Coil value 0x{:04X} is neither 0xFF00 nor 0x0000",
            other
        ))),
    }
}

fn decode_exception(code: u8, body: &[u8]) -> ModbusError {
    let function = code & !EXCEPTION_FLAG;
    match body {
        [exception_code] => {
            debug!(function, exception_code, "Exception response");
            ModbusError::exception(function, *exception_code)
        }
        _ => ModbusError::truncated(format!(
            "Exception response for function 0x{:02X} carries {} bytes, expected 1",
            function,
            body.len()
        )),
    }
}

/// Split `[byte count][data]` and check the count against the remaining bytes
///
/// Every read and multiple write moves at least one item, so a zero byte
/// count is rejected.
fn split_byte_count(body: &[u8]) -> ModbusResult<(usize, &[u8])> {
    let (&byte_count, data) = body
        .split_first()
        .ok_or_else(|| ModbusError::truncated("Missing byte count"))?;

    if byte_count == 0 {
        return Err(ModbusError::truncated("Byte count of 0 carries no data"));
    }

    if data.len() != byte_count as usize {
        return Err(ModbusError::truncated(format!(
            "Byte count {} does not match {} remaining bytes",
            byte_count,
            data.len()
        )));
    }

    Ok((byte_count as usize, data))
}

fn decode_bits(body: &[u8], expected_count: Option<u16>) -> ModbusResult<Vec<bool>> {
    let (byte_count, data) = split_byte_count(body)?;

    let bit_count = match expected_count {
        Some(0) => {
            return Err(ModbusError::truncated("Expected bit count of 0 cannot be answered"));
        }
        Some(count) => {
            let needed = data_utils::packed_len(count as usize);
            if needed != byte_count {
                return Err(ModbusError::truncated(format!(
                    "{} bits need {} bytes, byte count is {}",
                    count, needed, byte_count
                )));
            }
            count as usize
        }
        None => byte_count * 8,
    };

    Ok(data_utils::unpack_bits(data, bit_count))
}

fn decode_registers(body: &[u8], expected_count: Option<u16>) -> ModbusResult<Vec<u16>> {
    let (byte_count, data) = split_byte_count(body)?;

    if byte_count % 2 != 0 {
        return Err(ModbusError::truncated(format!(
            "Register byte count {} is odd",
            byte_count
        )));
    }
    if let Some(count) = expected_count {
        if count == 0 || count as usize * 2 != byte_count {
            return Err(ModbusError::truncated(format!(
                "{} registers need {} bytes, byte count is {}",
                count,
                count as usize * 2,
                byte_count
            )));
        }
    }

    data_utils::bytes_to_registers(data)
}

/// Decode the fixed `[u16][u16]` payload shared by echoes and read requests
fn decode_pair(function: ModbusFunction, body: &[u8]) -> ModbusResult<(u16, u16)> {
    match body {
        [a_hi, a_lo, b_hi, b_lo] => Ok((
            u16::from_be_bytes([*a_hi, *a_lo]),
            u16::from_be_bytes([*b_hi, *b_lo]),
        )),
        _ => Err(ModbusError::truncated(format!(
            "{} payload carries {} bytes, expected 4",
            function,
            body.len()
        ))),
    }
}

fn split_multiple_write(function: ModbusFunction, body: &[u8]) -> ModbusResult<(u16, u16, &[u8])> {
    if body.len() < 5 {
        return Err(ModbusError::truncated(format!(
            "{} request carries {} bytes, expected at least 5",
            function,
            body.len()
        )));
    }

    let (address, quantity) = decode_pair(function, &body[..4])?;
    let (_, data) = split_byte_count(&body[4..])?;
    Ok((address, quantity, data))
}
