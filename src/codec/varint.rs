use bytes::{Buf, BufMut};
use crate::core::error::{Error, ErrorKind, ParseError};

/// Max 7-bit groups for a 32-bit value
pub const MAX_GROUPS_32: usize = 5;
/// Max 7-bit groups for a 64-bit value
pub const MAX_GROUPS_64: usize = 10;

/// Variable byte encoding: 7 payload bits per byte, least significant group first.
/// Every byte but the last carries the 0x80 continuation bit.
pub fn write_var_u64(output: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        output.put_u8((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    output.put_u8(value as u8);
}

pub fn write_var_u32(output: &mut impl BufMut, value: u32) {
    write_var_u64(output, value as u64)
}

/// Signed values go through zigzag so small negatives stay short.
pub fn write_var_i64(output: &mut impl BufMut, value: i64) {
    write_var_u64(output, encode_zigzag_i64(value))
}

pub fn write_var_i32(output: &mut impl BufMut, value: i32) {
    write_var_u32(output, encode_zigzag_i32(value))
}

fn read_var(input: &mut impl Buf, max_groups: usize) -> Result<u64, ParseError> {
    let mut value = 0u64;
    let mut last_byte = 0u8;

    for group in 0..max_groups {
        if !input.has_remaining() {
            return Err(ParseError::UnexpectedEnd { needed: 1, remaining: 0 });
        }
        last_byte = input.get_u8();
        value |= ((last_byte & 0x7F) as u64) << (7 * group);

        if last_byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(ParseError::MalformedVarInt { max_groups, last_byte })
}

pub fn read_var_u64(input: &mut impl Buf) -> Result<u64, ParseError> {
    read_var(input, MAX_GROUPS_64)
}

pub fn read_var_u32(input: &mut impl Buf) -> Result<u32, ParseError> {
    // Bits beyond 32 in the fifth group are dropped, matching a 32-bit writer
    read_var(input, MAX_GROUPS_32).map(|v| v as u32)
}

pub fn read_var_i64(input: &mut impl Buf) -> Result<i64, ParseError> {
    read_var_u64(input).map(decode_zigzag_i64)
}

pub fn read_var_i32(input: &mut impl Buf) -> Result<i32, ParseError> {
    read_var_u32(input).map(decode_zigzag_i32)
}

/// Consume one varint without decoding it.
pub fn skip_var_bytes(input: &mut impl Buf) -> Result<(), ParseError> {
    read_var(input, MAX_GROUPS_64).map(|_| ())
}

pub fn encode_zigzag_i32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn decode_zigzag_i32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub fn encode_zigzag_i64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn decode_zigzag_i64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Number of 7-bit groups `value` needs, without writing it.
pub fn calculate_var_byte_length(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Most low bits `write_var_int_with_extra_info` can reserve; the extra
/// value is a `u8`.
pub const MAX_EXTRA_INFO_BITS: u8 = 7;

fn check_extra_info_bits(bits: u8) -> crate::core::error::Result<u64> {
    if bits > MAX_EXTRA_INFO_BITS {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("{} extra info bits requested, at most {} allowed", bits, MAX_EXTRA_INFO_BITS),
        ));
    }
    Ok((1u64 << bits) - 1)
}

/// Pack `extra_info` into the lowest `bits` bits in front of `value`.
/// Backends use it to keep a small type marker next to a length.
pub fn write_var_int_with_extra_info(
    output: &mut impl BufMut,
    value: u32,
    extra_info: u8,
    bits: u8,
) -> crate::core::error::Result<()> {
    let mask = check_extra_info_bits(bits)?;
    if extra_info as u64 > mask {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("extra info {} does not fit in {} bits", extra_info, bits),
        ));
    }
    write_var_u64(output, ((value as u64) << bits) | extra_info as u64);
    Ok(())
}

pub fn read_var_int_with_extra_info(input: &mut impl Buf, bits: u8) -> crate::core::error::Result<(u32, u8)> {
    let mask = check_extra_info_bits(bits)?;
    let raw = read_var_u64(input)?;
    let value = u32::try_from(raw >> bits).map_err(|_| ParseError::ValueOverflow {
        value: raw >> bits,
        bits: 32,
    })?;
    Ok((value, (raw & mask) as u8))
}
