use bytes::{Buf, BufMut};
use crate::codec::varint::{calculate_var_byte_length, read_var_u64, write_var_u64};
use crate::codec::wire::{
    calculate_key_and_content_length, read_length_delimited, skip_field, write_key_with_length, WireKey,
    WireType,
};
use crate::codec::write_cache::WriteCache;
use crate::core::error::{ParseError, Result};

/// Schema-less framed value. Backends build these for nested stored values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    VarInt(u64),
    Fixed64(u64),
    Fixed32(u32),
    Bytes(Vec<u8>),
    Message(Vec<WireField>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireField {
    pub tag: u32,
    pub value: WireValue,
}

impl WireField {
    pub fn new(tag: u32, value: WireValue) -> Self {
        WireField { tag, value }
    }

    pub fn wire_type(&self) -> WireType {
        match self.value {
            WireValue::VarInt(_) => WireType::VarInt,
            WireValue::Fixed64(_) => WireType::Fixed64,
            WireValue::Fixed32(_) => WireType::Fixed32,
            WireValue::Bytes(_) | WireValue::Message(_) => WireType::LengthDelimited,
        }
    }
}

/// Measure pass: total encoded size, reserving one length per nested field.
pub fn calculate_length(fields: &[WireField], cache: &mut WriteCache<()>) -> Result<usize> {
    let mut total = 0;
    for field in fields {
        total += calculate_key_and_content_length(field.tag, field.wire_type(), cache, |cache| {
            match &field.value {
                WireValue::VarInt(v) => Ok(calculate_var_byte_length(*v)),
                WireValue::Fixed64(_) => Ok(8),
                WireValue::Fixed32(_) => Ok(4),
                WireValue::Bytes(bytes) => Ok(bytes.len()),
                WireValue::Message(children) => calculate_length(children, cache),
            }
        })?;
    }
    Ok(total)
}

/// Write pass: must follow a `calculate_length` over the same fields.
pub fn write_fields(fields: &[WireField], output: &mut impl BufMut, cache: &mut WriteCache<()>) -> Result<()> {
    for field in fields {
        write_key_with_length(field.tag, field.wire_type(), output, cache)?;
        match &field.value {
            WireValue::VarInt(v) => write_var_u64(output, *v),
            WireValue::Fixed64(v) => output.put_u64_le(*v),
            WireValue::Fixed32(v) => output.put_u32_le(*v),
            WireValue::Bytes(bytes) => output.put_slice(bytes),
            WireValue::Message(children) => write_fields(children, output, cache)?,
        }
    }
    Ok(())
}

/// Measure then write in one call.
pub fn encode(fields: &[WireField]) -> Result<Vec<u8>> {
    let mut cache = WriteCache::new();
    let length = calculate_length(fields, &mut cache)?;
    let mut output = Vec::with_capacity(length);
    write_fields(fields, &mut output, &mut cache)?;
    debug_assert_eq!(output.len(), length);
    debug_assert!(cache.is_drained());
    Ok(output)
}

/// Decode a flat field list. Length-delimited payloads come back as `Bytes`;
/// callers that know a field is nested call `read_fields` on it again.
/// Groups are skipped.
pub fn read_fields(mut input: &[u8]) -> std::result::Result<Vec<WireField>, ParseError> {
    let mut fields = Vec::new();
    while input.has_remaining() {
        let key = WireKey::read(&mut input)?;
        let value = match key.wire_type {
            WireType::VarInt => WireValue::VarInt(read_var_u64(&mut input)?),
            WireType::Fixed64 => {
                ensure(&input, 8)?;
                WireValue::Fixed64(input.get_u64_le())
            }
            WireType::Fixed32 => {
                ensure(&input, 4)?;
                WireValue::Fixed32(input.get_u32_le())
            }
            WireType::LengthDelimited => WireValue::Bytes(read_length_delimited(&mut input)?.to_vec()),
            WireType::StartGroup | WireType::EndGroup => {
                skip_field(key, &mut input)?;
                continue;
            }
        };
        fields.push(WireField::new(key.tag, value));
    }
    Ok(fields)
}

fn ensure(input: &[u8], needed: usize) -> std::result::Result<(), ParseError> {
    if input.len() < needed {
        return Err(ParseError::UnexpectedEnd {
            needed,
            remaining: input.len(),
        });
    }
    Ok(())
}
