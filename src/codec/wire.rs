use bytes::{Buf, BufMut};
use crate::codec::varint::{calculate_var_byte_length, read_var_u64, skip_var_bytes, write_var_u64};
use crate::codec::write_cache::WriteCache;
use crate::core::error::{ParseError, Result};

/// How a field's payload is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    VarInt,
    Fixed64,
    LengthDelimited,
    StartGroup,
    EndGroup,
    Fixed32,
}

impl WireType {
    pub fn code(self) -> u8 {
        match self {
            WireType::VarInt => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::StartGroup => 3,
            WireType::EndGroup => 4,
            WireType::Fixed32 => 5,
        }
    }

    pub fn from_code(code: u64) -> std::result::Result<Self, ParseError> {
        match code {
            0 => Ok(WireType::VarInt),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(ParseError::UnknownWireType(other)),
        }
    }
}

pub fn wire_type_of(code: u64) -> std::result::Result<WireType, ParseError> {
    WireType::from_code(code)
}

/// Field tag plus wire type, written as `(tag << 3) | code` in a varint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireKey {
    pub tag: u32,
    pub wire_type: WireType,
}

impl WireKey {
    pub fn new(tag: u32, wire_type: WireType) -> Self {
        WireKey { tag, wire_type }
    }

    fn packed(&self) -> u64 {
        ((self.tag as u64) << 3) | self.wire_type.code() as u64
    }

    pub fn write(&self, output: &mut impl BufMut) {
        write_var_u64(output, self.packed());
    }

    pub fn read(input: &mut impl Buf) -> std::result::Result<Self, ParseError> {
        let packed = read_var_u64(input)?;
        let wire_type = WireType::from_code(packed & 0b111)?;
        let tag = u32::try_from(packed >> 3).map_err(|_| ParseError::TagOverflow(packed >> 3))?;
        Ok(WireKey { tag, wire_type })
    }

    pub fn byte_length(&self) -> usize {
        calculate_var_byte_length(self.packed())
    }
}

fn take(input: &mut impl Buf, count: usize) -> std::result::Result<(), ParseError> {
    if input.remaining() < count {
        return Err(ParseError::UnexpectedEnd {
            needed: count,
            remaining: input.remaining(),
        });
    }
    input.advance(count);
    Ok(())
}

/// Read a varint length, then borrow exactly that many payload bytes.
pub fn read_length_delimited<'a>(input: &mut &'a [u8]) -> std::result::Result<&'a [u8], ParseError> {
    let length = read_var_u64(input)?;
    let length = usize::try_from(length).map_err(|_| ParseError::LengthOverflow(length))?;
    if input.len() < length {
        return Err(ParseError::UnexpectedEnd {
            needed: length,
            remaining: input.len(),
        });
    }
    let whole: &'a [u8] = input;
    let (payload, rest) = whole.split_at(length);
    *input = rest;
    Ok(payload)
}

/// Deepest group nesting `skip_field` follows before giving up.
pub const MAX_GROUP_DEPTH: usize = 100;

/// Consume exactly one field's payload (the key is already read).
/// Groups are skipped until the end group of the same tag; nested groups
/// are tracked on an explicit stack bounded by `MAX_GROUP_DEPTH`.
pub fn skip_field(key: WireKey, input: &mut impl Buf) -> std::result::Result<(), ParseError> {
    if key.wire_type != WireType::StartGroup {
        return skip_payload(key, input);
    }

    let mut open_groups = vec![key.tag];
    while let Some(&innermost) = open_groups.last() {
        let child = WireKey::read(input)?;
        match child.wire_type {
            WireType::EndGroup if child.tag == innermost => {
                open_groups.pop();
            }
            WireType::EndGroup => {
                return Err(ParseError::MismatchedEndGroup {
                    expected: innermost,
                    found: child.tag,
                });
            }
            WireType::StartGroup => {
                if open_groups.len() >= MAX_GROUP_DEPTH {
                    return Err(ParseError::GroupTooDeep {
                        max_depth: MAX_GROUP_DEPTH,
                    });
                }
                open_groups.push(child.tag);
            }
            _ => skip_payload(child, input)?,
        }
    }
    Ok(())
}

fn skip_payload(key: WireKey, input: &mut impl Buf) -> std::result::Result<(), ParseError> {
    match key.wire_type {
        WireType::VarInt => skip_var_bytes(input),
        WireType::Fixed64 => take(input, 8),
        WireType::Fixed32 => take(input, 4),
        WireType::LengthDelimited => {
            let length = read_var_u64(input)?;
            let length = usize::try_from(length).map_err(|_| ParseError::LengthOverflow(length))?;
            take(input, length)
        }
        WireType::StartGroup => skip_field(key, input),
        WireType::EndGroup => Err(ParseError::UnmatchedEndGroup(key.tag)),
    }
}

/// Total bytes of a field: key, length prefix when length-delimited, content.
///
/// For length-delimited fields a slot is reserved in `cache` before
/// `content_length` runs, so outer slots always precede inner ones and the
/// write pass can consume them in order.
pub fn calculate_key_and_content_length<C>(
    tag: u32,
    wire_type: WireType,
    cache: &mut WriteCache<C>,
    content_length: impl FnOnce(&mut WriteCache<C>) -> Result<usize>,
) -> Result<usize> {
    let key_length = WireKey::new(tag, wire_type).byte_length();

    if wire_type == WireType::LengthDelimited {
        let slot = cache.reserve_length();
        let content = content_length(cache)?;
        let prefix = cache.resolve_length(slot, content)?;
        Ok(key_length + prefix + content)
    } else {
        Ok(key_length + content_length(cache)?)
    }
}

/// Write the key and, for length-delimited fields, the next cached length.
/// The caller writes the payload afterwards.
pub fn write_key_with_length<C>(
    tag: u32,
    wire_type: WireType,
    output: &mut impl BufMut,
    cache: &mut WriteCache<C>,
) -> Result<()> {
    WireKey::new(tag, wire_type).write(output);
    if wire_type == WireType::LengthDelimited {
        let length = cache.next_length()?;
        write_var_u64(output, length as u64);
    }
    Ok(())
}
