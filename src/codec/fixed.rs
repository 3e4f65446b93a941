use bytes::{Buf, BufMut};
use crate::core::error::{Error, ErrorKind, ParseError, Result};

/// Fixed-width big-endian encoding whose byte order equals the value order.
///
/// Signed integers flip only the sign bit. Floats flip the sign bit when
/// non-negative and invert every bit when negative. Width never depends on
/// the value, so encoded segments can be concatenated into composite keys.
pub trait OrderedFixed: Sized {
    const WIDTH: usize;

    fn write_ordered(&self, output: &mut impl BufMut);

    fn read_ordered(input: &mut impl Buf) -> std::result::Result<Self, ParseError>;

    fn to_ordered_bytes(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(Self::WIDTH);
        self.write_ordered(&mut output);
        output
    }

    fn from_ordered_bytes(bytes: &[u8]) -> std::result::Result<Self, ParseError> {
        if bytes.len() != Self::WIDTH {
            return Err(ParseError::UnexpectedEnd {
                needed: Self::WIDTH,
                remaining: bytes.len(),
            });
        }
        Self::read_ordered(&mut &bytes[..])
    }
}

fn ensure_remaining(input: &impl Buf, needed: usize) -> std::result::Result<(), ParseError> {
    if input.remaining() < needed {
        return Err(ParseError::UnexpectedEnd {
            needed,
            remaining: input.remaining(),
        });
    }
    Ok(())
}

macro_rules! ordered_signed {
    ($signed:ty, $unsigned:ty, $put:ident, $get:ident) => {
        impl OrderedFixed for $signed {
            const WIDTH: usize = std::mem::size_of::<$signed>();

            fn write_ordered(&self, output: &mut impl BufMut) {
                output.$put((*self as $unsigned) ^ (1 << (<$unsigned>::BITS - 1)));
            }

            fn read_ordered(input: &mut impl Buf) -> std::result::Result<Self, ParseError> {
                ensure_remaining(input, Self::WIDTH)?;
                Ok((input.$get() ^ (1 << (<$unsigned>::BITS - 1))) as $signed)
            }
        }
    };
}

macro_rules! ordered_unsigned {
    ($unsigned:ty, $put:ident, $get:ident) => {
        impl OrderedFixed for $unsigned {
            const WIDTH: usize = std::mem::size_of::<$unsigned>();

            fn write_ordered(&self, output: &mut impl BufMut) {
                output.$put(*self);
            }

            fn read_ordered(input: &mut impl Buf) -> std::result::Result<Self, ParseError> {
                ensure_remaining(input, Self::WIDTH)?;
                Ok(input.$get())
            }
        }
    };
}

ordered_signed!(i8, u8, put_u8, get_u8);
ordered_signed!(i16, u16, put_u16, get_u16);
ordered_signed!(i32, u32, put_u32, get_u32);
ordered_signed!(i64, u64, put_u64, get_u64);

ordered_unsigned!(u8, put_u8, get_u8);
ordered_unsigned!(u16, put_u16, get_u16);
ordered_unsigned!(u32, put_u32, get_u32);
ordered_unsigned!(u64, put_u64, get_u64);

impl OrderedFixed for f64 {
    const WIDTH: usize = 8;

    fn write_ordered(&self, output: &mut impl BufMut) {
        let bits = self.to_bits();
        let ordered = if bits & (1 << 63) != 0 { !bits } else { bits ^ (1 << 63) };
        output.put_u64(ordered);
    }

    fn read_ordered(input: &mut impl Buf) -> std::result::Result<Self, ParseError> {
        ensure_remaining(input, Self::WIDTH)?;
        let ordered = input.get_u64();
        let bits = if ordered & (1 << 63) != 0 { ordered ^ (1 << 63) } else { !ordered };
        Ok(f64::from_bits(bits))
    }
}

impl OrderedFixed for f32 {
    const WIDTH: usize = 4;

    fn write_ordered(&self, output: &mut impl BufMut) {
        let bits = self.to_bits();
        let ordered = if bits & (1 << 31) != 0 { !bits } else { bits ^ (1 << 31) };
        output.put_u32(ordered);
    }

    fn read_ordered(input: &mut impl Buf) -> std::result::Result<Self, ParseError> {
        ensure_remaining(input, Self::WIDTH)?;
        let ordered = input.get_u32();
        let bits = if ordered & (1 << 31) != 0 { ordered ^ (1 << 31) } else { !ordered };
        Ok(f32::from_bits(bits))
    }
}

impl OrderedFixed for bool {
    const WIDTH: usize = 1;

    fn write_ordered(&self, output: &mut impl BufMut) {
        output.put_u8(*self as u8);
    }

    fn read_ordered(input: &mut impl Buf) -> std::result::Result<Self, ParseError> {
        ensure_remaining(input, Self::WIDTH)?;
        Ok(input.get_u8() != 0)
    }
}

/// Three-byte signed integer, for domains known to fit in 24 bits.
pub const INT24_MIN: i32 = -(1 << 23);
pub const INT24_MAX: i32 = (1 << 23) - 1;
const INT24_SIGN: u32 = 1 << 23;

pub fn write_ordered_i24(output: &mut impl BufMut, value: i32) -> Result<()> {
    if !(INT24_MIN..=INT24_MAX).contains(&value) {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("{} does not fit in a 3-byte integer", value),
        ));
    }
    let flipped = (value as u32 ^ INT24_SIGN) & 0xFF_FFFF;
    output.put_uint(flipped as u64, 3);
    Ok(())
}

pub fn read_ordered_i24(input: &mut impl Buf) -> std::result::Result<i32, ParseError> {
    ensure_remaining(input, 3)?;
    let restored = input.get_uint(3) as u32 ^ INT24_SIGN;
    // Sign-extend from bit 23
    Ok(((restored << 8) as i32) >> 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minus_one_sorts_before_zero() {
        assert!((-1i32).to_ordered_bytes() < 0i32.to_ordered_bytes());
        assert!((-1i64).to_ordered_bytes() < 0i64.to_ordered_bytes());
        assert!(i8::MIN.to_ordered_bytes() < i8::MAX.to_ordered_bytes());
    }

    #[test]
    fn signed_layout_flips_only_sign_bit() {
        assert_eq!(0i32.to_ordered_bytes(), vec![0x80, 0, 0, 0]);
        assert_eq!((-1i32).to_ordered_bytes(), vec![0x7F, 0xFF, 0xFF, 0xFF]);
        assert_eq!(i16::MIN.to_ordered_bytes(), vec![0, 0]);
    }

    #[test]
    fn floats_order_across_zero() {
        let values = [f64::NEG_INFINITY, -10.5, -0.0, 0.0, 1e-300, 3.25, f64::INFINITY];
        for pair in values.windows(2) {
            assert!(
                pair[0].to_ordered_bytes() < pair[1].to_ordered_bytes(),
                "{} !< {}",
                pair[0],
                pair[1]
            );
        }
        assert!((-1.5f32).to_ordered_bytes() < 0.25f32.to_ordered_bytes());
    }

    #[test]
    fn float_negative_zero_keeps_sign() {
        let decoded = f64::from_ordered_bytes(&(-0.0f64).to_ordered_bytes()).unwrap();
        assert!(decoded.is_sign_negative());
        assert_eq!(decoded, 0.0);
    }

    #[test]
    fn wrong_width_is_rejected() {
        assert!(matches!(
            i64::from_ordered_bytes(&[1, 2, 3]),
            Err(ParseError::UnexpectedEnd { needed: 8, remaining: 3 })
        ));
    }

    #[test]
    fn int24_round_trips_and_sign_extends() {
        for value in [INT24_MIN, -70_000, -1, 0, 1, 70_000, INT24_MAX] {
            let mut out = Vec::new();
            write_ordered_i24(&mut out, value).unwrap();
            assert_eq!(out.len(), 3);
            assert_eq!(read_ordered_i24(&mut &out[..]).unwrap(), value);
        }

        let mut low = Vec::new();
        let mut high = Vec::new();
        write_ordered_i24(&mut low, -1).unwrap();
        write_ordered_i24(&mut high, 0).unwrap();
        assert!(low < high);
    }

    #[test]
    fn int24_out_of_domain() {
        let err = write_ordered_i24(&mut Vec::new(), INT24_MAX + 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }
}
