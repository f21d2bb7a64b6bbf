//! Variable-length 32-bit integer format.
//!
//! The first byte selects the width:
//!
//! | First byte            | Width | Value                                      |
//! |-----------------------|-------|--------------------------------------------|
//! | `0x00..=0x7F`         | 1     | the byte                                   |
//! | `0xFF`                | 1     | `0xFFFF_FFFF`                              |
//! | `0xFE`                | 1     | `0xFFFF_FFFE`                              |
//! | `0xF0`                | 5     | next four bytes, session endianness        |
//! | `0xC0..=0xFF` (other) | 4     | `(b & 0x3F) << 24 \| b1 << 16 \| b2 << 8 \| b3` |
//! | `0x80..=0xBF`         | 2     | `(b & 0x7F) << 8 \| b1`                    |
//!
//! The signed form stores the sign in the least significant bit of the
//! unsigned value: `u >> 1` is the magnitude, a set bit means
//! `-(magnitude + 1)`.  The raw value `0xFFFF_FFFF` decodes to `i32::MAX`.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::session::Endianness;

/// Longest encoding of a 32-bit value.
pub const MAX_COMPRESSED_SIZE: usize = 5;

const MARKER_MAX:      u8 = 0xFF;
const MARKER_MAX_LESS: u8 = 0xFE;
const MARKER_FULL:     u8 = 0xF0;

/// Total encoded width implied by the first byte.
#[inline]
pub fn encoded_len(first: u8) -> usize {
    match first {
        0x00..=0x7F                  => 1,
        MARKER_MAX | MARKER_MAX_LESS => 1,
        MARKER_FULL                  => 5,
        0xC0..=0xFF                  => 4,
        0x80..=0xBF                  => 2,
    }
}

/// Decode an unsigned value from the front of `buf`.
/// Returns the value and the number of bytes consumed.
pub fn decode_u32(buf: &[u8], endianness: Endianness) -> Result<(u32, usize)> {
    let first = *buf
        .first()
        .ok_or(Error::BufferExhausted { position: 0, requested: 1 })?;
    let len = encoded_len(first);
    if buf.len() < len {
        return Err(Error::BufferExhausted { position: buf.len() as u64, requested: len - buf.len() });
    }

    let value = match first {
        0x00..=0x7F     => u32::from(first),
        MARKER_MAX      => u32::MAX,
        MARKER_MAX_LESS => u32::MAX - 1,
        MARKER_FULL     => match endianness {
            Endianness::Little => LittleEndian::read_u32(&buf[1..5]),
            Endianness::Big    => BigEndian::read_u32(&buf[1..5]),
        },
        0xC0..=0xFF => {
            u32::from(first & 0x3F) << 24
                | u32::from(buf[1]) << 16
                | u32::from(buf[2]) << 8
                | u32::from(buf[3])
        }
        0x80..=0xBF => u32::from(first & 0x7F) << 8 | u32::from(buf[1]),
    };
    Ok((value, len))
}

/// Decode a signed value from the front of `buf`.
pub fn decode_i32(buf: &[u8], endianness: Endianness) -> Result<(i32, usize)> {
    let (raw, len) = decode_u32(buf, endianness)?;
    Ok((to_signed(raw), len))
}

/// Reinterpret a raw unsigned value in the sign-in-LSB form.
#[inline]
pub fn to_signed(raw: u32) -> i32 {
    if raw == u32::MAX {
        return i32::MAX;
    }
    // raw >> 1 <= 0x7FFF_FFFF
    let magnitude = (raw >> 1) as i32;
    if raw & 1 == 1 {
        -(magnitude + 1)
    } else {
        magnitude
    }
}

/// Inverse of [`to_signed`].  `i32::MIN` has no representation.
pub fn to_unsigned(value: i32) -> Result<u32> {
    match value {
        i32::MIN => Err(Error::conversion("i32", "compressed i32", value)),
        v if v >= 0 => Ok((v as u32) << 1),
        // !v == -(v + 1) for negative v
        v => Ok(((!v) as u32) << 1 | 1),
    }
}

/// Encode `value` into the front of `buf` using the shortest form.
/// Returns the number of bytes written.
pub fn encode_u32(value: u32, endianness: Endianness, buf: &mut [u8]) -> Result<usize> {
    let len = match value {
        0x0000_0000..=0x0000_007F => 1,
        0x0000_0080..=0x0000_3FFF => 2,
        0x0000_4000..=0x1FFF_FFFF => 4,
        0xFFFF_FFFE..=0xFFFF_FFFF => 1,
        _                         => 5,
    };
    if buf.len() < len {
        return Err(Error::BufferExhausted { position: buf.len() as u64, requested: len - buf.len() });
    }

    match len {
        1 if value == u32::MAX     => buf[0] = MARKER_MAX,
        1 if value == u32::MAX - 1 => buf[0] = MARKER_MAX_LESS,
        1 => buf[0] = value as u8,
        2 => {
            buf[0] = 0x80 | (value >> 8) as u8;
            buf[1] = value as u8;
        }
        4 => {
            buf[0] = 0xC0 | (value >> 24) as u8;
            buf[1] = (value >> 16) as u8;
            buf[2] = (value >> 8) as u8;
            buf[3] = value as u8;
        }
        _ => {
            buf[0] = MARKER_FULL;
            match endianness {
                Endianness::Little => LittleEndian::write_u32(&mut buf[1..5], value),
                Endianness::Big    => BigEndian::write_u32(&mut buf[1..5], value),
            }
        }
    }
    Ok(len)
}

/// Encode a signed value in the sign-in-LSB form.
pub fn encode_i32(value: i32, endianness: Endianness, buf: &mut [u8]) -> Result<usize> {
    encode_u32(to_unsigned(value)?, endianness, buf)
}

/// Convenience wrapper returning the encoded bytes.
pub fn to_vec_u32(value: u32, endianness: Endianness) -> Vec<u8> {
    let mut buf = [0u8; MAX_COMPRESSED_SIZE];
    // A MAX_COMPRESSED_SIZE buffer always fits.
    let len = encode_u32(value, endianness, &mut buf).unwrap_or(0);
    buf[..len].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LE: Endianness = Endianness::Little;

    #[test]
    fn boundary_examples() {
        assert_eq!(decode_u32(&[0x7F], LE).unwrap(), (127, 1));
        assert_eq!(decode_u32(&[0x80, 0x01], LE).unwrap(), (1, 2));
        assert_eq!(decode_u32(&[0xFF], LE).unwrap(), (4_294_967_295, 1));
        assert_eq!(decode_u32(&[0xFE], LE).unwrap(), (4_294_967_294, 1));
        assert_eq!(decode_u32(&[0xBF, 0xFF], LE).unwrap(), (0x3FFF, 2));
        assert_eq!(decode_u32(&[0xC1, 0x02, 0x03, 0x04], LE).unwrap(), (0x0102_0304, 4));
    }

    #[test]
    fn full_width_follows_endianness() {
        let bytes = [0xF0, 0x01, 0x02, 0x03, 0x04];
        assert_eq!(decode_u32(&bytes, LE).unwrap(), (0x0403_0201, 5));
        assert_eq!(decode_u32(&bytes, Endianness::Big).unwrap(), (0x0102_0304, 5));
    }

    #[test]
    fn signed_examples() {
        assert_eq!(to_signed(u32::MAX), i32::MAX);
        assert_eq!(to_signed(0), 0);
        assert_eq!(to_signed(1), -1);
        assert_eq!(to_signed(6), 3);
        assert_eq!(to_signed(7), -4);
        assert_eq!(decode_i32(&[0x07], LE).unwrap(), (-4, 1));
    }

    #[test]
    fn short_input_is_exhausted() {
        assert!(decode_u32(&[], LE).unwrap_err().is_buffer_exhausted());
        assert!(decode_u32(&[0x80], LE).unwrap_err().is_buffer_exhausted());
        assert!(decode_u32(&[0xF0, 1, 2], LE).unwrap_err().is_buffer_exhausted());
    }

    #[test]
    fn encoder_picks_shortest_form() {
        assert_eq!(to_vec_u32(0x7F, LE), [0x7F]);
        assert_eq!(to_vec_u32(0x80, LE), [0x80, 0x80]);
        assert_eq!(to_vec_u32(0x4000, LE), [0xC0, 0x00, 0x40, 0x00]);
        assert_eq!(to_vec_u32(0x2000_0000, LE), [0xF0, 0x00, 0x00, 0x00, 0x20]);
        assert_eq!(to_vec_u32(u32::MAX, LE), [0xFF]);
        assert_eq!(to_vec_u32(u32::MAX - 1, LE), [0xFE]);
    }

    #[test]
    fn encode_decode_agree_at_boundaries() {
        for value in [0, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1FFF_FFFF, 0x2000_0000, 0xF000_0000, u32::MAX - 2] {
            for e in [Endianness::Little, Endianness::Big] {
                let bytes = to_vec_u32(value, e);
                assert_eq!(decode_u32(&bytes, e).unwrap(), (value, bytes.len()));
            }
        }
    }

    #[test]
    fn signed_min_is_rejected() {
        let mut buf = [0u8; MAX_COMPRESSED_SIZE];
        assert!(encode_i32(i32::MIN, LE, &mut buf).unwrap_err().is_type_conversion());
        let n = encode_i32(i32::MIN + 1, LE, &mut buf).unwrap();
        assert_eq!(decode_i32(&buf[..n], LE).unwrap().0, i32::MIN + 1);
        let n = encode_i32(i32::MAX, LE, &mut buf).unwrap();
        assert_eq!(decode_i32(&buf[..n], LE).unwrap().0, i32::MAX);
    }

    #[test]
    fn small_buffer_is_exhausted() {
        let mut buf = [0u8; 2];
        assert!(encode_u32(0x4000, LE, &mut buf).unwrap_err().is_buffer_exhausted());
    }
}
