//! Z85 (RFC 32) textual encoding for binary key material.
//!
//! Groups of 4 input bytes become 5 output characters drawn from an
//! 85-symbol alphabet. Used by the CURVE mechanism to print/parse public and
//! secret keys as text (`zmq_z85_encode`/`zmq_z85_decode` in the wire spec);
//! never used on the hot message path.

use thiserror::Error;

const ENCODER: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

/// Reverse lookup, indexed by `ascii_byte - 32`. `0xFF` marks a byte that is
/// never a valid Z85 symbol.
const DECODER: [u8; 96] = [
    0xFF, 0x44, 0xFF, 0x54, 0x53, 0x52, 0x48, 0xFF, 0x4B, 0x4C, 0x46, 0x41, 0xFF, 0x3F, 0x3E, 0x45,
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x40, 0xFF, 0x49, 0x42, 0x4A, 0x47,
    0x51, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F, 0x30, 0x31, 0x32,
    0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x4D, 0xFF, 0x4E, 0x43, 0xFF,
    0xFF, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18,
    0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F, 0x20, 0x21, 0x22, 0x23, 0x4F, 0xFF, 0x50, 0xFF, 0xFF,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Z85Error {
    #[error("Z85 input length must be a non-zero multiple of 4 to encode")]
    InvalidEncodeLength,
    #[error("Z85 input length must be a non-zero multiple of 5 to decode")]
    InvalidDecodeLength,
    #[error("invalid Z85 character in input")]
    InvalidCharacter,
}

/// Encode `data` as Z85 text. `data.len()` must be a non-zero multiple of 4.
pub fn encode(data: &[u8]) -> Result<String, Z85Error> {
    if data.is_empty() || data.len() % 4 != 0 {
        return Err(Z85Error::InvalidEncodeLength);
    }

    let mut out = String::with_capacity(data.len() * 5 / 4);
    for chunk in data.chunks(4) {
        let mut value: u32 = 0;
        for &b in chunk {
            value = value.wrapping_mul(256).wrapping_add(u32::from(b));
        }

        let mut divisor: u32 = 85 * 85 * 85 * 85;
        for _ in 0..5 {
            let idx = ((value / divisor) % 85) as usize;
            out.push(ENCODER[idx] as char);
            divisor /= 85;
        }
    }

    Ok(out)
}

/// Decode Z85 text back to bytes. `text.len()` must be a non-zero multiple
/// of 5 and every character must be a valid Z85 symbol.
pub fn decode(text: &str) -> Result<Vec<u8>, Z85Error> {
    if text.is_empty() || !text.is_ascii() || text.len() % 5 != 0 {
        return Err(Z85Error::InvalidDecodeLength);
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 4 / 5);

    for chunk in bytes.chunks(5) {
        let mut value: u32 = 0;
        for &c in chunk {
            let idx = (c as usize)
                .checked_sub(32)
                .ok_or(Z85Error::InvalidCharacter)?;
            let digit = *DECODER.get(idx).ok_or(Z85Error::InvalidCharacter)?;
            if digit == 0xFF {
                return Err(Z85Error::InvalidCharacter);
            }
            value = value.wrapping_mul(85).wrapping_add(u32::from(digit));
        }
        out.extend_from_slice(&value.to_be_bytes());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECODED: [u8; 8] = [0x86, 0x4F, 0xD2, 0x6F, 0xB5, 0x59, 0xF7, 0x5B];
    const ENCODED: &str = "HelloWorld";

    #[test]
    fn encodes_rfc32_vector() {
        assert_eq!(encode(&DECODED).unwrap(), ENCODED);
    }

    #[test]
    fn decodes_rfc32_vector() {
        assert_eq!(decode(ENCODED).unwrap(), DECODED.to_vec());
    }

    #[test]
    fn roundtrips_curve_key_sized_input() {
        let data: Vec<u8> = (0..32u8).collect();
        let encoded = encode(&data).unwrap();
        assert_eq!(encoded.len(), 40);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn rejects_length_not_multiple_of_four_on_encode() {
        assert_eq!(encode(&[1, 2, 3]).unwrap_err(), Z85Error::InvalidEncodeLength);
    }

    #[test]
    fn rejects_length_not_multiple_of_five_on_decode() {
        assert_eq!(decode("abc").unwrap_err(), Z85Error::InvalidDecodeLength);
    }

    #[test]
    fn rejects_invalid_character() {
        assert_eq!(decode("abc\"e").unwrap_err(), Z85Error::InvalidCharacter);
    }
}
