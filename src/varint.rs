// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Unsigned variable-length integers.
//!
//! Protocol codes and variable value lengths are encoded as LEB128-style
//! varints: 7 bits of payload per byte, least-significant group first, with
//! the most-significant bit of each byte acting as a continuation flag.

use bytes::BufMut;

/// The maximum number of bytes in the encoding of a `u64`.
pub const MAX_LENGTH: usize = 10;

/// Errors raised when decoding a varint.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// The buffer ended before the final (continuation-bit-clear) byte.
    #[error("varint was truncated")]
    Truncated,
    /// The encoding does not fit in an unsigned 64-bit integer.
    #[error("varint overflows a 64-bit integer")]
    Overflow,
}

/// Returns the number of bytes `encode_to` writes for `value`, without
/// allocating.
pub const fn encoding_length(value: u64) -> usize {
    match value {
        0 => 1,
        v => (64 - v.leading_zeros() as usize).div_ceil(7),
    }
}

/// Appends the varint encoding of `value` to `buffer`.
pub fn encode_to<B: BufMut>(mut value: u64, buffer: &mut B) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;

        if value == 0 {
            buffer.put_u8(byte);
            return;
        }
        buffer.put_u8(byte | 0x80);
    }
}

/// Decodes a varint from the start of `bytes`.
///
/// Returns the decoded value along with the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value = 0u64;

    for (i, &byte) in bytes.iter().enumerate() {
        // The tenth byte may only contribute the single remaining bit.
        if i >= MAX_LENGTH || (i == MAX_LENGTH - 1 && byte > 0x01) {
            return Err(VarintError::Overflow);
        }

        value |= u64::from(byte & 0x7f) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(VarintError::Truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_encoding {
        ($name:ident, $value:expr, $encoded:expr) => {
            #[test]
            fn $name() {
                let mut buffer = Vec::new();
                encode_to($value, &mut buffer);

                assert_eq!(buffer, $encoded);
                assert_eq!(encoding_length($value), $encoded.len());
                assert_eq!(decode(&buffer), Ok(($value, $encoded.len())));
            }
        };
    }

    test_encoding!(zero, 0, [0x00]);
    test_encoding!(single_byte_max, 127, [0x7f]);
    test_encoding!(two_bytes_min, 128, [0x80, 0x01]);
    test_encoding!(udp_protocol_code, 273, [0x91, 0x02]);
    test_encoding!(memory_protocol_code, 777, [0x89, 0x06]);
    test_encoding!(
        u64_max,
        u64::MAX,
        [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
    );

    #[test]
    fn decode_ignores_trailing_bytes() {
        assert_eq!(decode(&[0x91, 0x02, 0xaa, 0xbb]), Ok((273, 2)));
    }

    #[test]
    fn decode_empty_is_truncated() {
        assert_eq!(decode(&[]), Err(VarintError::Truncated));
    }

    #[test]
    fn decode_unterminated_is_truncated() {
        assert_eq!(decode(&[0x80, 0x80]), Err(VarintError::Truncated));
    }

    #[test]
    fn decode_eleven_bytes_overflows() {
        let bytes = [0x80u8; 10];
        assert_eq!(decode(&bytes), Err(VarintError::Overflow));
    }

    #[test]
    fn decode_tenth_byte_overflow() {
        let mut bytes = [0xffu8; 9].to_vec();
        bytes.push(0x02);
        assert_eq!(decode(&bytes), Err(VarintError::Overflow));
    }
}
