//! Bit and alignment helpers shared by the codec and the planner.
//!
//! Bits inside a controller byte are numbered 0 (least significant) to 7
//! (most significant), so bit `b` of a byte is the character at index `7 - b`
//! of the byte's MSB-first binary rendering.
//!
//! # Example
//!
//! ```
//! use s7_tags::utils::{get_bit, set_bit};
//!
//! let value: u8 = 0b1000_0001;
//! assert!(get_bit(value, 7));
//! assert!(get_bit(value, 0));
//! assert!(!get_bit(value, 1));
//!
//! assert_eq!(set_bit(value, 7, false), 0b0000_0001);
//! ```

/// Gets bit `bit` (0-7, where 0 is the LSB) of a byte.
///
/// # Example
///
/// ```
/// use s7_tags::utils::get_bit;
///
/// assert!(get_bit(0b0000_0100, 2));
/// assert!(!get_bit(0b0000_0100, 3));
/// ```
#[inline]
pub fn get_bit(value: u8, bit: u8) -> bool {
    (value >> (bit & 0x07)) & 1 != 0
}

/// Returns `value` with bit `bit` (0-7) set to `state`.
///
/// # Example
///
/// ```
/// use s7_tags::utils::set_bit;
///
/// assert_eq!(set_bit(0b0000_0000, 3, true), 0b0000_1000);
/// assert_eq!(set_bit(0b1111_1111, 0, false), 0b1111_1110);
/// ```
#[inline]
pub fn set_bit(value: u8, bit: u8, state: bool) -> u8 {
    let mask = 1 << (bit & 0x07);
    if state {
        value | mask
    } else {
        value & !mask
    }
}

/// Formats a byte as an MSB-first binary string with a `0b` prefix.
///
/// # Example
///
/// ```
/// use s7_tags::utils::format_binary;
///
/// assert_eq!(format_binary(0x81), "0b1000_0001");
/// ```
pub fn format_binary(value: u8) -> String {
    format!("0b{:04b}_{:04b}", value >> 4, value & 0x0F)
}

/// Number of fill bytes that follow an item payload of `len` bytes.
///
/// Payloads of odd length are padded to an even boundary, except after
/// the final item of a request or response.
#[inline]
pub(crate) fn pad_len(len: usize, is_last: bool) -> usize {
    if is_last {
        0
    } else {
        len & 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_bit_matches_msb_first_rendering() {
        for value in [0x00u8, 0x01, 0x80, 0xA5, 0x5A, 0xFF] {
            let rendered = format!("{value:08b}");
            for bit in 0..8u8 {
                let from_rendering = rendered.as_bytes()[(7 - bit) as usize] == b'1';
                assert_eq!(get_bit(value, bit), from_rendering, "value {value:#04x} bit {bit}");
            }
        }
    }

    #[test]
    fn test_set_bit() {
        assert_eq!(set_bit(0, 7, true), 0x80);
        assert_eq!(set_bit(0x80, 7, true), 0x80);
        assert_eq!(set_bit(0xFF, 4, false), 0xEF);
        for bit in 0..8 {
            assert!(get_bit(set_bit(0, bit, true), bit));
            assert!(!get_bit(set_bit(0xFF, bit, false), bit));
        }
    }

    #[test]
    fn test_format_binary() {
        assert_eq!(format_binary(0x00), "0b0000_0000");
        assert_eq!(format_binary(0xA5), "0b1010_0101");
    }

    #[test]
    fn test_pad_len() {
        assert_eq!(pad_len(1, false), 1);
        assert_eq!(pad_len(2, false), 0);
        assert_eq!(pad_len(3, true), 0);
        assert_eq!(pad_len(0, false), 0);
    }
}
