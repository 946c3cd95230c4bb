//! Charstring operand encoding.
//!
//! Size   b0 range     Value range              Value calculation
//! -----------------------------------------------------------------------
//! 1      32 to 246    -107 to +107             b0 - 139
//! 2      247 to 250   +108 to +1131            (b0 - 247) * 256 + b1 + 108
//! 2      251 to 254   -1131 to -108            -(b0 - 251) * 256 - b1 - 108
//! 3      28           -32768 to +32767         b1 << 8 | b2 (not in Type1)
//! 5      255          16.16 fixed (Type2/CFF2) or 32-bit integer (Type1)
//!
//! See "3.2 Charstring Number Encoding" <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=12>

use types::Fixed;

use super::CharstringVersion;
use crate::{data::Cursor, error::CharstringError};

/// Returns true if `b0` starts an operand rather than an operator.
pub(crate) fn is_operand_prefix(b0: u8, version: CharstringVersion) -> bool {
    match b0 {
        32..=255 => true,
        28 => version != CharstringVersion::Type1,
        _ => false,
    }
}

/// Reads an operand whose first byte is `b0`.
pub(crate) fn parse_operand(
    cursor: &mut Cursor,
    b0: u8,
    version: CharstringVersion,
) -> Result<f64, CharstringError> {
    let end = |_| CharstringError::UnexpectedEnd;
    Ok(match b0 {
        32..=246 => (b0 as i32 - 139) as f64,
        247..=250 => {
            let b1 = cursor.read::<u8>().map_err(end)? as i32;
            ((b0 as i32 - 247) * 256 + b1 + 108) as f64
        }
        251..=254 => {
            let b1 = cursor.read::<u8>().map_err(end)? as i32;
            (-(b0 as i32 - 251) * 256 - b1 - 108) as f64
        }
        28 if version != CharstringVersion::Type1 => cursor.read::<i16>().map_err(end)? as f64,
        255 => {
            let raw = cursor.read::<i32>().map_err(end)?;
            match version {
                CharstringVersion::Type1 => raw as f64,
                _ => Fixed::from_bits(raw).to_f64(),
            }
        }
        _ => return Err(CharstringError::InvalidOperator(b0)),
    })
}

/// Appends the shortest encoding of `value`.
///
/// Type1 has no fractional operands so values are rounded to integers.
pub(crate) fn write_operand(out: &mut Vec<u8>, value: f64, version: CharstringVersion) {
    let value = if version == CharstringVersion::Type1 {
        value.round()
    } else {
        value
    };
    if value.fract() == 0.0 {
        let int = value as i32;
        match int {
            -107..=107 => {
                out.push((int + 139) as u8);
                return;
            }
            108..=1131 => {
                let v = int - 108;
                out.extend([(v / 256 + 247) as u8, (v % 256) as u8]);
                return;
            }
            -1131..=-108 => {
                let v = -int - 108;
                out.extend([(v / 256 + 251) as u8, (v % 256) as u8]);
                return;
            }
            -32768..=32767 if version != CharstringVersion::Type1 => {
                out.push(28);
                out.extend((int as i16).to_be_bytes());
                return;
            }
            _ => {}
        }
    }
    out.push(255);
    match version {
        CharstringVersion::Type1 => out.extend((value as i32).to_be_bytes()),
        _ => out.extend(Fixed::from_f64(value).to_bits().to_be_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn encode(value: f64, version: CharstringVersion) -> Vec<u8> {
        let mut out = Vec::new();
        write_operand(&mut out, value, version);
        out
    }

    fn decode(bytes: &[u8], version: CharstringVersion) -> f64 {
        let mut cursor = Cursor::new(&bytes[1..]);
        let value = parse_operand(&mut cursor, bytes[0], version).unwrap();
        assert_eq!(cursor.remaining_bytes(), 0);
        value
    }

    #[rstest]
    #[case(0.0, &[139])]
    #[case(-107.0, &[32])]
    #[case(107.0, &[246])]
    #[case(108.0, &[247, 0])]
    #[case(1131.0, &[250, 255])]
    #[case(-108.0, &[251, 0])]
    #[case(-1131.0, &[254, 255])]
    #[case(1132.0, &[28, 0x04, 0x6C])]
    #[case(-32768.0, &[28, 0x80, 0x00])]
    #[case(0.5, &[255, 0, 0, 0x80, 0])]
    #[case(-1.25, &[255, 0xFF, 0xFE, 0xC0, 0x00])]
    fn type2_operands(#[case] value: f64, #[case] expected: &[u8]) {
        let bytes = encode(value, CharstringVersion::Type2);
        assert_eq!(bytes, expected);
        assert_eq!(decode(&bytes, CharstringVersion::Type2), value);
    }

    #[rstest]
    #[case(1132.0, &[255, 0, 0, 0x04, 0x6C])]
    #[case(100000.0, &[255, 0, 0x01, 0x86, 0xA0])]
    #[case(2.6, &[142])]
    fn type1_operands(#[case] value: f64, #[case] expected: &[u8]) {
        let bytes = encode(value, CharstringVersion::Type1);
        assert_eq!(bytes, expected);
        assert_eq!(decode(&bytes, CharstringVersion::Type1), value.round());
    }

    #[test]
    fn shortint_is_not_type1() {
        assert!(!is_operand_prefix(28, CharstringVersion::Type1));
        assert!(is_operand_prefix(28, CharstringVersion::Cff2));
        let mut cursor = Cursor::new(&[0, 1]);
        assert_eq!(
            parse_operand(&mut cursor, 28, CharstringVersion::Type1),
            Err(CharstringError::InvalidOperator(28))
        );
    }

    #[test]
    fn truncated_operand() {
        let mut cursor = Cursor::new(&[0x01]);
        assert_eq!(
            parse_operand(&mut cursor, 255, CharstringVersion::Type2),
            Err(CharstringError::UnexpectedEnd)
        );
    }
}
