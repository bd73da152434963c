//! Address string syntax for tags.
//!
//! Tags can be written the way controller programmers usually write them:
//!
//! | Address | Meaning |
//! |---------|---------|
//! | `DB1,X0.7` | bit 7 of byte 0 in data block 1 |
//! | `DB2,I2` | INT at byte 2 of data block 2 |
//! | `DB2,R8*4` | four REALs starting at byte 8 |
//! | `DB5,S10.20` | STRING of max 20 characters at byte 10 |
//! | `I0.3` / `E0.3` | input bit |
//! | `QW4` / `AW4` | output word |
//! | `MDI12` | memory DINT |
//! | `C5`, `T3` | counter / timer word |
//!
//! Type codes: `X` bit, `B` byte, `C` char, `W` word, `I` int, `DW`/`D` dword,
//! `DI` dint, `R` real, `LR` lreal, `S` string, `WS` wstring. Parsing accepts
//! everything [`Tag`]'s `Display` produces.
//!
//! # Example
//!
//! ```
//! use s7_tags::{DataType, MemoryArea, Tag};
//!
//! let tag: Tag = "DB1,X0.7".parse()?;
//! assert_eq!(tag.area(), MemoryArea::DataBlock);
//! assert_eq!(tag.db_number(), 1);
//! assert_eq!(tag.data_type(), DataType::Bit);
//! assert_eq!(tag.bit_offset(), 7);
//!
//! let tag: Tag = "MW10".parse()?;
//! assert_eq!(tag.data_type(), DataType::Word);
//! assert_eq!(tag.start(), 10);
//! # Ok::<(), s7_tags::S7Error>(())
//! ```

use std::str::FromStr;

use crate::area::MemoryArea;
use crate::error::{Result, S7Error};
use crate::tag::{DataType, Tag};

/// Type codes, longest first so that `DW` wins over `D`.
const TYPE_CODES: [(&str, DataType); 13] = [
    ("DW", DataType::DWord),
    ("DI", DataType::DInt),
    ("LR", DataType::LReal),
    ("WS", DataType::WString),
    ("X", DataType::Bit),
    ("B", DataType::Byte),
    ("C", DataType::Char),
    ("W", DataType::Word),
    ("I", DataType::Int),
    ("D", DataType::DWord),
    ("R", DataType::Real),
    ("S", DataType::String),
    ("", DataType::Bit),
];

impl FromStr for Tag {
    type Err = S7Error;

    fn from_str(s: &str) -> Result<Self> {
        let address = s.trim().to_ascii_uppercase();
        let invalid = |reason: &str| S7Error::invalid_address(format!("'{s}': {reason}"));

        let (area, db_number, rest) = if let Some(db_part) = address.strip_prefix("DB") {
            let (number, rest) = db_part
                .split_once(',')
                .ok_or_else(|| invalid("expected ',' after the data block number"))?;
            let db_number: u16 = number
                .parse()
                .map_err(|_| invalid("data block number is not a number"))?;
            (MemoryArea::DataBlock, db_number, rest)
        } else {
            let mut chars = address.chars();
            let area = match chars.next() {
                Some('I') | Some('E') => MemoryArea::Input,
                Some('Q') | Some('A') => MemoryArea::Output,
                Some('M') => MemoryArea::Memory,
                Some('C') | Some('Z') => MemoryArea::Counter,
                Some('T') => MemoryArea::Timer,
                _ => return Err(invalid("unknown memory area")),
            };
            (area, 0, &address[1..])
        };

        let (code, mut data_type) = TYPE_CODES
            .iter()
            .copied()
            .find(|(code, _)| {
                rest.strip_prefix(*code)
                    .is_some_and(|tail| tail.starts_with(|c: char| c.is_ascii_digit()))
            })
            .ok_or_else(|| invalid("unknown data type"))?;
        let numbers = &rest[code.len()..];

        let (offset, suffix) = match numbers.find(|c: char| c == '.' || c == '*') {
            Some(pos) => (&numbers[..pos], Some((&numbers[pos..pos + 1], &numbers[pos + 1..]))),
            None => (numbers, None),
        };
        let start: u32 = offset
            .parse()
            .map_err(|_| invalid("start offset is not a number"))?;
        let suffix = match suffix {
            Some((sep, value)) => Some((
                sep,
                value
                    .parse::<u16>()
                    .map_err(|_| invalid("suffix is not a number"))?,
            )),
            None => None,
        };

        // Counters and timers default to their 16-bit word.
        if code.is_empty()
            && suffix.is_none()
            && matches!(area, MemoryArea::Counter | MemoryArea::Timer)
        {
            data_type = DataType::Word;
        }

        match (data_type, suffix) {
            (DataType::Bit, Some((".", bit))) => {
                let bit = u8::try_from(bit).map_err(|_| invalid("bit offset must be 0-7"))?;
                Tag::bit(area, db_number, start, bit)
            }
            (DataType::Bit, _) => Err(invalid("bit addresses need a '.bit' suffix")),
            (DataType::String | DataType::WString, Some((".", length))) => {
                Tag::new(area, db_number, data_type, start, 0, length)
            }
            (DataType::String | DataType::WString, _) => {
                Err(invalid("string addresses need a '.length' suffix"))
            }
            (_, Some(("*", length))) => Tag::new(area, db_number, data_type, start, 0, length),
            (_, None) => Tag::new(area, db_number, data_type, start, 0, 1),
            (_, Some(_)) => Err(invalid("only bit and string addresses take a '.' suffix")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Tag {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_data_block_types() {
        let tag = parse("DB1,X0.7");
        assert_eq!(tag, Tag::bit(MemoryArea::DataBlock, 1, 0, 7).unwrap());

        let cases = [
            ("DB2,B3", DataType::Byte),
            ("DB2,C3", DataType::Char),
            ("DB2,W3", DataType::Word),
            ("DB2,I3", DataType::Int),
            ("DB2,DW3", DataType::DWord),
            ("DB2,D3", DataType::DWord),
            ("DB2,DI3", DataType::DInt),
            ("DB2,R3", DataType::Real),
            ("DB2,LR3", DataType::LReal),
        ];
        for (address, data_type) in cases {
            let tag = parse(address);
            assert_eq!(tag.data_type(), data_type, "{address}");
            assert_eq!(tag.db_number(), 2);
            assert_eq!(tag.start(), 3);
            assert_eq!(tag.length(), 1);
        }
    }

    #[test]
    fn test_parse_strings_and_arrays() {
        let s = parse("DB5,S10.20");
        assert_eq!(s.data_type(), DataType::String);
        assert_eq!(s.length(), 20);
        assert_eq!(s.size(), 22);

        let ws = parse("DB5,WS40.8");
        assert_eq!(ws.data_type(), DataType::WString);
        assert_eq!(ws.size(), 20);

        let array = parse("DB2,R8*4");
        assert_eq!(array.data_type(), DataType::Real);
        assert_eq!(array.length(), 4);
        assert_eq!(array.size(), 16);
    }

    #[test]
    fn test_parse_flat_areas() {
        assert_eq!(parse("I0.3"), Tag::bit(MemoryArea::Input, 0, 0, 3).unwrap());
        assert_eq!(parse("E0.3"), parse("IX0.3"));
        assert_eq!(parse("QW4").area(), MemoryArea::Output);
        assert_eq!(parse("AW4"), parse("QW4"));
        assert_eq!(parse("MDI12").data_type(), DataType::DInt);
        assert_eq!(parse("mb7").data_type(), DataType::Byte);

        let counter = parse("C5");
        assert_eq!(counter.area(), MemoryArea::Counter);
        assert_eq!(counter.data_type(), DataType::Word);
        assert_eq!(parse("T3").area(), MemoryArea::Timer);
    }

    #[test]
    fn test_display_parse_roundtrip() {
        for address in [
            "DB1,X0.7",
            "DB3,I4*10",
            "DB3,S8.20",
            "DB9,WS0.4",
            "Q1.2",
            "MW10",
            "MDW0",
            "ILR8*2",
            "C5",
            "T3",
        ] {
            assert_eq!(parse(address).to_string(), address);
        }
    }

    #[test]
    fn test_parse_errors() {
        for address in [
            "", "DB1", "DBx,B0", "DB1,Y0", "X0.0", "M", "MW", "DB1,X0", "DB1,X0.8", "DB1,S0",
            "DB1,W0.3", "DB1,B0*0", "MB0*x",
        ] {
            let result: Result<Tag> = address.parse();
            assert!(result.is_err(), "{address:?} should be rejected");
        }
    }
}
