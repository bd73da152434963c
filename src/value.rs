//! Typed values read from or written to tags.
//!
//! A [`Value`] is what the client hands back for a read and accepts for a
//! write. Multi-element tags (`length > 1`) map to [`Value::List`]; a single
//! element always collapses to the scalar variant. Character data (`Char`,
//! `String`, `WString`) maps to [`Value::Text`].
//!
//! # Payload encodings
//!
//! | Data type | Value | Bytes on the wire |
//! |-----------|-------|-------------------|
//! | `Bit` | `Bool` | 1 byte, `0x00` / `0x01` |
//! | `Byte` | `Byte` | raw byte |
//! | `Char` | `Text` | Latin-1, NUL padded to `length` |
//! | `Word` / `Int` | `Word` / `Int` | 16-bit big-endian |
//! | `DWord` / `DInt` | `DWord` / `DInt` | 32-bit big-endian |
//! | `Real` / `LReal` | `Real` / `LReal` | IEEE-754 big-endian |
//! | `String` | `Text` | max length byte, actual length byte, Latin-1 |
//! | `WString` | `Text` | max length word, actual length word, UTF-16 BE |
//!
//! # Example
//!
//! ```
//! use s7_tags::Value;
//!
//! let value = Value::from(vec![1i16, 2, 3]);
//! assert_eq!(value.as_list().map(|items| items.len()), Some(3));
//!
//! assert_eq!(Value::from(true).as_bool(), Some(true));
//! assert_eq!(Value::from("pump").as_str(), Some("pump"));
//! ```

use crate::error::{Result, S7Error};
use crate::tag::{DataType, Tag};

/// A value held by a tag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Single bit.
    Bool(bool),
    /// Unsigned 8-bit value.
    Byte(u8),
    /// Unsigned 16-bit value.
    Word(u16),
    /// Signed 16-bit value.
    Int(i16),
    /// Unsigned 32-bit value.
    DWord(u32),
    /// Signed 32-bit value.
    DInt(i32),
    /// Single precision float.
    Real(f32),
    /// Double precision float.
    LReal(f64),
    /// Character data of a `Char`, `String` or `WString` tag.
    Text(String),
    /// Elements of an array tag, in address order.
    List(Vec<Value>),
}

impl Value {
    /// Returns the boolean if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns any integer variant widened to `i64`.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::Value;
    ///
    /// assert_eq!(Value::Int(-5).as_i64(), Some(-5));
    /// assert_eq!(Value::DWord(70_000).as_i64(), Some(70_000));
    /// assert_eq!(Value::Real(1.5).as_i64(), None);
    /// ```
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(value) => Some(i64::from(*value)),
            Value::Word(value) => Some(i64::from(*value)),
            Value::Int(value) => Some(i64::from(*value)),
            Value::DWord(value) => Some(i64::from(*value)),
            Value::DInt(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    /// Returns either float variant widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(value) => Some(f64::from(*value)),
            Value::LReal(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text if this is a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the elements if this is a [`Value::List`].
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    /// Decodes the payload of `length` elements of `data_type`.
    ///
    /// `raw` must hold at least `data_type.size(length)` bytes; extra bytes are ignored.
    pub(crate) fn decode(data_type: DataType, length: u16, raw: &[u8]) -> Result<Value> {
        let size = data_type.size(length);
        if raw.len() < size {
            return Err(S7Error::protocol(format!(
                "{data_type:?} payload needs {size} bytes, got {}",
                raw.len()
            )));
        }
        let raw = &raw[..size];

        let value = match data_type {
            DataType::Bit => Value::Bool(raw[0] != 0),
            DataType::Char => Value::Text(latin1(raw).trim_end_matches('\0').to_string()),
            DataType::String => {
                let actual = (raw[1] as usize).min(size - 2);
                Value::Text(latin1(&raw[2..2 + actual]))
            }
            DataType::WString => {
                let actual = (u16::from_be_bytes([raw[2], raw[3]]) as usize).min(length as usize);
                let units: Vec<u16> = raw[4..4 + 2 * actual]
                    .chunks_exact(2)
                    .map(|unit| u16::from_be_bytes([unit[0], unit[1]]))
                    .collect();
                Value::Text(String::from_utf16_lossy(&units))
            }
            _ => {
                let width = data_type.size(1);
                let mut items: Vec<Value> = raw
                    .chunks_exact(width)
                    .map(|chunk| decode_element(data_type, chunk))
                    .collect();
                if items.len() == 1 {
                    items.remove(0)
                } else {
                    Value::List(items)
                }
            }
        };
        Ok(value)
    }

    /// Encodes this value as the payload of `tag`.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidValue` if the variant does not match the tag's
    /// data type, a list has the wrong element count, or text does not fit.
    pub(crate) fn encode(&self, tag: &Tag) -> Result<Vec<u8>> {
        let data_type = tag.data_type();
        let length = tag.length() as usize;
        let mut bytes = Vec::with_capacity(tag.size());

        match data_type {
            DataType::Char => bytes.extend(self.latin1_for(tag)?),
            DataType::String => {
                let text = self.latin1_for(tag)?;
                bytes.push(length as u8);
                bytes.push(text.len() as u8);
                bytes.extend(text);
            }
            DataType::WString => {
                let text = self.text_for(tag)?;
                let units: Vec<u16> = text.encode_utf16().collect();
                if units.len() > length {
                    return Err(S7Error::invalid_value(
                        *tag,
                        format!("expected at most {length} UTF-16 code units"),
                    ));
                }
                bytes.extend_from_slice(&(length as u16).to_be_bytes());
                bytes.extend_from_slice(&(units.len() as u16).to_be_bytes());
                for unit in units {
                    bytes.extend_from_slice(&unit.to_be_bytes());
                }
            }
            _ if length == 1 => encode_element(self, tag, &mut bytes)?,
            _ => match self {
                Value::List(items) if items.len() == length => {
                    for item in items {
                        encode_element(item, tag, &mut bytes)?;
                    }
                }
                Value::List(items) => {
                    return Err(S7Error::invalid_value(
                        *tag,
                        format!("expected {length} elements, got {}", items.len()),
                    ));
                }
                _ => {
                    return Err(S7Error::invalid_value(
                        *tag,
                        format!("expected a list of {length} elements"),
                    ));
                }
            },
        }

        bytes.resize(tag.size(), 0);
        Ok(bytes)
    }

    fn text_for(&self, tag: &Tag) -> Result<&str> {
        self.as_str()
            .ok_or_else(|| S7Error::invalid_value(*tag, format!("expected text, got {self:?}")))
    }

    /// Single-byte characters of a `Char` or `String` value.
    fn latin1_for(&self, tag: &Tag) -> Result<Vec<u8>> {
        let length = tag.length() as usize;
        let bytes = self
            .text_for(tag)?
            .chars()
            .map(|c| u8::try_from(c).ok())
            .collect::<Option<Vec<u8>>>()
            .filter(|bytes| bytes.len() <= length);
        bytes.ok_or_else(|| {
            S7Error::invalid_value(*tag, format!("expected at most {length} Latin-1 characters"))
        })
    }
}

fn latin1(raw: &[u8]) -> String {
    raw.iter().map(|&byte| char::from(byte)).collect()
}

fn word4(chunk: &[u8]) -> [u8; 4] {
    [chunk[0], chunk[1], chunk[2], chunk[3]]
}

fn decode_element(data_type: DataType, chunk: &[u8]) -> Value {
    match data_type {
        DataType::Word => Value::Word(u16::from_be_bytes([chunk[0], chunk[1]])),
        DataType::Int => Value::Int(i16::from_be_bytes([chunk[0], chunk[1]])),
        DataType::DWord => Value::DWord(u32::from_be_bytes(word4(chunk))),
        DataType::DInt => Value::DInt(i32::from_be_bytes(word4(chunk))),
        DataType::Real => Value::Real(f32::from_be_bytes(word4(chunk))),
        DataType::LReal => {
            let mut bits = [0u8; 8];
            bits.copy_from_slice(&chunk[..8]);
            Value::LReal(f64::from_be_bytes(bits))
        }
        _ => Value::Byte(chunk[0]),
    }
}

fn encode_element(value: &Value, tag: &Tag, bytes: &mut Vec<u8>) -> Result<()> {
    match (tag.data_type(), value) {
        (DataType::Bit, Value::Bool(bit)) => bytes.push(u8::from(*bit)),
        (DataType::Byte, Value::Byte(byte)) => bytes.push(*byte),
        (DataType::Word, Value::Word(word)) => bytes.extend_from_slice(&word.to_be_bytes()),
        (DataType::Int, Value::Int(int)) => bytes.extend_from_slice(&int.to_be_bytes()),
        (DataType::DWord, Value::DWord(dword)) => bytes.extend_from_slice(&dword.to_be_bytes()),
        (DataType::DInt, Value::DInt(dint)) => bytes.extend_from_slice(&dint.to_be_bytes()),
        (DataType::Real, Value::Real(real)) => bytes.extend_from_slice(&real.to_be_bytes()),
        (DataType::LReal, Value::LReal(lreal)) => bytes.extend_from_slice(&lreal.to_be_bytes()),
        (data_type, other) => {
            return Err(S7Error::invalid_value(
                *tag,
                format!("{other:?} does not match data type {data_type:?}"),
            ));
        }
    }
    Ok(())
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Byte(value)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Word(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::DWord(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::DInt(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::LReal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::MemoryArea;

    fn db(data_type: DataType, length: u16) -> Tag {
        Tag::new(MemoryArea::DataBlock, 1, data_type, 0, 0, length).unwrap()
    }

    fn roundtrip(tag: Tag, value: Value) {
        let bytes = value.encode(&tag).unwrap();
        assert_eq!(bytes.len(), tag.size(), "{tag}");
        let decoded = Value::decode(tag.data_type(), tag.length(), &bytes).unwrap();
        assert_eq!(decoded, value, "{tag}");
    }

    #[test]
    fn test_roundtrip_every_type() {
        roundtrip(Tag::bit(MemoryArea::DataBlock, 1, 0, 3).unwrap(), Value::Bool(true));
        roundtrip(db(DataType::Byte, 1), Value::Byte(0xA5));
        roundtrip(db(DataType::Byte, 3), Value::from(vec![1u8, 2, 3]));
        roundtrip(db(DataType::Char, 4), Value::from("ab"));
        roundtrip(db(DataType::Word, 1), Value::Word(0xBEEF));
        roundtrip(db(DataType::Int, 2), Value::from(vec![-2i16, i16::MAX]));
        roundtrip(db(DataType::DWord, 1), Value::DWord(0xDEAD_BEEF));
        roundtrip(db(DataType::DInt, 1), Value::DInt(i32::MIN));
        roundtrip(db(DataType::Real, 1), Value::Real(-1.25e-3));
        roundtrip(db(DataType::LReal, 1), Value::LReal(std::f64::consts::PI));
        roundtrip(db(DataType::String, 10), Value::from("motor 1"));
        roundtrip(db(DataType::WString, 6), Value::from("Größe"));
    }

    #[test]
    fn test_real_bit_patterns_exact() {
        let tag = db(DataType::Real, 1);
        let value = Value::Real(f32::from_bits(0x7F80_0001));
        let bytes = value.encode(&tag).unwrap();
        assert_eq!(bytes, [0x7F, 0x80, 0x00, 0x01]);
        match Value::decode(DataType::Real, 1, &bytes).unwrap() {
            Value::Real(real) => assert_eq!(real.to_bits(), 0x7F80_0001),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_big_endian() {
        assert_eq!(Value::decode(DataType::Int, 1, &[0xFF, 0xFE]).unwrap(), Value::Int(-2));
        assert_eq!(
            Value::decode(DataType::DWord, 1, &[0x00, 0x01, 0x00, 0x00]).unwrap(),
            Value::DWord(65536)
        );
        assert_eq!(
            Value::decode(DataType::Real, 1, &[0x3F, 0x80, 0x00, 0x00]).unwrap(),
            Value::Real(1.0)
        );
    }

    #[test]
    fn test_string_layout() {
        let tag = db(DataType::String, 6);
        let bytes = Value::from("abc").encode(&tag).unwrap();
        assert_eq!(bytes, [6, 3, b'a', b'b', b'c', 0, 0, 0]);

        // Actual length larger than the buffer is clamped.
        let decoded = Value::decode(DataType::String, 2, &[2, 9, b'h', b'i']).unwrap();
        assert_eq!(decoded, Value::from("hi"));
    }

    #[test]
    fn test_wstring_layout() {
        let tag = db(DataType::WString, 2);
        let bytes = Value::from("é").encode(&tag).unwrap();
        assert_eq!(bytes, [0x00, 0x02, 0x00, 0x01, 0x00, 0xE9, 0x00, 0x00]);
    }

    #[test]
    fn test_char_and_string_are_latin1_both_ways() {
        let chars = db(DataType::Char, 3);
        let bytes = Value::from("né").encode(&chars).unwrap();
        assert_eq!(bytes, [b'n', 0xE9, 0x00]);
        assert_eq!(
            Value::decode(DataType::Char, 3, &bytes).unwrap(),
            Value::from("né")
        );

        let string = db(DataType::String, 4);
        let bytes = Value::from("ü1").encode(&string).unwrap();
        assert_eq!(bytes, [4, 2, 0xFC, b'1', 0, 0]);
        assert_eq!(
            Value::decode(DataType::String, 4, &bytes).unwrap(),
            Value::from("ü1")
        );

        assert!(Value::from("€").encode(&chars).is_err());
    }

    #[test]
    fn test_char_trims_trailing_nul() {
        let decoded = Value::decode(DataType::Char, 4, b"ok\0\0").unwrap();
        assert_eq!(decoded, Value::from("ok"));
    }

    #[test]
    fn test_decode_short_payload_is_protocol_error() {
        let err = Value::decode(DataType::DInt, 1, &[0x00, 0x01]).unwrap_err();
        assert!(matches!(err, S7Error::Protocol { .. }));
    }

    #[test]
    fn test_encode_rejects_mismatches() {
        let int = db(DataType::Int, 1);
        assert!(matches!(
            Value::Word(1).encode(&int),
            Err(S7Error::InvalidValue { .. })
        ));

        let array = db(DataType::Int, 3);
        let err = Value::from(vec![1i16, 2]).encode(&array).unwrap_err();
        assert!(err.to_string().contains("expected 3 elements, got 2"));
        assert!(Value::Int(1).encode(&array).is_err());

        let string = db(DataType::String, 2);
        assert!(Value::from("abc").encode(&string).is_err());
        assert!(Value::from("€").encode(&string).is_err());
        assert!(Value::Int(1).encode(&string).is_err());
    }
}
