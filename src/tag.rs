//! Tag descriptors: what to read or write, and how many bytes it occupies.
//!
//! A [`Tag`] names one memory reference on the controller: an area, a block
//! number (data blocks only), a data type, a byte offset, a bit offset (bit
//! tags only) and an element count. Tags are validated when constructed and
//! are immutable afterwards, so every tag that exists is well-formed.
//!
//! # Byte sizes
//!
//! | Data type | Size in bytes |
//! |-----------|---------------|
//! | `Bit` | 1 |
//! | `Byte`, `Char` | `length` |
//! | `Word`, `Int` | `2 * length` |
//! | `DWord`, `DInt`, `Real` | `4 * length` |
//! | `LReal` | `8 * length` |
//! | `String` | `length + 2` |
//! | `WString` | `2 * length + 4` |
//!
//! # Example
//!
//! ```
//! use s7_tags::{DataType, MemoryArea, Tag};
//!
//! let speed = Tag::new(MemoryArea::DataBlock, 10, DataType::Real, 4, 0, 1)?;
//! assert_eq!(speed.size(), 4);
//!
//! let name = Tag::new(MemoryArea::DataBlock, 10, DataType::String, 8, 0, 20)?;
//! assert_eq!(name.size(), 22);
//!
//! let start = Tag::bit(MemoryArea::Input, 0, 0, 3)?;
//! assert_eq!(start.to_string(), "I0.3");
//! # Ok::<(), s7_tags::S7Error>(())
//! ```

use std::cmp::Ordering;

use crate::area::MemoryArea;
use crate::error::{Result, S7Error};

/// Largest byte offset whose bit address (`start * 8 + 7`) still fits the
/// 3-byte address field of an item specification.
pub const MAX_START: u32 = (1 << 21) - 1;

/// Largest declared length of an S7 `STRING` (its length bytes are single bytes).
pub const MAX_STRING_LENGTH: u16 = 254;

/// Data types a tag can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// Single bit (BOOL).
    Bit,
    /// Unsigned 8-bit value.
    Byte,
    /// Single-byte (Latin-1) character.
    Char,
    /// Unsigned 16-bit value.
    Word,
    /// Signed 16-bit value (INT).
    Int,
    /// Unsigned 32-bit value.
    DWord,
    /// Signed 32-bit value (DINT).
    DInt,
    /// IEEE-754 single precision (REAL).
    Real,
    /// IEEE-754 double precision (LREAL).
    LReal,
    /// S7 `STRING`: max length byte, actual length byte, characters.
    String,
    /// S7 `WSTRING`: max length word, actual length word, UTF-16 code units.
    WString,
}

impl DataType {
    /// Returns the byte size of `length` elements of this type.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::DataType;
    ///
    /// assert_eq!(DataType::Bit.size(1), 1);
    /// assert_eq!(DataType::Word.size(3), 6);
    /// assert_eq!(DataType::String.size(10), 12);
    /// assert_eq!(DataType::WString.size(10), 24);
    /// ```
    pub fn size(self, length: u16) -> usize {
        let length = length as usize;
        match self {
            DataType::Bit => 1,
            DataType::Byte | DataType::Char => length,
            DataType::Word | DataType::Int => 2 * length,
            DataType::DWord | DataType::DInt | DataType::Real => 4 * length,
            DataType::LReal => 8 * length,
            DataType::String => length + 2,
            DataType::WString => 2 * length + 4,
        }
    }

    /// Returns whether `length` counts characters rather than elements.
    pub fn is_text(self) -> bool {
        matches!(self, DataType::String | DataType::WString)
    }

    /// Returns the notation code used in address strings.
    pub(crate) fn notation(self) -> &'static str {
        match self {
            DataType::Bit => "X",
            DataType::Byte => "B",
            DataType::Char => "C",
            DataType::Word => "W",
            DataType::Int => "I",
            DataType::DWord => "DW",
            DataType::DInt => "DI",
            DataType::Real => "R",
            DataType::LReal => "LR",
            DataType::String => "S",
            DataType::WString => "WS",
        }
    }
}

/// Immutable descriptor of one memory reference on the controller.
///
/// Two tags are equal when all their fields match. The [`Ord`] implementation
/// orders by area, block number and start offset first, which is the order
/// the planner groups tags in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Tag {
    area: MemoryArea,
    db_number: u16,
    data_type: DataType,
    start: u32,
    bit_offset: u8,
    length: u16,
}

impl Tag {
    /// Creates a new tag.
    ///
    /// # Arguments
    ///
    /// * `area` - Memory area
    /// * `db_number` - Data block number (must be 0 outside [`MemoryArea::DataBlock`])
    /// * `data_type` - Element type
    /// * `start` - Byte offset within the area or block
    /// * `bit_offset` - Bit within the start byte (0-7, only for [`DataType::Bit`])
    /// * `length` - Element count, or declared character count for text types
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidAddress` naming the violated field if:
    /// - `db_number` is non-zero outside a data block
    /// - `bit_offset` is above 7, or non-zero for a non-bit type
    /// - `length` is 0, or not 1 for a bit
    /// - `length` exceeds 254 for a `String`
    /// - `start` does not fit the 3-byte bit address
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::{DataType, MemoryArea, Tag};
    ///
    /// let tag = Tag::new(MemoryArea::DataBlock, 1, DataType::Int, 2, 0, 1).unwrap();
    /// assert_eq!(tag.size(), 2);
    ///
    /// assert!(Tag::new(MemoryArea::Memory, 1, DataType::Int, 2, 0, 1).is_err());
    /// ```
    pub fn new(
        area: MemoryArea,
        db_number: u16,
        data_type: DataType,
        start: u32,
        bit_offset: u8,
        length: u16,
    ) -> Result<Self> {
        if db_number != 0 && !area.uses_block_number() {
            return Err(S7Error::invalid_address(format!(
                "db_number must be 0 for area {area}, got {db_number}"
            )));
        }
        if bit_offset > 7 {
            return Err(S7Error::invalid_address(format!(
                "bit_offset must be 0-7, got {bit_offset}"
            )));
        }
        if bit_offset != 0 && data_type != DataType::Bit {
            return Err(S7Error::invalid_address(format!(
                "bit_offset must be 0 for {data_type:?}, got {bit_offset}"
            )));
        }
        if length == 0 {
            return Err(S7Error::invalid_address("length must be greater than 0"));
        }
        if data_type == DataType::Bit && length != 1 {
            return Err(S7Error::invalid_address(format!(
                "length must be 1 for Bit, got {length}"
            )));
        }
        if data_type == DataType::String && length > MAX_STRING_LENGTH {
            return Err(S7Error::invalid_address(format!(
                "length must not exceed {MAX_STRING_LENGTH} for String, got {length}"
            )));
        }
        if start > MAX_START {
            return Err(S7Error::invalid_address(format!(
                "start must not exceed {MAX_START}, got {start}"
            )));
        }

        Ok(Self {
            area,
            db_number,
            data_type,
            start,
            bit_offset,
            length,
        })
    }

    /// Creates a single-bit tag.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::{MemoryArea, Tag};
    ///
    /// let tag = Tag::bit(MemoryArea::DataBlock, 1, 0, 7).unwrap();
    /// assert_eq!(tag.to_string(), "DB1,X0.7");
    /// ```
    pub fn bit(area: MemoryArea, db_number: u16, start: u32, bit_offset: u8) -> Result<Self> {
        Self::new(area, db_number, DataType::Bit, start, bit_offset, 1)
    }

    /// Creates a byte-range tag covering `[start, start + length)`.
    pub(crate) fn byte_range(
        area: MemoryArea,
        db_number: u16,
        start: u32,
        length: usize,
    ) -> Result<Self> {
        let length = u16::try_from(length).map_err(|_| {
            S7Error::invalid_address(format!("byte range of {length} bytes is too long"))
        })?;
        Self::new(area, db_number, DataType::Byte, start, 0, length)
    }

    /// Memory area.
    pub fn area(&self) -> MemoryArea {
        self.area
    }

    /// Data block number (0 outside data blocks).
    pub fn db_number(&self) -> u16 {
        self.db_number
    }

    /// Element type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Byte offset within the area or block.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Bit within the start byte.
    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    /// Element count, or declared character count for text types.
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Returns the number of bytes this tag occupies on the controller.
    pub fn size(&self) -> usize {
        self.data_type.size(self.length)
    }

    /// Returns the byte offset one past the last byte of this tag.
    pub fn end(&self) -> usize {
        self.start as usize + self.size()
    }

    /// Returns whether `other` lies entirely inside this tag's byte range.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::{DataType, MemoryArea, Tag};
    ///
    /// let block = Tag::new(MemoryArea::DataBlock, 1, DataType::Byte, 0, 0, 8).unwrap();
    /// let word = Tag::new(MemoryArea::DataBlock, 1, DataType::Word, 6, 0, 1).unwrap();
    /// let other_db = Tag::new(MemoryArea::DataBlock, 2, DataType::Word, 6, 0, 1).unwrap();
    ///
    /// assert!(block.contains(&word));
    /// assert!(!block.contains(&other_db));
    /// ```
    pub fn contains(&self, other: &Tag) -> bool {
        self.same_region(other) && self.start <= other.start && self.end() >= other.end()
    }

    /// Returns whether both tags address the same area and block.
    pub fn same_region(&self, other: &Tag) -> bool {
        self.area == other.area && self.db_number == other.db_number
    }

    /// Key the planner sorts by.
    pub(crate) fn sort_key(&self) -> (u8, u16, u32) {
        (self.area.code(), self.db_number, self.start)
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.bit_offset.cmp(&other.bit_offset))
            .then_with(|| self.data_type.cmp(&other.data_type))
            .then_with(|| self.length.cmp(&other.length))
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.area == MemoryArea::DataBlock {
            write!(
                f,
                "DB{},{}{}",
                self.db_number,
                self.data_type.notation(),
                self.start
            )?;
        } else {
            let code = match (self.area, self.data_type) {
                (_, DataType::Bit) => "",
                (MemoryArea::Counter | MemoryArea::Timer, DataType::Word) => "",
                (_, data_type) => data_type.notation(),
            };
            write!(f, "{}{}{}", self.area, code, self.start)?;
        }

        match self.data_type {
            DataType::Bit => write!(f, ".{}", self.bit_offset),
            DataType::String | DataType::WString => write!(f, ".{}", self.length),
            _ if self.length > 1 => write!(f, "*{}", self.length),
            _ => Ok(()),
        }
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_string()
    }
}

impl TryFrom<String> for Tag {
    type Error = S7Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(db_number: u16, data_type: DataType, start: u32, length: u16) -> Tag {
        Tag::new(MemoryArea::DataBlock, db_number, data_type, start, 0, length).unwrap()
    }

    #[test]
    fn test_sizes() {
        assert_eq!(Tag::bit(MemoryArea::Memory, 0, 3, 4).unwrap().size(), 1);
        assert_eq!(db(1, DataType::Byte, 0, 5).size(), 5);
        assert_eq!(db(1, DataType::Char, 0, 5).size(), 5);
        assert_eq!(db(1, DataType::Word, 0, 3).size(), 6);
        assert_eq!(db(1, DataType::Int, 0, 1).size(), 2);
        assert_eq!(db(1, DataType::DWord, 0, 2).size(), 8);
        assert_eq!(db(1, DataType::DInt, 0, 1).size(), 4);
        assert_eq!(db(1, DataType::Real, 0, 3).size(), 12);
        assert_eq!(db(1, DataType::LReal, 0, 2).size(), 16);
        assert_eq!(db(1, DataType::String, 0, 10).size(), 12);
        assert_eq!(db(1, DataType::WString, 0, 10).size(), 24);
    }

    #[test]
    fn test_db_number_outside_data_block_rejected() {
        let err = Tag::new(MemoryArea::Input, 1, DataType::Byte, 0, 0, 1).unwrap_err();
        assert!(err.to_string().contains("db_number"));
        assert!(Tag::new(MemoryArea::Input, 0, DataType::Byte, 0, 0, 1).is_ok());
    }

    #[test]
    fn test_bit_offset_rules() {
        assert!(Tag::bit(MemoryArea::DataBlock, 1, 0, 8).is_err());
        let err = Tag::new(MemoryArea::DataBlock, 1, DataType::Byte, 0, 3, 1).unwrap_err();
        assert!(err.to_string().contains("bit_offset"));
        assert!(Tag::bit(MemoryArea::DataBlock, 1, 0, 7).is_ok());
    }

    #[test]
    fn test_length_rules() {
        assert!(Tag::new(MemoryArea::DataBlock, 1, DataType::Word, 0, 0, 0).is_err());
        assert!(Tag::new(MemoryArea::DataBlock, 1, DataType::Bit, 0, 0, 2).is_err());
        assert!(Tag::new(MemoryArea::DataBlock, 1, DataType::String, 0, 0, 254).is_ok());
        assert!(Tag::new(MemoryArea::DataBlock, 1, DataType::String, 0, 0, 255).is_err());
        assert!(Tag::new(MemoryArea::DataBlock, 1, DataType::WString, 0, 0, 1000).is_ok());
    }

    #[test]
    fn test_start_limit() {
        assert!(Tag::new(MemoryArea::Memory, 0, DataType::Byte, MAX_START, 0, 1).is_ok());
        assert!(Tag::new(MemoryArea::Memory, 0, DataType::Byte, MAX_START + 1, 0, 1).is_err());
    }

    #[test]
    fn test_contains() {
        let range = db(1, DataType::Byte, 2, 6);
        assert!(range.contains(&db(1, DataType::Word, 2, 1)));
        assert!(range.contains(&db(1, DataType::DWord, 4, 1)));
        assert!(!range.contains(&db(1, DataType::DWord, 5, 1)));
        assert!(!range.contains(&db(1, DataType::Byte, 1, 1)));
        assert!(!range.contains(&db(2, DataType::Byte, 3, 1)));
        assert!(range.contains(&Tag::bit(MemoryArea::DataBlock, 1, 7, 7).unwrap()));
        assert!(range.contains(&range));
    }

    #[test]
    fn test_ordering_by_area_block_start() {
        let mut tags = vec![
            db(2, DataType::Byte, 0, 1),
            Tag::new(MemoryArea::Memory, 0, DataType::Byte, 4, 0, 1).unwrap(),
            db(1, DataType::Byte, 10, 1),
            db(1, DataType::Byte, 2, 1),
        ];
        tags.sort();
        let printed: Vec<String> = tags.iter().map(Tag::to_string).collect();
        assert_eq!(printed, ["MB4", "DB1,B2", "DB1,B10", "DB2,B0"]);
    }

    #[test]
    fn test_equality_and_hash_use_all_fields() {
        use std::collections::HashSet;

        let a = db(1, DataType::Word, 2, 1);
        let b = db(1, DataType::Int, 2, 1);
        assert_ne!(a, b);
        let set: HashSet<Tag> = [a, a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Tag::bit(MemoryArea::DataBlock, 1, 0, 7).unwrap().to_string(), "DB1,X0.7");
        assert_eq!(db(3, DataType::Real, 4, 1).to_string(), "DB3,R4");
        assert_eq!(db(3, DataType::Int, 4, 10).to_string(), "DB3,I4*10");
        assert_eq!(db(3, DataType::String, 8, 20).to_string(), "DB3,S8.20");
        assert_eq!(Tag::bit(MemoryArea::Output, 0, 1, 2).unwrap().to_string(), "Q1.2");
        let mw = Tag::new(MemoryArea::Memory, 0, DataType::Word, 10, 0, 1).unwrap();
        assert_eq!(mw.to_string(), "MW10");
        let counter = Tag::new(MemoryArea::Counter, 0, DataType::Word, 5, 0, 1).unwrap();
        assert_eq!(counter.to_string(), "C5");
    }
}
