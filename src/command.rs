//! Read and write request structures and serialization.
//!
//! A request carries up to [`MAX_ITEMS`] items. Each item is addressed by a
//! 12-byte item specification in the parameter section; writes additionally
//! carry one data item per specification.
//!
//! # Item specification
//!
//! | Byte | Field | Description |
//! |------|-------|-------------|
//! | 0 | Spec type | `0x12` |
//! | 1 | Length | `0x0A` (bytes that follow) |
//! | 2 | Syntax ID | `0x10` (S7ANY) |
//! | 3 | Transport code | element type, see below |
//! | 4-5 | Count | number of elements |
//! | 6-7 | Block number | data block number, 0 elsewhere |
//! | 8 | Area | area code |
//! | 9-11 | Address | bit address, 24-bit big-endian |
//!
//! Transport codes: `0x01` bit, `0x02` byte, `0x03` char, `0x04` word,
//! `0x05` int, `0x06` dword, `0x07` dint, `0x08` real. `LReal`, `String` and
//! `WString` tags are requested as bytes.
//!
//! A bit item is addressed at `start * 8 + 7 - bit_offset`; every other item
//! is addressed at `start * 8`.
//!
//! # Example
//!
//! ```
//! use s7_tags::{ReadRequest, Tag};
//!
//! let tag: Tag = "DB2,I2".parse()?;
//! let request = ReadRequest::new(vec![tag], 0x0001, 240)?;
//! let bytes = request.to_bytes();
//! assert_eq!(bytes.len(), 31);
//! assert_eq!(
//!     &bytes[19..31],
//!     &[0x12, 0x0A, 0x10, 0x05, 0x00, 0x01, 0x00, 0x02, 0x84, 0x00, 0x00, 0x10]
//! );
//! # Ok::<(), s7_tags::S7Error>(())
//! ```

use bytes::BufMut;

use crate::error::{Result, S7Error};
use crate::header::{put_frame_prefix, S7Header, REQUEST_OVERHEAD, RESPONSE_OVERHEAD};
use crate::tag::{DataType, Tag};
use crate::utils::pad_len;
use crate::value::Value;

/// Read variable function code.
pub const FUNCTION_READ: u8 = 0x04;
/// Write variable function code.
pub const FUNCTION_WRITE: u8 = 0x05;

/// Maximum number of items in one request.
pub const MAX_ITEMS: usize = 20;

/// Size of one item specification in the parameter section.
pub const ITEM_SPEC_SIZE: usize = 12;
/// Size of the header preceding each item payload (return code or reserved
/// byte, transport size, length).
pub const DATA_ITEM_HEADER_SIZE: usize = 4;
/// Size of one item status in a write response.
pub const WRITE_STATUS_SIZE: usize = 1;

/// Largest payload the controller accepts as a write data length in bits.
const MAX_BIT_LENGTH_BYTES: usize = (u16::MAX as usize) / 8;

/// Returns the largest item size a read can address with `pdu_size`.
///
/// An item fits alone when its response (fixed overhead, item header and
/// payload) stays below the PDU and its request fits too.
///
/// # Example
///
/// ```
/// use s7_tags::max_read_item_size;
///
/// assert_eq!(max_read_item_size(240), 214);
/// assert_eq!(max_read_item_size(960), 934);
/// assert_eq!(max_read_item_size(20), 0);
/// ```
pub fn max_read_item_size(pdu_size: u16) -> usize {
    let pdu_size = pdu_size as usize;
    if REQUEST_OVERHEAD + ITEM_SPEC_SIZE >= pdu_size {
        return 0;
    }
    pdu_size.saturating_sub(RESPONSE_OVERHEAD + DATA_ITEM_HEADER_SIZE + 1)
}

/// Returns the largest item size a write can carry with `pdu_size`.
///
/// # Example
///
/// ```
/// use s7_tags::max_write_item_size;
///
/// assert_eq!(max_write_item_size(240), 204);
/// ```
pub fn max_write_item_size(pdu_size: u16) -> usize {
    (pdu_size as usize)
        .saturating_sub(REQUEST_OVERHEAD + ITEM_SPEC_SIZE + DATA_ITEM_HEADER_SIZE + 1)
        .min(MAX_BIT_LENGTH_BYTES)
}

/// Transport code and element count of a tag's item specification.
fn transport(tag: &Tag) -> (u8, u16) {
    let length = tag.length();
    match tag.data_type() {
        DataType::Bit => (0x01, 1),
        DataType::Byte => (0x02, length),
        DataType::Char => (0x03, length),
        DataType::Word => (0x04, length),
        DataType::Int => (0x05, length),
        DataType::DWord => (0x06, length),
        DataType::DInt => (0x07, length),
        DataType::Real => (0x08, length),
        DataType::LReal | DataType::String | DataType::WString => (0x02, tag.size() as u16),
    }
}

/// Returns the 24-bit address of a tag's item specification.
pub(crate) fn bit_address(tag: &Tag) -> u32 {
    match tag.data_type() {
        DataType::Bit => tag.start() * 8 + 7 - u32::from(tag.bit_offset()),
        _ => tag.start() * 8,
    }
}

fn put_item_spec<B: BufMut>(tag: &Tag, dst: &mut B) {
    let (code, count) = transport(tag);
    let address = bit_address(tag);
    dst.put_u8(0x12);
    dst.put_u8(0x0A);
    dst.put_u8(0x10);
    dst.put_u8(code);
    dst.put_u16(count);
    dst.put_u16(tag.db_number());
    dst.put_u8(tag.area().code());
    dst.put_u8((address >> 16) as u8);
    dst.put_u16((address & 0xFFFF) as u16);
}

fn check_item_count(count: usize) -> Result<()> {
    if count == 0 || count > MAX_ITEMS {
        return Err(S7Error::TooManyItems {
            count,
            max: MAX_ITEMS,
        });
    }
    Ok(())
}

/// Read variable request for up to [`MAX_ITEMS`] tags.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    pdu_ref: u16,
    items: Vec<Tag>,
}

impl ReadRequest {
    /// Creates a new read request.
    ///
    /// # Arguments
    ///
    /// * `items` - Tags to read, one item specification each
    /// * `pdu_ref` - PDU reference for request/response matching
    /// * `pdu_size` - Negotiated PDU size
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `items` is empty or holds more than [`MAX_ITEMS`] tags (`TooManyItems`)
    /// - any single tag cannot fit the PDU on its own (`ItemTooLarge`)
    /// - the request or its expected response exceeds the PDU (`RequestTooLarge`)
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::{ReadRequest, Tag};
    ///
    /// let tags: Vec<Tag> = vec!["DB1,X0.7".parse()?, "MW10".parse()?];
    /// let request = ReadRequest::new(tags, 7, 240)?;
    /// assert_eq!(request.pdu_ref(), 7);
    /// # Ok::<(), s7_tags::S7Error>(())
    /// ```
    pub fn new(items: Vec<Tag>, pdu_ref: u16, pdu_size: u16) -> Result<Self> {
        check_item_count(items.len())?;

        let max = max_read_item_size(pdu_size);
        if let Some(tag) = items.iter().find(|tag| tag.size() > max) {
            return Err(S7Error::ItemTooLarge {
                tag: *tag,
                required: tag.size(),
                max,
                pdu_size,
            });
        }

        let request = Self { pdu_ref, items };
        for size in [request.encoded_len(), request.response_len()] {
            if size > pdu_size as usize {
                return Err(S7Error::RequestTooLarge { size, pdu_size });
            }
        }
        Ok(request)
    }

    /// Returns the PDU reference.
    pub fn pdu_ref(&self) -> u16 {
        self.pdu_ref
    }

    /// Returns the requested tags in wire order.
    pub fn items(&self) -> &[Tag] {
        &self.items
    }

    /// Returns the size of the encoded request.
    pub fn encoded_len(&self) -> usize {
        REQUEST_OVERHEAD + ITEM_SPEC_SIZE * self.items.len()
    }

    /// Returns the size of a fully successful response.
    pub fn response_len(&self) -> usize {
        let last = self.items.len().saturating_sub(1);
        RESPONSE_OVERHEAD
            + self
                .items
                .iter()
                .enumerate()
                .map(|(i, tag)| DATA_ITEM_HEADER_SIZE + tag.size() + pad_len(tag.size(), i == last))
                .sum::<usize>()
    }

    /// Serializes the request to a complete frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        let total = self.encoded_len();
        let param_len = 2 + ITEM_SPEC_SIZE * self.items.len();

        let mut bytes = Vec::with_capacity(total);
        put_frame_prefix(total, &mut bytes);
        S7Header::job(self.pdu_ref, param_len as u16, 0).encode_to(&mut bytes);
        bytes.put_u8(FUNCTION_READ);
        bytes.put_u8(self.items.len() as u8);
        for tag in &self.items {
            put_item_spec(tag, &mut bytes);
        }
        bytes
    }
}

/// One tag of a write request together with its encoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteItem {
    tag: Tag,
    data: Vec<u8>,
}

impl WriteItem {
    /// Encodes `value` for `tag`.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidValue` if the value does not match the tag's
    /// data type and length.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::{Tag, Value, WriteItem};
    ///
    /// let tag: Tag = "DB1,W4".parse()?;
    /// let item = WriteItem::new(tag, &Value::Word(0x1234))?;
    /// assert_eq!(item.data(), &[0x12, 0x34]);
    ///
    /// assert!(WriteItem::new(tag, &Value::Bool(true)).is_err());
    /// # Ok::<(), s7_tags::S7Error>(())
    /// ```
    pub fn new(tag: Tag, value: &Value) -> Result<Self> {
        let data = value.encode(&tag)?;
        Ok(Self { tag, data })
    }

    /// Returns the target tag.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Returns the encoded payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Transport size and length field of the data item.
    fn data_header(&self) -> (u8, u16) {
        let len = self.data.len();
        match self.tag.data_type() {
            DataType::Bit => (0x03, 1),
            DataType::Byte | DataType::Char | DataType::Word | DataType::DWord => {
                (0x04, (len * 8) as u16)
            }
            DataType::Int | DataType::DInt => (0x05, (len * 8) as u16),
            DataType::Real | DataType::LReal | DataType::String | DataType::WString => {
                (0x09, len as u16)
            }
        }
    }
}

/// Write variable request for up to [`MAX_ITEMS`] tags.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pdu_ref: u16,
    items: Vec<WriteItem>,
}

impl WriteRequest {
    /// Creates a new write request.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `items` is empty or holds more than [`MAX_ITEMS`] entries (`TooManyItems`)
    /// - any single item cannot fit the PDU on its own (`ItemTooLarge`)
    /// - the encoded request exceeds the PDU (`RequestTooLarge`)
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::{Tag, Value, WriteItem, WriteRequest};
    ///
    /// let tag: Tag = "DB1,W4".parse()?;
    /// let item = WriteItem::new(tag, &Value::Word(0x1234))?;
    /// let request = WriteRequest::new(vec![item], 2, 240)?;
    /// assert_eq!(request.to_bytes().len(), 37);
    /// # Ok::<(), s7_tags::S7Error>(())
    /// ```
    pub fn new(items: Vec<WriteItem>, pdu_ref: u16, pdu_size: u16) -> Result<Self> {
        check_item_count(items.len())?;

        let max = max_write_item_size(pdu_size);
        if let Some(item) = items.iter().find(|item| item.data.len() > max) {
            return Err(S7Error::ItemTooLarge {
                tag: item.tag,
                required: item.data.len(),
                max,
                pdu_size,
            });
        }

        let request = Self { pdu_ref, items };
        let size = request.encoded_len();
        if size > pdu_size as usize {
            return Err(S7Error::RequestTooLarge { size, pdu_size });
        }
        Ok(request)
    }

    /// Returns the PDU reference.
    pub fn pdu_ref(&self) -> u16 {
        self.pdu_ref
    }

    /// Returns the items in wire order.
    pub fn items(&self) -> &[WriteItem] {
        &self.items
    }

    fn data_len(&self) -> usize {
        let last = self.items.len().saturating_sub(1);
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                DATA_ITEM_HEADER_SIZE + item.data.len() + pad_len(item.data.len(), i == last)
            })
            .sum()
    }

    /// Returns the size of the encoded request.
    pub fn encoded_len(&self) -> usize {
        REQUEST_OVERHEAD + ITEM_SPEC_SIZE * self.items.len() + self.data_len()
    }

    /// Serializes the request to a complete frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        let total = self.encoded_len();
        let param_len = 2 + ITEM_SPEC_SIZE * self.items.len();

        let mut bytes = Vec::with_capacity(total);
        put_frame_prefix(total, &mut bytes);
        S7Header::job(self.pdu_ref, param_len as u16, self.data_len() as u16)
            .encode_to(&mut bytes);
        bytes.put_u8(FUNCTION_WRITE);
        bytes.put_u8(self.items.len() as u8);
        for item in &self.items {
            put_item_spec(&item.tag, &mut bytes);
        }

        let last = self.items.len() - 1;
        for (i, item) in self.items.iter().enumerate() {
            let (transport_size, length) = item.data_header();
            bytes.put_u8(0x00);
            bytes.put_u8(transport_size);
            bytes.put_u16(length);
            bytes.put_slice(&item.data);
            bytes.put_bytes(0x00, pad_len(item.data.len(), i == last));
        }
        bytes
    }
}
