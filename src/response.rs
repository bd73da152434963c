//! Response parsing and validation.
//!
//! This module parses ack data frames returned for read and write requests
//! and splits their data section into per-item payloads.
//!
//! # Response Structure
//!
//! | Component | Size | Description |
//! |-----------|------|-------------|
//! | TPKT + COTP | 7 bytes | frame prefix |
//! | S7 header | 12 bytes | ack data header with error class/code |
//! | Function | 1 byte | `0x04` read, `0x05` write |
//! | Item count | 1 byte | number of items that follow |
//! | Data | variable | one entry per item |
//!
//! A read item is a return code, a transport size, a length (u16 BE) and
//! the payload, followed by one fill byte when the payload is odd and the
//! item is not the last. A failed item carries no payload. A write item is
//! a single return code.
//!
//! # Example
//!
//! ```
//! use s7_tags::{S7Response, Tag, Value};
//!
//! let frame = [
//!     0x03, 0x00, 0x00, 0x1B, 0x02, 0xF0, 0x80, // TPKT, COTP
//!     0x32, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x06, 0x00, 0x00, // header
//!     0x04, 0x01, // read, one item
//!     0xFF, 0x04, 0x00, 0x10, 0x12, 0x34, // success, 16 bits
//! ];
//!
//! let response = S7Response::from_bytes(&frame)?;
//! response.check_pdu_ref(1)?;
//! response.check_error()?;
//!
//! let tag: Tag = "DB1,W0".parse()?;
//! assert_eq!(response.to_values(&[tag])?, vec![Value::Word(0x1234)]);
//! # Ok::<(), s7_tags::S7Error>(())
//! ```

use crate::command::{DATA_ITEM_HEADER_SIZE, FUNCTION_READ, FUNCTION_WRITE, WRITE_STATUS_SIZE};
use crate::error::{Result, ReturnCode, S7Error};
use crate::header::{strip_frame, S7Header, ROSCTR_ACK_DATA};
use crate::tag::Tag;
use crate::utils::pad_len;
use crate::value::Value;

/// Parsed ack data response.
#[derive(Debug, Clone)]
pub struct S7Response {
    /// S7 header.
    pub header: S7Header,
    /// Function code echoed from the request (0 if the parameter section is absent).
    pub function: u8,
    /// Item count (0 if the parameter section is absent).
    pub item_count: u8,
    /// Data section.
    pub data: Vec<u8>,
}

/// Payload of one read item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemData<'a> {
    /// Status reported for the item.
    pub return_code: ReturnCode,
    /// Payload bytes (empty on failure).
    pub data: &'a [u8],
}

/// Outcome of reading one tag, as reported by the fail-soft read variants.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadResult {
    /// Tag that was read.
    pub tag: Tag,
    /// Whether the value was read.
    pub success: bool,
    /// Value, if the read succeeded.
    pub value: Option<Value>,
    /// Error message, if the read failed.
    pub error: Option<String>,
    /// Raw return code of the item that carried this tag.
    pub return_code: u8,
}

impl ReadResult {
    pub(crate) fn ok(tag: Tag, value: Value) -> Self {
        Self {
            tag,
            success: true,
            value: Some(value),
            error: None,
            return_code: ReturnCode::Success.code(),
        }
    }

    pub(crate) fn failed(tag: Tag, code: ReturnCode) -> Self {
        Self {
            tag,
            success: false,
            value: None,
            error: Some(S7Error::ReadResponse { tag, code }.to_string()),
            return_code: code.code(),
        }
    }

    /// Returns the symbolic return code.
    pub fn status(&self) -> ReturnCode {
        ReturnCode::from(self.return_code)
    }
}

/// Outcome of writing one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriteResult {
    /// Tag that was written.
    pub tag: Tag,
    /// Whether the controller accepted the value.
    pub success: bool,
    /// Error message, if the write failed.
    pub error: Option<String>,
    /// Raw return code of the item.
    pub return_code: u8,
}

impl WriteResult {
    pub(crate) fn new(tag: Tag, code: ReturnCode) -> Self {
        let success = code.is_success();
        Self {
            tag,
            success,
            error: (!success).then(|| S7Error::WriteResponse { tag, code }.to_string()),
            return_code: code.code(),
        }
    }

    /// Returns the symbolic return code.
    pub fn status(&self) -> ReturnCode {
        ReturnCode::from(self.return_code)
    }
}

/// Byte length of a read payload given its transport size and length field.
fn payload_len(transport_size: u8, length: u16) -> Result<usize> {
    let length = length as usize;
    match transport_size {
        // Bit, byte/word/dword and integer lengths are counted in bits.
        0x03..=0x05 => Ok(length.div_ceil(8)),
        // Real and octet string lengths are counted in bytes.
        0x07 | 0x09 => Ok(length),
        other => Err(S7Error::protocol(format!(
            "unsupported transport size 0x{other:02X}"
        ))),
    }
}

impl S7Response {
    /// Parses an ack data response from a complete frame.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Protocol` if:
    /// - the TPKT or COTP prefix is invalid
    /// - the S7 header is not an ack data header
    /// - the declared parameter and data lengths disagree with the frame
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::S7Response;
    ///
    /// let frame = [
    ///     0x03, 0x00, 0x00, 0x16, 0x02, 0xF0, 0x80,
    ///     0x32, 0x03, 0x00, 0x00, 0x00, 0x02, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00,
    ///     0x05, 0x01, 0xFF,
    /// ];
    /// let response = S7Response::from_bytes(&frame).unwrap();
    /// assert_eq!(response.function, 0x05);
    /// assert_eq!(response.data, vec![0xFF]);
    /// ```
    pub fn from_bytes(frame: &[u8]) -> Result<Self> {
        let pdu = strip_frame(frame)?;
        let header = S7Header::from_bytes(pdu)?;
        if header.rosctr != ROSCTR_ACK_DATA {
            return Err(S7Error::protocol(format!(
                "expected ack data (0x03), got message type 0x{:02X}",
                header.rosctr
            )));
        }

        let param_start = header.size();
        let data_start = param_start + header.param_len as usize;
        let end = data_start + header.data_len as usize;
        if end != pdu.len() {
            return Err(S7Error::protocol(format!(
                "header declares {end} bytes but the PDU holds {}",
                pdu.len()
            )));
        }

        let params = &pdu[param_start..data_start];
        let (function, item_count) = match params {
            [] => (0, 0),
            [function, item_count, ..] => (*function, *item_count),
            [_] => return Err(S7Error::protocol("parameter section truncated")),
        };

        Ok(Self {
            header,
            function,
            item_count,
            data: pdu[data_start..end].to_vec(),
        })
    }

    /// Returns whether the header reports no error.
    pub fn is_success(&self) -> bool {
        self.header.error_class == 0x00 && self.header.error_code == 0x00
    }

    /// Validates the header error class and code.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Rejected` if either is non-zero.
    pub fn check_error(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(S7Error::Rejected {
                error_class: self.header.error_class,
                error_code: self.header.error_code,
            })
        }
    }

    /// Validates the PDU reference matches the expected value.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::PduRefMismatch` if it doesn't match.
    pub fn check_pdu_ref(&self, expected: u16) -> Result<()> {
        if self.header.pdu_ref == expected {
            Ok(())
        } else {
            Err(S7Error::pdu_ref_mismatch(expected, self.header.pdu_ref))
        }
    }

    /// Validates the function code and item count echo the request.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Protocol` on any mismatch.
    pub fn check_function(&self, function: u8, item_count: usize) -> Result<()> {
        if self.function != function {
            return Err(S7Error::protocol(format!(
                "expected function 0x{function:02X}, got 0x{:02X}",
                self.function
            )));
        }
        if self.item_count as usize != item_count {
            return Err(S7Error::protocol(format!(
                "expected {item_count} items, got {}",
                self.item_count
            )));
        }
        Ok(())
    }

    /// Splits the data section into one payload per requested tag.
    ///
    /// `items` are the tags of the request, in wire order. Failed items are
    /// reported through [`ItemData::return_code`] with an empty payload.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Protocol` if the data is truncated, a payload
    /// length disagrees with the requested tag's size, or bytes follow the
    /// last item.
    pub fn read_items(&self, items: &[Tag]) -> Result<Vec<ItemData<'_>>> {
        self.check_function(FUNCTION_READ, items.len())?;

        let mut remaining = self.data.as_slice();
        let mut payloads = Vec::with_capacity(items.len());
        let last = items.len().saturating_sub(1);

        for (i, tag) in items.iter().enumerate() {
            let is_last = i == last;
            let Some(&code) = remaining.first() else {
                return Err(S7Error::protocol(format!("missing item for {tag}")));
            };
            let return_code = ReturnCode::from(code);

            if !return_code.is_success() {
                remaining = match remaining.get(DATA_ITEM_HEADER_SIZE..) {
                    Some(rest) => rest,
                    None if is_last => &[],
                    None => return Err(S7Error::protocol(format!("item for {tag} truncated"))),
                };
                payloads.push(ItemData {
                    return_code,
                    data: &[],
                });
                continue;
            }

            if remaining.len() < DATA_ITEM_HEADER_SIZE {
                return Err(S7Error::protocol(format!("item header for {tag} truncated")));
            }
            let length = u16::from_be_bytes([remaining[2], remaining[3]]);
            let len = payload_len(remaining[1], length)?;
            if len != tag.size() {
                return Err(S7Error::protocol(format!(
                    "{tag} expects {} bytes, response carries {len}",
                    tag.size()
                )));
            }

            let rest = &remaining[DATA_ITEM_HEADER_SIZE..];
            let used = len + pad_len(len, is_last);
            if rest.len() < len || (rest.len() < used && !is_last) {
                return Err(S7Error::protocol(format!("payload for {tag} truncated")));
            }
            payloads.push(ItemData {
                return_code,
                data: &rest[..len],
            });
            remaining = rest.get(used..).unwrap_or(&[]);
        }

        if !remaining.is_empty() {
            return Err(S7Error::protocol(format!(
                "{} unexpected bytes after the last item",
                remaining.len()
            )));
        }
        Ok(payloads)
    }

    /// Decodes one value per tag, stopping at the first failed item.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::ReadResponse` naming the first failed tag, or
    /// `S7Error::Protocol` for malformed data.
    pub fn to_values(&self, items: &[Tag]) -> Result<Vec<Value>> {
        self.read_items(items)?
            .into_iter()
            .zip(items)
            .map(|(item, tag)| {
                if item.return_code.is_success() {
                    Value::decode(tag.data_type(), tag.length(), item.data)
                } else {
                    Err(S7Error::ReadResponse {
                        tag: *tag,
                        code: item.return_code,
                    })
                }
            })
            .collect()
    }

    /// Decodes one result per tag, recording failed items instead of stopping.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Protocol` for malformed data; item failures are
    /// reported in the returned records.
    pub fn to_results(&self, items: &[Tag]) -> Result<Vec<ReadResult>> {
        self.read_items(items)?
            .into_iter()
            .zip(items)
            .map(|(item, tag)| {
                if item.return_code.is_success() {
                    Value::decode(tag.data_type(), tag.length(), item.data)
                        .map(|value| ReadResult::ok(*tag, value))
                } else {
                    Ok(ReadResult::failed(*tag, item.return_code))
                }
            })
            .collect()
    }

    /// Returns the status of each written item.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Protocol` if the function, item count or data length
    /// does not match a write of `item_count` items.
    pub fn write_statuses(&self, item_count: usize) -> Result<Vec<ReturnCode>> {
        self.check_function(FUNCTION_WRITE, item_count)?;
        if self.data.len() != item_count * WRITE_STATUS_SIZE {
            return Err(S7Error::protocol(format!(
                "expected {item_count} write statuses, got {} bytes",
                self.data.len()
            )));
        }
        Ok(self.data.iter().map(|&code| ReturnCode::from(code)).collect())
    }

    /// Returns one result per written tag.
    pub fn to_write_results(&self, items: &[Tag]) -> Result<Vec<WriteResult>> {
        Ok(self
            .write_statuses(items.len())?
            .into_iter()
            .zip(items)
            .map(|(code, tag)| WriteResult::new(*tag, code))
            .collect())
    }

    /// Validates every written item succeeded.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::WriteResponse` naming the first failed tag.
    pub fn check_write(&self, items: &[Tag]) -> Result<()> {
        let statuses = self.write_statuses(items.len())?;
        match statuses
            .into_iter()
            .zip(items)
            .find(|(code, _)| !code.is_success())
        {
            Some((code, tag)) => Err(S7Error::WriteResponse { tag: *tag, code }),
            None => Ok(()),
        }
    }
}
