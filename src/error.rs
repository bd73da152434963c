//! Error types for the S7 tag client.

use std::io;
use thiserror::Error;

use crate::tag::Tag;

/// Result type alias for S7 operations.
pub type Result<T> = std::result::Result<T, S7Error>;

/// Per-item return code reported by the controller in read and write responses.
///
/// # Example
///
/// ```
/// use s7_tags::ReturnCode;
///
/// assert_eq!(ReturnCode::from(0x0A), ReturnCode::ObjectDoesNotExist);
/// assert_eq!(ReturnCode::ObjectDoesNotExist.to_string(), "object does not exist");
/// assert!(ReturnCode::from(0xFF).is_success());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    /// Reserved (0x00).
    Reserved,
    /// Hardware fault in the addressed module (0x01).
    HardwareFault,
    /// Accessing the object is not allowed (0x03).
    NoAccess,
    /// Address out of range (0x05).
    OutOfRange,
    /// Data type not supported (0x06).
    UnsupportedType,
    /// Data type inconsistent with the requested size (0x07).
    InvalidDataSize,
    /// Object does not exist, e.g. a missing data block (0x0A).
    ObjectDoesNotExist,
    /// Success (0xFF).
    Success,
    /// Any code this library does not name.
    Unknown(u8),
}

impl ReturnCode {
    /// Returns the raw protocol byte.
    pub fn code(self) -> u8 {
        match self {
            ReturnCode::Reserved => 0x00,
            ReturnCode::HardwareFault => 0x01,
            ReturnCode::NoAccess => 0x03,
            ReturnCode::OutOfRange => 0x05,
            ReturnCode::UnsupportedType => 0x06,
            ReturnCode::InvalidDataSize => 0x07,
            ReturnCode::ObjectDoesNotExist => 0x0A,
            ReturnCode::Success => 0xFF,
            ReturnCode::Unknown(code) => code,
        }
    }

    /// Returns whether the code reports success.
    pub fn is_success(self) -> bool {
        matches!(self, ReturnCode::Success)
    }
}

impl From<u8> for ReturnCode {
    fn from(code: u8) -> Self {
        match code {
            0x00 => ReturnCode::Reserved,
            0x01 => ReturnCode::HardwareFault,
            0x03 => ReturnCode::NoAccess,
            0x05 => ReturnCode::OutOfRange,
            0x06 => ReturnCode::UnsupportedType,
            0x07 => ReturnCode::InvalidDataSize,
            0x0A => ReturnCode::ObjectDoesNotExist,
            0xFF => ReturnCode::Success,
            other => ReturnCode::Unknown(other),
        }
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnCode::Reserved => write!(f, "reserved"),
            ReturnCode::HardwareFault => write!(f, "hardware fault"),
            ReturnCode::NoAccess => write!(f, "no access"),
            ReturnCode::OutOfRange => write!(f, "address out of range"),
            ReturnCode::UnsupportedType => write!(f, "data type not supported"),
            ReturnCode::InvalidDataSize => write!(f, "invalid data size"),
            ReturnCode::ObjectDoesNotExist => write!(f, "object does not exist"),
            ReturnCode::Success => write!(f, "success"),
            ReturnCode::Unknown(code) => write!(f, "unknown return code 0x{code:02X}"),
        }
    }
}

/// Errors that can occur while planning, encoding, exchanging or decoding S7 requests.
#[derive(Debug, Error)]
pub enum S7Error {
    /// Malformed or invariant-violating tag.
    #[error("Invalid address: {reason}")]
    InvalidAddress {
        /// Description of the addressing error.
        reason: String,
    },

    /// A value cannot be written to the given tag.
    #[error("Invalid value for {tag}: {reason}")]
    InvalidValue {
        /// Tag the value was meant for.
        tag: Tag,
        /// Description of the mismatch.
        reason: String,
    },

    /// A write was given a different number of values than tags.
    #[error("{tags} tags but {values} values given")]
    ValueCountMismatch {
        /// Number of tags.
        tags: usize,
        /// Number of values.
        values: usize,
    },

    /// A single tag does not fit the negotiated PDU on its own.
    #[error(
        "{tag} requires {required} bytes but a PDU of {pdu_size} bytes can address at most {max} bytes per item"
    )]
    ItemTooLarge {
        /// Offending tag.
        tag: Tag,
        /// Bytes the tag needs.
        required: usize,
        /// Largest item size the PDU can carry.
        max: usize,
        /// Negotiated PDU size.
        pdu_size: u16,
    },

    /// Too many items in one request.
    #[error("Too many items in one request: {count} (maximum {max})")]
    TooManyItems {
        /// Item count of the request.
        count: usize,
        /// Protocol maximum.
        max: usize,
    },

    /// An encoded request would not fit the negotiated PDU.
    #[error("Request of {size} bytes exceeds the negotiated PDU of {pdu_size} bytes")]
    RequestTooLarge {
        /// Encoded size.
        size: usize,
        /// Negotiated PDU size.
        pdu_size: u16,
    },

    /// The controller rejected reading an item.
    #[error("Read of {tag} failed: {code} (0x{:02X})", .code.code())]
    ReadResponse {
        /// Item the status belongs to.
        tag: Tag,
        /// Status reported by the controller.
        code: ReturnCode,
    },

    /// The controller rejected writing an item.
    #[error("Write of {tag} failed: {code} (0x{:02X})", .code.code())]
    WriteResponse {
        /// Item the status belongs to.
        tag: Tag,
        /// Status reported by the controller.
        code: ReturnCode,
    },

    /// The controller answered the whole job with a header error.
    #[error("Request rejected: error class 0x{error_class:02X}, error code 0x{error_code:02X}")]
    Rejected {
        /// Error class from the AckData header.
        error_class: u8,
        /// Error code from the AckData header.
        error_code: u8,
    },

    /// Response bytes could not be parsed.
    #[error("Protocol error: {reason}")]
    Protocol {
        /// Description of the malformation.
        reason: String,
    },

    /// PDU reference mismatch between request and response.
    #[error("PDU reference mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    PduRefMismatch {
        /// Reference sent with the request.
        expected: u16,
        /// Reference found in the response.
        received: u16,
    },

    /// Communication timeout.
    #[error("Communication timeout")]
    Timeout,

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl S7Error {
    /// Creates a new `InvalidAddress` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::S7Error;
    ///
    /// let err = S7Error::invalid_address("bit offset must be 0-7");
    /// ```
    pub fn invalid_address(reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidValue` error.
    pub fn invalid_value(tag: Tag, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            tag,
            reason: reason.into(),
        }
    }

    /// Creates a new `Protocol` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::S7Error;
    ///
    /// let err = S7Error::protocol("response too short");
    /// assert_eq!(err.to_string(), "Protocol error: response too short");
    /// ```
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Creates a new `PduRefMismatch` error.
    pub fn pdu_ref_mismatch(expected: u16, received: u16) -> Self {
        Self::PduRefMismatch { expected, received }
    }

    /// Returns the controller status carried by item-level errors.
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            S7Error::ReadResponse { code, .. } | S7Error::WriteResponse { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::MemoryArea;
    use crate::tag::DataType;

    #[test]
    fn test_return_code_roundtrip() {
        for raw in [0x00, 0x01, 0x03, 0x05, 0x06, 0x07, 0x0A, 0xFF, 0x42] {
            assert_eq!(ReturnCode::from(raw).code(), raw);
        }
        assert_eq!(ReturnCode::from(0x42), ReturnCode::Unknown(0x42));
    }

    #[test]
    fn test_read_response_display_names_tag_and_status() {
        let tag = Tag::new(MemoryArea::DataBlock, 3, DataType::Int, 4, 0, 1).unwrap();
        let err = S7Error::ReadResponse {
            tag,
            code: ReturnCode::ObjectDoesNotExist,
        };
        assert_eq!(
            err.to_string(),
            "Read of DB3,I4 failed: object does not exist (0x0A)"
        );
        assert_eq!(err.return_code(), Some(ReturnCode::ObjectDoesNotExist));
    }

    #[test]
    fn test_item_too_large_display() {
        let tag = Tag::new(MemoryArea::DataBlock, 1, DataType::Byte, 0, 0, 500).unwrap();
        let err = S7Error::ItemTooLarge {
            tag,
            required: 500,
            max: 214,
            pdu_size: 240,
        };
        assert_eq!(
            err.to_string(),
            "DB1,B0*500 requires 500 bytes but a PDU of 240 bytes can address at most 214 bytes per item"
        );
    }

    #[test]
    fn test_rejected_display() {
        let err = S7Error::Rejected {
            error_class: 0x85,
            error_code: 0x00,
        };
        assert_eq!(
            err.to_string(),
            "Request rejected: error class 0x85, error code 0x00"
        );
    }

    #[test]
    fn test_pdu_ref_mismatch_display() {
        let err = S7Error::pdu_ref_mismatch(0x0001, 0x0002);
        assert_eq!(
            err.to_string(),
            "PDU reference mismatch: expected 0x0001, received 0x0002"
        );
        assert!(err.return_code().is_none());
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(S7Error::Timeout.to_string(), "Communication timeout");
    }
}
