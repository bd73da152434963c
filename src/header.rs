//! Frame headers: TPKT, COTP data transfer and the S7 PDU header.
//!
//! Every request and response travels in one frame of this shape:
//!
//! | Layer | Size | Content |
//! |-------|------|---------|
//! | TPKT | 4 bytes | version `0x03`, reserved `0x00`, total length (u16 BE) |
//! | COTP | 3 bytes | `0x02 0xF0 0x80` (data transfer, last unit) |
//! | S7 header | 10 / 12 bytes | see below |
//! | Parameters | variable | function code, item count, item specifications |
//! | Data | variable | item payloads |
//!
//! # S7 Header Structure
//!
//! | Byte | Field | Description |
//! |------|-------|-------------|
//! | 0 | Protocol ID | Always `0x32` |
//! | 1 | ROSCTR | `0x01` job, `0x03` ack data |
//! | 2-3 | Reserved | `0x0000` |
//! | 4-5 | PDU reference | Echoed by the controller |
//! | 6-7 | Parameter length | Bytes of the parameter section |
//! | 8-9 | Data length | Bytes of the data section |
//! | 10 | Error class | Ack data only |
//! | 11 | Error code | Ack data only |
//!
//! # Example
//!
//! ```
//! use s7_tags::S7Header;
//!
//! let header = S7Header::job(0x0001, 14, 0);
//! let mut bytes = Vec::new();
//! header.encode_to(&mut bytes);
//! assert_eq!(bytes, [0x32, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x0E, 0x00, 0x00]);
//! ```

use bytes::BufMut;

use crate::error::{Result, S7Error};

/// TPKT version byte (RFC 1006).
pub const TPKT_VERSION: u8 = 0x03;
/// TPKT header size in bytes.
pub const TPKT_HEADER_SIZE: usize = 4;
/// COTP data transfer header.
pub const COTP_DATA: [u8; 3] = [0x02, 0xF0, 0x80];
/// S7 protocol identifier.
pub const PROTOCOL_ID: u8 = 0x32;
/// ROSCTR of a request.
pub const ROSCTR_JOB: u8 = 0x01;
/// ROSCTR of a response carrying data.
pub const ROSCTR_ACK_DATA: u8 = 0x03;
/// S7 header size of a job.
pub const JOB_HEADER_SIZE: usize = 10;
/// S7 header size of an ack data response.
pub const ACK_DATA_HEADER_SIZE: usize = 12;

/// Fixed bytes of a read/write request before its first item: TPKT, COTP,
/// job header, function code and item count.
pub const REQUEST_OVERHEAD: usize = TPKT_HEADER_SIZE + COTP_DATA.len() + JOB_HEADER_SIZE + 2;
/// Fixed bytes of a read/write response before its first item.
pub const RESPONSE_OVERHEAD: usize =
    TPKT_HEADER_SIZE + COTP_DATA.len() + ACK_DATA_HEADER_SIZE + 2;

/// Prefix of the S7 PDU inside a frame.
const FRAME_PREFIX: usize = TPKT_HEADER_SIZE + 3;

/// S7 PDU header (10 bytes for jobs, 12 bytes for ack data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S7Header {
    /// Message type.
    pub rosctr: u8,
    /// PDU reference used to match responses to requests.
    pub pdu_ref: u16,
    /// Length of the parameter section.
    pub param_len: u16,
    /// Length of the data section.
    pub data_len: u16,
    /// Error class (ack data only, `0x00` = success).
    pub error_class: u8,
    /// Error code (ack data only, `0x00` = success).
    pub error_code: u8,
}

impl S7Header {
    /// Creates a job header.
    pub fn job(pdu_ref: u16, param_len: u16, data_len: u16) -> Self {
        Self {
            rosctr: ROSCTR_JOB,
            pdu_ref,
            param_len,
            data_len,
            error_class: 0,
            error_code: 0,
        }
    }

    /// Creates an ack data header.
    pub fn ack_data(pdu_ref: u16, param_len: u16, data_len: u16) -> Self {
        Self {
            rosctr: ROSCTR_ACK_DATA,
            ..Self::job(pdu_ref, param_len, data_len)
        }
    }

    /// Returns the encoded size of this header.
    pub fn size(&self) -> usize {
        if self.rosctr == ROSCTR_ACK_DATA {
            ACK_DATA_HEADER_SIZE
        } else {
            JOB_HEADER_SIZE
        }
    }

    /// Encodes the header into `dst`.
    pub fn encode_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u8(PROTOCOL_ID);
        dst.put_u8(self.rosctr);
        dst.put_u16(0x0000);
        dst.put_u16(self.pdu_ref);
        dst.put_u16(self.param_len);
        dst.put_u16(self.data_len);
        if self.rosctr == ROSCTR_ACK_DATA {
            dst.put_u8(self.error_class);
            dst.put_u8(self.error_code);
        }
    }

    /// Parses a header from the start of an S7 PDU.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Protocol` if the slice is too short or the protocol ID is wrong.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::S7Header;
    ///
    /// let bytes = [0x32, 0x03, 0x00, 0x00, 0x00, 0x07, 0x00, 0x02, 0x00, 0x05, 0x00, 0x00];
    /// let header = S7Header::from_bytes(&bytes).unwrap();
    /// assert_eq!(header.pdu_ref, 7);
    /// assert_eq!(header.data_len, 5);
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < JOB_HEADER_SIZE {
            return Err(S7Error::protocol(format!(
                "S7 header too short: expected at least {JOB_HEADER_SIZE} bytes, got {}",
                data.len()
            )));
        }
        if data[0] != PROTOCOL_ID {
            return Err(S7Error::protocol(format!(
                "unexpected protocol id 0x{:02X}",
                data[0]
            )));
        }

        let rosctr = data[1];
        let (error_class, error_code) = if rosctr == ROSCTR_ACK_DATA {
            if data.len() < ACK_DATA_HEADER_SIZE {
                return Err(S7Error::protocol(format!(
                    "ack data header too short: expected {ACK_DATA_HEADER_SIZE} bytes, got {}",
                    data.len()
                )));
            }
            (data[10], data[11])
        } else {
            (0, 0)
        };

        Ok(Self {
            rosctr,
            pdu_ref: u16::from_be_bytes([data[4], data[5]]),
            param_len: u16::from_be_bytes([data[6], data[7]]),
            data_len: u16::from_be_bytes([data[8], data[9]]),
            error_class,
            error_code,
        })
    }
}

/// Writes the TPKT and COTP headers for a frame of `total_len` bytes.
pub(crate) fn put_frame_prefix<B: BufMut>(total_len: usize, dst: &mut B) {
    dst.put_u8(TPKT_VERSION);
    dst.put_u8(0x00);
    dst.put_u16(total_len as u16);
    dst.put_slice(&COTP_DATA);
}

/// Validates the TPKT and COTP headers of a frame and returns the S7 PDU.
pub(crate) fn strip_frame(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < FRAME_PREFIX {
        return Err(S7Error::protocol(format!(
            "frame too short: expected at least {FRAME_PREFIX} bytes, got {}",
            frame.len()
        )));
    }
    if frame[0] != TPKT_VERSION {
        return Err(S7Error::protocol(format!(
            "unexpected TPKT version 0x{:02X}",
            frame[0]
        )));
    }
    let length = u16::from_be_bytes([frame[2], frame[3]]) as usize;
    if length != frame.len() {
        return Err(S7Error::protocol(format!(
            "TPKT length {length} does not match frame length {}",
            frame.len()
        )));
    }
    if frame[4..FRAME_PREFIX] != COTP_DATA {
        return Err(S7Error::protocol("frame is not a COTP data transfer"));
    }
    Ok(&frame[FRAME_PREFIX..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overheads() {
        assert_eq!(REQUEST_OVERHEAD, 19);
        assert_eq!(RESPONSE_OVERHEAD, 21);
    }

    #[test]
    fn test_job_header_to_bytes() {
        let mut bytes = Vec::new();
        S7Header::job(0x1234, 26, 0).encode_to(&mut bytes);
        assert_eq!(
            bytes,
            [0x32, 0x01, 0x00, 0x00, 0x12, 0x34, 0x00, 0x1A, 0x00, 0x00]
        );
    }

    #[test]
    fn test_ack_data_header_roundtrip() {
        let header = S7Header {
            error_class: 0x85,
            error_code: 0x01,
            ..S7Header::ack_data(9, 2, 40)
        };
        let mut bytes = Vec::new();
        header.encode_to(&mut bytes);
        assert_eq!(bytes.len(), header.size());
        assert_eq!(S7Header::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn test_header_from_bytes_errors() {
        assert!(S7Header::from_bytes(&[0x32, 0x03]).is_err());
        let wrong_id = [0x33, 0x01, 0, 0, 0, 1, 0, 0, 0, 0];
        assert!(S7Header::from_bytes(&wrong_id).is_err());
        let short_ack = [0x32, 0x03, 0, 0, 0, 1, 0, 0, 0, 0];
        assert!(S7Header::from_bytes(&short_ack).is_err());
    }

    #[test]
    fn test_frame_prefix_and_strip() {
        let mut frame = Vec::new();
        put_frame_prefix(9, &mut frame);
        frame.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(frame, hex::decode("0300000902f080aabb").unwrap());
        assert_eq!(strip_frame(&frame).unwrap(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_strip_frame_rejects_bad_prefix() {
        assert!(strip_frame(&[0x03, 0x00]).is_err());
        // Wrong TPKT version.
        assert!(strip_frame(&[0x02, 0x00, 0x00, 0x07, 0x02, 0xF0, 0x80]).is_err());
        // Length disagrees with the frame.
        assert!(strip_frame(&[0x03, 0x00, 0x00, 0x08, 0x02, 0xF0, 0x80]).is_err());
        // Not a data transfer.
        assert!(strip_frame(&[0x03, 0x00, 0x00, 0x07, 0x02, 0xD0, 0x80]).is_err());
    }
}
