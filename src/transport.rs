//! Transport layer: one request out, one framed response back.
//!
//! The [`Transport`] trait is everything the client needs from a session: it
//! sends a complete request frame and returns exactly one complete response
//! frame. Connecting, the COTP/S7 handshake, PDU size negotiation, retries and
//! reconnection stay with whoever builds the transport.
//!
//! [`StreamTransport`] implements the trait over any blocking byte stream
//! (typically a connected `TcpStream`) by reading one TPKT frame per request.
//!
//! # Constants
//!
//! - [`DEFAULT_PORT`] - ISO-on-TCP port (102)
//! - [`DEFAULT_TIMEOUT`] - Default timeout (2 seconds)
//!
//! # Example
//!
//! ```no_run
//! use s7_tags::{StreamTransport, Transport};
//! use std::net::TcpStream;
//! use std::time::Duration;
//!
//! // The connection is expected to be set up and negotiated already.
//! let stream = TcpStream::connect("192.168.0.1:102").unwrap();
//! let mut transport = StreamTransport::tcp(stream, Duration::from_secs(2)).unwrap();
//!
//! let request = vec![0x03, 0x00, /* ... rest of the frame */];
//! let response = transport.send_receive(&request);
//! ```

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{Result, S7Error};
use crate::header::{TPKT_HEADER_SIZE, TPKT_VERSION};

/// ISO-on-TCP port.
pub const DEFAULT_PORT: u16 = 102;

/// Default timeout for stream operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Exchanges one request frame for one response frame.
pub trait Transport {
    /// Sends `request` and returns the complete response frame.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Timeout` when the peer does not answer in time and
    /// `S7Error::Io` for other communication failures.
    fn send_receive(&mut self, request: &[u8]) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_receive(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        (**self).send_receive(request)
    }
}

fn io_error(e: std::io::Error) -> S7Error {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => S7Error::Timeout,
        _ => S7Error::Io(e),
    }
}

/// TPKT framing over a blocking byte stream.
pub struct StreamTransport<S> {
    stream: S,
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Returns a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Consumes the transport, returning the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl StreamTransport<TcpStream> {
    /// Wraps a connected TCP stream and sets its read and write timeouts.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the timeouts cannot be set.
    pub fn tcp(stream: TcpStream, timeout: Duration) -> Result<Self> {
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn send_receive(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.stream.write_all(request).map_err(io_error)?;
        self.stream.flush().map_err(io_error)?;

        let mut frame = vec![0u8; TPKT_HEADER_SIZE];
        self.stream.read_exact(&mut frame).map_err(io_error)?;
        if frame[0] != TPKT_VERSION {
            return Err(S7Error::protocol(format!(
                "unexpected TPKT version 0x{:02X}",
                frame[0]
            )));
        }
        let length = u16::from_be_bytes([frame[2], frame[3]]) as usize;
        if length < TPKT_HEADER_SIZE {
            return Err(S7Error::protocol(format!("TPKT length {length} too small")));
        }

        frame.resize(length, 0);
        self.stream
            .read_exact(&mut frame[TPKT_HEADER_SIZE..])
            .map_err(io_error)?;
        Ok(frame)
    }
}

impl<S> std::fmt::Debug for StreamTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("stream", &std::any::type_name::<S>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Stream that replays canned bytes and records what was written.
    struct Scripted {
        input: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Scripted {
        fn new(input: &[u8]) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                written: Vec::new(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct Stalled;

    impl Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::WouldBlock, "no data"))
        }
    }

    impl Write for Stalled {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_PORT, 102);
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(2));
    }

    #[test]
    fn test_reads_exactly_one_frame() {
        let first = [0x03, 0x00, 0x00, 0x09, 0x02, 0xF0, 0x80, 0xAA, 0xBB];
        let mut input = first.to_vec();
        input.extend_from_slice(&[0x03, 0x00, 0x00, 0x07, 0x02, 0xF0, 0x80]);

        let mut transport = StreamTransport::new(Scripted::new(&input));
        let response = transport.send_receive(&[0x01, 0x02]).unwrap();
        assert_eq!(response, first);
        assert_eq!(transport.get_ref().written, vec![0x01, 0x02]);

        let second = transport.send_receive(&[0x03]).unwrap();
        assert_eq!(second.len(), 7);
    }

    #[test]
    fn test_bad_tpkt_header() {
        let mut transport = StreamTransport::new(Scripted::new(&[0x02, 0x00, 0x00, 0x07]));
        assert!(matches!(
            transport.send_receive(&[0x00]),
            Err(S7Error::Protocol { .. })
        ));

        let mut transport = StreamTransport::new(Scripted::new(&[0x03, 0x00, 0x00, 0x02]));
        assert!(transport.send_receive(&[0x00]).is_err());
    }

    #[test]
    fn test_truncated_frame_is_io_error() {
        let mut transport =
            StreamTransport::new(Scripted::new(&[0x03, 0x00, 0x00, 0x09, 0x02, 0xF0]));
        assert!(matches!(
            transport.send_receive(&[0x00]),
            Err(S7Error::Io(_))
        ));
    }

    #[test]
    fn test_would_block_maps_to_timeout() {
        let mut transport = StreamTransport::new(Stalled);
        assert!(matches!(
            transport.send_receive(&[0x00]),
            Err(S7Error::Timeout)
        ));
    }

    #[test]
    fn test_transport_debug() {
        let transport = StreamTransport::new(Stalled);
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("StreamTransport"));
        assert!(debug_str.contains("Stalled"));
    }

    #[test]
    fn test_boxed_transport() {
        let input = [0x03, 0x00, 0x00, 0x07, 0x02, 0xF0, 0x80];
        let mut boxed: Box<dyn Transport> = Box::new(StreamTransport::new(Scripted::new(&input)));
        assert_eq!(boxed.send_receive(&[0x00]).unwrap(), input);
    }
}
