//! High-level S7 client for reading and writing controller tags.
//!
//! This module provides the [`Client`] struct, which drives a read or write of
//! an arbitrary tag list over a [`Transport`].
//!
//! # Overview
//!
//! The client handles:
//! - Planning: grouping nearby tags and splitting them into PDU-sized batches
//! - Request/response correlation via the PDU reference
//! - Response parsing and error checking
//! - Restoring results to the caller's tag order
//!
//! # Example
//!
//! ```no_run
//! use s7_tags::{Client, ClientConfig, StreamTransport, Tag, Value};
//! use std::net::TcpStream;
//! use std::time::Duration;
//!
//! // Session setup and PDU negotiation happen before the client is built.
//! let stream = TcpStream::connect("192.168.0.1:102")?;
//! let transport = StreamTransport::tcp(stream, Duration::from_secs(2))?;
//! let client = Client::new(transport, ClientConfig::new(480));
//!
//! let tags: Vec<Tag> = vec!["DB1,X0.0".parse()?, "DB2,I2".parse()?, "MW10".parse()?];
//! let values = client.read(&tags)?;
//!
//! client.write_one(&"DB1,R4".parse()?, 25.5f32)?;
//! # Ok::<(), s7_tags::S7Error>(())
//! ```
//!
//! # Failure isolation
//!
//! With grouping enabled, a failing status on a merged item fails every tag it
//! covers. Callers that need per-tag fault isolation should disable grouping
//! with [`ClientConfig::with_optimize`] and accept more round trips.
//!
//! # Thread Safety
//!
//! The `Client` uses an atomic counter for PDU references and holds the
//! transport behind a mutex for the whole of each call, so it can be shared
//! between threads. Batches of one call are sent sequentially and the
//! transport operations block.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

use crate::command::MAX_ITEMS;
use crate::error::{Result, S7Error};
use crate::planner::{in_request_order, plan_read, plan_write, PlannerConfig};
use crate::response::{ReadResult, S7Response, WriteResult};
use crate::tag::Tag;
use crate::transport::Transport;
use crate::value::Value;

/// PDU size assumed when none is configured.
pub const DEFAULT_PDU_SIZE: u16 = 240;

/// Configuration for creating an S7 client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// PDU size negotiated with the controller.
    pub pdu_size: u16,
    /// Maximum items per request (1-20).
    pub max_items: usize,
    /// Whether nearby read tags are merged into shared items.
    pub optimize: bool,
}

impl ClientConfig {
    /// Creates a new client configuration for a negotiated PDU size.
    ///
    /// Allows the protocol maximum of 20 items per request and enables grouping.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::ClientConfig;
    ///
    /// let config = ClientConfig::new(480);
    /// assert_eq!(config.max_items, 20);
    /// assert!(config.optimize);
    /// ```
    pub fn new(pdu_size: u16) -> Self {
        Self {
            pdu_size,
            max_items: MAX_ITEMS,
            optimize: true,
        }
    }

    /// Sets the maximum number of items per request, clamped to 1-20.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::ClientConfig;
    ///
    /// let config = ClientConfig::new(240).with_max_items(50);
    /// assert_eq!(config.max_items, 20);
    /// ```
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.clamp(1, MAX_ITEMS);
        self
    }

    /// Enables or disables grouping of nearby read tags (default enabled).
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// Returns the planner limits for this configuration.
    pub fn planner(&self) -> PlannerConfig {
        PlannerConfig::new(self.pdu_size).with_max_items(self.max_items)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PDU_SIZE)
    }
}

/// S7 client for reading and writing tags.
///
/// Each call plans its tags up front, then exchanges one request and one
/// response per batch. No automatic retries, caching, or reconnection.
///
/// # Example
///
/// ```no_run
/// use s7_tags::{Client, ClientConfig, StreamTransport, Tag};
/// use std::net::TcpStream;
///
/// let stream = TcpStream::connect("192.168.0.1:102").unwrap();
/// let client = Client::new(StreamTransport::new(stream), ClientConfig::new(240));
///
/// let tags: Vec<Tag> = vec!["DB1,X0.7".parse().unwrap(), "MW10".parse().unwrap()];
/// for result in client.read_detailed(&tags).unwrap() {
///     match result.value {
///         Some(value) => println!("{}: {:?}", result.tag, value),
///         None => println!("{}: {}", result.tag, result.error.unwrap_or_default()),
///     }
/// }
/// ```
pub struct Client<T> {
    transport: Mutex<T>,
    config: ClientConfig,
    pdu_ref_counter: AtomicU16,
}

impl<T: Transport> Client<T> {
    /// Creates a new client over an established session.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport: Mutex::new(transport),
            config,
            pdu_ref_counter: AtomicU16::new(1),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Consumes the client, returning the transport.
    pub fn into_inner(self) -> T {
        self.transport
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Generates the next PDU reference.
    fn next_pdu_ref(&self) -> u16 {
        self.pdu_ref_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends one request frame and validates the response correlates with it.
    fn exchange(transport: &mut T, request: &[u8], pdu_ref: u16) -> Result<S7Response> {
        trace!(pdu_ref, len = request.len(), "sending request");
        let bytes = transport.send_receive(request)?;
        let response = S7Response::from_bytes(&bytes)?;
        response.check_pdu_ref(pdu_ref)?;
        Ok(response)
    }

    /// Reads `tags`, returning one value per tag in the same order.
    ///
    /// Arrays come back as [`Value::List`], single elements as scalars.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a tag cannot fit the PDU on its own (`ItemTooLarge`, before anything is sent)
    /// - the controller reports a failed item (`ReadResponse`, naming the item)
    /// - the controller rejects a request (`Rejected`)
    /// - a response is malformed or uncorrelated (`Protocol`, `PduRefMismatch`)
    /// - communication fails (`Io`, `Timeout`)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7_tags::{Client, ClientConfig, StreamTransport, Tag, Value};
    /// use std::net::TcpStream;
    ///
    /// let stream = TcpStream::connect("192.168.0.1:102").unwrap();
    /// let client = Client::new(StreamTransport::new(stream), ClientConfig::new(240));
    ///
    /// let tags: Vec<Tag> = vec!["DB1,X0.0".parse().unwrap(), "DB1,X0.7".parse().unwrap()];
    /// let values = client.read(&tags).unwrap();
    /// assert_eq!(values.len(), 2);
    /// ```
    pub fn read(&self, tags: &[Tag]) -> Result<Vec<Value>> {
        let plan = plan_read(tags, &self.config.planner(), self.config.optimize)?;
        debug!(
            tags = tags.len(),
            items = plan.item_count(),
            batches = plan.batches().len(),
            optimize = self.config.optimize,
            "reading tags"
        );

        let mut transport = self.lock();
        let mut values = Vec::with_capacity(tags.len());
        for batch in plan.batches() {
            let pdu_ref = self.next_pdu_ref();
            let request = batch.to_request(pdu_ref, self.config.pdu_size)?;
            let response = Self::exchange(&mut transport, &request.to_bytes(), pdu_ref)?;
            values.extend(batch.decode(&response)?);
        }
        Ok(in_request_order(values))
    }

    /// Reads `tags`, reporting each tag's outcome instead of failing fast.
    ///
    /// A failed item does not stop sibling items or later batches; with
    /// grouping enabled it fails every tag merged into it.
    ///
    /// # Errors
    ///
    /// Item failures are reported in the returned records. The call itself
    /// fails on planning errors, rejected requests, malformed responses and
    /// communication failures.
    pub fn read_detailed(&self, tags: &[Tag]) -> Result<Vec<ReadResult>> {
        let plan = plan_read(tags, &self.config.planner(), self.config.optimize)?;
        debug!(
            tags = tags.len(),
            items = plan.item_count(),
            batches = plan.batches().len(),
            optimize = self.config.optimize,
            "reading tags (detailed)"
        );

        let mut transport = self.lock();
        let mut results = Vec::with_capacity(tags.len());
        for batch in plan.batches() {
            let pdu_ref = self.next_pdu_ref();
            let request = batch.to_request(pdu_ref, self.config.pdu_size)?;
            let response = Self::exchange(&mut transport, &request.to_bytes(), pdu_ref)?;
            for (index, result) in batch.decode_detailed(&response)? {
                if !result.success {
                    warn!(
                        tag = %result.tag,
                        code = result.return_code,
                        status = %result.status(),
                        "read failed"
                    );
                }
                results.push((index, result));
            }
        }
        Ok(in_request_order(results))
    }

    /// Writes `values` to `tags`, one item per tag.
    ///
    /// Every value is validated against its tag before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the counts differ (`ValueCountMismatch`)
    /// - a value does not match its tag (`InvalidValue`)
    /// - a tag cannot fit the PDU on its own (`ItemTooLarge`)
    /// - the controller reports a failed item (`WriteResponse`, naming the first)
    /// - the request is rejected, malformed or communication fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7_tags::{Client, ClientConfig, StreamTransport, Tag, Value};
    /// use std::net::TcpStream;
    ///
    /// let stream = TcpStream::connect("192.168.0.1:102").unwrap();
    /// let client = Client::new(StreamTransport::new(stream), ClientConfig::new(240));
    ///
    /// let tags: Vec<Tag> = vec!["DB1,W0".parse().unwrap(), "DB1,X2.1".parse().unwrap()];
    /// client.write(&tags, &[Value::Word(7), Value::Bool(true)]).unwrap();
    /// ```
    pub fn write(&self, tags: &[Tag], values: &[Value]) -> Result<()> {
        let plan = plan_write(tags, values, &self.config.planner())?;
        debug!(
            tags = tags.len(),
            batches = plan.batches().len(),
            "writing tags"
        );

        let mut transport = self.lock();
        for batch in plan.batches() {
            let pdu_ref = self.next_pdu_ref();
            let request = batch.to_request(pdu_ref, self.config.pdu_size)?;
            let response = Self::exchange(&mut transport, &request.to_bytes(), pdu_ref)?;
            batch.check(&response)?;
        }
        Ok(())
    }

    /// Writes `values` to `tags`, reporting each tag's outcome.
    ///
    /// # Errors
    ///
    /// Item failures are reported in the returned records. The call itself
    /// fails on validation errors, rejected requests, malformed responses and
    /// communication failures.
    pub fn write_detailed(&self, tags: &[Tag], values: &[Value]) -> Result<Vec<WriteResult>> {
        let plan = plan_write(tags, values, &self.config.planner())?;
        debug!(
            tags = tags.len(),
            batches = plan.batches().len(),
            "writing tags (detailed)"
        );

        let mut transport = self.lock();
        let mut results = Vec::with_capacity(tags.len());
        for batch in plan.batches() {
            let pdu_ref = self.next_pdu_ref();
            let request = batch.to_request(pdu_ref, self.config.pdu_size)?;
            let response = Self::exchange(&mut transport, &request.to_bytes(), pdu_ref)?;
            for result in batch.decode(&response)? {
                if !result.success {
                    warn!(
                        tag = %result.tag,
                        code = result.return_code,
                        status = %result.status(),
                        "write failed"
                    );
                }
                results.push(result);
            }
        }
        Ok(results)
    }

    /// Reads a single tag.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7_tags::{Client, ClientConfig, StreamTransport};
    /// use std::net::TcpStream;
    ///
    /// let stream = TcpStream::connect("192.168.0.1:102").unwrap();
    /// let client = Client::new(StreamTransport::new(stream), ClientConfig::new(240));
    ///
    /// let speed = client.read_one(&"DB10,R4".parse().unwrap()).unwrap();
    /// println!("speed = {:?}", speed.as_f64());
    /// ```
    pub fn read_one(&self, tag: &Tag) -> Result<Value> {
        self.read(std::slice::from_ref(tag))?
            .pop()
            .ok_or_else(|| S7Error::protocol(format!("no value returned for {tag}")))
    }

    /// Writes a single tag.
    pub fn write_one(&self, tag: &Tag, value: impl Into<Value>) -> Result<()> {
        self.write(std::slice::from_ref(tag), &[value.into()])
    }
}

impl<T> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &std::any::type_name::<T>())
            .field("config", &self.config)
            .field("pdu_ref", &self.pdu_ref_counter.load(Ordering::Relaxed))
            .finish()
    }
}
