//! # S7 Tag Client Library
//!
//! A Rust library for reading and writing typed tags on S7 controllers over
//! the ISO-on-TCP (TPKT/COTP) transport.
//!
//! This is a **protocol-only** library. It turns a list of tags into as few
//! PDU-sized read or write requests as possible, encodes and decodes them, and
//! restores results to the caller's order. Connecting, session negotiation,
//! polling and reconnection are left to the caller.
//!
//! ## Features
//!
//! - **Request planning**: nearby tags are merged into shared byte ranges and
//!   split into batches that fit the negotiated PDU
//! - **Order preserving**: results always come back in the order tags were given
//! - **Fail-fast or fail-soft**: `read`/`write` stop at the first failed item,
//!   `read_detailed`/`write_detailed` report every tag's outcome
//! - **Type-safe**: memory areas and data types as enums, values as [`Value`]
//! - **No panics**: all errors returned as `Result<T, S7Error>`
//! - **Pure core**: the planner and codec can be used without a client
//!
//! ## Quick Start
//!
//! ```no_run
//! use s7_tags::{Client, ClientConfig, StreamTransport, Tag, Value};
//! use std::net::TcpStream;
//! use std::time::Duration;
//!
//! fn main() -> s7_tags::Result<()> {
//!     // The session (COTP connect, S7 setup communication) is negotiated elsewhere.
//!     let stream = TcpStream::connect("192.168.0.1:102")?;
//!     let transport = StreamTransport::tcp(stream, Duration::from_secs(2))?;
//!     let client = Client::new(transport, ClientConfig::new(480));
//!
//!     let tags: Vec<Tag> = vec![
//!         "DB1,X0.0".parse()?,
//!         "DB2,I2".parse()?,
//!         "DB1,X0.7".parse()?,
//!         "MW10".parse()?,
//!     ];
//!     let values = client.read(&tags)?;
//!     println!("{:?}", values);
//!
//!     client.write(&tags[..2], &[Value::Bool(true), Value::Int(-42)])?;
//!     Ok(())
//! }
//! ```
//!
//! ## Addresses
//!
//! Tags parse from the usual address notation:
//!
//! | Address | Meaning |
//! |---------|---------|
//! | `DB1,X0.7` | Bit 7 of byte 0 in DB1 |
//! | `DB1,B4` / `DB1,B4*10` | Byte / array of 10 bytes |
//! | `DB1,W2`, `DB1,I2` | Word / signed int |
//! | `DB1,DW8`, `DB1,DI8` | Double word / signed double int |
//! | `DB1,R12`, `DB1,LR16` | Real / long real |
//! | `DB1,S20.10`, `DB1,WS40.8` | String / wide string of 10 and 8 characters |
//! | `I0.1`, `QB2`, `MW10`, `C3`, `T4` | Inputs, outputs, flags, counters, timers |
//!
//! ## Planning Without a Client
//!
//! ```
//! use s7_tags::{plan_read, PlannerConfig, Tag};
//!
//! let tags: Vec<Tag> = vec!["DB1,X2.5".parse()?, "DB1,X1.7".parse()?];
//! let plan = plan_read(&tags, &PlannerConfig::new(240), true)?;
//!
//! // Both bits travel in one two-byte item.
//! assert_eq!(plan.item_count(), 1);
//! assert_eq!(plan.batches()[0].tags()[0].to_string(), "DB1,B1*2");
//! # Ok::<(), s7_tags::S7Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, S7Error>`. Errors name the offending tag
//! in address notation and, for controller failures, the status code:
//!
//! ```no_run
//! use s7_tags::{Client, ClientConfig, S7Error, StreamTransport};
//! use std::net::TcpStream;
//!
//! let stream = TcpStream::connect("192.168.0.1:102").unwrap();
//! let client = Client::new(StreamTransport::new(stream), ClientConfig::new(240));
//!
//! match client.read_one(&"DB99,W0".parse().unwrap()) {
//!     Ok(value) => println!("{:?}", value),
//!     Err(S7Error::ReadResponse { tag, code }) => println!("{tag}: {code}"),
//!     Err(S7Error::Timeout) => println!("Timeout"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! The client emits [`tracing`] events: `debug` per call, `trace` per request
//! and `warn` per failed item in the detailed calls. No subscriber is installed.
//!
//! ## Feature Flags
//!
//! - `serde`: derives `Serialize`/`Deserialize` for tags, values and results.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod address;
mod area;
mod client;
mod command;
mod error;
mod header;
mod planner;
mod response;
mod tag;
mod transport;
pub mod utils;
mod value;

// Public re-exports
pub use area::MemoryArea;
pub use client::{Client, ClientConfig, DEFAULT_PDU_SIZE};
pub use command::{
    max_read_item_size, max_write_item_size, ReadRequest, WriteItem, WriteRequest,
    DATA_ITEM_HEADER_SIZE, FUNCTION_READ, FUNCTION_WRITE, ITEM_SPEC_SIZE, MAX_ITEMS,
};
pub use error::{Result, ReturnCode, S7Error};
pub use header::{S7Header, REQUEST_OVERHEAD, RESPONSE_OVERHEAD};
pub use planner::{
    merge_is_beneficial, plan_read, plan_write, PlannerConfig, ReadBatch, ReadItem, ReadPlan,
    WriteBatch, WritePlan, ITEM_OVERHEAD,
};
pub use response::{ItemData, ReadResult, S7Response, WriteResult};
pub use tag::{DataType, Tag, MAX_START, MAX_STRING_LENGTH};
pub use transport::{StreamTransport, Transport, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use value::Value;
