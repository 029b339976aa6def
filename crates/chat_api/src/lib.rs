//! Transport-level primitives for the NetCourier chat stream.
//!
//! This crate owns the wire contract only: request payload and endpoint
//! construction, the newline-delimited record buffer, and decoding of records
//! into normalized [`StreamEvent`] values. It holds no transcript state and no
//! turn lifecycle policy.
//!
//! Both observed record schemas (`text`/`data` and `payload`) are normalized at
//! the decode boundary so downstream consumers handle a single event shape.

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod headers;
pub mod line_buffer;
pub mod payload;
pub mod url;

pub use client::{await_or_cancel, CancellationSignal, ChatApiClient, StreamResult, TextChunkStream};
pub use config::ChatApiConfig;
pub use decode::decode_record;
pub use error::{ChatApiError, DecodeError};
pub use events::{Citation, EventKind, MessagePayload, Role, StreamEvent};
pub use line_buffer::{split_records, LineBuffer, Utf8ChunkDecoder};
pub use payload::{ChatSubmission, SubmissionContext};
pub use crate::url::build_stream_endpoint;

pub use reqwest::StatusCode;
