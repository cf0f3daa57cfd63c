//! peerlink-wire — self-describing configuration field dispatch.
//!
//! A configuration stream is an ordered sequence of `(field name, encoded
//! value)` pairs. A [`FieldTable`] maps each recognized name to a
//! decode-and-apply handler for some target type; unrecognized names are
//! skipped so older readers tolerate streams written by newer peers.
//!
//! Encoded values are [`serde_json::Value`]s; the [`decode`] helper turns
//! one into any `Deserialize` type and reports failures as a structured
//! [`ParseError`] naming the offending field.

pub mod error;
pub mod table;

pub use error::{ParseError, WireResult};
pub use table::{FieldTable, decode};
