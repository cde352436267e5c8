//! Zero-copy decoding of account records and HTTP request heads.
//!
//! Decoded strings are written into a bounded [`ByteArena`] owned by the
//! [`Account`] or [`Request`] being filled, and every textual field is a
//! [`StringRef`] into that arena. Both decoders can be called again with a
//! longer buffer after reporting [`Progress::Incomplete`].

#![no_std]
#![allow(missing_docs)]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod arena;
mod calendar;
mod error;
mod escape;
mod options;

mod account;
mod ingest;
mod request;

#[cfg(test)]
mod tests;

/// Seconds since the Unix epoch.
pub type Timestamp = i32;

/// Sentinel for a timestamp that was not present.
///
/// A record that spells out `2147483647` decodes to this value and is
/// indistinguishable from one that omits the field.
pub const INVALID_TIMESTAMP: Timestamp = i32::MAX;

pub use account::{Account, INVALID_ID, Like, Premium, RecordDecoder, Sex, Status};
pub use arena::{ByteArena, DEFAULT_ARENA_CAPACITY, StringRef};
pub use calendar::Calendar;
pub use error::{ArenaError, Progress, RecordError, RequestError};
pub use escape::{
    ESCAPE_TABLE, JsonString, UNHEX_TABLE, UrlDecode, decode_json_string, decode_url_value,
    encode_utf8, hex_to_int,
};
pub use ingest::{AccountStream, StreamItem};
pub use options::DecoderOptions;
pub use request::{
    BasicFlags, BasicParams, FilterFlags, FilterParams, GroupKey, GroupKeys, Method, Order,
    Params, Request, RequestDecoder, RequestKind,
};
