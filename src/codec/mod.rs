//! Codec module - typed payloads over string ports.
//!
//! - [`JsonCodec`] - JSON using `serde_json`
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! so a typed handler picks its codec at compile time.

mod json;

pub use json::JsonCodec;
