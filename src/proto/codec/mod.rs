//! Request encoder and reply decoder.
//!
//! Both directions are driven by a [`Command`](crate::proto::command::Command)'s
//! shapes; neither keeps state between requests.
//!
//! # Modules
//!
//! - [`encoder`] - Request encoding to bytes
//! - [`decoder`] - Shape-driven reply decoding from a buffered reader

/// Reply decoding.
pub mod decoder;
/// Request encoding.
pub mod encoder;

pub use decoder::decode;
pub use encoder::{encode, Encoder};
