//! # Wire protocol
//!
//! Inline request / typed reply codec for the Redis protocol.
//!
//! ## Modules
//!
//! - [`command`] - Command descriptors and their request/reply shapes
//! - [`codec`] - Encoder and decoder
//! - [`error`] - Error types shared by the whole crate
//! - [`response`] - Decoded replies

pub mod codec;
pub mod command;
/// Error types.
pub mod error;
pub mod response;
