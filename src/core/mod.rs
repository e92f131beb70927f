//! # Connections
//!
//! Connection configuration, the command table, and the two connection
//! flavours built on the wire codec.
//!
//! ## Modules
//!
//! - [`builder`] - Connection configuration
//! - [`command`] - The supported commands
//! - [`connection`] - Lockstep request/reply connection
//! - [`future`] - Single-assignment reply futures
//! - [`pipeline`] - Pipelined connection and its workers
//! - `worker` - The worker state machine the pipeline runs on

pub use crate::proto::error::{Error, Result};

/// Connection configuration.
pub mod builder;
pub mod command;
/// Lockstep connection and socket setup.
pub mod connection;
pub mod future;
pub mod pipeline;
pub(crate) mod worker;
