//! # Pipedis
//!
//! Redis client with a lockstep connection and a pipelined connection that
//! returns typed futures.
//!
//! Requests use the inline protocol; replies are decoded according to the
//! shape each command declares in the [`command`] table.
//!
//! - [`SyncConnection`] writes a request and reads its reply before returning.
//! - [`AsyncConnection`] queues requests, writes them in batches and fulfills
//!   one [`FutureHandle`] per request, strictly in submission order.
//!
//! ## Example
//!
//! ```no_run
//! use pipedis::{command, AsyncConnection, ConnectionSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spec = ConnectionSpec::from_url("redis://localhost:6379/0")?;
//!     let conn = AsyncConnection::open(spec).await?;
//!
//!     let pending: Vec<_> = futures::future::try_join_all(
//!         (0..100).map(|_| conn.queue_request(&command::INCR, &["counter"])),
//!     )
//!     .await?;
//!     for handle in pending {
//!         println!("{}", handle.into_int64()?.get().await?);
//!     }
//!
//!     conn.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub(crate) mod core;
pub mod proto;

pub use crate::core::builder::ConnectionSpec;
pub use crate::core::command;
pub use crate::core::connection::SyncConnection;
pub use crate::core::future::{
    pair, DerivedFuture, FutureBool, FutureBytes, FutureBytesArray, FutureFloat64, FutureHandle,
    FutureInfo, FutureInt64, FutureKeyType, FutureKeys, FutureReply, FutureString, FutureUnit,
    KeyType, Promise,
};
pub use crate::core::pipeline::AsyncConnection;
pub use crate::core::{Error, Result};
pub use crate::proto::command::Command;
pub use crate::proto::error::ErrorCategory;
pub use crate::proto::response::Response;
