//! Single-assignment result holders.
//!
//! A [`Promise`] / [`FutureReply`] pair is a one-slot channel: the producer
//! fulfills the promise exactly once (consuming it), the consumer takes the
//! value exactly once. Reading is single-consumption by contract:
//! [`FutureReply::get`] consumes the handle, and once [`FutureReply::try_get`]
//! has returned a value any further read fails with [`Error::FutureConsumed`]
//! instead of waiting forever.
//!
//! If the producer is dropped without fulfilling (a request abandoned at
//! connection shutdown), reads fail with [`Error::Shutdown`].

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::proto::command::ResponseShape;
use crate::proto::error::{Error, Result};
use crate::proto::response::Response;

/// Creates a connected promise/future pair.
pub fn pair<T>() -> (Promise<T>, FutureReply<T>) {
    let (tx, rx) = oneshot::channel();
    (Promise { tx }, FutureReply { rx: Some(rx) })
}

/// Producer side of a single-assignment slot.
#[derive(Debug)]
pub struct Promise<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> Promise<T> {
    /// Fulfills the slot with a value.
    pub fn set(self, value: T) {
        // the consumer may have gone away; nothing to deliver to then
        let _ = self.tx.send(Ok(value));
    }

    /// Fulfills the slot with an error.
    pub fn on_error(self, err: Error) {
        let _ = self.tx.send(Err(err));
    }
}

/// Consumer side of a single-assignment slot.
#[derive(Debug)]
pub struct FutureReply<T> {
    rx: Option<oneshot::Receiver<Result<T>>>,
}

impl<T> FutureReply<T> {
    /// Waits until the slot is fulfilled and returns its result.
    ///
    /// # Errors
    ///
    /// The error the producer delivered, [`Error::Shutdown`] if the producer
    /// was dropped, or [`Error::FutureConsumed`] if a previous `try_get`
    /// already returned the value.
    pub async fn get(mut self) -> Result<T> {
        let rx = self.rx.take().ok_or(Error::FutureConsumed)?;
        rx.await.map_err(|_| Error::Shutdown)?
    }

    /// Waits up to `timeout` for the slot to be fulfilled.
    ///
    /// Returns `Ok(None)` if the deadline passed first. A timeout does not
    /// cancel anything: the eventual value stays in the slot and a later
    /// `get` or `try_get` observes it.
    pub async fn try_get(&mut self, timeout: Duration) -> Result<Option<T>> {
        let rx = self.rx.as_mut().ok_or(Error::FutureConsumed)?;
        let outcome = tokio::time::timeout(timeout, rx).await;
        match outcome {
            Err(_) => Ok(None),
            Ok(received) => {
                self.rx = None;
                received.map_err(|_| Error::Shutdown)?.map(Some)
            }
        }
    }

    /// Returns true once the value has been taken.
    pub fn is_consumed(&self) -> bool {
        self.rx.is_none()
    }
}

/// Future of a boolean reply.
pub type FutureBool = FutureReply<bool>;
/// Future of a number reply.
pub type FutureInt64 = FutureReply<i64>;
/// Future of a string or status reply.
pub type FutureString = FutureReply<String>;
/// Future of a bulk reply; `None` when the server returned the null bulk.
pub type FutureBytes = FutureReply<Option<Bytes>>;
/// Future of a multi-bulk reply.
pub type FutureBytesArray = FutureReply<Option<Vec<Option<Bytes>>>>;
/// Future of a command that produces no reply.
pub type FutureUnit = FutureReply<()>;

/// A future that parses its source value only when it is read.
///
/// Parse failures surface from `get` / `try_get`, never earlier.
pub struct DerivedFuture<S, T> {
    inner: FutureReply<S>,
    parse: fn(S) -> Result<T>,
}

impl<S, T> DerivedFuture<S, T> {
    /// Wraps `inner`, applying `parse` at read time.
    pub fn new(inner: FutureReply<S>, parse: fn(S) -> Result<T>) -> Self {
        Self { inner, parse }
    }

    /// Waits for the source value and parses it.
    pub async fn get(self) -> Result<T> {
        let source = self.inner.get().await?;
        (self.parse)(source)
    }

    /// Waits up to `timeout` for the source value and parses it.
    pub async fn try_get(&mut self, timeout: Duration) -> Result<Option<T>> {
        match self.inner.try_get(timeout).await? {
            Some(source) => (self.parse)(source).map(Some),
            None => Ok(None),
        }
    }
}

impl<S, T> std::fmt::Debug for DerivedFuture<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedFuture")
            .field("consumed", &self.inner.is_consumed())
            .finish()
    }
}

/// Float parsed from a bulk reply (e.g. ZSCORE). `None` if absent.
pub type FutureFloat64 = DerivedFuture<Option<Bytes>, Option<f64>>;
/// Key names split out of a bulk reply (KEYS).
pub type FutureKeys = DerivedFuture<Option<Bytes>, Vec<String>>;
/// `field:value` mapping parsed from an INFO bulk reply.
pub type FutureInfo = DerivedFuture<Option<Bytes>, HashMap<String, String>>;
/// Key type parsed from a TYPE reply.
pub type FutureKeyType = DerivedFuture<String, KeyType>;

impl FutureFloat64 {
    /// Derives a float future from a bulk future.
    pub fn float64(inner: FutureBytes) -> Self {
        Self::new(inner, parse_float64)
    }
}

impl FutureKeys {
    /// Derives a key-list future from a bulk future.
    pub fn keys(inner: FutureBytes) -> Self {
        Self::new(inner, parse_keys)
    }
}

impl FutureInfo {
    /// Derives an info-map future from a bulk future.
    pub fn info(inner: FutureBytes) -> Self {
        Self::new(inner, parse_info)
    }
}

impl FutureKeyType {
    /// Derives a key-type future from a string future.
    pub fn key_type(inner: FutureString) -> Self {
        Self::new(inner, KeyType::parse)
    }
}

/// The type of value stored at a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Key does not exist.
    None,
    /// String value.
    String,
    /// List value.
    List,
    /// Set value.
    Set,
    /// Sorted set value.
    ZSet,
    /// Hash value.
    Hash,
}

impl KeyType {
    fn parse(name: String) -> Result<Self> {
        match name.as_str() {
            "none" => Ok(KeyType::None),
            "string" => Ok(KeyType::String),
            "list" => Ok(KeyType::List),
            "set" => Ok(KeyType::Set),
            "zset" => Ok(KeyType::ZSet),
            "hash" => Ok(KeyType::Hash),
            other => Err(Error::protocol(format!("unknown key type {:?}", other))),
        }
    }
}

fn parse_float64(data: Option<Bytes>) -> Result<Option<f64>> {
    let Some(data) = data else {
        return Ok(None);
    };
    std::str::from_utf8(&data)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(Some)
        .ok_or_else(|| {
            Error::protocol(format!(
                "expected float, got {:?}",
                String::from_utf8_lossy(&data)
            ))
        })
}

fn parse_keys(data: Option<Bytes>) -> Result<Vec<String>> {
    let Some(data) = data else {
        return Ok(Vec::new());
    };
    Ok(String::from_utf8_lossy(&data)
        .split_whitespace()
        .map(str::to_string)
        .collect())
}

fn parse_info(data: Option<Bytes>) -> Result<HashMap<String, String>> {
    let Some(data) = data else {
        return Ok(HashMap::new());
    };
    let text = String::from_utf8_lossy(&data);
    let mut info = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once(':') {
            Some((field, value)) => {
                info.insert(field.to_string(), value.to_string());
            }
            None => {
                return Err(Error::protocol(format!("malformed info line {:?}", line)));
            }
        }
    }
    Ok(info)
}

/// A typed future for any command, picked by the command's reply shape.
#[derive(Debug)]
pub enum FutureHandle {
    /// [`ResponseShape::Boolean`]
    Bool(FutureBool),
    /// [`ResponseShape::Number`]
    Number(FutureInt64),
    /// [`ResponseShape::String`]
    String(FutureString),
    /// [`ResponseShape::Status`]
    Status(FutureString),
    /// [`ResponseShape::Bulk`]
    Bulk(FutureBytes),
    /// [`ResponseShape::MultiBulk`]
    MultiBulk(FutureBytesArray),
    /// [`ResponseShape::Virtual`]
    Virtual(FutureUnit),
}

impl FutureHandle {
    /// The reply shape this handle was built for.
    pub fn shape(&self) -> ResponseShape {
        match self {
            FutureHandle::Bool(_) => ResponseShape::Boolean,
            FutureHandle::Number(_) => ResponseShape::Number,
            FutureHandle::String(_) => ResponseShape::String,
            FutureHandle::Status(_) => ResponseShape::Status,
            FutureHandle::Bulk(_) => ResponseShape::Bulk,
            FutureHandle::MultiBulk(_) => ResponseShape::MultiBulk,
            FutureHandle::Virtual(_) => ResponseShape::Virtual,
        }
    }

    /// Unwraps a boolean future.
    pub fn into_bool(self) -> Result<FutureBool> {
        match self {
            FutureHandle::Bool(f) => Ok(f),
            other => Err(other.mismatch("boolean")),
        }
    }

    /// Unwraps a number future.
    pub fn into_int64(self) -> Result<FutureInt64> {
        match self {
            FutureHandle::Number(f) => Ok(f),
            other => Err(other.mismatch("number")),
        }
    }

    /// Unwraps a string or status future.
    pub fn into_string(self) -> Result<FutureString> {
        match self {
            FutureHandle::String(f) | FutureHandle::Status(f) => Ok(f),
            other => Err(other.mismatch("string")),
        }
    }

    /// Unwraps a bulk future.
    pub fn into_bytes(self) -> Result<FutureBytes> {
        match self {
            FutureHandle::Bulk(f) => Ok(f),
            other => Err(other.mismatch("bulk")),
        }
    }

    /// Unwraps a multi-bulk future.
    pub fn into_bytes_array(self) -> Result<FutureBytesArray> {
        match self {
            FutureHandle::MultiBulk(f) => Ok(f),
            other => Err(other.mismatch("multi-bulk")),
        }
    }

    /// Unwraps a virtual future.
    pub fn into_unit(self) -> Result<FutureUnit> {
        match self {
            FutureHandle::Virtual(f) => Ok(f),
            other => Err(other.mismatch("virtual")),
        }
    }

    fn mismatch(&self, wanted: &str) -> Error {
        Error::invalid_argument(format!(
            "expected {} future, handle is {:?}",
            wanted,
            self.shape()
        ))
    }
}

/// The producer side matching a [`FutureHandle`].
#[derive(Debug)]
pub(crate) enum PromiseSlot {
    Bool(Promise<bool>),
    Number(Promise<i64>),
    String(Promise<String>),
    Bulk(Promise<Option<Bytes>>),
    MultiBulk(Promise<Option<Vec<Option<Bytes>>>>),
    Virtual(Promise<()>),
}

impl PromiseSlot {
    /// Builds the promise/future pair for a reply shape.
    pub(crate) fn for_shape(shape: ResponseShape) -> (PromiseSlot, FutureHandle) {
        match shape {
            ResponseShape::Boolean => {
                let (p, f) = pair();
                (PromiseSlot::Bool(p), FutureHandle::Bool(f))
            }
            ResponseShape::Number => {
                let (p, f) = pair();
                (PromiseSlot::Number(p), FutureHandle::Number(f))
            }
            ResponseShape::String => {
                let (p, f) = pair();
                (PromiseSlot::String(p), FutureHandle::String(f))
            }
            ResponseShape::Status => {
                let (p, f) = pair();
                (PromiseSlot::String(p), FutureHandle::Status(f))
            }
            ResponseShape::Bulk => {
                let (p, f) = pair();
                (PromiseSlot::Bulk(p), FutureHandle::Bulk(f))
            }
            ResponseShape::MultiBulk => {
                let (p, f) = pair();
                (PromiseSlot::MultiBulk(p), FutureHandle::MultiBulk(f))
            }
            ResponseShape::Virtual => {
                let (p, f) = pair();
                (PromiseSlot::Virtual(p), FutureHandle::Virtual(f))
            }
        }
    }

    /// Delivers a decoded reply; server errors become [`Error::Server`].
    pub(crate) fn fulfill(self, response: Response) {
        match (self, response) {
            (slot, Response::Error(message)) => slot.on_error(Error::Server { message }),
            (PromiseSlot::Bool(p), Response::Bool(b)) => p.set(b),
            (PromiseSlot::Number(p), Response::Number(n)) => p.set(n),
            (PromiseSlot::String(p), Response::String(s) | Response::Status(s)) => p.set(s),
            (PromiseSlot::Bulk(p), Response::Bulk(b)) => p.set(b),
            (PromiseSlot::MultiBulk(p), Response::MultiBulk(items)) => p.set(items),
            (PromiseSlot::Virtual(p), Response::Virtual) => p.set(()),
            (slot, response) => slot.on_error(Error::protocol(format!(
                "reply {:?} does not match the pending request",
                response
            ))),
        }
    }

    pub(crate) fn on_error(self, err: Error) {
        match self {
            PromiseSlot::Bool(p) => p.on_error(err),
            PromiseSlot::Number(p) => p.on_error(err),
            PromiseSlot::String(p) => p.on_error(err),
            PromiseSlot::Bulk(p) => p.on_error(err),
            PromiseSlot::MultiBulk(p) => p.on_error(err),
            PromiseSlot::Virtual(p) => p.on_error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_returns_value() {
        let (promise, future) = pair::<i64>();
        promise.set(7);
        assert_eq!(future.get().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_get_returns_error() {
        let (promise, future) = pair::<i64>();
        promise.on_error(Error::Server {
            message: "ERR nope".into(),
        });
        let err = future.get().await.unwrap_err();
        assert!(err.is_redis_error());
    }

    #[tokio::test]
    async fn test_try_get_timeout_does_not_lose_value() {
        let (promise, mut future) = pair::<String>();
        assert_eq!(
            future.try_get(Duration::from_millis(10)).await.unwrap(),
            None
        );
        assert!(!future.is_consumed());

        promise.set("late".to_string());
        assert_eq!(future.get().await.unwrap(), "late");
    }

    #[tokio::test]
    async fn test_try_get_after_timeout_then_value() {
        let (promise, mut future) = pair::<bool>();
        assert_eq!(future.try_get(Duration::from_millis(10)).await.unwrap(), None);
        tokio::spawn(async move { promise.set(true) });
        assert_eq!(
            future.try_get(Duration::from_secs(5)).await.unwrap(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_second_read_fails_loudly() {
        let (promise, mut future) = pair::<i64>();
        promise.set(1);
        assert_eq!(future.try_get(Duration::from_secs(1)).await.unwrap(), Some(1));
        assert!(future.is_consumed());

        let err = future.try_get(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, Error::FutureConsumed));
        let err = future.get().await.unwrap_err();
        assert!(matches!(err, Error::FutureConsumed));
    }

    #[tokio::test]
    async fn test_dropped_promise_reports_shutdown() {
        let (promise, future) = pair::<i64>();
        drop(promise);
        assert!(matches!(future.get().await, Err(Error::Shutdown)));
    }

    #[tokio::test]
    async fn test_float64_parses_lazily() {
        let (promise, future) = pair::<Option<Bytes>>();
        let derived = FutureFloat64::float64(future);
        promise.set(Some(Bytes::from("3.25")));
        assert_eq!(derived.get().await.unwrap(), Some(3.25));

        let (promise, future) = pair::<Option<Bytes>>();
        let derived = FutureFloat64::float64(future);
        promise.set(None);
        assert_eq!(derived.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_float64_parse_failure_surfaces_on_get() {
        let (promise, future) = pair::<Option<Bytes>>();
        let mut derived = FutureFloat64::float64(future);
        promise.set(Some(Bytes::from("not-a-float")));
        let err = derived.try_get(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_keys() {
        let (promise, future) = pair::<Option<Bytes>>();
        let derived = FutureKeys::keys(future);
        promise.set(Some(Bytes::from("foo bar  baz")));
        assert_eq!(derived.get().await.unwrap(), vec!["foo", "bar", "baz"]);
    }

    #[tokio::test]
    async fn test_info() {
        let (promise, future) = pair::<Option<Bytes>>();
        let derived = FutureInfo::info(future);
        promise.set(Some(Bytes::from(
            "# Server\r\nredis_version:1.2.6\r\n\r\nconnected_clients:3\r\n",
        )));
        let info = derived.get().await.unwrap();
        assert_eq!(info.len(), 2);
        assert_eq!(info["redis_version"], "1.2.6");
        assert_eq!(info["connected_clients"], "3");
    }

    #[tokio::test]
    async fn test_key_type() {
        let (promise, future) = pair::<String>();
        let derived = FutureKeyType::key_type(future);
        promise.set("zset".to_string());
        assert_eq!(derived.get().await.unwrap(), KeyType::ZSet);

        let (promise, future) = pair::<String>();
        let derived = FutureKeyType::key_type(future);
        promise.set("stream".to_string());
        assert!(derived.get().await.is_err());
    }

    #[tokio::test]
    async fn test_slot_fulfills_matching_shape() {
        let (slot, handle) = PromiseSlot::for_shape(ResponseShape::Bulk);
        slot.fulfill(Response::Bulk(None));
        let value = handle.into_bytes().unwrap().get().await.unwrap();
        assert_eq!(value, None);

        let (slot, handle) = PromiseSlot::for_shape(ResponseShape::Status);
        slot.fulfill(Response::Status("OK".into()));
        let value = handle.into_string().unwrap().get().await.unwrap();
        assert_eq!(value, "OK");
    }

    #[tokio::test]
    async fn test_slot_delivers_server_error() {
        let (slot, handle) = PromiseSlot::for_shape(ResponseShape::Number);
        slot.fulfill(Response::Error("ERR not an integer".into()));
        let err = handle.into_int64().unwrap().get().await.unwrap_err();
        assert_eq!(err.message(), "ERR not an integer");
        assert!(err.is_redis_error());
    }

    #[tokio::test]
    async fn test_slot_mismatched_reply_is_bug() {
        let (slot, handle) = PromiseSlot::for_shape(ResponseShape::Boolean);
        slot.fulfill(Response::Number(3));
        let err = handle.into_bool().unwrap().get().await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_handle_accessor_mismatch() {
        let (_slot, handle) = PromiseSlot::for_shape(ResponseShape::Virtual);
        assert_eq!(handle.shape(), ResponseShape::Virtual);
        assert!(matches!(
            handle.into_bool(),
            Err(Error::InvalidArgument { .. })
        ));
    }
}
