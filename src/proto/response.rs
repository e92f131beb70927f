//! Decoded replies.

use bytes::Bytes;

/// The decoded result of one request/reply exchange.
///
/// Exactly one variant is produced per exchange, chosen by the
/// [`ResponseShape`](crate::proto::command::ResponseShape) that drove decoding.
/// An error reply is always surfaced as [`Response::Error`], whatever shape
/// was requested.
///
/// Bulk payloads distinguish absent (`None`, the protocol null) from empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// `-ERR ...` with the marker stripped.
    Error(String),
    /// `+OK` with the marker stripped.
    Status(String),
    /// `:0` / `:1`.
    Bool(bool),
    /// `:<i64>`.
    Number(i64),
    /// A typed line with the marker stripped.
    String(String),
    /// `$<len>` payload; `None` for `$-1`.
    Bulk(Option<Bytes>),
    /// `*<count>` payload; `None` for `*-1`, inner `None` for `$-1` elements.
    MultiBulk(Option<Vec<Option<Bytes>>>),
    /// Nothing was read from the wire.
    Virtual,
}

impl Response {
    /// Returns true if the server replied with an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Status or error text, if this reply carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Response::Error(m) | Response::Status(m) => Some(m),
            _ => None,
        }
    }

    /// Boolean value, if this is a boolean reply.
    pub fn bool_value(&self) -> Option<bool> {
        match self {
            Response::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value, if this is a number reply.
    pub fn number_value(&self) -> Option<i64> {
        match self {
            Response::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text value, if this is a string reply.
    pub fn string_value(&self) -> Option<&str> {
        match self {
            Response::String(s) => Some(s),
            _ => None,
        }
    }

    /// Bulk payload. `None` when absent or not a bulk reply.
    pub fn bulk_data(&self) -> Option<&Bytes> {
        match self {
            Response::Bulk(b) => b.as_ref(),
            _ => None,
        }
    }

    /// Multi-bulk payload. `None` when absent or not a multi-bulk reply.
    pub fn multi_bulk_data(&self) -> Option<&[Option<Bytes>]> {
        match self {
            Response::MultiBulk(items) => items.as_deref(),
            _ => None,
        }
    }
}
