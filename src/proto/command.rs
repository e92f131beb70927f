//! Command descriptors.
//!
//! A [`Command`] is pure static data: the wire code plus the two shapes that
//! tell the codec how to frame the request and how to read the reply.

/// Argument layout of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// `CODE`
    NoArg,
    /// `CODE key`
    Key,
    /// `CODE key key`
    KeyKey,
    /// `CODE key num`
    KeyNum,
    /// `CODE key spec`
    KeySpec,
    /// `CODE key num num`
    KeyNumNum,
    /// `CODE key` followed by a bulk value.
    KeyValue,
    /// `CODE key index` followed by a bulk value.
    KeyIdxValue,
    /// `CODE key key` followed by a bulk value.
    KeyKeyValue,
    /// `CODE key count` followed by a bulk value.
    ///
    /// Arguments are given as `[key, value, count]`; the count is written
    /// before the value on the wire.
    KeyCntValue,
    /// `CODE key [key ...]`
    MultiKey,
}

/// Arity requirement of a [`RequestShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Exact(usize),
    /// At least this many arguments.
    AtLeast(usize),
}

impl Arity {
    /// Returns true if `n` arguments satisfy this arity.
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(expected) => n == expected,
            Arity::AtLeast(min) => n >= min,
        }
    }
}

impl RequestShape {
    /// Number of arguments this shape expects.
    pub fn arity(self) -> Arity {
        match self {
            RequestShape::NoArg => Arity::Exact(0),
            RequestShape::Key => Arity::Exact(1),
            RequestShape::KeyKey
            | RequestShape::KeyNum
            | RequestShape::KeySpec
            | RequestShape::KeyValue => Arity::Exact(2),
            RequestShape::KeyNumNum
            | RequestShape::KeyIdxValue
            | RequestShape::KeyKeyValue
            | RequestShape::KeyCntValue => Arity::Exact(3),
            RequestShape::MultiKey => Arity::AtLeast(1),
        }
    }
}

/// Decode strategy for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `:0` / `:1`
    Boolean,
    /// `:<i64>`
    Number,
    /// A single typed line, returned as text.
    String,
    /// `+<status>`
    Status,
    /// `$<len>` followed by the payload.
    Bulk,
    /// `*<count>` followed by that many bulk replies.
    MultiBulk,
    /// No reply is read at all (e.g. QUIT).
    Virtual,
}

/// A server operation: its code and framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    code: &'static str,
    request: RequestShape,
    response: ResponseShape,
}

impl Command {
    /// Defines a command.
    pub const fn new(code: &'static str, request: RequestShape, response: ResponseShape) -> Self {
        Self {
            code,
            request,
            response,
        }
    }

    /// The command code written on the wire.
    #[inline]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Request argument layout.
    #[inline]
    pub fn request_shape(&self) -> RequestShape {
        self.request
    }

    /// Reply decode strategy.
    #[inline]
    pub fn response_shape(&self) -> ResponseShape {
        self.response
    }
}
