use bytes::{BufMut, Bytes, BytesMut};

use crate::proto::command::{Command, RequestShape};
use crate::proto::error::{Error, Result};

const CRLF: &[u8] = b"\r\n";
const SPACE: u8 = b' ';

/// Encodes a request for `cmd` into a fresh buffer.
///
/// Arguments are laid out according to the command's [`RequestShape`]. Inline
/// tokens are space-separated on the command line; a value argument is
/// written as a length-prefixed bulk after the line terminator.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the number of arguments does not
/// match the shape.
///
/// # Example
///
/// ```
/// use pipedis::command::SET;
/// use pipedis::proto::codec::encode;
///
/// let data = encode(&SET, &["foo", "bar"]).unwrap();
/// assert_eq!(data.as_ref(), b"SET foo\r\n3\r\nbar\r\n");
/// ```
pub fn encode<A: AsRef<[u8]>>(cmd: &Command, args: &[A]) -> Result<Bytes> {
    let mut encoder = Encoder::new();
    encoder.encode(cmd, args)?;
    Ok(encoder.take().freeze())
}

/// A request encoder that accumulates requests in an internal buffer.
///
/// The encoder keeps no state between requests other than the buffer itself,
/// so several requests may be encoded back to back and taken at once.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// Creates a new encoder with an empty buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Encodes one request into the internal buffer.
    ///
    /// On error nothing is written.
    pub fn encode<A: AsRef<[u8]>>(&mut self, cmd: &Command, args: &[A]) -> Result<()> {
        let shape = cmd.request_shape();
        if !shape.arity().accepts(args.len()) {
            return Err(Error::invalid_argument(format!(
                "{} expects {:?} arguments, got {}",
                cmd.code(),
                shape.arity(),
                args.len()
            )));
        }

        self.buf.extend_from_slice(cmd.code().as_bytes());
        match shape {
            RequestShape::NoArg => {}
            RequestShape::Key
            | RequestShape::KeyKey
            | RequestShape::KeyNum
            | RequestShape::KeySpec
            | RequestShape::KeyNumNum
            | RequestShape::MultiKey => {
                for arg in args {
                    self.inline(arg.as_ref());
                }
            }
            RequestShape::KeyValue => {
                self.inline(args[0].as_ref());
                self.buf.extend_from_slice(CRLF);
                self.bulk(args[1].as_ref());
                return Ok(());
            }
            RequestShape::KeyIdxValue | RequestShape::KeyKeyValue => {
                self.inline(args[0].as_ref());
                self.inline(args[1].as_ref());
                self.buf.extend_from_slice(CRLF);
                self.bulk(args[2].as_ref());
                return Ok(());
            }
            RequestShape::KeyCntValue => {
                // count is the third argument but precedes the value on the wire
                self.inline(args[0].as_ref());
                self.inline(args[2].as_ref());
                self.buf.extend_from_slice(CRLF);
                self.bulk(args[1].as_ref());
                return Ok(());
            }
        }
        self.buf.extend_from_slice(CRLF);
        Ok(())
    }

    /// Number of bytes currently buffered.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Takes the encoded data from the buffer, leaving it empty.
    ///
    /// # Returns
    ///
    /// The accumulated bytes
    pub fn take(&mut self) -> BytesMut {
        std::mem::take(&mut self.buf)
    }

    fn inline(&mut self, token: &[u8]) {
        self.buf.put_u8(SPACE);
        self.buf.extend_from_slice(token);
    }

    fn bulk(&mut self, value: &[u8]) {
        self.buf
            .extend_from_slice(value.len().to_string().as_bytes());
        self.buf.extend_from_slice(CRLF);
        self.buf.extend_from_slice(value);
        self.buf.extend_from_slice(CRLF);
    }
}
