use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::proto::command::{Command, ResponseShape};
use crate::proto::error::{Error, Result};
use crate::proto::response::Response;

const MAX_BULK_SIZE: usize = 512 * 1024 * 1024; // 512 MB, the server's own limit
const MAX_LINE_LENGTH: usize = 64 * 1024;
const MAX_PREALLOCATED_ITEMS: usize = 1024;

const ERROR_MARKER: u8 = b'-';
const BULK_MARKER: u8 = b'$';
const MULTI_BULK_MARKER: u8 = b'*';
const TRUE_MARKER: u8 = b'1';

/// Reads exactly one reply for `cmd` from `reader`.
///
/// Decoding is driven purely by the command's [`ResponseShape`]; the reply's
/// own type marker is only checked for consistency. An error reply is
/// surfaced as [`Response::Error`] under every shape. [`ResponseShape::Virtual`]
/// reads nothing.
///
/// # Errors
///
/// Returns [`Error::Io`] if the stream fails or closes, and
/// [`Error::Protocol`] if the reply is malformed for the expected shape.
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use pipedis::command::GET;
/// use pipedis::proto::codec::decode;
///
/// let mut reader: &[u8] = b"$-1\r\n";
/// let resp = decode(&mut reader, &GET).await.unwrap();
/// assert!(!resp.is_error());
/// assert_eq!(resp.bulk_data(), None);
/// # }
/// ```
pub async fn decode<R>(reader: &mut R, cmd: &Command) -> Result<Response>
where
    R: AsyncBufRead + Unpin,
{
    let shape = cmd.response_shape();
    if shape == ResponseShape::Virtual {
        return Ok(Response::Virtual);
    }

    let mut line = Vec::with_capacity(64);
    read_line(reader, &mut line).await?;

    if line[0] == ERROR_MARKER {
        return Ok(Response::Error(text(&line[1..])));
    }

    match shape {
        // some Status commands answer with `:n` instead of `+OK`
        ResponseShape::Status => Ok(Response::Status(text(&line[1..]))),
        ResponseShape::Boolean => {
            if line.len() < 2 {
                return Err(unexpected("boolean", &line));
            }
            Ok(Response::Bool(line[1] == TRUE_MARKER))
        }
        ResponseShape::String => Ok(Response::String(text(&line[1..]))),
        ResponseShape::Number => parse_i64(&line[1..]).map(Response::Number),
        ResponseShape::Bulk => {
            if line[0] != BULK_MARKER {
                return Err(unexpected("bulk size", &line));
            }
            let len = parse_i64(&line[1..])?;
            read_bulk_body(reader, len).await.map(Response::Bulk)
        }
        ResponseShape::MultiBulk => {
            if line[0] != MULTI_BULK_MARKER {
                return Err(unexpected("multi-bulk count", &line));
            }
            let count = parse_i64(&line[1..])?;
            if count < 0 {
                return Ok(Response::MultiBulk(None));
            }
            let count = count as usize;
            // every element needs at least "$0\r\n\r\n"
            if count > MAX_BULK_SIZE / 6 {
                return Err(Error::protocol(format!(
                    "multi-bulk count {} exceeds maximum",
                    count
                )));
            }

            let mut items = Vec::with_capacity(count.min(MAX_PREALLOCATED_ITEMS));
            for _ in 0..count {
                read_line(reader, &mut line).await?;
                if line[0] != BULK_MARKER {
                    return Err(unexpected("bulk size", &line));
                }
                let len = parse_i64(&line[1..])?;
                items.push(read_bulk_body(reader, len).await?);
            }
            Ok(Response::MultiBulk(Some(items)))
        }
        ResponseShape::Virtual => Ok(Response::Virtual),
    }
}

/// Reads one CRLF-terminated line into `line`, without the terminator.
///
/// The line is guaranteed to be non-empty on success.
async fn read_line<R>(reader: &mut R, line: &mut Vec<u8>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let limit = MAX_LINE_LENGTH as u64;
    let n = (&mut *reader).take(limit).read_until(b'\n', line).await?;
    if n == 0 {
        return Err(closed());
    }
    if n == MAX_LINE_LENGTH && !line.ends_with(b"\n") {
        return Err(Error::protocol(format!(
            "reply line exceeds {} bytes",
            MAX_LINE_LENGTH
        )));
    }
    if !line.ends_with(b"\r\n") {
        return Err(Error::protocol("reply line not terminated by CRLF"));
    }
    line.truncate(line.len() - 2);
    if line.is_empty() {
        return Err(Error::protocol("empty reply line"));
    }
    Ok(())
}

async fn read_bulk_body<R>(reader: &mut R, len: i64) -> Result<Option<Bytes>>
where
    R: AsyncBufRead + Unpin,
{
    if len < 0 {
        return Ok(None);
    }
    let len = len as usize;
    if len > MAX_BULK_SIZE {
        return Err(Error::protocol(format!(
            "bulk length {} exceeds maximum",
            len
        )));
    }

    let mut data = vec![0u8; len + 2];
    reader.read_exact(&mut data).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            closed()
        } else {
            Error::from(e)
        }
    })?;
    if &data[len..] != b"\r\n" {
        return Err(Error::protocol("bulk payload not terminated by CRLF"));
    }
    data.truncate(len);
    Ok(Some(Bytes::from(data)))
}

fn parse_i64(digits: &[u8]) -> Result<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            Error::protocol(format!(
                "expected integer, got {:?}",
                String::from_utf8_lossy(digits)
            ))
        })
}

fn text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

fn unexpected(expected: &str, line: &[u8]) -> Error {
    Error::protocol(format!(
        "expected {} reply, got {:?}",
        expected,
        String::from_utf8_lossy(line)
    ))
}

fn closed() -> Error {
    Error::from(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "connection closed",
    ))
}
