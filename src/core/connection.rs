use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::{TcpSocket, TcpStream};
use tracing::{debug, instrument, Span};

use crate::core::builder::ConnectionSpec;
use crate::core::command::{AUTH, QUIT, SELECT};
use crate::proto::codec::{decode, Encoder};
use crate::proto::command::Command;
use crate::proto::error::{Error, Result};
use crate::proto::response::Response;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A lockstep request/reply connection.
///
/// Each [`service_request`](SyncConnection::service_request) writes one
/// request and reads its reply before returning. The `&mut self` receiver
/// rules out concurrent callers; open more connections for concurrency, or
/// use [`AsyncConnection`](crate::AsyncConnection) for pipelining.
///
/// A transport failure, timeout or framing error leaves the stream at an
/// unknown position, so the connection refuses every later request with
/// [`Error::Shutdown`]. Server error replies do not break it.
///
/// # Example
///
/// ```no_run
/// use pipedis::{command, ConnectionSpec, SyncConnection};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), pipedis::Error> {
/// let mut conn = SyncConnection::open(ConnectionSpec::new()).await?;
/// conn.service_request(&command::SET, &["foo", "bar"]).await?;
/// let resp = conn.service_request(&command::GET, &["foo"]).await?;
/// assert_eq!(resp.bulk_data().map(|b| b.as_ref()), Some(&b"bar"[..]));
/// # Ok(())
/// # }
/// ```
pub struct SyncConnection<S = TcpStream> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    encoder: Encoder,
    spec: ConnectionSpec,
    span: Span,
    broken: bool,
}

impl SyncConnection<TcpStream> {
    /// Connects to the server described by `spec`.
    ///
    /// Issues AUTH if a password is set and SELECT if the database is not 0.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the socket cannot be opened, or the
    /// server error if AUTH or SELECT is rejected.
    pub async fn open(spec: ConnectionSpec) -> Result<Self> {
        let stream = open_stream(&spec).await?;
        Self::from_stream(stream, spec).await
    }
}

impl<S> SyncConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Builds a connection over an already-established stream and runs the
    /// AUTH/SELECT handshake on it.
    pub async fn from_stream(stream: S, spec: ConnectionSpec) -> Result<Self> {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let span = tracing::debug_span!("redis_connection", id, addr = %spec.addr());
        let (read_half, write_half) = tokio::io::split(stream);
        let mut conn = Self {
            reader: BufReader::with_capacity(spec.get_read_buffer_size().max(64), read_half),
            writer: write_half,
            encoder: Encoder::new(),
            spec,
            span,
            broken: false,
        };
        conn.handshake().await?;
        Ok(conn)
    }

    async fn handshake(&mut self) -> Result<()> {
        if let Some(password) = self.spec.get_password().map(str::to_owned) {
            self.service_request(&AUTH, &[password]).await?;
            debug!(parent: &self.span, "authenticated");
        }
        let db = self.spec.get_db();
        if db != 0 {
            self.service_request(&SELECT, &[db.to_string()]).await?;
            debug!(parent: &self.span, db, "database selected");
        }
        Ok(())
    }

    /// Sends one request and waits for its reply.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `args` does not fit the command's shape,
    /// [`Error::Server`] if the server replied with an error, and a
    /// system error for transport, timeout or framing failures.
    #[instrument(parent = &self.span, skip_all, fields(cmd = cmd.code()), level = "debug")]
    pub async fn service_request<A: AsRef<[u8]>>(
        &mut self,
        cmd: &Command,
        args: &[A],
    ) -> Result<Response> {
        if self.broken {
            return Err(Error::Shutdown);
        }
        self.encoder.encode(cmd, args)?;
        let data = self.encoder.take();

        let response = match self.exchange(cmd, &data).await {
            Ok(response) => response,
            Err(e) => {
                // the reply stream may be out of step with requests from here on
                self.broken = true;
                debug!(error = %e, "connection broken");
                return Err(e);
            }
        };
        match response {
            Response::Error(message) => {
                debug!(%message, "server rejected request");
                Err(Error::Server { message })
            }
            response => Ok(response),
        }
    }

    async fn exchange(&mut self, cmd: &Command, data: &[u8]) -> Result<Response> {
        let writer = &mut self.writer;
        with_deadline(self.spec.get_write_timeout(), async {
            writer.write_all(data).await?;
            writer.flush().await?;
            Ok(())
        })
        .await?;

        let reader = &mut self.reader;
        with_deadline(self.spec.get_read_timeout(), decode(reader, cmd)).await
    }

    /// Returns true once a failed exchange has made the connection unusable.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Sends QUIT and closes the write side.
    pub async fn quit(mut self) -> Result<()> {
        self.service_request::<&str>(&QUIT, &[]).await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    /// The configuration this connection was opened with.
    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    pub(crate) fn into_parts(self) -> (BufReader<ReadHalf<S>>, WriteHalf<S>, ConnectionSpec, Span) {
        (self.reader, self.writer, self.spec, self.span)
    }
}

impl<S> fmt::Debug for SyncConnection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConnection")
            .field("addr", &self.spec.addr())
            .finish()
    }
}

/// Opens and configures the TCP socket for `spec`.
pub(crate) async fn open_stream(spec: &ConnectionSpec) -> Result<TcpStream> {
    let addr = tokio::net::lookup_host(spec.addr())
        .await?
        .next()
        .ok_or_else(|| Error::invalid_argument(format!("{} did not resolve", spec.addr())))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_keepalive(spec.get_keepalive())?;
    set_linger(&socket, spec.get_linger())?;
    socket.set_recv_buffer_size(buffer_size(spec.get_read_buffer_size()))?;
    socket.set_send_buffer_size(buffer_size(spec.get_write_buffer_size()))?;

    let stream = with_deadline(spec.get_connect_timeout(), async {
        Ok(socket.connect(addr).await?)
    })
    .await?;
    stream.set_nodelay(spec.get_nodelay())?;
    debug!(%addr, "connected");
    Ok(stream)
}

// deprecated because a non-zero linger blocks the thread on drop; the default is zero
#[allow(deprecated)]
fn set_linger(socket: &TcpSocket, linger: Option<Duration>) -> std::io::Result<()> {
    socket.set_linger(linger)
}

fn buffer_size(size: usize) -> u32 {
    u32::try_from(size).unwrap_or(u32::MAX)
}

/// Runs `fut`, failing with [`Error::Timeout`] if `deadline` passes first.
pub(crate) async fn with_deadline<F, T>(deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout)?,
        None => fut.await,
    }
}
