//! The pipelined connection.
//!
//! Requests flow through two bounded queues owned by one connection:
//!
//! ```text
//! queue_request ─▶ [await-write] ─▶ request processor ─▶ socket
//!                                         │
//!                                         ▼
//!                  [await-read]  ─▶ response processor ◀─ socket
//! ```
//!
//! No request id goes on the wire; replies are matched to requests purely by
//! position. A heartbeat worker pings through the same path, and a manager
//! worker tears the whole connection down on the first fault reported by any
//! other worker.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, warn, Instrument, Span};

use crate::core::builder::ConnectionSpec;
use crate::core::command::PING;
use crate::core::connection::{open_stream, with_deadline, SyncConnection};
use crate::core::future::{FutureHandle, PromiseSlot};
use crate::core::worker::{
    control_channel, Controller, Event, Interrupt, Status, Task, Worker, WorkerEvent,
};
use crate::proto::codec::{decode, encode};
use crate::proto::command::Command;
use crate::proto::error::{Error, Result};

const FEEDBACK_CAPACITY: usize = 32;

/// One request on its way through the pipeline.
struct PendingRequest {
    /// Assigned by the request processor when the request is written.
    id: u64,
    cmd: Command,
    out: Bytes,
    slot: PromiseSlot,
}

/// Entry point shared by callers and the heartbeat.
#[derive(Clone)]
struct Submitter {
    pending_write: mpsc::Sender<PendingRequest>,
    shutdown: Arc<AtomicBool>,
}

impl Submitter {
    async fn submit<A: AsRef<[u8]>>(&self, cmd: &Command, args: &[A]) -> Result<FutureHandle> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }
        let out = encode(cmd, args)?;
        let (slot, handle) = PromiseSlot::for_shape(cmd.response_shape());
        let request = PendingRequest {
            id: 0,
            cmd: *cmd,
            out,
            slot,
        };
        // blocks while the await-write queue is full
        self.pending_write
            .send(request)
            .await
            .map_err(|_| Error::Shutdown)?;
        Ok(handle)
    }
}

/// A connection that pipelines requests and hands back futures.
///
/// [`queue_request`](AsyncConnection::queue_request) returns as soon as the
/// request is queued; the reply is delivered through the returned
/// [`FutureHandle`]. Requests are written, read and fulfilled strictly in
/// submission order.
///
/// Any transport or framing fault shuts the connection down: later calls
/// fail with [`Error::Shutdown`] and requests still in flight are abandoned
/// (their futures resolve to [`Error::Shutdown`]). There is no reconnect.
///
/// # Example
///
/// ```no_run
/// use pipedis::{command, AsyncConnection, ConnectionSpec};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), pipedis::Error> {
/// let conn = AsyncConnection::open(ConnectionSpec::new()).await?;
/// let set = conn.queue_request(&command::SET, &["foo", "bar"]).await?;
/// let get = conn.queue_request(&command::GET, &["foo"]).await?;
/// set.into_string()?.get().await?;
/// let value = get.into_bytes()?.get().await?;
/// assert_eq!(value.as_deref(), Some(&b"bar"[..]));
/// # Ok(())
/// # }
/// ```
pub struct AsyncConnection {
    submitter: Submitter,
    controllers: Vec<Controller>,
    workers: Vec<JoinHandle<()>>,
    spec: ConnectionSpec,
    span: Span,
}

impl AsyncConnection {
    /// Connects to the server described by `spec` and starts the workers.
    ///
    /// The AUTH/SELECT handshake runs before any worker starts.
    pub async fn open(spec: ConnectionSpec) -> Result<Self> {
        let stream = open_stream(&spec).await?;
        Self::from_stream(stream, spec).await
    }

    /// Builds a pipelined connection over an already-established stream.
    pub async fn from_stream<S>(stream: S, spec: ConnectionSpec) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer, spec, span) = SyncConnection::from_stream(stream, spec)
            .await?
            .into_parts();

        let shutdown = Arc::new(AtomicBool::new(false));
        let (write_tx, write_rx) = mpsc::channel(spec.get_request_queue_size().max(1));
        let (read_tx, read_rx) = mpsc::channel(spec.get_response_queue_size().max(1));
        let (feedback_tx, feedback_rx) = mpsc::channel(FEEDBACK_CAPACITY);

        let submitter = Submitter {
            pending_write: write_tx,
            shutdown: shutdown.clone(),
        };

        let (manager_ctl, manager_rx) = control_channel("manager");
        let (requests_ctl, requests_rx) = control_channel("request-processor");
        let (responses_ctl, responses_rx) = control_channel("response-processor");
        let mut staff = vec![requests_ctl, responses_ctl];
        let mut workers = Vec::with_capacity(4);

        let requests = RequestProcessor {
            writer: BufWriter::with_capacity(spec.get_write_buffer_size().max(64), writer),
            pending_write: write_rx,
            pending_read: read_tx,
            next_id: 0,
            batch_threshold: spec.get_write_buffer_size(),
            write_timeout: spec.get_write_timeout(),
        };
        workers.push(spawn_worker("request-processor", requests, requests_rx, &feedback_tx, &span));

        let responses = ResponseProcessor {
            reader,
            pending_read: read_rx,
            read_timeout: spec.get_read_timeout(),
        };
        workers.push(spawn_worker("response-processor", responses, responses_rx, &feedback_tx, &span));

        let period = spec.get_heartbeat();
        if !period.is_zero() {
            let (heartbeat_ctl, heartbeat_rx) = control_channel("heartbeat");
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let heartbeat = Heartbeat {
                ticker,
                period,
                submitter: submitter.clone(),
            };
            workers.push(spawn_worker("heartbeat", heartbeat, heartbeat_rx, &feedback_tx, &span));
            staff.push(heartbeat_ctl);
        }

        let manager = Manager {
            feedback: feedback_rx,
            staff: staff.clone(),
            own: manager_ctl.clone(),
            shutdown,
        };
        workers.push(spawn_worker("manager", manager, manager_rx, &feedback_tx, &span));

        let mut controllers = vec![manager_ctl];
        controllers.extend(staff);
        for ctl in &controllers {
            ctl.signal(Interrupt::Start);
        }
        debug!(parent: &span, workers = workers.len(), "pipeline started");

        Ok(Self {
            submitter,
            controllers,
            workers,
            spec,
            span,
        })
    }

    /// Queues a request and returns the future of its reply.
    ///
    /// Waits only while the await-write queue is full.
    ///
    /// # Errors
    ///
    /// [`Error::Shutdown`] if the connection has been shut down, and
    /// [`Error::InvalidArgument`] if `args` does not fit the command's shape.
    /// An encode failure creates no future and queues nothing, so the error
    /// returned here is the only place it is reported; the connection stays
    /// up. The server's eventual answer, error or not, arrives through the
    /// future.
    pub async fn queue_request<A: AsRef<[u8]>>(
        &self,
        cmd: &Command,
        args: &[A],
    ) -> Result<FutureHandle> {
        self.submitter
            .submit(cmd, args)
            .instrument(self.span.clone())
            .await
    }

    /// Returns true once the connection has been shut down.
    pub fn is_shutdown(&self) -> bool {
        self.submitter.shutdown.load(Ordering::Acquire)
    }

    /// The configuration this connection was opened with.
    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    /// Stops all workers and waits for them to exit.
    ///
    /// Requests still queued are abandoned.
    pub async fn shutdown(mut self) {
        self.stop_workers();
        let workers = std::mem::take(&mut self.workers);
        futures::future::join_all(workers).await;
        debug!(parent: &self.span, "pipeline shut down");
    }

    fn stop_workers(&self) {
        self.submitter.shutdown.store(true, Ordering::Release);
        for ctl in &self.controllers {
            ctl.signal(Interrupt::Stop);
        }
    }
}

impl Drop for AsyncConnection {
    fn drop(&mut self) {
        self.stop_workers();
    }
}

impl fmt::Debug for AsyncConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncConnection")
            .field("addr", &self.spec.addr())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

fn spawn_worker<T: Task>(
    name: &'static str,
    task: T,
    control: mpsc::UnboundedReceiver<Interrupt>,
    feedback: &mpsc::Sender<WorkerEvent>,
    span: &Span,
) -> JoinHandle<()> {
    let worker = Worker::new(name, task, control, feedback.clone());
    tokio::spawn(worker.run().instrument(span.clone()))
}

/// Writes queued requests, batching bursts into one flush.
struct RequestProcessor<W> {
    writer: BufWriter<W>,
    pending_write: mpsc::Receiver<PendingRequest>,
    pending_read: mpsc::Sender<PendingRequest>,
    next_id: u64,
    batch_threshold: usize,
    write_timeout: Option<Duration>,
}

impl<W> RequestProcessor<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    async fn write_batch(&mut self, first: PendingRequest) -> Status {
        let mut request = first;
        let mut batched = 0usize;
        let mut bytes = 0usize;
        loop {
            bytes += request.out.len();
            batched += 1;
            if let Err(status) = self.write_one(request).await {
                return status;
            }
            if bytes >= self.batch_threshold {
                break;
            }
            match self.pending_write.try_recv() {
                Ok(next) => request = next,
                Err(_) => break,
            }
        }

        match self.flush().await {
            Ok(()) => {
                debug!(requests = batched, bytes, "flushed batch");
                Status::Ok
            }
            Err(e) => {
                error!(error = %e, "flush failed");
                Status::SendError
            }
        }
    }

    async fn write_one(&mut self, mut request: PendingRequest) -> std::result::Result<(), Status> {
        self.next_id += 1;
        request.id = self.next_id;

        let writer = &mut self.writer;
        let out = &request.out;
        if let Err(e) = with_deadline(self.write_timeout, async {
            writer.write_all(out).await?;
            Ok(())
        })
        .await
        {
            error!(id = request.id, error = %e, "send failed");
            request.slot.on_error(e);
            return Err(Status::SendError);
        }

        match self.pending_read.try_send(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(request)) => {
                // the replies being waited on may belong to requests still in the buffer
                if let Err(e) = self.flush().await {
                    error!(id = request.id, error = %e, "flush failed");
                    request.slot.on_error(e);
                    return Err(Status::SendError);
                }
                self.pending_read
                    .send(request)
                    .await
                    .map_err(|_| Status::QueueClosed)
            }
            Err(TrySendError::Closed(request)) => {
                request.slot.on_error(Error::Shutdown);
                Err(Status::QueueClosed)
            }
        }
    }

    async fn flush(&mut self) -> Result<()> {
        let writer = &mut self.writer;
        with_deadline(self.write_timeout, async {
            writer.flush().await?;
            Ok(())
        })
        .await
    }
}

impl<W> Task for RequestProcessor<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    type Unit = PendingRequest;

    fn next(&mut self) -> BoxFuture<'_, Option<PendingRequest>> {
        self.pending_write.recv().boxed()
    }

    fn process(&mut self, request: PendingRequest) -> BoxFuture<'_, Status> {
        self.write_batch(request).boxed()
    }
}

/// Reads one reply per written request, in order.
struct ResponseProcessor<R> {
    reader: R,
    pending_read: mpsc::Receiver<PendingRequest>,
    read_timeout: Option<Duration>,
}

impl<R> ResponseProcessor<R>
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    async fn receive(&mut self, request: PendingRequest) -> Status {
        let reader = &mut self.reader;
        match with_deadline(self.read_timeout, decode(reader, &request.cmd)).await {
            Ok(response) => {
                debug!(id = request.id, cmd = request.cmd.code(), "reply received");
                request.slot.fulfill(response);
                Status::Ok
            }
            Err(e) => {
                error!(id = request.id, error = %e, "receive failed");
                let status = match e {
                    Error::Protocol { .. } => Status::ProtocolError,
                    _ => Status::ReceiveError,
                };
                request.slot.on_error(e);
                status
            }
        }
    }
}

impl<R> Task for ResponseProcessor<R>
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    type Unit = PendingRequest;

    fn next(&mut self) -> BoxFuture<'_, Option<PendingRequest>> {
        self.pending_read.recv().boxed()
    }

    fn process(&mut self, request: PendingRequest) -> BoxFuture<'_, Status> {
        self.receive(request).boxed()
    }
}

/// Periodically pings through the normal request path.
struct Heartbeat {
    ticker: Interval,
    period: Duration,
    submitter: Submitter,
}

impl Heartbeat {
    async fn beat(&mut self) -> Status {
        let handle = match self.submitter.submit::<&str>(&PING, &[]).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "heartbeat could not be queued");
                return Status::HeartbeatError;
            }
        };
        let mut reply = match handle.into_string() {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "heartbeat future has the wrong shape");
                return Status::HeartbeatError;
            }
        };

        match reply.try_get(self.period).await {
            Ok(Some(_)) => {
                debug!("heartbeat");
                Status::Ok
            }
            Ok(None) => {
                warn!(period = ?self.period, "heartbeat reply is late");
                Status::Ok
            }
            Err(e) => {
                error!(error = %e, "heartbeat failed");
                Status::HeartbeatError
            }
        }
    }
}

impl Task for Heartbeat {
    type Unit = ();

    fn next(&mut self) -> BoxFuture<'_, Option<()>> {
        async move {
            self.ticker.tick().await;
            Some(())
        }
        .boxed()
    }

    fn process(&mut self, _: ()) -> BoxFuture<'_, Status> {
        self.beat().boxed()
    }
}

/// Watches the feedback channel and shuts everything down on a fault.
struct Manager {
    feedback: mpsc::Receiver<WorkerEvent>,
    staff: Vec<Controller>,
    own: Controller,
    shutdown: Arc<AtomicBool>,
}

impl Manager {
    fn handle(&mut self, message: WorkerEvent) -> Status {
        match message.event {
            Event::Faulted => {
                error!(
                    worker = message.worker,
                    status = ?message.status,
                    "shutting connection down"
                );
                self.shutdown.store(true, Ordering::Release);
                for ctl in &self.staff {
                    debug!(worker = ctl.name(), "stopping");
                    ctl.signal(Interrupt::Stop);
                }
                self.own.signal(Interrupt::Stop);
            }
            event => debug!(worker = message.worker, ?event, "worker event"),
        }
        Status::Ok
    }
}

impl Task for Manager {
    type Unit = WorkerEvent;

    fn next(&mut self) -> BoxFuture<'_, Option<WorkerEvent>> {
        self.feedback.recv().boxed()
    }

    fn process(&mut self, message: WorkerEvent) -> BoxFuture<'_, Status> {
        let status = self.handle(message);
        async move { status }.boxed()
    }
}
