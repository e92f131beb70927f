//! Cooperating worker loops.
//!
//! Every worker runs the same state machine around a [`Task`]:
//!
//! ```text
//!            start                non-ok status
//! AwaitSignal ─────▶ Work ─────────────────────▶ OnError
//!     ▲   ▲           │ pause                       │
//!     │   └───────────┘                             │
//!     └─────────────────────────────────────────────┘
//!                         stop (from any state) ──▶ Stopped
//! ```
//!
//! Interrupts arrive on the worker's private control channel and always take
//! priority over the next unit of work. A unit that has started runs to
//! completion; only `stop` may abandon it. Faults are published on the shared
//! feedback channel for the manager to act on.

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Control codes sent to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    Start,
    /// Parks the worker until the next `Start`. The pipeline never sends it.
    #[allow(dead_code)]
    Pause,
    Stop,
}

/// Event codes a worker publishes on the feedback channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Ready,
    Working,
    Faulted,
}

/// Outcome of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Ok,
    SendError,
    ReceiveError,
    ProtocolError,
    HeartbeatError,
    QueueClosed,
}

/// A message on the feedback channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorkerEvent {
    pub(crate) worker: &'static str,
    pub(crate) event: Event,
    pub(crate) status: Status,
}

/// The work a worker repeats.
///
/// `next` waits for the next unit and must be cancel-safe; `process` handles
/// one unit and is never cancelled except by `stop`.
pub(crate) trait Task: Send + 'static {
    type Unit: Send;

    /// Waits for the next unit. `None` means the source is gone.
    fn next(&mut self) -> BoxFuture<'_, Option<Self::Unit>>;

    /// Handles one unit.
    fn process(&mut self, unit: Self::Unit) -> BoxFuture<'_, Status>;
}

/// Sending side of a worker's control channel.
#[derive(Debug, Clone)]
pub(crate) struct Controller {
    name: &'static str,
    tx: mpsc::UnboundedSender<Interrupt>,
}

impl Controller {
    pub(crate) fn signal(&self, interrupt: Interrupt) {
        if self.tx.send(interrupt).is_err() {
            debug!(worker = self.name, ?interrupt, "worker already stopped");
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }
}

/// Creates the control channel for the worker `name`.
pub(crate) fn control_channel(
    name: &'static str,
) -> (Controller, mpsc::UnboundedReceiver<Interrupt>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Controller { name, tx }, rx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitSignal,
    Work,
    OnError(Status),
    Stopped,
}

/// A named control loop bound to one task.
pub(crate) struct Worker<T: Task> {
    name: &'static str,
    task: T,
    control: mpsc::UnboundedReceiver<Interrupt>,
    feedback: mpsc::Sender<WorkerEvent>,
}

impl<T: Task> Worker<T> {
    pub(crate) fn new(
        name: &'static str,
        task: T,
        control: mpsc::UnboundedReceiver<Interrupt>,
        feedback: mpsc::Sender<WorkerEvent>,
    ) -> Self {
        Self {
            name,
            task,
            control,
            feedback,
        }
    }

    /// Drives the state machine until the worker is stopped.
    pub(crate) async fn run(mut self) {
        let mut state = State::AwaitSignal;
        loop {
            state = match state {
                State::AwaitSignal => self.await_signal().await,
                State::Work => self.work().await,
                State::OnError(status) => self.on_error(status).await,
                State::Stopped => break,
            };
        }
        debug!(worker = self.name, "stopped");
    }

    async fn await_signal(&mut self) -> State {
        self.publish(Event::Ready, Status::Ok).await;
        loop {
            match self.control.recv().await {
                Some(Interrupt::Start) => {
                    debug!(worker = self.name, "started");
                    self.publish(Event::Working, Status::Ok).await;
                    return State::Work;
                }
                Some(Interrupt::Pause) => continue,
                Some(Interrupt::Stop) | None => return State::Stopped,
            }
        }
    }

    async fn work(&mut self) -> State {
        loop {
            let unit = tokio::select! {
                biased;
                interrupt = self.control.recv() => match interrupt {
                    Some(Interrupt::Start) => continue,
                    Some(Interrupt::Pause) => return State::AwaitSignal,
                    Some(Interrupt::Stop) | None => return State::Stopped,
                },
                unit = self.task.next() => unit,
            };
            let Some(unit) = unit else {
                return State::OnError(Status::QueueClosed);
            };

            let mut deferred = None;
            let mut processing = self.task.process(unit);
            let status = loop {
                tokio::select! {
                    biased;
                    interrupt = self.control.recv(), if deferred.is_none() => match interrupt {
                        Some(Interrupt::Stop) | None => return State::Stopped,
                        Some(other) => deferred = Some(other),
                    },
                    status = &mut processing => break status,
                }
            };
            drop(processing);

            if status != Status::Ok {
                return State::OnError(status);
            }
            if deferred == Some(Interrupt::Pause) {
                return State::AwaitSignal;
            }
        }
    }

    async fn on_error(&mut self, status: Status) -> State {
        error!(worker = self.name, ?status, "worker faulted");
        self.publish(Event::Faulted, status).await;
        State::AwaitSignal
    }

    async fn publish(&mut self, event: Event, status: Status) {
        let message = WorkerEvent {
            worker: self.name,
            event,
            status,
        };
        if event == Event::Faulted {
            // a lost fault would leave the connection half alive
            let _ = self.feedback.send(message).await;
        } else {
            let _ = self.feedback.try_send(message);
        }
    }
}
