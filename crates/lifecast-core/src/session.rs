//! Client session protocol.
//!
//! A [`Session`] bridges one connected observer to the simulation loop
//! with three concurrent tasks:
//!
//! - **receive** -- reads point-lists from the transport and offers them
//!   to the session's inbound queue (dropped if the queue stays full).
//! - **send** -- writes snapshots from the session's outbound queue to the
//!   transport.
//! - **coordinate** -- turns inbound point-lists into
//!   [`Command::InjectCells`] and, whenever it has been idle for the
//!   snapshot interval, submits a [`Command::Snapshot`] aimed at the
//!   outbound queue.
//!
//! All three watch a shared [`Liveness`] that moves one way through
//! [`SessionPhase::Active`], [`SessionPhase::Closing`] and
//! [`SessionPhase::Closed`]. The first I/O failure flips the session to
//! `Closing`; every task is waiting on that transition alongside its own
//! work, so all of them stop promptly and the coordinator submits nothing
//! further.
//!
//! The transport is abstracted behind [`PointReader`] and [`PointWriter`]
//! so the protocol can run over a WebSocket, an in-memory pipe, or
//! anything else that moves whole point-lists.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lifecast_grid::Point;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::{Command, SnapshotTarget};
use crate::config::TimingConfig;
use crate::offer::{Offer, offer};
use crate::simulation::SimulationHandle;

/// Capacity of a session's inbound and outbound queues.
pub const SESSION_QUEUE_CAPACITY: usize = 1;

/// Failure of a session's transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,

    /// An inbound message could not be decoded into a point-list.
    #[error("malformed message: {0}")]
    Decode(String),

    /// Reading or writing the connection failed.
    #[error("transport I/O failed: {0}")]
    Io(String),
}

/// Inbound half of a session transport.
pub trait PointReader: Send + 'static {
    /// Wait for the next inbound point-list.
    ///
    /// Any error ends the session; there is no partial-message recovery.
    fn read(&mut self) -> impl Future<Output = Result<Vec<Point>, TransportError>> + Send;
}

/// Outbound half of a session transport.
pub trait PointWriter: Send + 'static {
    /// Send one point-list as one message.
    fn write(
        &mut self,
        points: Vec<Point>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the connection. Called exactly once, when the session ends.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Unique identifier for a session, time-ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// All three tasks are running.
    Active,
    /// A task has failed or the loop is gone; tasks are winding down.
    Closing,
    /// Every task has stopped.
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The receive task's read failed.
    ReadFailed(TransportError),
    /// The send task's write failed.
    WriteFailed(TransportError),
    /// The simulation loop stopped accepting commands.
    SimulationGone,
}

/// Shared, one-way session phase observed by all of a session's tasks.
#[derive(Debug, Clone)]
pub struct Liveness {
    phase: Arc<watch::Sender<SessionPhase>>,
}

impl Liveness {
    /// A fresh, active session phase.
    pub fn new() -> Self {
        let (phase, _) = watch::channel(SessionPhase::Active);
        Self {
            phase: Arc::new(phase),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Whether the session is still [`SessionPhase::Active`].
    pub fn is_active(&self) -> bool {
        self.phase() == SessionPhase::Active
    }

    /// Move from `Active` to `Closing`.
    ///
    /// Returns `true` only for the caller that performed the transition,
    /// so concurrent failures agree on a single reason.
    pub fn begin_close(&self) -> bool {
        self.phase.send_if_modified(|phase| {
            if *phase == SessionPhase::Active {
                *phase = SessionPhase::Closing;
                true
            } else {
                false
            }
        })
    }

    /// Mark the session `Closed`. Only the session runner calls this,
    /// after all tasks have stopped.
    fn finish(&self) {
        self.phase.send_replace(SessionPhase::Closed);
    }

    /// Resolve once the session is no longer `Active`.
    pub async fn closing(&self) {
        let mut rx = self.phase.subscribe();
        // The sender lives in `self`, so this cannot fail while we wait.
        let _ = rx.wait_for(|phase| *phase != SessionPhase::Active).await;
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Timeouts governing one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Idle time after which the coordinator requests a snapshot.
    pub snapshot_interval: Duration,
    /// How long the receive task waits to hand off an inbound message.
    pub inbound_offer: Duration,
}

impl From<&TimingConfig> for SessionSettings {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            snapshot_interval: timing.snapshot_interval(),
            inbound_offer: timing.inbound_offer(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

/// What a session did before it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// The session.
    pub id: SessionId,
    /// Why it ended, if anything failed.
    pub close_reason: Option<CloseReason>,
    /// Inject commands accepted by the command stream.
    pub injected: u64,
    /// Snapshot commands accepted by the command stream.
    pub snapshots_requested: u64,
}

/// One observer's connection to the simulation.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    simulation: SimulationHandle,
    settings: SessionSettings,
    liveness: Liveness,
}

#[derive(Debug, Default)]
struct CoordinatorOutcome {
    close_reason: Option<CloseReason>,
    injected: u64,
    snapshots_requested: u64,
}

impl Session {
    /// Create a session that will submit commands through `simulation`.
    pub fn new(simulation: SimulationHandle, settings: SessionSettings) -> Self {
        Self {
            id: SessionId::new(),
            simulation,
            settings,
            liveness: Liveness::new(),
        }
    }

    /// This session's identifier.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// A handle on this session's phase.
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Run the session until its transport fails or the loop goes away.
    ///
    /// Spawns the receive and send tasks, runs the coordinator on the
    /// calling task, then waits for all three to stop before marking the
    /// session [`SessionPhase::Closed`].
    pub async fn run<R, W>(self, reader: R, writer: W) -> SessionReport
    where
        R: PointReader,
        W: PointWriter,
    {
        info!(session = %self.id, "Session started");

        let (inbound_tx, inbound_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);

        let receive = tokio::spawn(receive_loop(
            self.id,
            reader,
            inbound_tx,
            self.liveness.clone(),
            self.settings.inbound_offer,
        ));
        let send = tokio::spawn(send_loop(
            self.id,
            writer,
            outbound_rx,
            self.liveness.clone(),
        ));

        let outcome = self.coordinate(inbound_rx, outbound_tx).await;

        // The coordinator only returns once the session is closing, so both
        // I/O tasks are already on their way out.
        self.liveness.begin_close();
        let read_failure = join_task(self.id, "receive", receive).await;
        let write_failure = join_task(self.id, "send", send).await;
        self.liveness.finish();

        let close_reason = outcome.close_reason.or(read_failure).or(write_failure);
        info!(
            session = %self.id,
            reason = ?close_reason,
            injected = outcome.injected,
            snapshots_requested = outcome.snapshots_requested,
            "Session closed"
        );

        SessionReport {
            id: self.id,
            close_reason,
            injected: outcome.injected,
            snapshots_requested: outcome.snapshots_requested,
        }
    }

    async fn coordinate(
        &self,
        mut inbound: mpsc::Receiver<Vec<Point>>,
        outbound: SnapshotTarget,
    ) -> CoordinatorOutcome {
        let mut outcome = CoordinatorOutcome::default();

        while self.liveness.is_active() {
            let waited = tokio::select! {
                () = self.liveness.closing() => break,
                waited = tokio::time::timeout(self.settings.snapshot_interval, inbound.recv()) => waited,
            };

            let command = match waited {
                Ok(Some(points)) => Command::InjectCells(points),
                // The receive task has stopped, which only happens on close.
                Ok(None) => break,
                Err(_idle) => Command::Snapshot(outbound.clone()),
            };

            if !self.liveness.is_active() {
                break;
            }

            let is_inject = matches!(command, Command::InjectCells(_));
            // A full command stream can hold the submit for `command_offer`;
            // closing during that wait abandons the command.
            let submitted = tokio::select! {
                biased;
                () = self.liveness.closing() => break,
                submitted = self.simulation.submit(command) => submitted,
            };
            match submitted {
                Offer::Delivered if is_inject => {
                    outcome.injected = outcome.injected.saturating_add(1);
                }
                Offer::Delivered => {
                    outcome.snapshots_requested = outcome.snapshots_requested.saturating_add(1);
                }
                Offer::Dropped => {}
                Offer::Closed => {
                    if self.liveness.begin_close() {
                        outcome.close_reason = Some(CloseReason::SimulationGone);
                    }
                    break;
                }
            }
        }

        outcome
    }
}

async fn receive_loop<R: PointReader>(
    id: SessionId,
    mut reader: R,
    inbound: mpsc::Sender<Vec<Point>>,
    liveness: Liveness,
    wait: Duration,
) -> Option<CloseReason> {
    loop {
        let read = tokio::select! {
            () = liveness.closing() => return None,
            read = reader.read() => read,
        };

        match read {
            Ok(points) => match offer(&inbound, points, wait).await {
                Offer::Delivered => {}
                Offer::Dropped => debug!(session = %id, "Inbound queue full, message dropped"),
                Offer::Closed => return None,
            },
            Err(e) => {
                debug!(session = %id, error = %e, "Session read failed");
                return liveness
                    .begin_close()
                    .then_some(CloseReason::ReadFailed(e));
            }
        }
    }
}

async fn send_loop<W: PointWriter>(
    id: SessionId,
    mut writer: W,
    mut outbound: mpsc::Receiver<Vec<Point>>,
    liveness: Liveness,
) -> Option<CloseReason> {
    let failure = loop {
        let points = tokio::select! {
            () = liveness.closing() => break None,
            points = outbound.recv() => match points {
                Some(points) => points,
                None => break None,
            },
        };

        let written = tokio::select! {
            () = liveness.closing() => break None,
            written = writer.write(points) => written,
        };

        if let Err(e) = written {
            debug!(session = %id, error = %e, "Session write failed");
            break liveness
                .begin_close()
                .then_some(CloseReason::WriteFailed(e));
        }
    };

    writer.close().await;
    failure
}

async fn join_task(
    id: SessionId,
    task: &str,
    handle: JoinHandle<Option<CloseReason>>,
) -> Option<CloseReason> {
    match handle.await {
        Ok(reason) => reason,
        Err(e) => {
            warn!(session = %id, task, error = %e, "Session task did not finish cleanly");
            None
        }
    }
}
