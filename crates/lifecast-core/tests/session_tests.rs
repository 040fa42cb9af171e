//! Integration tests for the client session protocol.
//!
//! Sessions run over in-memory transports: a scripted reader fed from a
//! channel and writers that record, stall, or fail. Time is paused so the
//! snapshot cadence and offer timeouts resolve instantly and
//! deterministically.

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lifecast_core::{
    CloseReason, Command, PointReader, PointWriter, Session, SessionPhase, SessionSettings,
    Simulation, SimulationHandle, SimulationSettings, TransportError,
};
use lifecast_grid::{Grid, Point, Torus};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

const HOUR: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// In-memory transports
// ---------------------------------------------------------------------------

type Inbound = mpsc::UnboundedSender<Result<Vec<Point>, TransportError>>;

/// Yields whatever the test pushes; idles forever once the test hangs up.
struct ScriptedReader {
    rx: mpsc::UnboundedReceiver<Result<Vec<Point>, TransportError>>,
}

impl PointReader for ScriptedReader {
    async fn read(&mut self) -> Result<Vec<Point>, TransportError> {
        match self.rx.recv().await {
            Some(message) => message,
            None => std::future::pending().await,
        }
    }
}

fn scripted_reader() -> (Inbound, ScriptedReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ScriptedReader { rx })
}

/// Forwards every written point-list to the test.
struct RecordingWriter {
    tx: mpsc::UnboundedSender<Vec<Point>>,
    closed: Arc<AtomicBool>,
}

impl PointWriter for RecordingWriter {
    async fn write(&mut self, points: Vec<Point>) -> Result<(), TransportError> {
        self.tx
            .send(points)
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn recording_writer() -> (mpsc::UnboundedReceiver<Vec<Point>>, Arc<AtomicBool>, RecordingWriter) {
    let (tx, rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    let writer = RecordingWriter {
        tx,
        closed: Arc::clone(&closed),
    };
    (rx, closed, writer)
}

/// A peer that never accepts a byte.
struct StalledWriter {
    closed: Arc<AtomicBool>,
}

impl PointWriter for StalledWriter {
    async fn write(&mut self, _points: Vec<Point>) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A peer whose connection is already broken.
struct FailingWriter;

impl PointWriter for FailingWriter {
    async fn write(&mut self, _points: Vec<Point>) -> Result<(), TransportError> {
        Err(TransportError::Io("broken pipe".to_owned()))
    }

    async fn close(&mut self) {}
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn block_at(x: i64, y: i64) -> Vec<Point> {
    vec![
        Point::new(x, y),
        Point::new(x + 1, y),
        Point::new(x, y + 1),
        Point::new(x + 1, y + 1),
    ]
}

fn start_simulation(tick_interval: Duration) -> SimulationHandle {
    let grid = Grid::new(Torus::new(64, 64).unwrap());
    let settings = SimulationSettings {
        tick_interval,
        rng_seed: Some(1),
        ..SimulationSettings::default()
    };
    let (simulation, handle) = Simulation::new(grid, settings);
    tokio::spawn(simulation.run());
    handle
}

/// Read snapshots until one contains every point in `wanted`.
async fn await_snapshot_containing(
    written: &mut mpsc::UnboundedReceiver<Vec<Point>>,
    wanted: &[Point],
) -> BTreeSet<Point> {
    for _ in 0..20 {
        let snapshot: BTreeSet<Point> = written.recv().await.unwrap().into_iter().collect();
        if wanted.iter().all(|p| snapshot.contains(p)) {
            return snapshot;
        }
    }
    panic!("no snapshot contained {wanted:?}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn injected_cells_come_back_in_snapshots() {
    let handle = start_simulation(HOUR);
    let (inbound, reader) = scripted_reader();
    let (mut written, _closed, writer) = recording_writer();

    let session = Session::new(handle, SessionSettings::default());
    tokio::spawn(session.run(reader, writer));

    let block = block_at(10, 10);
    inbound.send(Ok(block.clone())).unwrap();

    let snapshot = await_snapshot_containing(&mut written, &block).await;
    assert_eq!(snapshot, block.into_iter().collect());
}

#[tokio::test(start_paused = true)]
async fn read_failure_tears_down_every_task() {
    let (handle, mut commands) = SimulationHandle::channel(16, Duration::from_millis(50));
    let (inbound, reader) = scripted_reader();
    let (_written, closed, writer) = recording_writer();

    let session = Session::new(handle, SessionSettings::default());
    let liveness = session.liveness();
    let running = tokio::spawn(session.run(reader, writer));

    // Let the coordinator settle into its snapshot cadence.
    let first = commands.recv().await.unwrap();
    assert!(matches!(first, Command::Snapshot(_)));

    inbound
        .send(Err(TransportError::Decode("expected array".to_owned())))
        .unwrap();
    let report = running.await.unwrap();

    assert_eq!(
        report.close_reason,
        Some(CloseReason::ReadFailed(TransportError::Decode(
            "expected array".to_owned()
        )))
    );
    assert_eq!(liveness.phase(), SessionPhase::Closed);
    assert!(closed.load(Ordering::SeqCst), "connection was not closed");

    // Whatever was already queued stays; nothing new can ever arrive.
    while commands.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(matches!(commands.try_recv(), Err(TryRecvError::Disconnected)));
}

#[tokio::test(start_paused = true)]
async fn teardown_is_prompt_even_while_a_write_is_stuck() {
    let handle = start_simulation(HOUR);
    let (inbound, reader) = scripted_reader();
    let closed = Arc::new(AtomicBool::new(false));
    let writer = StalledWriter {
        closed: Arc::clone(&closed),
    };

    let settings = SessionSettings::default();
    let session = Session::new(handle, settings);
    let running = tokio::spawn(session.run(reader, writer));

    // Give the send task time to get stuck on a snapshot write.
    tokio::time::sleep(Duration::from_millis(350)).await;

    let failed_at = tokio::time::Instant::now();
    inbound.send(Err(TransportError::Closed)).unwrap();
    let report = running.await.unwrap();

    assert!(failed_at.elapsed() < settings.snapshot_interval);
    assert_eq!(
        report.close_reason,
        Some(CloseReason::ReadFailed(TransportError::Closed))
    );
    assert!(report.snapshots_requested >= 1);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn write_failure_tears_down_session() {
    let (handle, mut commands) = SimulationHandle::channel(16, Duration::from_millis(50));
    let (_inbound, reader) = scripted_reader();

    let session = Session::new(handle, SessionSettings::default());
    let running = tokio::spawn(session.run(reader, FailingWriter));

    let Some(Command::Snapshot(target)) = commands.recv().await else {
        panic!("expected a snapshot request");
    };
    target.send(block_at(0, 0)).await.unwrap();

    let report = running.await.unwrap();
    assert_eq!(
        report.close_reason,
        Some(CloseReason::WriteFailed(TransportError::Io(
            "broken pipe".to_owned()
        )))
    );
}

#[tokio::test(start_paused = true)]
async fn inbound_messages_keep_arrival_order() {
    let (handle, mut commands) = SimulationHandle::channel(16, Duration::from_millis(50));
    let (inbound, reader) = scripted_reader();
    let (_written, _closed, writer) = recording_writer();

    let session = Session::new(handle, SessionSettings::default());
    tokio::spawn(session.run(reader, writer));

    let messages: Vec<Vec<Point>> = (0..3).map(|i| vec![Point::new(i, i)]).collect();
    for message in &messages {
        inbound.send(Ok(message.clone())).unwrap();
    }

    let mut injected = Vec::new();
    while injected.len() < messages.len() {
        match commands.recv().await.unwrap() {
            Command::InjectCells(points) => injected.push(points),
            Command::Snapshot(_) => {}
            other => panic!("unexpected command {}", other.kind()),
        }
    }
    assert_eq!(injected, messages);
}

#[tokio::test(start_paused = true)]
async fn stalled_session_does_not_starve_a_healthy_one() {
    let handle = start_simulation(Duration::from_millis(50));

    // Session A: its peer never reads.
    let (_stalled_inbound, stalled_reader) = scripted_reader();
    let stalled = Session::new(handle.clone(), SessionSettings::default());
    let stalled_liveness = stalled.liveness();
    tokio::spawn(stalled.run(
        stalled_reader,
        StalledWriter {
            closed: Arc::new(AtomicBool::new(false)),
        },
    ));

    // Let A wedge its send task and fill its outbound slot.
    tokio::time::sleep(Duration::from_millis(500)).await;

    // Session B: healthy.
    let (inbound, reader) = scripted_reader();
    let (mut written, _closed, writer) = recording_writer();
    let healthy = Session::new(handle.clone(), SessionSettings::default());
    tokio::spawn(healthy.run(reader, writer));

    let started = tokio::time::Instant::now();
    let block = block_at(30, 30);
    inbound.send(Ok(block.clone())).unwrap();
    await_snapshot_containing(&mut written, &block).await;

    // Injection plus one snapshot round-trip, not held up by A.
    assert!(started.elapsed() <= Duration::from_millis(250));
    assert_eq!(stalled_liveness.phase(), SessionPhase::Active);
    assert!(handle.stats().await.unwrap().generation > 0);
}

#[tokio::test(start_paused = true)]
async fn session_closes_when_the_simulation_is_gone() {
    let (handle, commands) = SimulationHandle::channel(16, Duration::from_millis(50));
    drop(commands);

    let (_inbound, reader) = scripted_reader();
    let (_written, closed, writer) = recording_writer();
    let report = Session::new(handle, SessionSettings::default())
        .run(reader, writer)
        .await;

    assert_eq!(report.close_reason, Some(CloseReason::SimulationGone));
    assert_eq!(report.snapshots_requested, 0);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn nothing_is_submitted_once_closing_begins() {
    // One slot, already taken: the coordinator's next submit has to wait.
    let (handle, mut commands) = SimulationHandle::channel(1, Duration::from_millis(200));
    assert!(handle.seed(1, 1).await.is_delivered());

    let (inbound, reader) = scripted_reader();
    let (_written, _closed, writer) = recording_writer();
    let settings = SessionSettings::default();
    let session = Session::new(handle, settings);
    let running = tokio::spawn(session.run(reader, writer));

    // Past the snapshot interval, inside the command offer window.
    tokio::time::sleep(settings.snapshot_interval + Duration::from_millis(10)).await;
    inbound.send(Err(TransportError::Closed)).unwrap();
    let report = running.await.unwrap();

    assert_eq!(
        report.close_reason,
        Some(CloseReason::ReadFailed(TransportError::Closed))
    );
    assert_eq!(report.snapshots_requested, 0);

    assert!(matches!(
        commands.recv().await,
        Some(Command::Seed { .. })
    ));
    tokio::time::sleep(Duration::from_secs(1)).await;
    match commands.try_recv() {
        Err(TryRecvError::Disconnected) => {}
        Ok(command) => panic!("{} submitted after the session closed", command.kind()),
        Err(TryRecvError::Empty) => panic!("command stream still has a producer"),
    }
}

#[tokio::test(start_paused = true)]
async fn full_inbound_queue_drops_messages_without_closing() {
    // Stall the coordinator on a full command stream.
    let (handle, mut commands) = SimulationHandle::channel(1, Duration::from_secs(10));
    assert!(handle.seed(1, 1).await.is_delivered());

    let (inbound, reader) = scripted_reader();
    let (_written, _closed, writer) = recording_writer();
    let session = Session::new(handle, SessionSettings::default());
    let liveness = session.liveness();
    tokio::spawn(session.run(reader, writer));

    let messages: Vec<Vec<Point>> = (0..6).map(|i| vec![Point::new(i, 0)]).collect();
    for message in &messages {
        inbound.send(Ok(message.clone())).unwrap();
    }

    // Long enough for every read to either land or time out.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(liveness.phase(), SessionPhase::Active);

    // Draining frees the stream; the coordinator then catches up.
    let mut injected = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while let Ok(Some(command)) = tokio::time::timeout_at(deadline, commands.recv()).await {
        if let Command::InjectCells(points) = command {
            injected.push(points);
        }
    }

    assert!(!injected.is_empty());
    assert!(
        injected.len() < messages.len(),
        "expected drops, every message arrived"
    );
    assert_eq!(injected.first(), messages.first());
    let positions: Vec<usize> = injected
        .iter()
        .map(|points| messages.iter().position(|m| m == points).unwrap())
        .collect();
    assert!(
        positions.windows(2).all(|pair| pair[0] < pair[1]),
        "out of order: {positions:?}"
    );
    assert_eq!(liveness.phase(), SessionPhase::Active);
}
