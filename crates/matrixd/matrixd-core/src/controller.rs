//! The matrix controller and its single-writer control loop.
//!
//! [`MatrixController`] is a cheap, cloneable handle for producers and
//! subscribers. [`ControlLoop`] owns the wire buffer and the hardware and is
//! the only code that ever changes what is displayed. The two talk over
//! `crossbeam-channel`:
//!
//! ```text
//! push() ──► frames (bounded, 3) ──┐
//! shutdown() ──► stop (bounded, 1) ┼──► select! ──► encode ─► sink ─► state ─► broadcast
//!                 heartbeat tick ──┘
//! ```
//!
//! # Blocking call sites
//! - `push` blocks while the ingestion queue is full.
//! - The loop blocks inside the hardware write and, under
//!   [`DeliveryPolicy::Blocking`], inside `broadcast` until every subscriber
//!   has taken the frame.
//!
//! None of these time out. Shutdown is observed between iterations only, so
//! it does not interrupt a stalled broadcast.

use crate::error::ControllerError;
use crate::registry::{DeliveryPolicy, ObserverRegistry};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select, tick};
use matrixd_frame::{Frame, WireBuffer};
use matrixd_sink::{Hardware, HardwareStatus};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

#[derive(Clone, Copy, Debug)]
pub struct ControllerOptions {
    /// Frames that can wait for the loop before `push` blocks.
    pub queue_capacity: usize,
    /// Idle tick interval. Must be non-zero: a zero-period ticker is always
    /// ready and turns the loop into a busy spin.
    pub heartbeat: Duration,
    pub delivery: DeliveryPolicy,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 3,
            heartbeat: Duration::from_secs(1),
            delivery: DeliveryPolicy::Blocking,
        }
    }
}

/// Snapshot of what the controller is displaying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayStatus {
    /// Last accepted frame; blank until the first push.
    pub frame: Frame,
    pub hardware: HardwareStatus,
    pub frames_accepted: u64,
    /// Hardware writes that failed or came up short.
    pub write_failures: u64,
    /// Per-subscriber frames skipped under `DropWhenFull`.
    pub frames_dropped: u64,
}

/// Handle to a running (or not yet started) control loop.
#[derive(Clone)]
pub struct MatrixController {
    frames: Sender<Frame>,
    stop: Sender<()>,
    registry: Arc<ObserverRegistry>,
    state: Arc<RwLock<DisplayStatus>>,
}

/// The loop side. Run it on its own thread with [`ControlLoop::run`], or let
/// [`MatrixController::spawn`] do that.
pub struct ControlLoop {
    frames: Receiver<Frame>,
    stop: Receiver<()>,
    heartbeat: Duration,
    display: Display,
}

/// Everything the loop mutates while handling a frame.
struct Display {
    hardware: Hardware,
    buffer: WireBuffer,
    registry: Arc<ObserverRegistry>,
    state: Arc<RwLock<DisplayStatus>>,
}

impl MatrixController {
    /// Builds a controller handle and the loop that serves it.
    ///
    /// Nothing is processed until [`ControlLoop::run`] is called; pushes
    /// past the queue capacity block until then.
    pub fn new(hardware: Hardware, options: ControllerOptions) -> (Self, ControlLoop) {
        let (frames_tx, frames_rx) = bounded(options.queue_capacity);
        let (stop_tx, stop_rx) = bounded(1);
        let registry = Arc::new(ObserverRegistry::new(options.delivery));
        let state = Arc::new(RwLock::new(DisplayStatus {
            frame: Frame::blank(),
            hardware: hardware.status(),
            frames_accepted: 0,
            write_failures: 0,
            frames_dropped: 0,
        }));

        let controller = Self {
            frames: frames_tx,
            stop: stop_tx,
            registry: registry.clone(),
            state: state.clone(),
        };
        let control = ControlLoop {
            frames: frames_rx,
            stop: stop_rx,
            heartbeat: options.heartbeat,
            display: Display {
                hardware,
                buffer: WireBuffer::new(),
                registry,
                state,
            },
        };
        (controller, control)
    }

    /// Starts the control loop on a dedicated thread.
    ///
    /// Join the returned handle after [`MatrixController::shutdown`] to wait
    /// for the loop to finish and the hardware to be released.
    pub fn spawn(
        hardware: Hardware,
        options: ControllerOptions,
    ) -> Result<(Self, JoinHandle<()>), ControllerError> {
        let (controller, control) = Self::new(hardware, options);
        let handle = thread::Builder::new()
            .name("matrix-control".into())
            .spawn(move || control.run())
            .map_err(ControllerError::Spawn)?;
        Ok((controller, handle))
    }

    /// Queues a frame for display and broadcast.
    ///
    /// Blocks while the queue is full. Hardware write failures are not
    /// reported here; they show up in logs and in [`DisplayStatus`].
    pub fn push(&self, frame: Frame) -> Result<(), ControllerError> {
        self.frames.send(frame).map_err(|_| ControllerError::Closed)
    }

    /// Registers `tx` to receive every frame broadcast from now on.
    pub fn add_observer(&self, id: impl Into<String>, tx: Sender<Frame>) {
        self.registry.add(id, tx);
    }

    /// Creates a channel of `capacity` frames, registers it under `id` and
    /// returns the receiving side.
    pub fn subscribe(&self, id: impl Into<String>, capacity: usize) -> Receiver<Frame> {
        let (tx, rx) = bounded(capacity);
        self.registry.add(id, tx);
        rx
    }

    /// Deregisters the first subscriber named `id`. Unknown ids are ignored.
    pub fn remove_observer(&self, id: &str) -> bool {
        self.registry.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.registry.len()
    }

    /// Asks the loop to stop.
    ///
    /// Safe to call more than once: a signal already pending, or a loop that
    /// has already finished, makes this a no-op.
    pub fn shutdown(&self) {
        match self.stop.try_send(()) {
            Ok(()) => info!("matrix shutdown requested"),
            Err(TrySendError::Full(())) => debug!("matrix shutdown already pending"),
            Err(TrySendError::Disconnected(())) => debug!("matrix control loop already stopped"),
        }
    }

    /// The frame most recently accepted by the loop.
    pub fn current_frame(&self) -> Frame {
        self.state.read().unwrap_or_else(PoisonError::into_inner).frame
    }

    pub fn status(&self) -> DisplayStatus {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ControlLoop {
    /// Runs until a shutdown signal arrives or every controller handle is
    /// dropped, then releases the hardware.
    pub fn run(self) {
        let ControlLoop {
            frames,
            stop,
            heartbeat,
            display: mut screen,
        } = self;

        let hardware = screen.hardware.status();
        let delivery = screen.registry.policy();
        info!(%hardware, ?delivery, "matrix control loop started");
        let ticker = tick(heartbeat);

        loop {
            select! {
                recv(stop) -> _ => break,
                recv(frames) -> msg => match msg {
                    Ok(frame) => screen.apply(frame),
                    Err(_) => {
                        debug!("all controller handles dropped");
                        break;
                    }
                },
                recv(ticker) -> _ => screen.heartbeat(),
            }
        }

        screen.release();
    }
}

impl Display {
    fn apply(&mut self, frame: Frame) {
        let mut write_failed = false;
        if let Some(sink) = self.hardware.sink_mut() {
            self.buffer.encode(&frame);
            if let Err(e) = sink.write(&self.buffer) {
                warn!(error = %e, "matrix write failed");
                write_failed = true;
            }
        }

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.frame = frame;
            state.frames_accepted += 1;
            if write_failed {
                state.write_failures += 1;
            }
        }

        let report = self.registry.broadcast(&frame);
        trace!(
            delivered = report.delivered,
            dropped = report.dropped,
            "frame broadcast"
        );
        if report.dropped > 0 {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.frames_dropped += report.dropped as u64;
        }
    }

    fn heartbeat(&self) {
        trace!("matrix heartbeat");
    }

    fn release(self) {
        if self.hardware.is_present() {
            info!("releasing LED matrix");
        }
        drop(self.hardware);
        info!("matrix control loop stopped");
    }
}
