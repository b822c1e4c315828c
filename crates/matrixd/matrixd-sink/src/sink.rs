use crate::bus::BusWrite;
use matrixd_frame::{Frame, WIRE_LEN, WireBuffer};
use std::io;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("bus write failed: {0}")]
    Io(#[from] io::Error),

    #[error("short write: {written} of {expected} bytes accepted")]
    ShortWrite { written: usize, expected: usize },
}

/// The matrix as seen by the control loop: a bus that takes whole wire
/// buffers.
pub struct MatrixSink {
    bus: Box<dyn BusWrite>,
}

impl std::fmt::Debug for MatrixSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixSink").finish_non_exhaustive()
    }
}

impl MatrixSink {
    pub fn new<B: BusWrite + 'static>(bus: B) -> Self {
        Self { bus: Box::new(bus) }
    }

    /// Writes one encoded frame.
    ///
    /// Succeeds only if the transport accepted all 193 bytes.
    pub fn write(&mut self, buf: &WireBuffer) -> Result<(), SinkError> {
        let written = self.bus.write(buf.as_bytes())?;
        if written != WIRE_LEN {
            return Err(SinkError::ShortWrite {
                written,
                expected: WIRE_LEN,
            });
        }
        Ok(())
    }

    /// Encodes `frame` into a scratch buffer and writes it.
    ///
    /// Only for startup paths; the control loop reuses its own buffer.
    pub fn show(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let mut buf = WireBuffer::new();
        buf.encode(frame);
        self.write(&buf)
    }

    /// Turns every LED off.
    pub fn blank(&mut self) -> Result<(), SinkError> {
        self.show(&Frame::blank())
    }

    /// Flashes the whole matrix dimly, then turns it off again, pausing
    /// `pause` after each step.
    ///
    /// Failures are logged and otherwise ignored; the caller decides whether
    /// the device is usable with a final [`MatrixSink::blank`].
    pub fn self_test(&mut self, pause: Duration) {
        debug!("matrix self test");
        for frame in [Frame::filled(3, 3, 3), Frame::blank()] {
            if let Err(e) = self.show(&frame) {
                warn!(error = %e, "matrix self test write failed");
            }
            thread::sleep(pause);
        }
    }
}
