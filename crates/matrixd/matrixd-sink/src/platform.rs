//! Startup-time hardware detection.
//!
//! This is the one place that looks at the host: the Sense HAT only exists on
//! Linux ARM boards, everywhere else the daemon runs as a pure broadcast hub.

use crate::hardware::{Absence, Hardware};
use crate::sink::MatrixSink;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Pause between the steps of the startup self test.
pub const SELF_TEST_PAUSE: Duration = Duration::from_millis(100);

/// Where to find the matrix and how to bring it up.
#[derive(Clone, Debug)]
pub struct BusOptions {
    pub bus_path: PathBuf,
    pub address: u16,
    pub self_test: bool,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            bus_path: PathBuf::from("/dev/i2c-1"),
            address: crate::MATRIX_ADDRESS,
            self_test: true,
        }
    }
}

/// Decides the hardware capability for this host.
pub fn detect(options: &BusOptions) -> Hardware {
    if !platform_supported() {
        info!("no LED matrix on this platform, running without hardware");
        return Hardware::Absent(Absence::Unsupported);
    }
    open_matrix(options)
}

#[inline]
fn platform_supported() -> bool {
    cfg!(all(
        target_os = "linux",
        any(target_arch = "arm", target_arch = "aarch64")
    ))
}

#[cfg(target_os = "linux")]
fn open_matrix(options: &BusOptions) -> Hardware {
    use crate::bus::I2cDevice;

    match I2cDevice::open(&options.bus_path, options.address) {
        Ok(device) => {
            info!(
                bus = %device.path().display(),
                address = %format!("{:#04x}", device.address()),
                "opened LED matrix"
            );
            initialize(MatrixSink::new(device), options.self_test, SELF_TEST_PAUSE)
        }
        Err(e) => {
            warn!(bus = %options.bus_path.display(), error = %e, "failed to open i2c bus");
            Hardware::Absent(Absence::InitFailed(format!(
                "failed to open {}: {e}",
                options.bus_path.display()
            )))
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn open_matrix(_options: &BusOptions) -> Hardware {
    Hardware::Absent(Absence::Unsupported)
}

/// Brings an opened sink into a known state.
///
/// Optionally runs the self test, then blanks the matrix. A failed blanking
/// write means the bus is unusable and the capability is reported absent.
pub fn initialize(mut sink: MatrixSink, self_test: bool, pause: Duration) -> Hardware {
    if self_test {
        sink.self_test(pause);
    }
    match sink.blank() {
        Ok(()) => Hardware::Present(sink),
        Err(e) => {
            warn!(error = %e, "cannot use the i2c bus");
            Hardware::Absent(Absence::InitFailed(format!("cannot use the i2c bus: {e}")))
        }
    }
}
