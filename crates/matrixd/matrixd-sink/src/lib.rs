mod bus;
mod hardware;
pub mod platform;
mod sink;

pub use bus::BusWrite;
#[cfg(target_os = "linux")]
pub use bus::I2cDevice;
pub use hardware::{Absence, Hardware, HardwareStatus};
pub use platform::{BusOptions, SELF_TEST_PAUSE, detect, initialize};
pub use sink::{MatrixSink, SinkError};

/// 7-bit I2C address of the Sense HAT LED matrix controller.
pub const MATRIX_ADDRESS: u16 = 0x0046;
