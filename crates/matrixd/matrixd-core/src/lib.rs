mod controller;
mod error;
mod registry;

pub use controller::{ControlLoop, ControllerOptions, DisplayStatus, MatrixController};
pub use crossbeam_channel::{Receiver, Sender};
pub use error::ControllerError;
pub use registry::{BroadcastReport, DeliveryPolicy, ObserverRegistry};
