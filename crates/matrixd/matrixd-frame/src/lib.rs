#![forbid(unsafe_code)]

pub mod frame;
pub mod wire;

pub use frame::{Frame, GRID_SIDE, PIXELS};
pub use wire::{HEADER_LEN, PAYLOAD_LEN, WIRE_LEN, WireBuffer, encode};
