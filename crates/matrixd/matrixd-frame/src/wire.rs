//! Wire format of the Sense HAT LED matrix.
//!
//! The matrix controller (an AVR behind I2C address `0x46`) expects a single
//! 193-byte write: one header byte followed by 8 row segments of 24 bytes.
//! Each row segment holds three 8-byte blocks, red then green then blue,
//! and every intensity is 6 bits wide.
//!
//! ```text
//! byte:  0 | 1 ..  8 | 9 .. 16 | 17 .. 24 | 25 .. 32 | ... | 185 .. 192
//!        H | R row 0 | G row 0 | B row 0  | R row 1  | ... | B row 7
//! ```

use crate::frame::{Frame, GRID_SIDE, PIXELS};

/// Bytes preceding the pixel payload.
pub const HEADER_LEN: usize = 1;

/// Encoded pixel bytes: three channels for every pixel.
pub const PAYLOAD_LEN: usize = PIXELS * 3;

/// Total length of one write to the peripheral.
pub const WIRE_LEN: usize = HEADER_LEN + PAYLOAD_LEN;

// Offsets of each channel's block inside a row segment, header included.
const RED_OFFSET: usize = HEADER_LEN;
const GREEN_OFFSET: usize = HEADER_LEN + GRID_SIDE;
const BLUE_OFFSET: usize = HEADER_LEN + 2 * GRID_SIDE;

/// Reusable buffer holding exactly what gets written to the device.
///
/// The header byte is never touched by [`encode`]; it starts at zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireBuffer {
    bytes: [u8; WIRE_LEN],
}

impl Default for WireBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl WireBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; WIRE_LEN],
        }
    }

    /// Overwrites the payload with `frame`, keeping the header byte.
    #[inline]
    pub fn encode(&mut self, frame: &Frame) {
        encode(frame, &mut self.bytes);
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; WIRE_LEN] {
        &self.bytes
    }

    #[inline]
    pub fn header(&self) -> u8 {
        self.bytes[0]
    }

    pub fn set_header(&mut self, header: u8) {
        self.bytes[0] = header;
    }
}

impl AsRef<[u8]> for WireBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Maps `frame` into `out` using the peripheral's interleaved layout.
///
/// For pixel `i` on row `i / 8`, the row skips the two channel blocks
/// already emitted by earlier rows (`16` bytes per row), so red lands at
/// `i + row * 16 + 1`, green eight bytes later and blue sixteen bytes later.
/// Each intensity is divided by 4, turning 8-bit input into the 6-bit value
/// the matrix controller expects.
///
/// `out[0]` is left as it was.
#[inline]
pub fn encode(frame: &Frame, out: &mut [u8; WIRE_LEN]) {
    for i in 0..PIXELS {
        let skip = (i / GRID_SIDE) * 2 * GRID_SIDE;
        out[i + skip + RED_OFFSET] = frame.r[i] / 4;
        out[i + skip + GREEN_OFFSET] = frame.g[i] / 4;
        out[i + skip + BLUE_OFFSET] = frame.b[i] / 4;
    }
}
