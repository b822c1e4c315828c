// A frame is the full 8x8 image in three planar channels.
// Index i addresses row i / 8, column i % 8 (row-major).
// Values are raw 8-bit intensities; nothing here clamps or normalizes them,
// the wire encoder truncates to 6 bits on its own.

/// Width and height of the LED grid.
pub const GRID_SIDE: usize = 8;

/// Number of pixels in one frame.
pub const PIXELS: usize = GRID_SIDE * GRID_SIDE;

/// One complete 8x8 RGB image.
///
/// Channels are fixed-size arrays so the geometry is known at compile time
/// and the encoder's hot loop has no bounds surprises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Frame {
    pub r: [u8; PIXELS],
    pub g: [u8; PIXELS],
    pub b: [u8; PIXELS],
}

impl Default for Frame {
    fn default() -> Self {
        Self::blank()
    }
}

impl Frame {
    /// All pixels off.
    pub const fn blank() -> Self {
        Self::filled(0, 0, 0)
    }

    /// Every pixel set to the same color.
    pub const fn filled(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: [r; PIXELS],
            g: [g; PIXELS],
            b: [b; PIXELS],
        }
    }

    /// Builds a frame by calling `f(row, col)` for every pixel.
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> (u8, u8, u8)) -> Self {
        let mut frame = Self::blank();
        for i in 0..PIXELS {
            let (r, g, b) = f(i / GRID_SIDE, i % GRID_SIDE);
            frame.r[i] = r;
            frame.g[i] = g;
            frame.b[i] = b;
        }
        frame
    }

    /// Returns `(r, g, b)` at the given grid position.
    ///
    /// # Panics
    /// Panics if `row` or `col` is outside `0..8`.
    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> (u8, u8, u8) {
        let i = index(row, col);
        (self.r[i], self.g[i], self.b[i])
    }

    /// Sets the color at the given grid position.
    ///
    /// # Panics
    /// Panics if `row` or `col` is outside `0..8`.
    #[inline]
    pub fn set_pixel(&mut self, row: usize, col: usize, (r, g, b): (u8, u8, u8)) {
        let i = index(row, col);
        self.r[i] = r;
        self.g[i] = g;
        self.b[i] = b;
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::blank()
    }
}

#[inline]
fn index(row: usize, col: usize) -> usize {
    assert!(row < GRID_SIDE && col < GRID_SIDE, "pixel ({row}, {col}) is off the grid");
    row * GRID_SIDE + col
}
