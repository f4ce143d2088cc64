//! # ESC/POS Raster Graphics
//!
//! Commands for printing a pre-rendered 1-bit bitmap. Conversion from a
//! picture to packed bits happens outside this crate; these builders only
//! frame the bytes.
//!
//! ## Data Format
//!
//! ```text
//! Row-major, MSB first, 1 = black:
//!
//! Byte:  [b7 b6 b5 b4 b3 b2 b1 b0]
//! Pixel:  0  1  2  3  4  5  6  7
//! ```

use super::commands::{GS, u16_le};

/// # Set Left Margin (GS L nL nH)
///
/// | Format  | Bytes          |
/// |---------|----------------|
/// | ASCII   | GS L nL nH     |
/// | Hex     | 1D 4C nL nH    |
///
/// Margin is in horizontal motion units (dots on these printers).
pub fn left_margin(dots: u16) -> Vec<u8> {
    let [lo, hi] = u16_le(dots);
    vec![GS, b'L', lo, hi]
}

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d...)
///
/// | Format  | Bytes                       |
/// |---------|-----------------------------|
/// | ASCII   | GS v 0 m xL xH yL yH d...   |
/// | Hex     | 1D 76 30 00 xL xH yL yH d...|
///
/// - `width_bytes`: bytes per row (`ceil(width_dots / 8)`)
/// - `height`: number of rows
/// - `data`: `width_bytes * height` bytes
///
/// ## Example
///
/// ```
/// use bonprint::protocol::graphics;
///
/// let cmd = graphics::raster(2, 1, &[0xFF, 0x00]);
/// assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 2, 0, 1, 0]);
/// ```
pub fn raster(width_bytes: u16, height: u16, data: &[u8]) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(8 + data.len());
    cmd.extend([GS, b'v', b'0', 0]);
    cmd.extend(u16_le(width_bytes));
    cmd.extend(u16_le(height));
    cmd.extend_from_slice(data);
    cmd
}
