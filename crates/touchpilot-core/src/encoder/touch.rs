//! Absolute-touch digitizer reports for the USB gadget.
//!
//! The gadget's report descriptor declares X and Y as 15-bit absolute values
//! (`0..=32767`), little-endian, X first.  A report of four zero bytes lifts
//! the finger, so a touch-down at the origin is sent as `x = 1` instead.

use crate::domain::action::NormalizedPoint;

/// Largest value of a 15-bit digitizer axis.
pub const DIGITIZER_MAX: u16 = 0x7FFF;

/// The all-zero lift report.
pub const TOUCH_LIFT_REPORT: [u8; 4] = [0; 4];

/// Converts a fraction in `[0, 1]` to a digitizer value.
pub fn digitizer_value(fraction: f64) -> u16 {
    let scaled = (fraction.clamp(0.0, 1.0) * f64::from(DIGITIZER_MAX)).round_ties_even();
    (scaled as u16) & DIGITIZER_MAX
}

/// The touch-down report for a point given as fractions of the destination.
///
/// Never equal to [`TOUCH_LIFT_REPORT`].
pub fn touch_down_report(point: NormalizedPoint) -> [u8; 4] {
    let y = digitizer_value(point.y);
    let x = match digitizer_value(point.x) {
        0 if y == 0 => 1,
        x => x,
    };
    let (x, y) = (x.to_le_bytes(), y.to_le_bytes());
    [x[0], x[1], y[0], y[1]]
}
