//! Actions decided for the next pipeline cycle.

use std::fmt;

/// A point expressed as fractions of the located screen region.
///
/// `(0.0, 0.0)` is the top-left corner, `(1.0, 1.0)` the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The center of the region.
    pub fn center() -> Self {
        Self::new(0.5, 0.5)
    }

    /// Saturates both components to `[0, 1]`.  NaN becomes `0`.
    pub fn clamped(self) -> Self {
        Self::new(clamp_unit(self.x), clamp_unit(self.y))
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn clamp_signed_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-1.0, 1.0)
    }
}

/// The next UI action chosen by the decision producer.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Single touch at a normalized point.
    Tap(NormalizedPoint),
    /// Two touches at the same point.
    DoubleTap(NormalizedPoint),
    /// Drag from the screen center by a signed normalized delta.
    Swipe { dx: f64, dy: f64 },
    /// Type a string on the device keyboard.
    TypeText(String),
    /// Do nothing this cycle.
    None,
    /// The objective is complete; the session ends.
    Done,
}

impl Action {
    /// Applies the action-level clamp: points to `[0, 1]`, swipe deltas to `[-1, 1]`.
    pub fn clamped(&self) -> Action {
        match self {
            Action::Tap(p) => Action::Tap(p.clamped()),
            Action::DoubleTap(p) => Action::DoubleTap(p.clamped()),
            Action::Swipe { dx, dy } => Action::Swipe {
                dx: clamp_signed_unit(*dx),
                dy: clamp_signed_unit(*dy),
            },
            other => other.clone(),
        }
    }

    /// Returns `true` for actions that produce no HID output.
    pub fn is_idle(&self) -> bool {
        matches!(self, Action::None | Action::Done)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Tap(p) => write!(f, "tap({:.3}, {:.3})", p.x, p.y),
            Action::DoubleTap(p) => write!(f, "doubleTap({:.3}, {:.3})", p.x, p.y),
            Action::Swipe { dx, dy } => write!(f, "swipe({dx:+.3}, {dy:+.3})"),
            Action::TypeText(text) => write!(f, "type({text:?})"),
            Action::None => f.write_str("none"),
            Action::Done => f.write_str("done"),
        }
    }
}
