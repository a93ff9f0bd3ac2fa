//! Character to HID keyboard translation.
//!
//! Text from the decision producer is typed one character at a time.  Each
//! character becomes a [`KeyStroke`]; characters without a stroke are dropped.

pub mod hid;

pub use hid::{HidKeyCode, KeyStroke, KEY_RELEASE_REPORT, MODIFIER_LEFT_SHIFT};

use tracing::trace;

/// Translates `text` into keystrokes, skipping characters with no mapping.
pub fn keystrokes(text: &str) -> Vec<KeyStroke> {
    text.chars()
        .filter_map(|c| {
            let stroke = KeyStroke::from_char(c);
            if stroke.is_none() {
                trace!(character = ?c, "no HID mapping; skipped");
            }
            stroke
        })
        .collect()
}
