//! Text command sets for the two Bluetooth bridge transports.
//!
//! # Line bridge
//!
//! A local relay process owns the OS Bluetooth HID profile and accepts one
//! ASCII command per line:
//!
//! ```text
//! TAP 0.250 0.750
//! SWIPE 0.000 -0.400
//! TYPE hello\nworld
//! ```
//!
//! # GATT peripheral
//!
//! The BLE peripheral exposes one write characteristic.  Each write carries
//! one short UTF-8 command:
//!
//! | Command              | Meaning                                  |
//! |----------------------|------------------------------------------|
//! | `k:<text>`           | type `text`                              |
//! | `ko:<char>`          | type one character                       |
//! | `ko_special:<code>`  | press one HID usage (decimal)            |
//! | `kh:<code>`          | hold one HID usage (decimal)             |
//! | `m:<dx>,<dy>`        | relative mouse move                      |
//! | `mc:<button>`        | click                                    |
//! | `mp:<button>`        | press and hold                           |
//! | `mr:<button>`        | release                                  |

use std::fmt;

use crate::keymap::hid::HidKeyCode;

/// Mouse buttons understood by the GATT peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

/// One command for the GATT relative-mouse/keyboard peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattCommand {
    Type(String),
    TypeChar(char),
    Special(HidKeyCode),
    Hold(HidKeyCode),
    Move { dx: i32, dy: i32 },
    Click(MouseButton),
    Press(MouseButton),
    Release(MouseButton),
}

impl fmt::Display for GattCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GattCommand::Type(text) => write!(f, "k:{text}"),
            GattCommand::TypeChar(c) => write!(f, "ko:{c}"),
            GattCommand::Special(code) => write!(f, "ko_special:{}", code.as_u8()),
            GattCommand::Hold(code) => write!(f, "kh:{}", code.as_u8()),
            GattCommand::Move { dx, dy } => write!(f, "m:{dx},{dy}"),
            GattCommand::Click(b) => write!(f, "mc:{}", b.as_str()),
            GattCommand::Press(b) => write!(f, "mp:{}", b.as_str()),
            GattCommand::Release(b) => write!(f, "mr:{}", b.as_str()),
        }
    }
}

/// One command for the line bridge relay.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    Tap { x: f64, y: f64 },
    Swipe { dx: f64, dy: f64 },
    Type(String),
}

impl fmt::Display for BridgeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeCommand::Tap { x, y } => write!(f, "TAP {x:.3} {y:.3}"),
            BridgeCommand::Swipe { dx, dy } => write!(f, "SWIPE {dx:.3} {dy:.3}"),
            BridgeCommand::Type(text) => write!(f, "TYPE {}", escape_line(text)),
        }
    }
}

/// Escapes a payload so it fits on one line: `\` → `\\`, newline → `\n`.
pub fn escape_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}
