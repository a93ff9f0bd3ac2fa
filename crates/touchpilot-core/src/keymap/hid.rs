//! USB HID Usage IDs (page 0x07, Keyboard/Keypad page) and boot reports.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page 0x07).
//!
//! # What is a HID Usage ID? (for beginners)
//!
//! The **USB Human Interface Device (HID)** standard assigns a unique number to
//! every key on a keyboard.  All keyboard keys are on usage page 0x07.
//!
//! | Key          | HID Usage ID |
//! |--------------|-------------|
//! | Letter A     | 0x04        |
//! | Digit 1      | 0x1E        |
//! | Enter        | 0x28        |
//! | Left Shift   | 0xE1        |
//!
//! HID codes are **physical key positions**, not characters.  Typing an
//! uppercase `A` means pressing the `A` position while Shift is held, which
//! in a boot report is a bit in the modifier byte rather than a second key.
//!
//! # The boot keyboard report
//!
//! ```text
//! byte 0   modifier bitmask (bit 1 = Left Shift)
//! byte 1   reserved, always 0
//! byte 2–7 up to six pressed usage IDs
//! ```
//!
//! An all-zero report means "every key released".

use serde::{Deserialize, Serialize};

/// Modifier bit for Left Shift in byte 0 of a boot report.
pub const MODIFIER_LEFT_SHIFT: u8 = 0x02;

/// An all-zero boot report: every key up.
pub const KEY_RELEASE_REPORT: [u8; 8] = [0; 8];

/// USB HID Usage ID for the keys touchpilot can type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HidKeyCode {
    // Letters (HID 0x04–0x1D)
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digits (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control and punctuation
    Enter = 0x28,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,
}

const LETTERS: [HidKeyCode; 26] = [
    HidKeyCode::KeyA,
    HidKeyCode::KeyB,
    HidKeyCode::KeyC,
    HidKeyCode::KeyD,
    HidKeyCode::KeyE,
    HidKeyCode::KeyF,
    HidKeyCode::KeyG,
    HidKeyCode::KeyH,
    HidKeyCode::KeyI,
    HidKeyCode::KeyJ,
    HidKeyCode::KeyK,
    HidKeyCode::KeyL,
    HidKeyCode::KeyM,
    HidKeyCode::KeyN,
    HidKeyCode::KeyO,
    HidKeyCode::KeyP,
    HidKeyCode::KeyQ,
    HidKeyCode::KeyR,
    HidKeyCode::KeyS,
    HidKeyCode::KeyT,
    HidKeyCode::KeyU,
    HidKeyCode::KeyV,
    HidKeyCode::KeyW,
    HidKeyCode::KeyX,
    HidKeyCode::KeyY,
    HidKeyCode::KeyZ,
];

const DIGITS: [HidKeyCode; 10] = [
    HidKeyCode::Digit0,
    HidKeyCode::Digit1,
    HidKeyCode::Digit2,
    HidKeyCode::Digit3,
    HidKeyCode::Digit4,
    HidKeyCode::Digit5,
    HidKeyCode::Digit6,
    HidKeyCode::Digit7,
    HidKeyCode::Digit8,
    HidKeyCode::Digit9,
];

impl HidKeyCode {
    /// Returns the raw USB HID Usage ID value for this key code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One key press: a modifier bitmask plus a usage ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyStroke {
    pub modifier: u8,
    pub usage: HidKeyCode,
}

impl KeyStroke {
    pub fn plain(usage: HidKeyCode) -> Self {
        Self { modifier: 0, usage }
    }

    pub fn shifted(usage: HidKeyCode) -> Self {
        Self {
            modifier: MODIFIER_LEFT_SHIFT,
            usage,
        }
    }

    /// Translates one character.  Returns `None` for anything not on the table.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a'..='z' => Some(Self::plain(LETTERS[(c as u8 - b'a') as usize])),
            'A'..='Z' => Some(Self::shifted(LETTERS[(c as u8 - b'A') as usize])),
            '0'..='9' => Some(Self::plain(DIGITS[(c as u8 - b'0') as usize])),
            '\n' => Some(Self::plain(HidKeyCode::Enter)),
            '\t' => Some(Self::plain(HidKeyCode::Tab)),
            ' ' => Some(Self::plain(HidKeyCode::Space)),
            '-' => Some(Self::plain(HidKeyCode::Minus)),
            ',' => Some(Self::plain(HidKeyCode::Comma)),
            '.' => Some(Self::plain(HidKeyCode::Period)),
            '/' => Some(Self::plain(HidKeyCode::Slash)),
            _ => None,
        }
    }

    /// The 8-byte key-down boot report for this stroke.
    pub fn press_report(&self) -> [u8; 8] {
        [self.modifier, 0, self.usage.as_u8(), 0, 0, 0, 0, 0]
    }
}
