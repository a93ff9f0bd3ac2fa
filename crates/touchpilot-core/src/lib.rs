//! # touchpilot-core
//!
//! Shared library for touchpilot containing the frame and action data model,
//! the screen locator, the coordinate mapper, the keycode table, the HID
//! report encoder, and the decoder for decision-producer replies.
//!
//! This crate is used by the agent application.
//! It has zero dependencies on device files, sockets, or async runtimes.
//!
//! # Architecture overview (for beginners)
//!
//! touchpilot drives a touch-screen device (for example a phone) from a
//! vision model.  A capture card films the device's screen, a model looks at
//! the picture and decides what to do next ("tap here", "type hello"), and
//! touchpilot turns that decision into the raw bytes a USB or Bluetooth HID
//! peripheral would send.
//!
//! This crate (`touchpilot-core`) is the pure part of that pipeline:
//!
//! - **`domain`** – The data model: [`Frame`], [`ScreenRegion`], [`Action`],
//!   normalized points and extents.
//!
//! - **`locator`** – Finds where the device's screen sits inside a captured
//!   frame (the capture is usually letterboxed by black bars).
//!
//! - **`mapping`** – Converts between the three coordinate spaces: the raw
//!   frame, the cropped device screen, and the destination HID space.
//!
//! - **`keymap`** – The character → USB HID Usage ID table for typing text.
//!
//! - **`encoder`** – Turns a resolved action into the ordered list of reports
//!   and pauses for one transport family (USB gadget, line bridge, BLE GATT).
//!
//! - **`decision`** – Decodes the model's free-form reply into an [`Action`].

pub mod decision;
pub mod domain;
pub mod encoder;
pub mod keymap;
pub mod locator;
pub mod mapping;

// Re-export the most-used types at the crate root so callers can write
// `touchpilot_core::Action` instead of `touchpilot_core::domain::action::Action`.
pub use decision::{decode_reply, Decision, DecodeError};
pub use domain::action::{Action, NormalizedPoint};
pub use domain::frame::{EncodedFrame, Extent, Frame, FrameError, ImageEncoding, ScreenRegion};
pub use encoder::{
    EncodedStep, EncoderConfig, HidEncoder, HidReport, RelativeBounds, TransportFamily,
};
pub use keymap::hid::{HidKeyCode, KeyStroke};
pub use locator::{LocatedRegion, LocatorConfig, ScreenLocator, ThresholdPolicy};
pub use mapping::{
    AffineMap, CoordinateFrame, CoordinateMapper, DestinationPoint, Gesture, ResolvedAction,
};
