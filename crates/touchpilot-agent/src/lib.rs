//! # touchpilot-agent
//!
//! The agent process: grabs frames of a device screen, asks a decision
//! producer what to do next, and drives the device through a USB HID gadget
//! or a Bluetooth bridge.
//!
//! # Architecture (for beginners)
//!
//! ```text
//! capture card / image files
//!         ↓  Frame
//! [touchpilot-agent]
//!   ├── application/
//!   │     ├── sequencer   capture → locate → decide → map → encode → send
//!   │     └── retry       connect polling with a time budget
//!   └── infrastructure/
//!         ├── capture     FrameSource, ImageFileSource, CaptureSession
//!         ├── decision    DecisionProducer, ScriptedDecisionProducer
//!         ├── transport   TransportSink: gadget, line bridge, GATT
//!         └── storage     TOML configuration
//!         ↓  HID reports / bridge commands
//! phone or tablet
//! ```
//!
//! The pure pieces (locator, mapper, encoder, reply decoder) live in
//! `touchpilot-core`; this crate adds the I/O around them.

pub mod application;
pub mod infrastructure;
