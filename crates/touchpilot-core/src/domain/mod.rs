//! Domain entities for touchpilot.
//!
//! This module contains the plain data types that flow through the pipeline.
//! Nothing here performs I/O: frames are already in memory, actions are
//! already decoded.
//!
//! # The three coordinate spaces (for beginners)
//!
//! A capture card produces a *raw frame* (say 1920×1080).  The phone screen
//! occupies only part of it – the *cropped screen region*.  The model reasons
//! in fractions of that region (0.0 – 1.0), and the HID peripheral finally
//! needs numbers in its own *destination* space (a 15-bit digitizer range, or
//! pixels for a relative mouse).  The types in this module name those pieces;
//! [`crate::mapping`] converts between them.

/// Captured frames, regions, and encoded images.
pub mod frame;

/// Decided actions and normalized points.
pub mod action;
