//! Infrastructure layer for the agent.
//!
//! Contains the OS-facing adapters: frame acquisition, the decision producer
//! boundary, device and socket transports, and configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `touchpilot_core`, but the core crate never depends on it.
//!
//! # Sub-modules
//!
//! - **`capture`** – The `FrameSource` trait, an image-file replay source and
//!   the `CaptureSession` that owns the source for one session.
//!
//! - **`decision`** – The `DecisionProducer` trait and a scripted producer that
//!   replays recorded model replies.
//!
//! - **`transport`** – The `TransportSink` trait and its USB gadget, line bridge
//!   and GATT implementations.  A recording sink is provided for tests.
//!
//! - **`storage`** – TOML configuration loading and saving.

pub mod capture;
pub mod decision;
pub mod storage;
pub mod transport;
