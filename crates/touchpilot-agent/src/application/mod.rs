//! Application layer use cases for the agent.
//!
//! Use cases here orchestrate the core crate's pure logic and talk to the
//! outside world only through the traits defined in `infrastructure`
//! (`FrameSource`, `DecisionProducer`, `TransportSink`), so every path can be
//! exercised with in-memory implementations.
//!
//! # Sub-modules
//!
//! - **`sequencer`** – The per-session capture → decide → send loop.
//!
//! - **`retry`** – How often and for how long to retry a transport connection.

pub mod retry;
pub mod sequencer;
