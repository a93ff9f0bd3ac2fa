//! Transport sinks: deliver encoded HID steps to the device.
//!
//! Each sink owns exactly one connection and executes one step list at a time
//! (`send` takes `&mut self`).  `Pause` steps are slept with
//! `tokio::time::sleep`, so a touch dwell never blocks the runtime thread.
//!
//! # Connection state machine
//!
//! ```text
//!              connect()            success
//! Disconnected ─────────► Connecting ───────► Connected
//!      ▲                      │                   │
//!      └──────── failure ─────┘   write error /   │
//!      ▲                          peer drop       │
//!      └──────────────────────────────────────────┘
//!
//! any state ── close() ──► Closed
//! ```
//!
//! Sinks never reconnect on their own.  The sequencer decides when to retry,
//! using [`crate::application::retry::RetryPolicy`].
//!
//! # Sub-modules
//!
//! - **`gadget`** – USB HID gadget character devices (`/dev/hidg0`, `/dev/hidg1`).
//! - **`line_bridge`** – TCP line relay in front of the OS Bluetooth HID stack.
//! - **`gatt`** – BLE GATT peripheral reached through a write characteristic.
//! - **`mock`** – In-memory recording sink and characteristic for tests.

pub mod gadget;
pub mod gatt;
pub mod line_bridge;
pub mod mock;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use touchpilot_core::{EncodedStep, HidReport, TransportFamily};

use crate::infrastructure::storage::config::TransportConfig;

pub use gadget::{GadgetConfig, GadgetSink};
pub use gatt::{BleCharacteristic, BleConfig, GattCharacteristic, GattSink};
pub use line_bridge::{LineBridgeConfig, LineBridgeSink};

/// Errors that can occur while connecting to or writing to a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device or peer could not be opened.
    #[error("failed to connect to {target}: {source}")]
    ConnectFailed {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on an established connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `send` was called while the sink is not connected.
    #[error("transport is not connected")]
    NotConnected,

    /// The report kind cannot travel over this transport.
    #[error("{family} transport cannot carry {report} reports")]
    UnsupportedReport {
        family: TransportFamily,
        report: &'static str,
    },

    /// The sink was closed and will not accept further work.
    #[error("transport closed")]
    Closed,
}

/// Lifecycle of a sink's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        })
    }
}

/// Short name of a report kind, for error messages and logs.
pub(crate) fn report_kind(report: &HidReport) -> &'static str {
    match report {
        HidReport::Keyboard(_) => "keyboard",
        HidReport::Touch(_) => "touch",
        HidReport::Command(_) => "command",
    }
}

/// A destination for encoded HID steps.
///
/// Implementors provide `connect`, `write_report` and `close`; the provided
/// `send` walks the step list, sleeping on pauses and writing each report as
/// one unit.
#[async_trait]
pub trait TransportSink: Send {
    /// The encoder family this sink understands.
    fn family(&self) -> TransportFamily;

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Makes exactly one connection attempt.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Writes one report.  Implementations move to `Disconnected` on I/O failure.
    async fn write_report(&mut self, report: &HidReport) -> Result<(), TransportError>;

    /// Releases the connection.  The sink ends in `Closed`.
    async fn close(&mut self);

    /// Executes `steps` in order.
    async fn send(&mut self, steps: &[EncodedStep]) -> Result<(), TransportError> {
        match self.state() {
            ConnectionState::Connected => {}
            ConnectionState::Closed => return Err(TransportError::Closed),
            _ => return Err(TransportError::NotConnected),
        }
        for step in steps {
            match step {
                EncodedStep::Pause(delay) => tokio::time::sleep(*delay).await,
                EncodedStep::Report(report) => self.write_report(report).await?,
            }
        }
        Ok(())
    }
}

/// Builds the sink selected by `family` from the transport configuration.
pub fn build_sink(family: TransportFamily, config: &TransportConfig) -> Box<dyn TransportSink> {
    match family {
        TransportFamily::Gadget => Box::new(GadgetSink::new(config.gadget())),
        TransportFamily::LineBridge => Box::new(LineBridgeSink::new(config.line_bridge())),
        TransportFamily::Gatt => Box::new(GattSink::new(BleCharacteristic::new(config.ble()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_unsupported_report_message_names_family_and_kind() {
        let err = TransportError::UnsupportedReport {
            family: TransportFamily::Gadget,
            report: report_kind(&HidReport::Command("TAP 0 0".into())),
        };
        assert_eq!(err.to_string(), "gadget transport cannot carry command reports");
    }

    #[test]
    fn test_build_sink_matches_requested_family() {
        // Arrange
        let config = TransportConfig::default();

        // Act / Assert
        for family in [TransportFamily::Gadget, TransportFamily::LineBridge, TransportFamily::Gatt] {
            let sink = build_sink(family, &config);
            assert_eq!(sink.family(), family);
            assert_eq!(sink.state(), ConnectionState::Disconnected);
        }
    }
}
