//! Recording transport sink and GATT characteristic for unit and integration tests.
//!
//! # Why a mock sink?
//!
//! The real sinks need a gadget-mode USB port, a Bluetooth line relay or a BLE
//! peripheral.  `RecordingSink` replaces all of them with in-memory recording:
//! every step list passed to `send` is pushed into a shared
//! `Arc<Mutex<Vec<...>>>`, so a test can keep a handle to the log after the
//! sink itself has been boxed and moved into the sequencer.
//!
//! # Usage in tests
//!
//! ```ignore
//! let sink = RecordingSink::new(TransportFamily::Gatt);
//! let sent = sink.sent_handle();
//! let sequencer = ActionSequencer::new(/* ... */, Box::new(sink), /* ... */);
//!
//! sequencer.run().await;
//!
//! assert_eq!(sent.lock().unwrap().len(), 1);
//! ```
//!
//! # Failure injection
//!
//! - `connect_failures` – number of upcoming `connect` calls that fail.
//! - `should_fail` – when `true`, every `send` fails with an I/O error and the
//!   sink drops to `Disconnected`, as a real sink does after a broken pipe.
//!
//! # Recording characteristic
//!
//! [`RecordingCharacteristic`] stands in for the BLE characteristic behind a
//! real [`super::GattSink`], so the GATT sink's own state handling is
//! exercised while the written values land in memory.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use touchpilot_core::{EncodedStep, HidReport, TransportFamily};

use super::{ConnectionState, GattCharacteristic, TransportError, TransportSink};

/// Shared log of every value a [`RecordingCharacteristic`] accepted.
pub type WrittenLog = Arc<Mutex<Vec<String>>>;

/// Shared log of every step list a [`RecordingSink`] accepted.
pub type SentLog = Arc<Mutex<Vec<Vec<EncodedStep>>>>;

/// A sink that records sends without touching any device.
pub struct RecordingSink {
    family: TransportFamily,
    state: ConnectionState,
    sent: SentLog,
    /// Number of upcoming `connect` calls that will fail.
    pub connect_failures: u32,
    /// Total `connect` calls made so far.
    pub connect_attempts: u32,
    /// When `true`, every `send` fails and the sink drops to `Disconnected`.
    pub should_fail: bool,
}

impl RecordingSink {
    /// Creates a disconnected sink that reports `family`.
    pub fn new(family: TransportFamily) -> Self {
        Self {
            family,
            state: ConnectionState::Disconnected,
            sent: Arc::new(Mutex::new(Vec::new())),
            connect_failures: 0,
            connect_attempts: 0,
            should_fail: false,
        }
    }

    /// Makes the next `count` connect attempts fail.
    pub fn failing_connects(mut self, count: u32) -> Self {
        self.connect_failures = count;
        self
    }

    /// Returns a handle to the send log that outlives the sink.
    pub fn sent_handle(&self) -> SentLog {
        Arc::clone(&self.sent)
    }

    /// Simulates the peer dropping the connection.
    pub fn drop_connection(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}

#[async_trait]
impl TransportSink for RecordingSink {
    fn family(&self) -> TransportFamily {
        self.family
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connect_attempts += 1;
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            self.state = ConnectionState::Disconnected;
            return Err(TransportError::ConnectFailed {
                target: "mock".into(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        self.state = ConnectionState::Connected;
        Ok(())
    }

    async fn write_report(&mut self, _report: &HidReport) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }

    /// Records the whole step list, or fails if `should_fail` is set.
    async fn send(&mut self, steps: &[EncodedStep]) -> Result<(), TransportError> {
        match self.state {
            ConnectionState::Connected => {}
            ConnectionState::Closed => return Err(TransportError::Closed),
            _ => return Err(TransportError::NotConnected),
        }
        if self.should_fail {
            self.state = ConnectionState::Disconnected;
            return Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
        }
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(steps.to_vec());
        Ok(())
    }
}

/// An in-memory GATT characteristic.
#[derive(Default)]
pub struct RecordingCharacteristic {
    pub(crate) written: WrittenLog,
    /// When `true`, `open` fails as if the peripheral were out of range.
    pub fail_open: bool,
    /// When `true`, every write fails with a broken pipe.
    pub fail_writes: bool,
}

impl RecordingCharacteristic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the written values that outlives the characteristic.
    pub fn written_handle(&self) -> WrittenLog {
        Arc::clone(&self.written)
    }
}

#[async_trait]
impl GattCharacteristic for RecordingCharacteristic {
    fn describe(&self) -> String {
        "recording characteristic".to_string()
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        if self.fail_open {
            return Err(TransportError::ConnectFailed {
                target: self.describe(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(())
    }

    async fn write_value(&mut self, value: &[u8]) -> std::io::Result<()> {
        if self.fail_writes {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        }
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(String::from_utf8_lossy(value).into_owned());
        Ok(())
    }

    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink_records_sends() {
        // Arrange
        let mut sink = RecordingSink::new(TransportFamily::LineBridge);
        let sent = sink.sent_handle();
        sink.connect().await.unwrap();

        // Act
        sink.send(&[EncodedStep::Report(HidReport::Command("TAP 0.500 0.500".into()))])
            .await
            .unwrap();

        // Assert
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_connects_count_down() {
        let mut sink = RecordingSink::new(TransportFamily::Gadget).failing_connects(2);

        assert!(sink.connect().await.is_err());
        assert!(sink.connect().await.is_err());
        assert!(sink.connect().await.is_ok());
        assert_eq!(sink.connect_attempts, 3);
        assert_eq!(sink.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_should_fail_drops_to_disconnected() {
        let mut sink = RecordingSink::new(TransportFamily::Gatt);
        sink.connect().await.unwrap();
        sink.should_fail = true;

        let result = sink.send(&[]).await;

        assert!(matches!(result, Err(TransportError::Io(_))));
        assert_eq!(sink.state(), ConnectionState::Disconnected);
    }
}
