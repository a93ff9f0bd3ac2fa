//! Line bridge sink: newline-terminated commands over a loopback TCP stream.
//!
//! A relay process on the same machine owns the Bluetooth HID profile and
//! listens on a local port (default `127.0.0.1:5555`).  touchpilot keeps one
//! persistent stream open and writes one command per line:
//!
//! ```text
//! TAP 0.250 0.750\n
//! TYPE hello\n
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time;
use touchpilot_core::{HidReport, TransportFamily};
use tracing::{debug, info, warn};

use super::{report_kind, ConnectionState, TransportError, TransportSink};

/// Where the line relay listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBridgeConfig {
    pub addr: SocketAddr,
    /// Upper bound for one TCP connect attempt.
    pub attempt_timeout: Duration,
}

impl Default for LineBridgeConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5555)),
            attempt_timeout: Duration::from_secs(2),
        }
    }
}

/// Writes bridge commands to the local line relay.
pub struct LineBridgeSink {
    config: LineBridgeConfig,
    stream: Option<TcpStream>,
    state: ConnectionState,
}

impl LineBridgeSink {
    pub fn new(config: LineBridgeConfig) -> Self {
        Self {
            config,
            stream: None,
            state: ConnectionState::Disconnected,
        }
    }
}

/// Opens a TCP stream with a per-attempt timeout.
pub(crate) async fn connect_stream(
    addr: SocketAddr,
    attempt_timeout: Duration,
) -> Result<TcpStream, TransportError> {
    let connect_failed = |source| TransportError::ConnectFailed {
        target: addr.to_string(),
        source,
    };
    let stream = match time::timeout(attempt_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(connect_failed(e)),
        Err(_) => {
            return Err(connect_failed(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connect timed out",
            )))
        }
    };
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Writes one newline-terminated line and flushes it.
pub(crate) async fn write_line(stream: &mut TcpStream, line: &str) -> std::io::Result<()> {
    let mut frame = Vec::with_capacity(line.len() + 1);
    frame.extend_from_slice(line.as_bytes());
    frame.push(b'\n');
    stream.write_all(&frame).await?;
    stream.flush().await
}

#[async_trait]
impl TransportSink for LineBridgeSink {
    fn family(&self) -> TransportFamily {
        TransportFamily::LineBridge
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.state = ConnectionState::Connecting;
        match connect_stream(self.config.addr, self.config.attempt_timeout).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = ConnectionState::Connected;
                info!("line bridge connected to {}", self.config.addr);
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    async fn write_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
        let HidReport::Command(line) = report else {
            return Err(TransportError::UnsupportedReport {
                family: TransportFamily::LineBridge,
                report: report_kind(report),
            });
        };
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        let written = write_line(stream, line).await;
        if let Err(e) = written {
            warn!("line bridge write failed: {e}");
            self.stream = None;
            self.state = ConnectionState::Disconnected;
            return Err(TransportError::Io(e));
        }
        debug!(command = %line, "line bridge command sent");
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            info!("line bridge connection closed");
        }
        self.state = ConnectionState::Closed;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
