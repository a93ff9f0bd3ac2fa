//! USB HID gadget sink.
//!
//! On a board running in USB device mode (for example a Raspberry Pi with the
//! `libcomposite` gadget configured), the kernel exposes each HID function as a
//! character device.  Writing a report to the device sends it to the host.
//!
//! | Path          | Function                     | Report size |
//! |---------------|------------------------------|-------------|
//! | `/dev/hidg0`  | boot keyboard                | 8 bytes     |
//! | `/dev/hidg1`  | absolute touch digitizer     | 4 bytes     |
//!
//! Both handles are opened once by `connect` and held until `close` or drop.
//! Each report is written with `write_all` followed by `flush`, so the kernel
//! sees it as one transfer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use touchpilot_core::{HidReport, TransportFamily};
use tracing::{debug, info, warn};

use super::{report_kind, ConnectionState, TransportError, TransportSink};

/// Device paths for the gadget functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GadgetConfig {
    pub keyboard_path: PathBuf,
    pub touch_path: PathBuf,
}

impl Default for GadgetConfig {
    fn default() -> Self {
        Self {
            keyboard_path: PathBuf::from("/dev/hidg0"),
            touch_path: PathBuf::from("/dev/hidg1"),
        }
    }
}

/// Writes boot-keyboard and touch reports to the gadget character devices.
pub struct GadgetSink {
    config: GadgetConfig,
    keyboard: Option<File>,
    touch: Option<File>,
    state: ConnectionState,
}

impl GadgetSink {
    pub fn new(config: GadgetConfig) -> Self {
        Self {
            config,
            keyboard: None,
            touch: None,
            state: ConnectionState::Disconnected,
        }
    }

    fn drop_handles(&mut self) {
        self.keyboard = None;
        self.touch = None;
    }
}

async fn open_device(path: &Path) -> Result<File, TransportError> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|source| TransportError::ConnectFailed {
            target: path.display().to_string(),
            source,
        })
}

async fn write_report_bytes(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

#[async_trait]
impl TransportSink for GadgetSink {
    fn family(&self) -> TransportFamily {
        TransportFamily::Gadget
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.state = ConnectionState::Connecting;
        let opened = async {
            let keyboard = open_device(&self.config.keyboard_path).await?;
            let touch = open_device(&self.config.touch_path).await?;
            Ok::<_, TransportError>((keyboard, touch))
        }
        .await;

        match opened {
            Ok((keyboard, touch)) => {
                self.keyboard = Some(keyboard);
                self.touch = Some(touch);
                self.state = ConnectionState::Connected;
                info!(
                    keyboard = %self.config.keyboard_path.display(),
                    touch = %self.config.touch_path.display(),
                    "gadget devices opened"
                );
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    async fn write_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
        let (handle, bytes): (&mut Option<File>, &[u8]) = match report {
            HidReport::Keyboard(bytes) => (&mut self.keyboard, bytes),
            HidReport::Touch(bytes) => (&mut self.touch, bytes),
            HidReport::Command(_) => {
                return Err(TransportError::UnsupportedReport {
                    family: TransportFamily::Gadget,
                    report: report_kind(report),
                })
            }
        };
        let Some(file) = handle.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        let written = write_report_bytes(file, bytes).await;
        if let Err(e) = written {
            warn!("gadget write failed: {e}");
            self.drop_handles();
            self.state = ConnectionState::Disconnected;
            return Err(TransportError::Io(e));
        }
        debug!(kind = report_kind(report), ?bytes, "gadget report written");
        Ok(())
    }

    async fn close(&mut self) {
        self.drop_handles();
        if self.state != ConnectionState::Closed {
            info!("gadget devices closed");
        }
        self.state = ConnectionState::Closed;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
