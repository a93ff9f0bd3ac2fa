//! GATT sink: short UTF-8 commands written to a BLE write characteristic.
//!
//! The peripheral (advertised as `iControl HID`) exposes one writable
//! characteristic.  Every write carries one command such as `m:-127,-127` or
//! `mc:left`; the peripheral turns it into relative-mouse or keyboard reports
//! towards the paired phone.
//!
//! # Why a characteristic trait? (for beginners)
//!
//! Talking BLE needs a radio and the OS Bluetooth stack.  [`GattCharacteristic`]
//! hides both behind four methods, so the sink logic is tested against an
//! in-memory characteristic while [`BleCharacteristic`] does the real work.
//!
//! # Reaching the peripheral
//!
//! [`BleCharacteristic::open`] takes the first Bluetooth adapter, scans until a
//! peripheral advertising `device_name` shows up (bounded by `scan_timeout`),
//! connects, discovers services and picks the characteristic whose UUID
//! matches.  Writes use `WriteType::WithoutResponse`, one command per write.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central as _, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time;
use touchpilot_core::{HidReport, TransportFamily};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{report_kind, ConnectionState, TransportError, TransportSink};

/// Advertised name of the touchpilot BLE peripheral.
pub const DEFAULT_DEVICE_NAME: &str = "iControl HID";

/// UUID of the peripheral's command characteristic.
pub const DEFAULT_CHARACTERISTIC: Uuid = Uuid::from_u128(0xc48e6068_5295_48d3_8d5c_0395f61792b1);

/// How often the peripheral list is polled while scanning.
const SCAN_POLL: Duration = Duration::from_millis(250);

/// A writable BLE characteristic.
#[async_trait]
pub trait GattCharacteristic: Send {
    /// Human-readable target, for logs and errors.
    fn describe(&self) -> String;

    /// Connects to the peripheral and resolves the characteristic.
    async fn open(&mut self) -> Result<(), TransportError>;

    /// Writes one characteristic value.
    async fn write_value(&mut self, value: &[u8]) -> std::io::Result<()>;

    /// Disconnects from the peripheral.
    async fn close(&mut self);
}

/// Settings for [`BleCharacteristic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleConfig {
    pub device_name: String,
    pub characteristic: Uuid,
    /// Upper bound for finding the peripheral during one `open`.
    pub scan_timeout: Duration,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            characteristic: DEFAULT_CHARACTERISTIC,
            scan_timeout: Duration::from_secs(10),
        }
    }
}

/// An open link to the peripheral's command characteristic.
struct BleLink {
    // Kept alive for the lifetime of the connection.
    _adapter: Adapter,
    peripheral: Peripheral,
    characteristic: Characteristic,
}

/// A GATT write characteristic reached through the host's Bluetooth adapter.
pub struct BleCharacteristic {
    config: BleConfig,
    link: Option<BleLink>,
}

impl BleCharacteristic {
    pub fn new(config: BleConfig) -> Self {
        Self { config, link: None }
    }

    fn connect_failed(&self, source: std::io::Error) -> TransportError {
        TransportError::ConnectFailed {
            target: self.describe(),
            source,
        }
    }

    async fn first_adapter(&self) -> Result<Adapter, TransportError> {
        let manager = Manager::new().await.map_err(|e| self.connect_failed(ble_io(e)))?;
        manager
            .adapters()
            .await
            .map_err(|e| self.connect_failed(ble_io(e)))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                self.connect_failed(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no Bluetooth adapter",
                ))
            })
    }
}

fn ble_io(e: btleplug::Error) -> std::io::Error {
    std::io::Error::other(e)
}

/// Polls the adapter until a peripheral advertises `name`.
async fn find_by_name(adapter: &Adapter, name: &str) -> btleplug::Result<Peripheral> {
    loop {
        for peripheral in adapter.peripherals().await? {
            let local_name = peripheral.properties().await?.and_then(|p| p.local_name);
            if local_name.as_deref() == Some(name) {
                return Ok(peripheral);
            }
        }
        time::sleep(SCAN_POLL).await;
    }
}

#[async_trait]
impl GattCharacteristic for BleCharacteristic {
    fn describe(&self) -> String {
        format!("{} ({})", self.config.device_name, self.config.characteristic)
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        let adapter = self.first_adapter().await?;
        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| self.connect_failed(ble_io(e)))?;
        let found = time::timeout(
            self.config.scan_timeout,
            find_by_name(&adapter, &self.config.device_name),
        )
        .await;
        if let Err(e) = adapter.stop_scan().await {
            debug!("stop_scan failed: {e}");
        }
        let peripheral = match found {
            Ok(Ok(peripheral)) => peripheral,
            Ok(Err(e)) => return Err(self.connect_failed(ble_io(e))),
            Err(_) => {
                return Err(self.connect_failed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "peripheral not found while scanning",
                )))
            }
        };

        peripheral.connect().await.map_err(|e| self.connect_failed(ble_io(e)))?;
        if let Err(e) = peripheral.discover_services().await {
            let _ = peripheral.disconnect().await;
            return Err(self.connect_failed(ble_io(e)));
        }
        let wanted = self.config.characteristic;
        let Some(characteristic) = peripheral.characteristics().into_iter().find(|c| c.uuid == wanted)
        else {
            let _ = peripheral.disconnect().await;
            return Err(self.connect_failed(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "characteristic not offered by peripheral",
            )));
        };

        self.link = Some(BleLink {
            _adapter: adapter,
            peripheral,
            characteristic,
        });
        Ok(())
    }

    async fn write_value(&mut self, value: &[u8]) -> std::io::Result<()> {
        let link = self
            .link
            .as_ref()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotConnected))?;
        link.peripheral
            .write(&link.characteristic, value, WriteType::WithoutResponse)
            .await
            .map_err(ble_io)
    }

    async fn close(&mut self) {
        if let Some(link) = self.link.take() {
            if let Err(e) = link.peripheral.disconnect().await {
                debug!("BLE disconnect failed: {e}");
            }
        }
    }
}

/// Writes GATT commands through a [`GattCharacteristic`].
pub struct GattSink<C: GattCharacteristic> {
    characteristic: C,
    state: ConnectionState,
}

impl<C: GattCharacteristic> GattSink<C> {
    pub fn new(characteristic: C) -> Self {
        Self {
            characteristic,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn characteristic(&self) -> &C {
        &self.characteristic
    }
}

#[async_trait]
impl<C: GattCharacteristic> TransportSink for GattSink<C> {
    fn family(&self) -> TransportFamily {
        TransportFamily::Gatt
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.state = ConnectionState::Connecting;
        match self.characteristic.open().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!("GATT peripheral connected: {}", self.characteristic.describe());
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    async fn write_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
        let HidReport::Command(command) = report else {
            return Err(TransportError::UnsupportedReport {
                family: TransportFamily::Gatt,
                report: report_kind(report),
            });
        };
        if self.state != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }

        if let Err(e) = self.characteristic.write_value(command.as_bytes()).await {
            warn!("GATT write failed: {e}");
            self.characteristic.close().await;
            self.state = ConnectionState::Disconnected;
            return Err(TransportError::Io(e));
        }
        debug!(%command, "GATT command written");
        Ok(())
    }

    async fn close(&mut self) {
        self.characteristic.close().await;
        if self.state == ConnectionState::Connected {
            info!("GATT peripheral disconnected");
        }
        self.state = ConnectionState::Closed;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
