//! TOML-based configuration for the touchpilot agent.
//!
//! The file is read from `--config <path>` or, when no path is given, from the
//! platform config directory:
//! - Linux:    `$XDG_CONFIG_HOME/touchpilot/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/touchpilot/config.toml`
//! - Windows:  `%APPDATA%\touchpilot\config.toml`
//!
//! # Example
//!
//! ```toml
//! [agent]
//! objective = "Open Notes and type hello"
//! min_interval_ms = 1000
//!
//! [destination]
//! width = 280
//! height = 550
//!
//! [transport]
//! kind = "gatt"
//! max_move = 127
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a partial file (or no
//! file at all) yields a working configuration.  Sections map one-to-one onto
//! the runtime types through the conversion methods at the bottom of each
//! section (`locator_config`, `encoder_config`, `startup_retry`, ...).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touchpilot_core::{
    EncoderConfig, Extent, ImageEncoding, LocatorConfig, RelativeBounds, ThresholdPolicy,
    TransportFamily,
};
use uuid::Uuid;

use crate::application::retry::RetryPolicy;
use crate::application::sequencer::SequencerConfig;
use crate::infrastructure::transport::gatt::{DEFAULT_CHARACTERISTIC, DEFAULT_DEVICE_NAME};
use crate::infrastructure::transport::{BleConfig, GadgetConfig, LineBridgeConfig};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but lies outside its accepted range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level agent configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub locator: LocatorSettings,
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Session-level behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Goal handed to the decision producer every cycle.
    #[serde(default = "default_objective")]
    pub objective: String,
    /// Minimum wall-clock duration of one cycle.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Stop after this many cycles; `0` runs until `done` or Ctrl-C.
    #[serde(default)]
    pub max_cycles: u64,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Container for the screenshot handed to the decision producer.
    #[serde(default)]
    pub image_encoding: ImageEncoding,
}

/// Where frames come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// An image file or a directory of images.
    #[serde(default = "default_capture_source")]
    pub source: PathBuf,
}

/// Where decisions come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionConfig {
    /// Script of raw replies, one per line.
    #[serde(default = "default_decision_script")]
    pub script: PathBuf,
}

/// Threshold policy names accepted in the config file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocatorPolicy {
    #[default]
    Otsu,
    Fixed,
}

/// Screen locator tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocatorSettings {
    #[serde(default)]
    pub policy: LocatorPolicy,
    /// Gray level for the `fixed` policy.
    #[serde(default = "default_fixed_level")]
    pub fixed_level: u8,
    /// Gaussian blur applied before the `fixed` threshold.
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,
    #[serde(default = "default_min_area_ratio")]
    pub min_area_ratio: f64,
    #[serde(default = "default_margin")]
    pub margin: u32,
}

/// Size of the destination HID coordinate space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationConfig {
    #[serde(default = "default_destination_width")]
    pub width: u32,
    #[serde(default = "default_destination_height")]
    pub height: u32,
}

/// Transport selection and per-transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportConfig {
    /// `"gadget"`, `"bridge"` or `"gatt"`.
    #[serde(default = "default_transport_kind")]
    pub kind: TransportFamily,
    #[serde(default = "default_keyboard_device")]
    pub keyboard_device: PathBuf,
    #[serde(default = "default_touch_device")]
    pub touch_device: PathBuf,
    #[serde(default = "default_bridge_addr")]
    pub bridge_addr: SocketAddr,
    #[serde(default = "default_gatt_device_name")]
    pub gatt_device_name: String,
    #[serde(default = "default_gatt_characteristic")]
    pub gatt_characteristic: Uuid,
    /// How long one connect attempt scans for the GATT peripheral.
    #[serde(default = "default_gatt_scan_timeout_ms")]
    pub gatt_scan_timeout_ms: u64,
    /// Largest per-report relative displacement on the GATT mouse.
    #[serde(default = "default_max_move")]
    pub max_move: i32,
    /// Origin-reset distance; `0` derives it from the destination extent.
    #[serde(default)]
    pub reset_distance: u32,
    /// Pause between connect attempts; also bounds one line-bridge TCP connect.
    #[serde(default = "default_connect_interval_ms")]
    pub connect_interval_ms: u64,
    /// Budget for the initial connection.  Exhausting it is fatal.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Budget for reconnecting between cycles.
    #[serde(default = "default_reconnect_timeout_ms")]
    pub reconnect_timeout_ms: u64,
}

/// Encoder delays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_key_settle_ms")]
    pub key_settle_ms: u64,
    #[serde(default = "default_inter_key_ms")]
    pub inter_key_ms: u64,
    #[serde(default = "default_touch_dwell_ms")]
    pub touch_dwell_ms: u64,
    #[serde(default = "default_swipe_steps")]
    pub swipe_steps: u32,
    #[serde(default = "default_swipe_step_ms")]
    pub swipe_step_ms: u64,
    #[serde(default = "default_double_tap_gap_ms")]
    pub double_tap_gap_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_objective() -> String {
    "Describe the current screen".to_string()
}
fn default_min_interval_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_capture_source() -> PathBuf {
    PathBuf::from("frames")
}
fn default_decision_script() -> PathBuf {
    PathBuf::from("replies.jsonl")
}
fn default_fixed_level() -> u8 {
    60
}
fn default_blur_sigma() -> f32 {
    1.5
}
fn default_min_area_ratio() -> f64 {
    0.1
}
fn default_margin() -> u32 {
    4
}
fn default_destination_width() -> u32 {
    280
}
fn default_destination_height() -> u32 {
    550
}
fn default_transport_kind() -> TransportFamily {
    TransportFamily::Gadget
}
fn default_keyboard_device() -> PathBuf {
    PathBuf::from("/dev/hidg0")
}
fn default_touch_device() -> PathBuf {
    PathBuf::from("/dev/hidg1")
}
fn default_bridge_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5555))
}
fn default_gatt_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}
fn default_gatt_characteristic() -> Uuid {
    DEFAULT_CHARACTERISTIC
}
fn default_gatt_scan_timeout_ms() -> u64 {
    10_000
}
fn default_max_move() -> i32 {
    127
}
fn default_connect_interval_ms() -> u64 {
    2000
}
fn default_connect_timeout_ms() -> u64 {
    60_000
}
fn default_reconnect_timeout_ms() -> u64 {
    4000
}
fn default_key_settle_ms() -> u64 {
    40
}
fn default_inter_key_ms() -> u64 {
    20
}
fn default_touch_dwell_ms() -> u64 {
    50
}
fn default_swipe_steps() -> u32 {
    15
}
fn default_swipe_step_ms() -> u64 {
    20
}
fn default_double_tap_gap_ms() -> u64 {
    100
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            objective: default_objective(),
            min_interval_ms: default_min_interval_ms(),
            max_cycles: 0,
            log_level: default_log_level(),
            image_encoding: ImageEncoding::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: default_capture_source(),
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            script: default_decision_script(),
        }
    }
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            policy: LocatorPolicy::default(),
            fixed_level: default_fixed_level(),
            blur_sigma: default_blur_sigma(),
            min_area_ratio: default_min_area_ratio(),
            margin: default_margin(),
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            width: default_destination_width(),
            height: default_destination_height(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
            keyboard_device: default_keyboard_device(),
            touch_device: default_touch_device(),
            bridge_addr: default_bridge_addr(),
            gatt_device_name: default_gatt_device_name(),
            gatt_characteristic: default_gatt_characteristic(),
            gatt_scan_timeout_ms: default_gatt_scan_timeout_ms(),
            max_move: default_max_move(),
            reset_distance: 0,
            connect_interval_ms: default_connect_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_timeout_ms: default_reconnect_timeout_ms(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            key_settle_ms: default_key_settle_ms(),
            inter_key_ms: default_inter_key_ms(),
            touch_dwell_ms: default_touch_dwell_ms(),
            swipe_steps: default_swipe_steps(),
            swipe_step_ms: default_swipe_step_ms(),
            double_tap_gap_ms: default_double_tap_gap_ms(),
        }
    }
}

// ── Conversions into runtime types ────────────────────────────────────────────

impl AgentConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// `None` when the session is unbounded.
    pub fn max_cycles(&self) -> Option<u64> {
        (self.max_cycles > 0).then_some(self.max_cycles)
    }
}

impl LocatorSettings {
    pub fn locator_config(&self) -> LocatorConfig {
        let policy = match self.policy {
            LocatorPolicy::Otsu => ThresholdPolicy::Otsu,
            LocatorPolicy::Fixed => ThresholdPolicy::Fixed {
                level: self.fixed_level,
                blur_sigma: self.blur_sigma,
            },
        };
        LocatorConfig {
            policy,
            min_area_ratio: self.min_area_ratio,
            margin: self.margin,
        }
    }
}

impl DestinationConfig {
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }
}

/// Largest accepted `transport.max_move`.
pub const MAX_RELATIVE_MOVE: i32 = 32_767;

/// Largest accepted `transport.reset_distance`.
pub const MAX_RESET_DISTANCE: u32 = 65_535;

impl TransportConfig {
    /// Rejects relative-mouse bounds that would produce unbounded command lists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_RELATIVE_MOVE).contains(&self.max_move) {
            return Err(ConfigError::Invalid {
                field: "transport.max_move",
                reason: format!("{} is not in 1..={MAX_RELATIVE_MOVE}", self.max_move),
            });
        }
        if self.reset_distance > MAX_RESET_DISTANCE {
            return Err(ConfigError::Invalid {
                field: "transport.reset_distance",
                reason: format!("{} exceeds {MAX_RESET_DISTANCE}", self.reset_distance),
            });
        }
        Ok(())
    }

    fn connect_interval(&self) -> Duration {
        Duration::from_millis(self.connect_interval_ms)
    }

    pub fn gadget(&self) -> GadgetConfig {
        GadgetConfig {
            keyboard_path: self.keyboard_device.clone(),
            touch_path: self.touch_device.clone(),
        }
    }

    pub fn line_bridge(&self) -> LineBridgeConfig {
        LineBridgeConfig {
            addr: self.bridge_addr,
            attempt_timeout: self.connect_interval(),
        }
    }

    pub fn ble(&self) -> BleConfig {
        BleConfig {
            device_name: self.gatt_device_name.clone(),
            characteristic: self.gatt_characteristic,
            scan_timeout: Duration::from_millis(self.gatt_scan_timeout_ms),
        }
    }

    pub fn relative_bounds(&self) -> RelativeBounds {
        RelativeBounds {
            max_move: self.max_move,
            reset_distance: (self.reset_distance > 0).then_some(self.reset_distance),
        }
    }

    /// Policy for the first connection of a session.
    pub fn startup_retry(&self) -> RetryPolicy {
        RetryPolicy {
            interval: self.connect_interval(),
            timeout: Duration::from_millis(self.connect_timeout_ms),
            max_attempts: None,
        }
    }

    /// Policy for reconnecting before a cycle.
    pub fn reconnect_retry(&self) -> RetryPolicy {
        RetryPolicy {
            interval: self.connect_interval(),
            timeout: Duration::from_millis(self.reconnect_timeout_ms),
            max_attempts: None,
        }
    }
}

impl AppConfig {
    pub fn encoder_config(&self) -> EncoderConfig {
        let t = &self.timing;
        EncoderConfig {
            key_settle: Duration::from_millis(t.key_settle_ms),
            inter_key: Duration::from_millis(t.inter_key_ms),
            touch_dwell: Duration::from_millis(t.touch_dwell_ms),
            swipe_steps: t.swipe_steps,
            swipe_step: Duration::from_millis(t.swipe_step_ms),
            double_tap_gap: Duration::from_millis(t.double_tap_gap_ms),
            relative: self.transport.relative_bounds(),
        }
    }

    /// Collects the settings the action sequencer needs.
    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            objective: self.agent.objective.clone(),
            min_interval: self.agent.min_interval(),
            max_cycles: self.agent.max_cycles(),
            image_encoding: self.agent.image_encoding,
            locator: self.locator.locator_config(),
            encoder: self.encoder_config(),
            destination: self.destination.extent(),
            startup: self.transport.startup_retry(),
            reconnect: self.transport.reconnect_retry(),
        }
    }

    /// Renders the configuration as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path in the platform config directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)?
        .join("config.toml"))
}

/// Loads the configuration from the platform config directory, returning
/// `AppConfig::default()` if the file does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Loads the configuration from an explicit path.  The file must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read,
/// [`ConfigError::Parse`] if the TOML is malformed and
/// [`ConfigError::Invalid`] for out-of-range values.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    config.transport.validate()?;
    Ok(config)
}

/// Resolves the platform config directory including the `touchpilot` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("touchpilot"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("touchpilot")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("touchpilot"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── AppConfig defaults ────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_matches_documented_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.agent.min_interval(), Duration::from_secs(1));
        assert_eq!(cfg.agent.max_cycles(), None);
        assert_eq!(cfg.agent.log_level, "info");
        assert_eq!(cfg.destination.extent(), Extent::new(280, 550));
        assert_eq!(cfg.transport.kind, TransportFamily::Gadget);
        assert_eq!(cfg.transport.max_move, 127);
    }

    #[test]
    fn test_encoder_config_from_defaults_equals_encoder_default() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.encoder_config(), EncoderConfig::default());
    }

    #[test]
    fn test_locator_config_from_defaults_equals_locator_default() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.locator.locator_config(), LocatorConfig::default());
    }

    #[test]
    fn test_sequencer_config_from_defaults_equals_sequencer_default() {
        let cfg = AppConfig::default();
        let seq = cfg.sequencer_config();

        assert_eq!(seq.encoder, EncoderConfig::default());
        assert_eq!(seq.destination, Extent::new(280, 550));
        assert_eq!(seq.reconnect, SequencerConfig::default().reconnect);
        assert_eq!(seq.startup, RetryPolicy::default());
    }

    #[test]
    fn test_reset_distance_zero_means_derived() {
        let mut transport = TransportConfig::default();
        assert_eq!(transport.relative_bounds().reset_distance, None);

        transport.reset_distance = 600;
        assert_eq!(transport.relative_bounds().reset_distance, Some(600));
    }

    #[test]
    fn test_retry_policies_use_their_own_budgets() {
        let transport = TransportConfig::default();

        assert_eq!(transport.startup_retry().timeout, Duration::from_secs(60));
        assert_eq!(transport.reconnect_retry().timeout, Duration::from_secs(4));
        assert_eq!(transport.reconnect_retry().interval, Duration::from_secs(2));
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_partial_toml_fills_in_defaults() {
        // Arrange
        let text = r#"
            [agent]
            objective = "Open Notes"
            max_cycles = 5

            [locator]
            policy = "fixed"
            fixed_level = 80

            [transport]
            kind = "bridge"
            bridge_addr = "127.0.0.1:6000"
        "#;

        // Act
        let cfg: AppConfig = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(cfg.agent.objective, "Open Notes");
        assert_eq!(cfg.agent.max_cycles(), Some(5));
        assert_eq!(cfg.agent.min_interval_ms, 1000);
        assert_eq!(
            cfg.locator.locator_config().policy,
            ThresholdPolicy::Fixed {
                level: 80,
                blur_sigma: 1.5
            }
        );
        assert_eq!(cfg.transport.kind, TransportFamily::LineBridge);
        assert_eq!(cfg.transport.line_bridge().addr.port(), 6000);
        assert_eq!(cfg.timing, TimingConfig::default());
    }

    #[test]
    fn test_gatt_settings_flow_into_ble_config() {
        let text = r#"
            [transport]
            kind = "gatt"
            gatt_device_name = "Bench HID"
            gatt_scan_timeout_ms = 3000
        "#;

        let cfg: AppConfig = toml::from_str(text).unwrap();
        let ble = cfg.transport.ble();

        assert_eq!(ble.device_name, "Bench HID");
        assert_eq!(ble.characteristic, DEFAULT_CHARACTERISTIC);
        assert_eq!(ble.scan_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_unknown_transport_kind_is_parse_error() {
        let result = toml::from_str::<AppConfig>("[transport]\nkind = \"serial\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_app_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.transport.kind = TransportFamily::Gatt;
        cfg.agent.image_encoding = ImageEncoding::Jpeg;

        // Act
        let toml_str = cfg.to_toml().expect("serialize");
        let restored: AppConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    // ── Repository ────────────────────────────────────────────────────────────

    #[test]
    fn test_printed_config_loads_back_from_explicit_path() {
        // Arrange
        let path = std::env::temp_dir().join(format!("touchpilot_cfg_{}.toml", Uuid::new_v4()));
        let mut cfg = AppConfig::default();
        cfg.destination.width = 1170;
        std::fs::write(&path, cfg.to_toml().unwrap()).unwrap();

        // Act
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_config_from_missing_path_is_io_error() {
        let result = load_config_from(Path::new("/nonexistent/touchpilot/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_config_from_malformed_toml_is_parse_error() {
        let path = std::env::temp_dir().join(format!("touchpilot_bad_{}.toml", Uuid::new_v4()));
        std::fs::write(&path, "[agent\nobjective = ").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_out_of_range_relative_bounds_are_rejected() {
        for (body, field) in [
            ("max_move = 0", "transport.max_move"),
            ("max_move = 40000", "transport.max_move"),
            ("max_move = 1\nreset_distance = 4000000000", "transport.reset_distance"),
        ] {
            // Arrange
            let path = std::env::temp_dir().join(format!("touchpilot_bounds_{}.toml", Uuid::new_v4()));
            std::fs::write(&path, format!("[transport]\n{body}\n")).unwrap();

            // Act
            let result = load_config_from(&path);

            // Assert
            assert!(
                matches!(result, Err(ConfigError::Invalid { field: f, .. }) if f == field),
                "{body}: {result:?}"
            );
            std::fs::remove_file(&path).ok();
        }
    }

    #[test]
    fn test_config_file_path_ends_with_touchpilot_config() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("touchpilot/config.toml") || path.ends_with("touchpilot\\config.toml"));
        }
    }
}
