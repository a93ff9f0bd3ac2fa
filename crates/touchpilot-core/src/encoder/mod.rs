//! HID encoder: turns a [`ResolvedAction`] into transport-ready steps.
//!
//! The encoder never touches a device.  It returns an ordered list of
//! [`EncodedStep`]s, where each step is either one report to write or a pause
//! to wait before the next write.  The transport sink executes the list.
//!
//! # Transport families (for beginners)
//!
//! touchpilot can reach the device three ways, each speaking a different
//! "language":
//!
//! | Family        | What travels                 | Coordinates              |
//! |---------------|------------------------------|--------------------------|
//! | `Gadget`      | raw USB HID reports (bytes)  | 15-bit absolute digitizer|
//! | `LineBridge`  | `TAP x y` text lines         | normalized, 3 decimals   |
//! | `Gatt`        | `m:dx,dy` text commands      | relative mouse deltas    |
//!
//! A relative mouse has no notion of "position 70, 412".  The GATT family
//! therefore first slams the pointer into the top-left corner with a move
//! larger than the screen, then moves forward by the destination coordinates.
//!
//! # Invariants
//!
//! - Every touch-down report is followed by the all-zero lift report after at
//!   most one dwell (or one swipe step) pause.
//! - No relative move exceeds `max_move` on either axis; sub-moves sum exactly
//!   to the requested displacement.

pub mod command;
pub mod relative;
pub mod touch;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::action::NormalizedPoint;
use crate::domain::frame::Extent;
use crate::keymap::{self, hid::KEY_RELEASE_REPORT, HidKeyCode};
use crate::mapping::{DestinationPoint, Gesture, ResolvedAction};

pub use command::{BridgeCommand, GattCommand, MouseButton};
pub use relative::chunk_displacement;
pub use touch::{touch_down_report, TOUCH_LIFT_REPORT};

// ── Types ─────────────────────────────────────────────────────────────────────

/// Which encoder family (and therefore which sink) is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportFamily {
    /// USB HID gadget character devices.
    Gadget,
    /// TCP line relay to the OS Bluetooth HID stack.
    #[serde(rename = "bridge", alias = "line_bridge")]
    LineBridge,
    /// BLE GATT relative mouse/keyboard peripheral.
    Gatt,
}

impl fmt::Display for TransportFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportFamily::Gadget => "gadget",
            TransportFamily::LineBridge => "bridge",
            TransportFamily::Gatt => "gatt",
        })
    }
}

impl FromStr for TransportFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gadget" => Ok(TransportFamily::Gadget),
            "bridge" | "line_bridge" => Ok(TransportFamily::LineBridge),
            "gatt" => Ok(TransportFamily::Gatt),
            other => Err(format!(
                "unknown transport '{other}' (expected gadget, bridge or gatt)"
            )),
        }
    }
}

/// One unit written to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HidReport {
    /// 8-byte boot keyboard report, written to the keyboard stream.
    Keyboard([u8; 8]),
    /// 4-byte absolute touch report, written to the touch stream.
    Touch([u8; 4]),
    /// One text command for a bridge transport.
    Command(String),
}

impl HidReport {
    pub fn is_touch_down(&self) -> bool {
        matches!(self, HidReport::Touch(bytes) if *bytes != TOUCH_LIFT_REPORT)
    }

    pub fn is_touch_lift(&self) -> bool {
        matches!(self, HidReport::Touch(bytes) if *bytes == TOUCH_LIFT_REPORT)
    }
}

/// A report to write, or a delay before the next write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedStep {
    Report(HidReport),
    Pause(Duration),
}

/// Numeric limits of a relative-mouse transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeBounds {
    /// Largest per-axis delta in one move command.
    pub max_move: i32,
    /// Origin-reset distance; `None` derives it from the destination extent.
    pub reset_distance: Option<u32>,
}

impl Default for RelativeBounds {
    fn default() -> Self {
        Self {
            max_move: 127,
            reset_distance: None,
        }
    }
}

impl RelativeBounds {
    fn reset_for(&self, destination: Extent) -> i32 {
        let derived = destination.width.max(destination.height);
        self.reset_distance.unwrap_or(derived).min(i32::MAX as u32) as i32
    }
}

/// Delays and limits used by [`HidEncoder`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub key_settle: Duration,
    pub inter_key: Duration,
    pub touch_dwell: Duration,
    pub swipe_steps: u32,
    pub swipe_step: Duration,
    pub double_tap_gap: Duration,
    pub relative: RelativeBounds,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            key_settle: Duration::from_millis(40),
            inter_key: Duration::from_millis(20),
            touch_dwell: Duration::from_millis(50),
            swipe_steps: 15,
            swipe_step: Duration::from_millis(20),
            double_tap_gap: Duration::from_millis(100),
            relative: RelativeBounds::default(),
        }
    }
}

// ── Encoder ───────────────────────────────────────────────────────────────────

/// Stateless encoder from resolved actions to report sequences.
#[derive(Debug, Clone, Default)]
pub struct HidEncoder {
    config: EncoderConfig,
}

impl HidEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encodes `action` for `family`.
    pub fn encode(&self, action: &ResolvedAction, family: TransportFamily) -> Vec<EncodedStep> {
        let steps = match family {
            TransportFamily::Gadget => self.encode_gadget(action),
            TransportFamily::LineBridge => self.encode_line_bridge(action),
            TransportFamily::Gatt => self.encode_gatt(action),
        };
        trace!(%family, steps = steps.len(), "action encoded");
        steps
    }

    // ── USB gadget ────────────────────────────────────────────────────────────

    fn encode_gadget(&self, action: &ResolvedAction) -> Vec<EncodedStep> {
        let mut steps = Vec::new();
        match &action.gesture {
            Gesture::Tap { destination, .. } => {
                self.gadget_tap(&mut steps, fraction_of(*destination, action.destination));
            }
            Gesture::DoubleTap { destination, .. } => {
                let point = fraction_of(*destination, action.destination);
                self.gadget_tap(&mut steps, point);
                steps.push(EncodedStep::Pause(self.config.double_tap_gap));
                self.gadget_tap(&mut steps, point);
            }
            Gesture::Swipe { dx, dy } => self.gadget_swipe(&mut steps, *dx, *dy),
            Gesture::TypeText(text) => {
                for stroke in keymap::keystrokes(text) {
                    steps.push(EncodedStep::Report(HidReport::Keyboard(stroke.press_report())));
                    steps.push(EncodedStep::Pause(self.config.key_settle));
                    steps.push(EncodedStep::Report(HidReport::Keyboard(KEY_RELEASE_REPORT)));
                    steps.push(EncodedStep::Pause(self.config.inter_key));
                }
            }
        }
        steps
    }

    fn gadget_tap(&self, steps: &mut Vec<EncodedStep>, point: NormalizedPoint) {
        steps.push(EncodedStep::Report(HidReport::Touch(touch_down_report(point))));
        steps.push(EncodedStep::Pause(self.config.touch_dwell));
        steps.push(EncodedStep::Report(HidReport::Touch(TOUCH_LIFT_REPORT)));
    }

    fn gadget_swipe(&self, steps: &mut Vec<EncodedStep>, dx: f64, dy: f64) {
        let start = NormalizedPoint::center();
        let end = NormalizedPoint::new(start.x + dx, start.y + dy).clamped();
        let count = self.config.swipe_steps.max(1);

        for i in 0..count {
            let t = if count == 1 {
                1.0
            } else {
                f64::from(i) / f64::from(count - 1)
            };
            let point = NormalizedPoint::new(
                start.x + (end.x - start.x) * t,
                start.y + (end.y - start.y) * t,
            );
            steps.push(EncodedStep::Report(HidReport::Touch(touch_down_report(point))));
            steps.push(EncodedStep::Pause(self.config.swipe_step));
        }
        steps.push(EncodedStep::Report(HidReport::Touch(TOUCH_LIFT_REPORT)));
    }

    // ── Line bridge ───────────────────────────────────────────────────────────

    fn encode_line_bridge(&self, action: &ResolvedAction) -> Vec<EncodedStep> {
        let command = |c: BridgeCommand| EncodedStep::Report(HidReport::Command(c.to_string()));
        match &action.gesture {
            Gesture::Tap { normalized, .. } => vec![command(BridgeCommand::Tap {
                x: normalized.x,
                y: normalized.y,
            })],
            Gesture::DoubleTap { normalized, .. } => {
                let tap = BridgeCommand::Tap {
                    x: normalized.x,
                    y: normalized.y,
                };
                vec![
                    command(tap.clone()),
                    EncodedStep::Pause(self.config.double_tap_gap),
                    command(tap),
                ]
            }
            Gesture::Swipe { dx, dy } => vec![command(BridgeCommand::Swipe { dx: *dx, dy: *dy })],
            Gesture::TypeText(text) if text.is_empty() => Vec::new(),
            Gesture::TypeText(text) => vec![command(BridgeCommand::Type(text.clone()))],
        }
    }

    // ── GATT relative mouse ───────────────────────────────────────────────────

    fn encode_gatt(&self, action: &ResolvedAction) -> Vec<EncodedStep> {
        let mut commands = Vec::new();
        match &action.gesture {
            Gesture::Tap { destination, .. } => {
                self.gatt_position(&mut commands, *destination, action.destination);
                commands.push(GattCommand::Click(MouseButton::Left));
            }
            Gesture::DoubleTap { destination, .. } => {
                self.gatt_position(&mut commands, *destination, action.destination);
                commands.push(GattCommand::Click(MouseButton::Left));
                let mut steps = gatt_steps(commands);
                steps.push(EncodedStep::Pause(self.config.double_tap_gap));
                steps.push(gatt_step(GattCommand::Click(MouseButton::Left)));
                return steps;
            }
            Gesture::Swipe { dx, dy } => {
                let extent = action.destination;
                let center = DestinationPoint::new(
                    (f64::from(extent.width) / 2.0).round_ties_even() as i32,
                    (f64::from(extent.height) / 2.0).round_ties_even() as i32,
                );
                self.gatt_position(&mut commands, center, extent);
                commands.push(GattCommand::Press(MouseButton::Left));
                let drag_x = (dx * f64::from(extent.width)).round_ties_even() as i32;
                let drag_y = (dy * f64::from(extent.height)).round_ties_even() as i32;
                self.gatt_move(&mut commands, drag_x, drag_y);
                commands.push(GattCommand::Release(MouseButton::Left));
            }
            Gesture::TypeText(text) => gatt_text(&mut commands, text),
        }
        gatt_steps(commands)
    }

    /// Origin reset followed by the forward move to `target`.
    fn gatt_position(&self, commands: &mut Vec<GattCommand>, target: DestinationPoint, extent: Extent) {
        let reset = self.config.relative.reset_for(extent);
        self.gatt_move(commands, -reset, -reset);
        self.gatt_move(commands, target.x, target.y);
    }

    fn gatt_move(&self, commands: &mut Vec<GattCommand>, dx: i32, dy: i32) {
        commands.extend(
            chunk_displacement(dx, dy, self.config.relative.max_move)
                .into_iter()
                .map(|(dx, dy)| GattCommand::Move { dx, dy }),
        );
    }
}

fn fraction_of(point: DestinationPoint, extent: Extent) -> NormalizedPoint {
    crate::mapping::destination_fraction(point, extent)
}

fn gatt_text(commands: &mut Vec<GattCommand>, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            commands.push(GattCommand::Special(HidKeyCode::Enter));
        }
        let typable: String = line
            .chars()
            .filter(|&c| {
                let mapped = keymap::KeyStroke::from_char(c).is_some();
                if !mapped {
                    trace!(character = ?c, "no HID mapping; skipped");
                }
                mapped
            })
            .collect();
        if !typable.is_empty() {
            commands.push(GattCommand::Type(typable));
        }
    }
}

fn gatt_step(command: GattCommand) -> EncodedStep {
    EncodedStep::Report(HidReport::Command(command.to_string()))
}

fn gatt_steps(commands: Vec<GattCommand>) -> Vec<EncodedStep> {
    commands.into_iter().map(gatt_step).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(gesture: Gesture) -> ResolvedAction {
        ResolvedAction {
            gesture,
            destination: Extent::new(280, 550),
        }
    }

    fn tap_at(x: i32, y: i32) -> Gesture {
        Gesture::Tap {
            normalized: NormalizedPoint::new(0.25, 0.75),
            destination: DestinationPoint::new(x, y),
        }
    }

    fn commands(steps: &[EncodedStep]) -> Vec<&str> {
        steps
            .iter()
            .filter_map(|s| match s {
                EncodedStep::Report(HidReport::Command(c)) => Some(c.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Asserts that every touch-down is eventually lifted with only pauses
    /// and further touch-downs in between.
    fn assert_every_touch_is_lifted(steps: &[EncodedStep]) {
        let mut down = false;
        for step in steps {
            match step {
                EncodedStep::Report(r) if r.is_touch_down() => down = true,
                EncodedStep::Report(r) if r.is_touch_lift() => down = false,
                EncodedStep::Report(other) => assert!(!down, "{other:?} while touching"),
                EncodedStep::Pause(_) => {}
            }
        }
        assert!(!down, "sequence ends with the finger down");
    }

    #[test]
    fn test_gadget_tap_is_down_dwell_lift() {
        // Arrange
        let encoder = HidEncoder::default();

        // Act
        let steps = encoder.encode(&resolved(tap_at(70, 412)), TransportFamily::Gadget);

        // Assert – 70/280 = 0.25 → 8192; 412/550 · 32767 ≈ 24545.46 → 24545
        let y = 24545u16.to_le_bytes();
        assert_eq!(
            steps,
            vec![
                EncodedStep::Report(HidReport::Touch([0x00, 0x20, y[0], y[1]])),
                EncodedStep::Pause(Duration::from_millis(50)),
                EncodedStep::Report(HidReport::Touch(TOUCH_LIFT_REPORT)),
            ]
        );
    }

    #[test]
    fn test_gadget_double_tap_separated_by_gap() {
        let gesture = Gesture::DoubleTap {
            normalized: NormalizedPoint::center(),
            destination: DestinationPoint::new(140, 275),
        };
        let steps = HidEncoder::default().encode(&resolved(gesture), TransportFamily::Gadget);

        assert_eq!(steps.len(), 7);
        assert_eq!(steps[3], EncodedStep::Pause(Duration::from_millis(100)));
        assert_eq!(steps[0], steps[4]);
        assert_every_touch_is_lifted(&steps);
    }

    #[test]
    fn test_gadget_swipe_lifts_only_after_final_step() {
        // Arrange
        let encoder = HidEncoder::default();

        // Act
        let steps = encoder.encode(&resolved(Gesture::Swipe { dx: 0.0, dy: -0.4 }), TransportFamily::Gadget);

        // Assert
        let downs: Vec<_> = steps
            .iter()
            .filter(|s| matches!(s, EncodedStep::Report(r) if r.is_touch_down()))
            .collect();
        assert_eq!(downs.len(), 15);
        assert_eq!(steps.last(), Some(&EncodedStep::Report(HidReport::Touch(TOUCH_LIFT_REPORT))));
        assert_eq!(
            steps.iter().filter(|s| matches!(s, EncodedStep::Report(r) if r.is_touch_lift())).count(),
            1
        );
        assert_eq!(downs[0], &EncodedStep::Report(HidReport::Touch(touch_down_report(NormalizedPoint::center()))));
        assert_eq!(
            downs[14],
            &EncodedStep::Report(HidReport::Touch(touch_down_report(NormalizedPoint::new(0.5, 0.1))))
        );
        assert_every_touch_is_lifted(&steps);
    }

    #[test]
    fn test_gadget_swipe_target_is_clamped() {
        let encoder = HidEncoder::new(EncoderConfig {
            swipe_steps: 1,
            ..EncoderConfig::default()
        });

        let steps = encoder.encode(&resolved(Gesture::Swipe { dx: 1.0, dy: 0.0 }), TransportFamily::Gadget);

        assert_eq!(
            steps[0],
            EncodedStep::Report(HidReport::Touch(touch_down_report(NormalizedPoint::new(1.0, 0.5))))
        );
    }

    #[test]
    fn test_gadget_text_press_settle_release_gap() {
        // Arrange
        let encoder = HidEncoder::default();

        // Act – '!' has no mapping and is skipped
        let steps = encoder.encode(&resolved(Gesture::TypeText("a!".into())), TransportFamily::Gadget);

        // Assert
        assert_eq!(
            steps,
            vec![
                EncodedStep::Report(HidReport::Keyboard([0, 0, 0x04, 0, 0, 0, 0, 0])),
                EncodedStep::Pause(Duration::from_millis(40)),
                EncodedStep::Report(HidReport::Keyboard([0; 8])),
                EncodedStep::Pause(Duration::from_millis(20)),
            ]
        );
    }

    #[test]
    fn test_line_bridge_tap_uses_normalized_point() {
        let steps = HidEncoder::default().encode(&resolved(tap_at(70, 412)), TransportFamily::LineBridge);
        assert_eq!(commands(&steps), vec!["TAP 0.250 0.750"]);
    }

    #[test]
    fn test_line_bridge_double_tap_is_two_taps() {
        let gesture = Gesture::DoubleTap {
            normalized: NormalizedPoint::new(0.1, 0.2),
            destination: DestinationPoint::new(28, 110),
        };
        let steps = HidEncoder::default().encode(&resolved(gesture), TransportFamily::LineBridge);

        assert_eq!(commands(&steps), vec!["TAP 0.100 0.200", "TAP 0.100 0.200"]);
        assert_eq!(steps[1], EncodedStep::Pause(Duration::from_millis(100)));
    }

    #[test]
    fn test_line_bridge_type_and_swipe() {
        let encoder = HidEncoder::default();

        let typed = encoder.encode(&resolved(Gesture::TypeText("hi\nyou".into())), TransportFamily::LineBridge);
        let swiped = encoder.encode(&resolved(Gesture::Swipe { dx: -0.25, dy: 0.5 }), TransportFamily::LineBridge);
        let empty = encoder.encode(&resolved(Gesture::TypeText(String::new())), TransportFamily::LineBridge);

        assert_eq!(commands(&typed), vec!["TYPE hi\\nyou"]);
        assert_eq!(commands(&swiped), vec!["SWIPE -0.250 0.500"]);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_gatt_tap_resets_then_moves_then_clicks() {
        // Arrange
        let encoder = HidEncoder::default();

        // Act
        let steps = encoder.encode(&resolved(tap_at(70, 412)), TransportFamily::Gatt);

        // Assert – reset of 550 in 127-steps, then 70,412 in 127-steps
        assert_eq!(
            commands(&steps),
            vec![
                "m:-127,-127",
                "m:-127,-127",
                "m:-127,-127",
                "m:-127,-127",
                "m:-42,-42",
                "m:70,127",
                "m:0,127",
                "m:0,127",
                "m:0,31",
                "mc:left",
            ]
        );
    }

    #[test]
    fn test_gatt_explicit_reset_distance_and_wide_bound() {
        let encoder = HidEncoder::new(EncoderConfig {
            relative: RelativeBounds {
                max_move: 32767,
                reset_distance: Some(2000),
            },
            ..EncoderConfig::default()
        });

        let steps = encoder.encode(&resolved(tap_at(70, 412)), TransportFamily::Gatt);

        assert_eq!(commands(&steps), vec!["m:-2000,-2000", "m:70,412", "mc:left"]);
    }

    #[test]
    fn test_gatt_double_tap_clicks_twice_after_one_positioning() {
        let encoder = HidEncoder::new(EncoderConfig {
            relative: RelativeBounds {
                max_move: 32767,
                reset_distance: None,
            },
            ..EncoderConfig::default()
        });
        let gesture = Gesture::DoubleTap {
            normalized: NormalizedPoint::center(),
            destination: DestinationPoint::new(140, 275),
        };

        let steps = encoder.encode(&resolved(gesture), TransportFamily::Gatt);

        assert_eq!(commands(&steps), vec!["m:-550,-550", "m:140,275", "mc:left", "mc:left"]);
        assert_eq!(steps[3], EncodedStep::Pause(Duration::from_millis(100)));
    }

    #[test]
    fn test_gatt_swipe_presses_drags_and_releases() {
        // Arrange
        let encoder = HidEncoder::new(EncoderConfig {
            relative: RelativeBounds {
                max_move: 100,
                reset_distance: Some(100),
            },
            ..EncoderConfig::default()
        });

        // Act – drag of -0.4 · 550 = -220
        let steps = encoder.encode(&resolved(Gesture::Swipe { dx: 0.0, dy: -0.4 }), TransportFamily::Gatt);

        // Assert
        assert_eq!(
            commands(&steps),
            vec![
                "m:-100,-100",
                "m:100,100",
                "m:40,100",
                "m:0,75",
                "mp:left",
                "m:0,-100",
                "m:0,-100",
                "m:0,-20",
                "mr:left",
            ]
        );
    }

    #[test]
    fn test_gatt_text_splits_on_newline() {
        let steps = HidEncoder::default().encode(&resolved(Gesture::TypeText("hello\nworld\n".into())), TransportFamily::Gatt);
        assert_eq!(
            commands(&steps),
            vec!["k:hello", "ko_special:40", "k:world", "ko_special:40"]
        );
    }

    #[test]
    fn test_gatt_text_drops_unmapped_characters() {
        let encoder = HidEncoder::default();

        let typed = encoder.encode(&resolved(Gesture::TypeText("hi!é".into())), TransportFamily::Gatt);
        let nothing = encoder.encode(&resolved(Gesture::TypeText("!?\nOK".into())), TransportFamily::Gatt);

        assert_eq!(commands(&typed), vec!["k:hi"]);
        assert_eq!(commands(&nothing), vec!["ko_special:40", "k:OK"]);
    }

    #[test]
    fn test_transport_family_parses_aliases() {
        assert_eq!("gadget".parse::<TransportFamily>(), Ok(TransportFamily::Gadget));
        assert_eq!("Bridge".parse::<TransportFamily>(), Ok(TransportFamily::LineBridge));
        assert_eq!("line_bridge".parse::<TransportFamily>(), Ok(TransportFamily::LineBridge));
        assert_eq!("gatt".parse::<TransportFamily>(), Ok(TransportFamily::Gatt));
        assert!("usb".parse::<TransportFamily>().is_err());
    }
}
