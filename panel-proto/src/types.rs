//! Wire vocabulary: device kinds, panel statuses, the frame envelope, and
//! the inbound payload types.

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Enumerated physical-device kind carried in `panel_config` entries.
///
/// The first five kinds are inputs, the next five outputs. A type string
/// the panel does not recognize maps to [`DeviceKind::Unknown`] so the
/// offending entry can be reported rather than dropped silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceKind {
    Button,
    Potentiometer,
    Encoder,
    RotarySwitch,
    Slider,
    Led,
    RgbStrip,
    SevenSegment,
    LedBar,
    Buzzer,
    Unknown,
}

impl DeviceKind {
    /// Map a wire type string to its kind.
    #[must_use]
    pub fn from_type_str(s: &str) -> Self {
        match s {
            "button" => Self::Button,
            "potentiometer" => Self::Potentiometer,
            "encoder" => Self::Encoder,
            "rotary_switch" => Self::RotarySwitch,
            "slider" => Self::Slider,
            "led" => Self::Led,
            "rgb_strip" => Self::RgbStrip,
            "7segment" => Self::SevenSegment,
            "led_bar" => Self::LedBar,
            "buzzer" => Self::Buzzer,
            _ => Self::Unknown,
        }
    }

    /// The wire type string for this kind.
    #[must_use]
    pub const fn type_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Potentiometer => "potentiometer",
            Self::Encoder => "encoder",
            Self::RotarySwitch => "rotary_switch",
            Self::Slider => "slider",
            Self::Led => "led",
            Self::RgbStrip => "rgb_strip",
            Self::SevenSegment => "7segment",
            Self::LedBar => "led_bar",
            Self::Buzzer => "buzzer",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this kind belongs to the input partition.
    #[inline]
    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(
            self,
            Self::Button | Self::Potentiometer | Self::Encoder | Self::RotarySwitch | Self::Slider
        )
    }

    /// Whether this kind belongs to the output partition.
    #[inline]
    #[must_use]
    pub const fn is_output(self) -> bool {
        matches!(
            self,
            Self::Led | Self::RgbStrip | Self::SevenSegment | Self::LedBar | Self::Buzzer
        )
    }
}

/// Panel connection/health status as reported in `panel_status` frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelStatus {
    /// Initial state, before `start`.
    #[default]
    Offline,
    /// Wi-Fi association not yet up.
    Connecting,
    /// Wi-Fi and TCP up, awaiting a valid `panel_config`.
    Configuring,
    /// Configured with zero device init failures.
    Online,
    /// Transport failure detected; a reconnection is scheduled.
    Error,
    /// Configured but at least one device failed to initialize.
    Partial,
}

impl PanelStatus {
    /// The status string used on the wire.
    ///
    /// `Connecting` and `Configuring` are collapsed to `"connecting"`: the
    /// orchestrator only distinguishes the reachable/unreachable cases.
    #[must_use]
    pub const fn wire_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Error => "error",
            Self::Partial => "partial",
            Self::Connecting | Self::Configuring => "connecting",
        }
    }
}

/// The common frame envelope: `{type, timestamp, data}`.
///
/// `timestamp` is monotonic milliseconds since boot as a decimal string.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
    #[serde(default)]
    pub data: Value,
}

/// Payload of an inbound `panel_config` frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigPayload {
    pub panel_id: String,
    #[serde(default = "default_panel_name")]
    pub name: String,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

fn default_panel_name() -> String {
    String::from("Unknown Panel")
}

/// One device declaration inside a `panel_config` payload.
///
/// `config` is an opaque JSON subtree interpreted by the handler for the
/// declared kind; unknown keys are ignored there.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub pin: u8,
    #[serde(default)]
    pub config: Value,
}

impl DeviceEntry {
    /// The declared kind, or [`DeviceKind::Unknown`] for unrecognized strings.
    #[must_use]
    pub fn device_kind(&self) -> DeviceKind {
        DeviceKind::from_type_str(&self.kind)
    }
}

/// Payload of an inbound `panel_output` frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputCommand {
    pub panel_id: String,
    pub device_id: String,
    pub command: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub context: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            DeviceKind::Button,
            DeviceKind::Potentiometer,
            DeviceKind::Encoder,
            DeviceKind::RotarySwitch,
            DeviceKind::Slider,
            DeviceKind::Led,
            DeviceKind::RgbStrip,
            DeviceKind::SevenSegment,
            DeviceKind::LedBar,
            DeviceKind::Buzzer,
        ] {
            assert_eq!(DeviceKind::from_type_str(kind.type_str()), kind);
        }
    }

    #[test]
    fn test_kind_partition_is_exclusive() {
        for kind in [
            DeviceKind::Button,
            DeviceKind::Potentiometer,
            DeviceKind::Encoder,
            DeviceKind::RotarySwitch,
            DeviceKind::Slider,
        ] {
            assert!(kind.is_input());
            assert!(!kind.is_output());
        }
        for kind in [
            DeviceKind::Led,
            DeviceKind::RgbStrip,
            DeviceKind::SevenSegment,
            DeviceKind::LedBar,
            DeviceKind::Buzzer,
        ] {
            assert!(kind.is_output());
            assert!(!kind.is_input());
        }
        assert!(!DeviceKind::Unknown.is_input());
        assert!(!DeviceKind::Unknown.is_output());
    }

    #[test]
    fn test_unknown_type_string() {
        assert_eq!(DeviceKind::from_type_str("joystick"), DeviceKind::Unknown);
        assert_eq!(DeviceKind::from_type_str(""), DeviceKind::Unknown);
    }

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(PanelStatus::Online.wire_str(), "online");
        assert_eq!(PanelStatus::Offline.wire_str(), "offline");
        assert_eq!(PanelStatus::Error.wire_str(), "error");
        assert_eq!(PanelStatus::Partial.wire_str(), "partial");
        assert_eq!(PanelStatus::Connecting.wire_str(), "connecting");
        assert_eq!(PanelStatus::Configuring.wire_str(), "connecting");
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"type":"panel_heartbeat","timestamp":"42","data":{"client_id":"helm_main"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.kind, "panel_heartbeat");
        assert_eq!(envelope.timestamp, "42");

        let encoded = serde_json::to_string(&envelope).unwrap();
        assert!(encoded.starts_with(r#"{"type":"panel_heartbeat""#));
    }

    #[test]
    fn test_config_payload_defaults() {
        let payload: ConfigPayload =
            serde_json::from_str(r#"{"panel_id":"helm_main"}"#).unwrap();
        assert_eq!(payload.panel_id, "helm_main");
        assert_eq!(payload.name, "Unknown Panel");
        assert!(payload.devices.is_empty());
    }

    #[test]
    fn test_device_entry_opaque_config() {
        let entry: DeviceEntry = serde_json::from_str(
            r#"{"id":"throttle","type":"potentiometer","pin":34,"config":{"min":0,"max":1023}}"#,
        )
        .unwrap();
        assert_eq!(entry.device_kind(), DeviceKind::Potentiometer);
        assert_eq!(entry.pin, 34);
        assert_eq!(entry.config["max"], 1023);
    }
}
