//! Device handlers: one variant per physical-device kind.
//!
//! Handlers are closed tagged variants rather than trait objects, so a
//! device table slot stores its handler inline with no heap indirection and
//! reconfiguration never churns allocations. The input/output partition is
//! enforced here: [`InputHandler::build`] only accepts input kinds,
//! [`OutputHandler::build`] only output kinds.

pub mod input;
pub mod output;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::hal::{Board, PinError};
use panel_proto::DeviceKind;

pub use input::{Button, Encoder, Potentiometer, RotarySwitch, Slider};
pub use output::{Buzzer, Led, LedBar, RgbStrip, SevenSegment};

/// Error type for handler construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// The kind does not belong to the requested partition.
    Partition,
    /// The config subtree does not decode for this kind.
    Config,
    /// The board rejected a pin configuration.
    Pin(PinError),
}

impl From<PinError> for DeviceError {
    fn from(err: PinError) -> Self {
        Self::Pin(err)
    }
}

/// Physical layout of a slider or bar-graph device. Informational for
/// inputs; declared so configs can carry it either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Decode a per-kind config subtree, treating an absent subtree as all
/// defaults.
fn parse_config<T: DeserializeOwned + Default>(config: &Value) -> Result<T, DeviceError> {
    if config.is_null() {
        return Ok(T::default());
    }
    T::deserialize(config).map_err(|_| DeviceError::Config)
}

/// Handler for one input device.
#[derive(Debug)]
pub enum InputHandler {
    Button(Button),
    Potentiometer(Potentiometer),
    Encoder(Encoder),
    RotarySwitch(RotarySwitch),
    Slider(Slider),
}

impl InputHandler {
    /// Construct and initialize the handler for an input kind.
    pub fn build<B: Board>(
        kind: DeviceKind,
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        match kind {
            DeviceKind::Button => Button::init(pin, config, board).map(Self::Button),
            DeviceKind::Potentiometer => {
                Potentiometer::init(pin, config, board).map(Self::Potentiometer)
            }
            DeviceKind::Encoder => Encoder::init(pin, config, board).map(Self::Encoder),
            DeviceKind::RotarySwitch => {
                RotarySwitch::init(pin, config, board).map(Self::RotarySwitch)
            }
            DeviceKind::Slider => Slider::init(pin, config, board).map(Self::Slider),
            _ => Err(DeviceError::Partition),
        }
    }

    /// Sample the hardware and update debounce/smoothing state.
    pub fn poll<B: Board>(&mut self, board: &mut B) {
        match self {
            Self::Button(h) => h.poll(board),
            Self::Potentiometer(h) => h.poll(board),
            Self::Encoder(h) => h.poll(board),
            Self::RotarySwitch(h) => h.poll(board),
            Self::Slider(h) => h.poll(board),
        }
    }

    /// Self-resetting edge latch: reports each accepted change exactly once.
    pub fn changed(&mut self) -> bool {
        match self {
            Self::Button(h) => h.changed(),
            Self::Potentiometer(h) => h.changed(),
            Self::Encoder(h) => h.changed(),
            Self::RotarySwitch(h) => h.changed(),
            Self::Slider(h) => h.changed(),
        }
    }

    /// The current reported value.
    #[must_use]
    pub fn value(&self) -> f32 {
        match self {
            Self::Button(h) => h.value(),
            Self::Potentiometer(h) => h.value(),
            Self::Encoder(h) => h.value(),
            Self::RotarySwitch(h) => h.value(),
            Self::Slider(h) => h.value(),
        }
    }

    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Button(_) => "button",
            Self::Potentiometer(_) => "potentiometer",
            Self::Encoder(_) => "encoder",
            Self::RotarySwitch(_) => "rotary_switch",
            Self::Slider(_) => "slider",
        }
    }
}

/// Handler for one output device.
#[derive(Debug)]
pub enum OutputHandler {
    Led(Led),
    RgbStrip(RgbStrip),
    SevenSegment(SevenSegment),
    LedBar(LedBar),
    Buzzer(Buzzer),
}

impl OutputHandler {
    /// Construct and initialize the handler for an output kind.
    pub fn build<B: Board>(
        kind: DeviceKind,
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        match kind {
            DeviceKind::Led => Led::init(pin, config, board).map(Self::Led),
            DeviceKind::RgbStrip => RgbStrip::init(pin, config, board).map(Self::RgbStrip),
            DeviceKind::SevenSegment => {
                SevenSegment::init(pin, config, board).map(Self::SevenSegment)
            }
            DeviceKind::LedBar => LedBar::init(pin, config, board).map(Self::LedBar),
            DeviceKind::Buzzer => Buzzer::init(pin, config, board).map(Self::Buzzer),
            _ => Err(DeviceError::Partition),
        }
    }

    /// Drive the device from a normalized value in `[0, 1]`.
    pub fn set_value<B: Board>(&mut self, value: f32, board: &mut B) {
        match self {
            Self::Led(h) => h.set_value(value, board),
            Self::RgbStrip(h) => h.set_value(value, board),
            Self::SevenSegment(h) => h.set_value(value),
            Self::LedBar(h) => h.set_value(value),
            Self::Buzzer(h) => h.set_value(value, board),
        }
    }

    /// Apply a named command. Returns whether the command was recognized.
    pub fn set_command<B: Board>(&mut self, command: &str, value: &Value, board: &mut B) -> bool {
        match self {
            Self::Led(h) => h.set_command(command, value, board),
            Self::RgbStrip(h) => h.set_command(command, value, board),
            Self::SevenSegment(h) => h.set_command(command, value),
            Self::LedBar(h) => h.set_command(command, value),
            Self::Buzzer(h) => h.set_command(command, value, board),
        }
    }

    /// Advance internal timers (blink, tone duration).
    pub fn poll<B: Board>(&mut self, board: &mut B) {
        match self {
            Self::Led(h) => h.poll(board),
            Self::Buzzer(h) => h.poll(board),
            Self::RgbStrip(_) | Self::SevenSegment(_) | Self::LedBar(_) => {}
        }
    }

    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Led(_) => "led",
            Self::RgbStrip(_) => "rgb_strip",
            Self::SevenSegment(_) => "7segment",
            Self::LedBar(_) => "led_bar",
            Self::Buzzer(_) => "buzzer",
        }
    }
}
