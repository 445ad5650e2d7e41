//! Input device handlers: button, potentiometer, encoder, rotary switch,
//! slider.
//!
//! Each handler owns its pin state and a one-shot changed latch. `poll`
//! samples the hardware and arms the latch when a change is accepted
//! (debounced, out of the deadzone, or a new switch index); `changed`
//! reports the latch exactly once and self-clears.

use core::mem;

use libm::fabsf;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::{parse_config, DeviceError, Orientation};
use crate::hal::Board;
use crate::{ANALOG_SMOOTHING, DEBOUNCE_DELAY_MS};

/// ADC full scale used for index mapping.
const ADC_MAX: u16 = 1023;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ButtonConfig {
    pullup: bool,
    debounce_ms: u16,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            pullup: true,
            debounce_ms: DEBOUNCE_DELAY_MS,
        }
    }
}

/// Momentary button with debounce.
///
/// A level transition is accepted only once the reading has been stable for
/// the configured debounce window; `value` is 1.0 for a high stable level.
#[derive(Debug)]
pub struct Button {
    pin: u8,
    debounce_ms: u16,
    last_reading: bool,
    stable: bool,
    last_change_ms: u64,
    changed: bool,
}

impl Button {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: ButtonConfig = parse_config(config)?;
        board.configure_input(pin, cfg.pullup)?;
        let level = board.digital_read(pin);
        Ok(Self {
            pin,
            debounce_ms: cfg.debounce_ms,
            last_reading: level,
            stable: level,
            last_change_ms: 0,
            changed: false,
        })
    }

    pub(crate) fn poll<B: Board>(&mut self, board: &mut B) {
        let now = board.now_ms();
        let reading = board.digital_read(self.pin);

        if reading != self.last_reading {
            self.last_change_ms = now;
        }
        if now.saturating_sub(self.last_change_ms) > u64::from(self.debounce_ms)
            && reading != self.stable
        {
            self.stable = reading;
            self.changed = true;
        }
        self.last_reading = reading;
    }

    pub(crate) fn changed(&mut self) -> bool {
        mem::take(&mut self.changed)
    }

    pub(crate) fn value(&self) -> f32 {
        if self.stable {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PotentiometerConfig {
    min: i32,
    max: i32,
    deadzone: i32,
    invert: bool,
    smoothing: f32,
}

impl Default for PotentiometerConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 1023,
            deadzone: 10,
            invert: false,
            smoothing: ANALOG_SMOOTHING,
        }
    }
}

/// Analog potentiometer with EWMA smoothing and a reporting deadzone.
#[derive(Debug)]
pub struct Potentiometer {
    pin: u8,
    min: i32,
    max: i32,
    deadzone: i32,
    invert: bool,
    smoothing: f32,
    smoothed: f32,
    last_reported: f32,
    changed: bool,
}

impl Potentiometer {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: PotentiometerConfig = parse_config(config)?;
        board.configure_input(pin, false)?;
        let raw = f32::from(board.analog_read(pin));
        Ok(Self {
            pin,
            min: cfg.min,
            max: cfg.max,
            deadzone: cfg.deadzone,
            invert: cfg.invert,
            smoothing: clamp_smoothing(cfg.smoothing),
            smoothed: raw,
            last_reported: raw,
            changed: false,
        })
    }

    pub(crate) fn poll<B: Board>(&mut self, board: &mut B) {
        let raw = f32::from(board.analog_read(self.pin));
        self.smoothed = self.smoothed * (1.0 - self.smoothing) + raw * self.smoothing;
        if fabsf(self.smoothed - self.last_reported) > self.deadzone as f32 {
            self.last_reported = self.smoothed;
            self.changed = true;
        }
    }

    pub(crate) fn changed(&mut self) -> bool {
        mem::take(&mut self.changed)
    }

    pub(crate) fn value(&self) -> f32 {
        let normalized = normalize(self.smoothed, self.min, self.max);
        if self.invert {
            1.0 - normalized
        } else {
            normalized
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Direction {
    #[default]
    Clockwise,
    Counterclockwise,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EncoderConfig {
    steps: i32,
    direction: Direction,
    acceleration: bool,
    button_pin: Option<u8>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            direction: Direction::Clockwise,
            acceleration: false,
            button_pin: None,
        }
    }
}

/// Rotary encoder, polled fallback.
///
/// The polled capture counts any A-channel edge and ignores B, so fast
/// rotation between two passes loses steps and direction is fixed by
/// configuration rather than quadrature phase. Interrupt-driven capture is
/// the board's business; this handler only ever reads the pins from the
/// main loop.
#[derive(Debug)]
pub struct Encoder {
    pin: u8,
    button_pin: Option<u8>,
    steps: i32,
    direction: Direction,
    position: i32,
    last_a: bool,
    last_button: bool,
    changed: bool,
}

impl Encoder {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: EncoderConfig = parse_config(config)?;
        board.configure_input(pin, true)?;
        if let Some(button_pin) = cfg.button_pin {
            board.configure_input(button_pin, true)?;
        }
        debug!(
            "encoder on pin {}: steps={} acceleration={}",
            pin,
            cfg.steps.max(1),
            cfg.acceleration
        );
        let last_a = board.digital_read(pin);
        let last_button = match cfg.button_pin {
            Some(button_pin) => !board.digital_read(button_pin),
            None => false,
        };
        Ok(Self {
            pin,
            button_pin: cfg.button_pin,
            steps: cfg.steps.max(1),
            direction: cfg.direction,
            position: 0,
            last_a,
            last_button,
            changed: false,
        })
    }

    pub(crate) fn poll<B: Board>(&mut self, board: &mut B) {
        let a = board.digital_read(self.pin);
        if a != self.last_a {
            self.position += match self.direction {
                Direction::Clockwise => 1,
                Direction::Counterclockwise => -1,
            };
            self.changed = true;
        }
        self.last_a = a;

        if let Some(button_pin) = self.button_pin {
            let pressed = !board.digital_read(button_pin);
            if pressed != self.last_button {
                self.last_button = pressed;
                self.changed = true;
            }
        }
    }

    pub(crate) fn changed(&mut self) -> bool {
        mem::take(&mut self.changed)
    }

    pub(crate) fn value(&self) -> f32 {
        self.position as f32 / self.steps as f32
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RotarySwitchConfig {
    positions: u8,
    starting_position: u8,
}

impl Default for RotarySwitchConfig {
    fn default() -> Self {
        Self {
            positions: 8,
            starting_position: 0,
        }
    }
}

/// Multi-position rotary switch read through a resistor ladder on the ADC.
#[derive(Debug)]
pub struct RotarySwitch {
    pin: u8,
    positions: u8,
    current: u8,
    changed: bool,
}

impl RotarySwitch {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: RotarySwitchConfig = parse_config(config)?;
        board.configure_input(pin, false)?;
        let positions = cfg.positions.max(1);
        Ok(Self {
            pin,
            positions,
            current: cfg.starting_position.min(positions - 1),
            changed: false,
        })
    }

    pub(crate) fn poll<B: Board>(&mut self, board: &mut B) {
        let raw = board.analog_read(self.pin);
        let index = if self.positions <= 1 {
            0
        } else {
            let top = u32::from(self.positions - 1);
            ((u32::from(raw) * top) / u32::from(ADC_MAX)).min(top) as u8
        };
        if index != self.current {
            self.current = index;
            self.changed = true;
        }
    }

    pub(crate) fn changed(&mut self) -> bool {
        mem::take(&mut self.changed)
    }

    pub(crate) fn value(&self) -> f32 {
        f32::from(self.current)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SliderConfig {
    min: i32,
    max: i32,
    deadzone: i32,
    smoothing: f32,
    orientation: Orientation,
    center_detent: bool,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 1023,
            deadzone: 10,
            smoothing: ANALOG_SMOOTHING,
            orientation: Orientation::Horizontal,
            center_detent: false,
        }
    }
}

/// Linear slide potentiometer. Same smoothing/deadzone pipeline as
/// [`Potentiometer`], but the reported value is clamped to `[0, 1]`.
#[derive(Debug)]
pub struct Slider {
    pin: u8,
    min: i32,
    max: i32,
    deadzone: i32,
    smoothing: f32,
    smoothed: f32,
    last_reported: f32,
    changed: bool,
}

impl Slider {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: SliderConfig = parse_config(config)?;
        board.configure_input(pin, false)?;
        debug!(
            "slider on pin {}: orientation={:?} center_detent={}",
            pin, cfg.orientation, cfg.center_detent
        );
        let raw = f32::from(board.analog_read(pin));
        Ok(Self {
            pin,
            min: cfg.min,
            max: cfg.max,
            deadzone: cfg.deadzone,
            smoothing: clamp_smoothing(cfg.smoothing),
            smoothed: raw,
            last_reported: raw,
            changed: false,
        })
    }

    pub(crate) fn poll<B: Board>(&mut self, board: &mut B) {
        let raw = f32::from(board.analog_read(self.pin));
        self.smoothed = self.smoothed * (1.0 - self.smoothing) + raw * self.smoothing;
        if fabsf(self.smoothed - self.last_reported) > self.deadzone as f32 {
            self.last_reported = self.smoothed;
            self.changed = true;
        }
    }

    pub(crate) fn changed(&mut self) -> bool {
        mem::take(&mut self.changed)
    }

    pub(crate) fn value(&self) -> f32 {
        normalize(self.smoothed, self.min, self.max).clamp(0.0, 1.0)
    }
}

/// Keep a configured smoothing factor inside `(0, 1]`.
fn clamp_smoothing(smoothing: f32) -> f32 {
    if smoothing > 0.0 && smoothing <= 1.0 {
        smoothing
    } else {
        ANALOG_SMOOTHING
    }
}

fn normalize(value: f32, min: i32, max: i32) -> f32 {
    let span = (max - min) as f32;
    if span == 0.0 {
        return 0.0;
    }
    (value - min as f32) / span
}
