//! Output device handlers: LED, RGB strip, seven-segment, bar graph,
//! buzzer.
//!
//! Outputs are driven two ways: `set_value` maps a normalized `[0, 1]`
//! value onto the device, and `set_command` applies a named command with a
//! kind-specific payload. `poll` advances the handlers that carry timers
//! (LED blink, buzzer duration); the display-only handlers keep their state
//! between passes.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use libm::{floorf, roundf};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::{parse_config, DeviceError, Orientation};
use crate::hal::{Board, Rgb};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LedConfig {
    pwm: bool,
    max_brightness: u8,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            pwm: true,
            max_brightness: 255,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Blink {
    start_ms: u64,
    rate_ms: u64,
    duration_ms: u64,
}

/// Single indicator LED, PWM-dimmed or plain on/off.
#[derive(Debug)]
pub struct Led {
    pin: u8,
    pwm: bool,
    max_brightness: u8,
    brightness: u8,
    blink: Option<Blink>,
}

impl Led {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: LedConfig = parse_config(config)?;
        board.configure_output(pin)?;
        board.digital_write(pin, false);
        if cfg.pwm {
            board.configure_pwm(pin)?;
        }
        Ok(Self {
            pin,
            pwm: cfg.pwm,
            max_brightness: cfg.max_brightness,
            brightness: 0,
            blink: None,
        })
    }

    pub(crate) fn set_value<B: Board>(&mut self, value: f32, board: &mut B) {
        let level = roundf(value * f32::from(self.max_brightness));
        self.brightness = if level <= 0.0 {
            0
        } else if level >= 255.0 {
            255
        } else {
            level as u8
        };
        if self.pwm {
            board.pwm_write(self.pin, self.brightness);
        } else {
            board.digital_write(self.pin, self.brightness > 0);
        }
    }

    pub(crate) fn set_command<B: Board>(
        &mut self,
        command: &str,
        value: &Value,
        board: &mut B,
    ) -> bool {
        match command {
            "set_brightness" => {
                let raw = value.as_f64().unwrap_or(0.0) as f32;
                self.set_value(raw / 255.0, board);
                true
            }
            "set_state" => {
                let on = value.as_bool().unwrap_or(false);
                self.set_value(if on { 1.0 } else { 0.0 }, board);
                true
            }
            "blink" => {
                let rate_ms = value
                    .get("rate")
                    .and_then(Value::as_u64)
                    .unwrap_or(500)
                    .max(1);
                let duration_ms = value.get("duration").and_then(Value::as_u64).unwrap_or(5000);
                self.blink = Some(Blink {
                    start_ms: board.now_ms(),
                    rate_ms,
                    duration_ms,
                });
                true
            }
            _ => false,
        }
    }

    pub(crate) fn poll<B: Board>(&mut self, board: &mut B) {
        let Some(blink) = self.blink else {
            return;
        };
        let elapsed = board.now_ms().saturating_sub(blink.start_ms);
        if elapsed > blink.duration_ms {
            self.blink = None;
            self.set_value(0.0, board);
        } else {
            let on = (elapsed / blink.rate_ms) % 2 == 0;
            self.set_value(if on { 1.0 } else { 0.0 }, board);
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RgbStripConfig {
    pixels: u16,
    max_brightness: u8,
    #[serde(rename = "type")]
    strip_type: String,
}

impl Default for RgbStripConfig {
    fn default() -> Self {
        Self {
            pixels: 12,
            max_brightness: 128,
            strip_type: String::from("WS2812B"),
        }
    }
}

/// Addressable RGB strip. The `type` config string is a driver hint; only
/// the WS2812B path is driven.
#[derive(Debug)]
pub struct RgbStrip {
    pin: u8,
    pixels: u16,
    colors: Vec<Rgb>,
}

impl RgbStrip {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: RgbStripConfig = parse_config(config)?;
        debug!(
            "rgb strip on pin {}: {} pixels, driver hint {}",
            pin, cfg.pixels, cfg.strip_type
        );
        board.configure_strip(pin, cfg.pixels, cfg.max_brightness)?;
        let colors = vec![Rgb::BLACK; usize::from(cfg.pixels)];
        board.strip_write(pin, &colors);
        Ok(Self {
            pin,
            pixels: cfg.pixels,
            colors,
        })
    }

    pub(crate) fn set_value<B: Board>(&mut self, value: f32, board: &mut B) {
        let level = (value.clamp(0.0, 1.0) * 255.0) as u8;
        self.colors.fill(Rgb::grey(level));
        board.strip_write(self.pin, &self.colors);
    }

    pub(crate) fn set_command<B: Board>(
        &mut self,
        command: &str,
        value: &Value,
        board: &mut B,
    ) -> bool {
        match command {
            "set_all" => {
                if let Some(color) = rgb_from(value) {
                    self.colors.fill(color);
                    board.strip_write(self.pin, &self.colors);
                }
                true
            }
            "set_colors" => {
                if let Some(list) = value.as_array() {
                    for (pixel, entry) in list.iter().take(usize::from(self.pixels)).enumerate() {
                        if let Some(color) = rgb_from(entry) {
                            self.colors[pixel] = color;
                        }
                    }
                    board.strip_write(self.pin, &self.colors);
                }
                true
            }
            _ => false,
        }
    }

    /// Current pixel buffer.
    #[must_use]
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }
}

/// Decode a `[r, g, b]` array.
fn rgb_from(value: &Value) -> Option<Rgb> {
    let parts = value.as_array()?;
    if parts.len() < 3 {
        return None;
    }
    let component = |v: &Value| v.as_u64().map(|n| n.min(255) as u8);
    Some(Rgb::new(
        component(&parts[0])?,
        component(&parts[1])?,
        component(&parts[2])?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SevenSegmentConfig {
    digits: u8,
    driver: String,
    brightness: u8,
}

impl Default for SevenSegmentConfig {
    fn default() -> Self {
        Self {
            digits: 4,
            driver: String::from("MAX7219"),
            brightness: 8,
        }
    }
}

/// Seven-segment display. The handler holds the rendered text and
/// decimal-point states; the display driver itself is the board's concern.
#[derive(Debug)]
pub struct SevenSegment {
    digits: u8,
    brightness: u8,
    text: String,
    decimals: [bool; 8],
}

impl SevenSegment {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        _board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: SevenSegmentConfig = parse_config(config)?;
        debug!(
            "7-segment on pin {}: {} digits, {} driver",
            pin, cfg.digits, cfg.driver
        );
        Ok(Self {
            digits: cfg.digits,
            brightness: cfg.brightness,
            text: String::new(),
            decimals: [false; 8],
        })
    }

    pub(crate) fn set_value(&mut self, value: f32) {
        self.text = (value as i32).to_string();
    }

    pub(crate) fn set_command(&mut self, command: &str, value: &Value) -> bool {
        match command {
            "set_text" => {
                self.text = String::from(value.as_str().unwrap_or(""));
                true
            }
            "set_brightness" => {
                self.brightness = value.as_u64().map_or(self.brightness, |n| n.min(255) as u8);
                true
            }
            "set_decimal" => {
                let position = value.get("position").and_then(Value::as_u64);
                let state = value.get("state").and_then(Value::as_bool);
                if let (Some(position), Some(state)) = (position, state) {
                    let limit = u64::from(self.digits.min(8));
                    if position < limit {
                        self.decimals[position as usize] = state;
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// The text currently rendered.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// The decimal-point state at a digit position.
    #[must_use]
    pub fn decimal_point(&self, position: usize) -> bool {
        self.decimals.get(position).copied().unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LedBarConfig {
    leds: u8,
    orientation: Orientation,
    color: String,
}

impl Default for LedBarConfig {
    fn default() -> Self {
        Self {
            leds: 10,
            orientation: Orientation::Horizontal,
            color: String::from("green"),
        }
    }
}

/// Bar-graph display: a level lights the lowest LEDs, or a pattern sets
/// each LED directly.
#[derive(Debug)]
pub struct LedBar {
    count: u8,
    level: f32,
    states: Vec<bool>,
}

impl LedBar {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        _board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: LedBarConfig = parse_config(config)?;
        debug!(
            "led bar on pin {}: {} leds, orientation={:?}, color={}",
            pin, cfg.leds, cfg.orientation, cfg.color
        );
        Ok(Self {
            count: cfg.leds,
            level: 0.0,
            states: vec![false; usize::from(cfg.leds)],
        })
    }

    pub(crate) fn set_value(&mut self, value: f32) {
        self.level = value.clamp(0.0, 1.0);
        let active = floorf(self.level * f32::from(self.count)) as usize;
        for (index, state) in self.states.iter_mut().enumerate() {
            *state = index < active;
        }
    }

    pub(crate) fn set_command(&mut self, command: &str, value: &Value) -> bool {
        match command {
            "set_level" => {
                self.set_value(value.as_f64().unwrap_or(0.0) as f32);
                true
            }
            "set_pattern" => {
                if let Some(pattern) = value.as_array() {
                    for (index, entry) in pattern.iter().take(self.states.len()).enumerate() {
                        self.states[index] = entry.as_bool().unwrap_or(false);
                    }
                }
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Per-LED lit states, lowest first.
    #[must_use]
    pub fn states(&self) -> &[bool] {
        &self.states
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct BuzzerConfig {
    frequency: u16,
    max_volume: u8,
}

impl Default for BuzzerConfig {
    fn default() -> Self {
        Self {
            frequency: 440,
            max_volume: 128,
        }
    }
}

/// Piezo buzzer. `set_value` plays the configured frequency while the
/// value is positive; `set_buzzer` plays for a duration and auto-silences.
#[derive(Debug)]
pub struct Buzzer {
    pin: u8,
    frequency: u16,
    max_volume: u8,
    playing: bool,
    play_until_ms: Option<u64>,
}

impl Buzzer {
    pub(crate) fn init<B: Board>(
        pin: u8,
        config: &Value,
        board: &mut B,
    ) -> Result<Self, DeviceError> {
        let cfg: BuzzerConfig = parse_config(config)?;
        board.configure_output(pin)?;
        Ok(Self {
            pin,
            frequency: cfg.frequency,
            max_volume: cfg.max_volume,
            playing: false,
            play_until_ms: None,
        })
    }

    pub(crate) fn set_value<B: Board>(&mut self, value: f32, board: &mut B) {
        if value > 0.0 {
            board.tone(self.pin, self.frequency, self.max_volume);
            self.playing = true;
        } else {
            board.silence(self.pin);
            self.playing = false;
        }
        self.play_until_ms = None;
    }

    pub(crate) fn set_command<B: Board>(
        &mut self,
        command: &str,
        value: &Value,
        board: &mut B,
    ) -> bool {
        match command {
            "set_buzzer" => {
                self.frequency = value
                    .get("frequency")
                    .and_then(Value::as_u64)
                    .map_or(440, |n| n.min(u64::from(u16::MAX)) as u16);
                let duration_ms = value.get("duration").and_then(Value::as_u64).unwrap_or(1000);
                board.tone(self.pin, self.frequency, self.max_volume);
                self.playing = true;
                self.play_until_ms = Some(board.now_ms() + duration_ms);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn poll<B: Board>(&mut self, board: &mut B) {
        if !self.playing {
            return;
        }
        if let Some(until) = self.play_until_ms {
            if board.now_ms() >= until {
                board.silence(self.pin);
                self.playing = false;
                self.play_until_ms = None;
            }
        }
    }
}
