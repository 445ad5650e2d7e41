//! Collaborator traits: the seams between the runtime and the platform.
//!
//! The runtime never touches hardware or sockets directly. A firmware entry
//! point binds these traits to the real Wi-Fi driver, TCP stack, and pin
//! primitives; tests bind them to mocks. All implementations must be
//! non-blocking after `start`: only short bounded waits (an ADC read, a
//! socket read of already-buffered bytes, a non-blocking connect) are
//! acceptable inside a trait method.

use core::net::Ipv4Addr;

/// Wi-Fi association state as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiStatus {
    /// No association and none in progress.
    Down,
    /// Association in progress.
    Associating,
    /// Associated with an address assigned.
    Up,
}

/// Error type for pin configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// The pin cannot serve the requested function.
    Unsupported,
    /// The pin is claimed by another peripheral.
    Busy,
}

/// Error type for transport writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The connection is no longer open.
    Closed,
    /// The stack reported an I/O failure.
    Io,
}

/// One pixel of an addressable strip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Uniform grey at the given level.
    #[inline]
    #[must_use]
    pub const fn grey(level: u8) -> Self {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }
}

/// The Wi-Fi association driver.
pub trait Wifi {
    /// Begin (or restart) association. Non-blocking: progress is observed
    /// through [`status`](Self::status) on later passes.
    fn associate(&mut self, ssid: &str, password: &str);

    /// Current association state.
    fn status(&self) -> WifiStatus;

    /// The assigned IPv4 address, once up.
    fn local_address(&self) -> Option<Ipv4Addr>;
}

/// The TCP client socket, owned exclusively by the runtime.
pub trait TcpLink {
    /// Attempt a connection. Bounded wait; returns whether the socket came up.
    fn connect(&mut self, host: &str, port: u16) -> bool;

    /// Whether the socket is currently open.
    fn is_connected(&self) -> bool;

    /// Number of inbound bytes already buffered.
    fn available(&self) -> usize;

    /// Pop one buffered inbound byte.
    fn read_byte(&mut self) -> Option<u8>;

    /// Write the whole buffer to the transport.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Time, watchdog, and pin primitives of the host board.
///
/// Pins are addressed by number, the way the orchestrator's device configs
/// declare them. A board rejects a configuration it cannot serve with
/// [`PinError`]; the offending device is then reported and disabled rather
/// than aborting the runtime.
pub trait Board {
    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Yield to the host I/O stack for at least `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);

    /// Pet the hardware watchdog.
    fn feed_watchdog(&mut self);

    fn configure_input(&mut self, pin: u8, pullup: bool) -> Result<(), PinError>;
    fn configure_output(&mut self, pin: u8) -> Result<(), PinError>;
    fn configure_pwm(&mut self, pin: u8) -> Result<(), PinError>;
    fn configure_strip(&mut self, pin: u8, pixels: u16, max_brightness: u8)
        -> Result<(), PinError>;

    fn digital_read(&mut self, pin: u8) -> bool;
    fn digital_write(&mut self, pin: u8, high: bool);

    /// Sample the ADC on `pin`. The conventional full scale is 0..=1023.
    fn analog_read(&mut self, pin: u8) -> u16;

    /// Set a PWM duty cycle (0..=255) on a pin previously configured for PWM.
    fn pwm_write(&mut self, pin: u8, duty: u8);

    /// Push a full pixel buffer to an addressable strip.
    fn strip_write(&mut self, pin: u8, colors: &[Rgb]);

    /// Start a continuous tone.
    fn tone(&mut self, pin: u8, frequency_hz: u16, volume: u8);

    /// Stop any tone on the pin.
    fn silence(&mut self, pin: u8);
}

#[cfg(test)]
pub(crate) mod mock {
    extern crate std;

    use std::collections::VecDeque;
    use std::vec::Vec;

    use super::*;

    /// Scriptable board: tests preload pin levels/ADC readings and observe
    /// every output-side call. `sleep_ms` advances the clock so timing
    /// behavior can be exercised without a real timer.
    pub struct MockBoard {
        pub now: u64,
        pub levels: [bool; 64],
        pub analog: [u16; 64],
        pub watchdog_feeds: u32,
        pub configured_inputs: Vec<(u8, bool)>,
        pub configured_outputs: Vec<u8>,
        pub digital_writes: Vec<(u8, bool)>,
        pub pwm_writes: Vec<(u8, u8)>,
        pub strip_writes: Vec<(u8, Vec<Rgb>)>,
        pub tones: Vec<(u8, u16, u8)>,
        pub silences: Vec<u8>,
        pub fail_pins: Vec<u8>,
    }

    impl MockBoard {
        pub fn new() -> Self {
            Self {
                now: 0,
                levels: [false; 64],
                analog: [0; 64],
                watchdog_feeds: 0,
                configured_inputs: Vec::new(),
                configured_outputs: Vec::new(),
                digital_writes: Vec::new(),
                pwm_writes: Vec::new(),
                strip_writes: Vec::new(),
                tones: Vec::new(),
                silences: Vec::new(),
                fail_pins: Vec::new(),
            }
        }

        pub fn advance(&mut self, ms: u64) {
            self.now += ms;
        }

        fn check_pin(&self, pin: u8) -> Result<(), PinError> {
            if self.fail_pins.contains(&pin) {
                Err(PinError::Unsupported)
            } else {
                Ok(())
            }
        }
    }

    impl Board for MockBoard {
        fn now_ms(&self) -> u64 {
            self.now
        }

        fn sleep_ms(&mut self, ms: u32) {
            self.now += u64::from(ms);
        }

        fn feed_watchdog(&mut self) {
            self.watchdog_feeds += 1;
        }

        fn configure_input(&mut self, pin: u8, pullup: bool) -> Result<(), PinError> {
            self.check_pin(pin)?;
            self.configured_inputs.push((pin, pullup));
            Ok(())
        }

        fn configure_output(&mut self, pin: u8) -> Result<(), PinError> {
            self.check_pin(pin)?;
            self.configured_outputs.push(pin);
            Ok(())
        }

        fn configure_pwm(&mut self, pin: u8) -> Result<(), PinError> {
            self.check_pin(pin)
        }

        fn configure_strip(
            &mut self,
            pin: u8,
            _pixels: u16,
            _max_brightness: u8,
        ) -> Result<(), PinError> {
            self.check_pin(pin)
        }

        fn digital_read(&mut self, pin: u8) -> bool {
            self.levels[pin as usize]
        }

        fn digital_write(&mut self, pin: u8, high: bool) {
            self.digital_writes.push((pin, high));
        }

        fn analog_read(&mut self, pin: u8) -> u16 {
            self.analog[pin as usize]
        }

        fn pwm_write(&mut self, pin: u8, duty: u8) {
            self.pwm_writes.push((pin, duty));
        }

        fn strip_write(&mut self, pin: u8, colors: &[Rgb]) {
            self.strip_writes.push((pin, colors.to_vec()));
        }

        fn tone(&mut self, pin: u8, frequency_hz: u16, volume: u8) {
            self.tones.push((pin, frequency_hz, volume));
        }

        fn silence(&mut self, pin: u8) {
            self.silences.push(pin);
        }
    }

    pub struct MockWifi {
        pub state: WifiStatus,
        pub up_on_associate: bool,
        pub associate_calls: u32,
    }

    impl MockWifi {
        pub fn up() -> Self {
            Self {
                state: WifiStatus::Down,
                up_on_associate: true,
                associate_calls: 0,
            }
        }

        pub fn unreachable() -> Self {
            Self {
                state: WifiStatus::Down,
                up_on_associate: false,
                associate_calls: 0,
            }
        }
    }

    impl Wifi for MockWifi {
        fn associate(&mut self, _ssid: &str, _password: &str) {
            self.associate_calls += 1;
            self.state = if self.up_on_associate {
                WifiStatus::Up
            } else {
                WifiStatus::Associating
            };
        }

        fn status(&self) -> WifiStatus {
            self.state
        }

        fn local_address(&self) -> Option<Ipv4Addr> {
            match self.state {
                WifiStatus::Up => Some(Ipv4Addr::new(192, 168, 1, 50)),
                _ => None,
            }
        }
    }

    pub struct MockTcp {
        pub connected: bool,
        pub accept_connect: bool,
        pub connect_calls: u32,
        pub inbound: VecDeque<u8>,
        pub outbound: Vec<u8>,
    }

    impl MockTcp {
        pub fn new() -> Self {
            Self {
                connected: false,
                accept_connect: true,
                connect_calls: 0,
                inbound: VecDeque::new(),
                outbound: Vec::new(),
            }
        }

        /// Queue one inbound frame (the trailing newline is appended).
        pub fn push_frame(&mut self, line: &str) {
            self.inbound.extend(line.bytes());
            self.inbound.push_back(b'\n');
        }

        /// Every outbound frame written so far, parsed back from JSON.
        pub fn sent_frames(&self) -> Vec<serde_json::Value> {
            self.outbound
                .split(|&b| b == b'\n')
                .filter(|line| !line.is_empty())
                .map(|line| serde_json::from_slice(line).expect("outbound frame is valid JSON"))
                .collect()
        }
    }

    impl TcpLink for MockTcp {
        fn connect(&mut self, _host: &str, _port: u16) -> bool {
            self.connect_calls += 1;
            self.connected = self.accept_connect;
            self.connected
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn available(&self) -> usize {
            if self.connected {
                self.inbound.len()
            } else {
                0
            }
        }

        fn read_byte(&mut self) -> Option<u8> {
            self.inbound.pop_front()
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::Closed);
            }
            self.outbound.extend_from_slice(bytes);
            Ok(())
        }
    }
}
