//! Fixed-capacity device table.
//!
//! The registry maps a stable string id to a configured device handler.
//! `apply_config` replaces the table in full: the previous slots (and their
//! handlers) are torn down before the first new record initializes, so no
//! device from an earlier config is ever polled or commanded again.

use alloc::format;
use heapless::{String, Vec};
use log::{info, warn};
use serde_json::Value;

use crate::config::bounded;
use crate::device::{InputHandler, OutputHandler};
use crate::hal::Board;
use crate::ledger::ErrorLedger;
use crate::MAX_DEVICES;
use panel_proto::{DeviceEntry, DeviceKind};

#[derive(Debug)]
enum Handler {
    Input(InputHandler),
    Output(OutputHandler),
}

/// One configured device.
///
/// A slot is enabled exactly when its handler is present; a slot whose
/// initialization failed stays in the table disabled, so the orchestrator's
/// device count still reflects the declared config.
#[derive(Debug)]
pub struct DeviceSlot {
    id: String<32>,
    kind: DeviceKind,
    pin: u8,
    handler: Option<Handler>,
    last_value: f32,
    last_update_ms: u64,
}

impl DeviceSlot {
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn pin(&self) -> u8 {
        self.pin
    }

    #[inline]
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.handler.is_some()
    }

    /// Last value reported for this device.
    #[inline]
    #[must_use]
    pub fn last_value(&self) -> f32 {
        self.last_value
    }

    /// Tick of the last report, in milliseconds since boot.
    #[inline]
    #[must_use]
    pub fn last_update_ms(&self) -> u64 {
        self.last_update_ms
    }

    /// Poll an input slot. Returns the new value when the changed latch
    /// fired; the slot's report state is committed before returning, so an
    /// emitted frame never precedes the panel's own view.
    pub fn poll_input<B: Board>(&mut self, board: &mut B) -> Option<f32> {
        let handler = match &mut self.handler {
            Some(Handler::Input(handler)) => handler,
            _ => return None,
        };
        handler.poll(board);
        if !handler.changed() {
            return None;
        }
        let value = handler.value();
        self.last_value = value;
        self.last_update_ms = board.now_ms();
        Some(value)
    }

    /// Advance an output slot's internal timers.
    pub fn poll_output<B: Board>(&mut self, board: &mut B) {
        if let Some(Handler::Output(handler)) = &mut self.handler {
            handler.poll(board);
        }
    }

    /// Apply an output command to this slot.
    ///
    /// A command addressed to an input or disabled slot is a no-op; an
    /// unrecognized command name reports `false`.
    pub fn command_output<B: Board>(
        &mut self,
        command: &str,
        value: &Value,
        board: &mut B,
    ) -> bool {
        let handler = match &mut self.handler {
            Some(Handler::Output(handler)) => handler,
            _ => return false,
        };
        if command == "set_value" {
            handler.set_value(value.as_f64().unwrap_or(0.0) as f32, board);
            true
        } else {
            handler.set_command(command, value, board)
        }
    }
}

/// Result of a config apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Slots in the new table, enabled or not.
    pub device_count: u8,
    /// Slots that failed to initialize (plus unknown-kind entries).
    pub failures: u8,
}

/// Fixed table of [`MAX_DEVICES`] device slots, in config order.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    slots: Vec<DeviceSlot, MAX_DEVICES>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slots(&self) -> &[DeviceSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [DeviceSlot] {
        &mut self.slots
    }

    /// Find a slot by id. Linear scan; the table is small.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut DeviceSlot> {
        self.slots.iter_mut().find(|slot| slot.id() == id)
    }

    /// Replace the table with the declared devices.
    ///
    /// Unknown kinds, duplicate ids, pin collisions, and handler init
    /// failures each skip or disable the offending slot and append to the
    /// ledger; the rest of the config still applies. Entries beyond
    /// [`MAX_DEVICES`] are dropped.
    pub fn apply_config<B: Board>(
        &mut self,
        entries: &[DeviceEntry],
        board: &mut B,
        ledger: &mut ErrorLedger,
    ) -> ApplyOutcome {
        self.slots.clear();

        if entries.len() > MAX_DEVICES {
            warn!(
                "config declares {} devices; keeping the first {}",
                entries.len(),
                MAX_DEVICES
            );
        }

        let mut failures: u8 = 0;
        let mut used_pins: Vec<u8, MAX_DEVICES> = Vec::new();

        for entry in entries.iter().take(MAX_DEVICES) {
            let kind = entry.device_kind();
            if kind == DeviceKind::Unknown {
                ledger.push(&format!("Unknown device type for {}", entry.id));
                failures += 1;
                continue;
            }

            let duplicate_id = self.slots.iter().any(|slot| slot.id() == entry.id);
            let pin_collision = used_pins.contains(&entry.pin);

            let handler = if duplicate_id || pin_collision {
                warn!(
                    "device {} rejected: duplicate {}",
                    entry.id,
                    if duplicate_id { "id" } else { "pin" }
                );
                None
            } else {
                Self::build_handler(kind, entry, board)
            };

            match &handler {
                Some(_) => {
                    let _ = used_pins.push(entry.pin);
                    info!(
                        "{} device {} initialized on pin {}",
                        if kind.is_input() { "input" } else { "output" },
                        entry.id,
                        entry.pin
                    );
                }
                None => {
                    let side = if kind.is_input() { "Input" } else { "Output" };
                    ledger.push(&format!("{side} device {} failed", entry.id));
                    failures += 1;
                }
            }

            let _ = self.slots.push(DeviceSlot {
                id: bounded(&entry.id),
                kind,
                pin: entry.pin,
                handler,
                last_value: 0.0,
                last_update_ms: 0,
            });
        }

        ApplyOutcome {
            device_count: self.slots.len() as u8,
            failures,
        }
    }

    fn build_handler<B: Board>(
        kind: DeviceKind,
        entry: &DeviceEntry,
        board: &mut B,
    ) -> Option<Handler> {
        if kind.is_input() {
            InputHandler::build(kind, entry.pin, &entry.config, board)
                .map(Handler::Input)
                .ok()
        } else {
            OutputHandler::build(kind, entry.pin, &entry.config, board)
                .map(Handler::Output)
                .ok()
        }
    }
}
