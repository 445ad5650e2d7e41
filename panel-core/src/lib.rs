//! Panel runtime for bridge control-surface nodes.
//!
//! This crate provides the core of the panel firmware without any
//! platform-specific dependencies. It can be used both in embedded
//! `no_std` environments (with `alloc`) and on host for testing.
//!
//! # Overview
//!
//! The crate is organized into several modules:
//!
//! - [`hal`]: Collaborator traits ([`Board`], [`Wifi`], [`TcpLink`])
//! - [`device`]: The ten device handlers ([`InputHandler`], [`OutputHandler`])
//! - [`registry`]: Fixed-capacity device table ([`DeviceRegistry`])
//! - [`ledger`]: Bounded error record ([`ErrorLedger`])
//! - [`link`]: Connection state machine ([`LinkManager`])
//! - [`runtime`]: The cooperative scheduler ([`Panel`])
//!
//! # Architecture
//!
//! The panel is single-threaded and cooperative: the entry point owns a
//! [`Panel`] and pumps [`Panel::tick`] forever. Each pass services the
//! watchdog, verifies the link, drains inbound frames, emits the heartbeat
//! when due, and polls every configured device. Inputs whose changed latch
//! fires emit a `panel_input` frame; outputs advance their blink/tone
//! timers.
//!
//! The physical world is reached exclusively through the [`hal`] traits, so
//! the whole runtime runs unmodified against mock collaborators in tests.
//!
//! # Example
//!
//! ```no_run
//! # fn demo<B, W, T>(board: B, wifi: W, tcp: T)
//! # where B: panel_core::Board, W: panel_core::Wifi, T: panel_core::TcpLink {
//! use panel_core::{panel_identity, Panel};
//!
//! let mut panel = Panel::new(panel_identity!(), board, wifi, tcp);
//! panel.set_network_config("Celestial_Bridge", "starship2024", "192.168.1.100", 8081);
//! if panel.start().is_err() {
//!     // Wi-Fi never came up; the ledger records why. Keep ticking: the
//!     // runtime schedules reconnection attempts on its own.
//! }
//! loop {
//!     panel.tick();
//! }
//! # }
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod device;
pub mod hal;
pub mod ledger;
pub mod link;
pub mod registry;
pub mod runtime;

// Re-export main types at crate root
pub use config::{NetworkConfig, PanelIdentity};
pub use device::{DeviceError, InputHandler, OutputHandler};
pub use hal::{Board, PinError, Rgb, TcpLink, TransportError, Wifi, WifiStatus};
pub use ledger::ErrorLedger;
pub use link::{LinkManager, StartError};
pub use registry::{ApplyOutcome, DeviceRegistry, DeviceSlot};
pub use runtime::Panel;

// The protocol vocabulary travels with the runtime types.
pub use panel_proto::{DeviceKind, PanelStatus};

/// Firmware version reported over serial diagnostics.
pub const FIRMWARE_VERSION: &str = "1.0.0";

/// Capacity of the device table.
pub const MAX_DEVICES: usize = 32;

/// Deadline for Wi-Fi association inside `start`.
pub const WIFI_TIMEOUT_MS: u64 = 30_000;

/// Interval between outbound heartbeats while TCP is up.
pub const HEARTBEAT_INTERVAL_MS: u64 = 10_000;

/// Minimum spacing between reconnection attempts.
pub const RECONNECT_DELAY_MS: u64 = 5_000;

/// Default button debounce window.
pub const DEBOUNCE_DELAY_MS: u16 = 50;

/// Default EWMA smoothing factor for analog inputs.
pub const ANALOG_SMOOTHING: f32 = 0.1;

/// Watchdog pet interval; the host watchdog is armed for this period.
pub const WATCHDOG_TIMEOUT_MS: u64 = 60_000;

/// Cooperative yield at the tail of each full scheduler pass.
pub const LOOP_YIELD_MS: u32 = 10;
