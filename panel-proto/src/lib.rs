//! Wire protocol types, parsing, and serialization for bridge panel nodes.
//!
//! This crate provides everything needed to work with the panel protocol
//! spoken between a control-panel node and the orchestrator:
//!
//! - **Types**: Wire vocabulary shared by every frame
//!   - [`DeviceKind`] - Enumerated physical-device kind
//!   - [`PanelStatus`] - Panel connection/health status
//!   - [`Envelope`] - The common `{type, timestamp, data}` frame envelope
//!   - [`ConfigPayload`] / [`DeviceEntry`] - `panel_config` payload
//!   - [`OutputCommand`] - `panel_output` payload
//!
//! - **Parsing**: Parse incoming frames
//!   - [`parse_frame()`] - Parse one complete line into a [`ParsedFrame`]
//!
//! - **Serialization**: Build outgoing frames
//!   - [`heartbeat()`], [`status()`], [`input()`] - Frame builders
//!
//! - **Framing**: [`LineAccumulator`] - Byte-at-a-time line assembly with
//!   overflow discard
//!
//! # Protocol Format
//!
//! Frames are UTF-8 JSON objects, serialized compactly and terminated by a
//! single `\n` (LF). Every frame shares the envelope:
//!
//! ```text
//! {"type":"<kind>","timestamp":"<ms since boot>","data":{...}}\n
//! ```
//!
//! Timestamps are monotonic milliseconds since boot, serialized as a decimal
//! string. Five frame kinds exist: `panel_heartbeat`, `panel_status`,
//! `panel_input`, `panel_config`, and `panel_output`.
//!
//! # Examples
//!
//! ## Parsing Frames
//!
//! ```
//! use panel_proto::{parse_frame, ParsedFrame};
//!
//! let line = br#"{"type":"panel_config","timestamp":"1000","data":{"panel_id":"helm_main","devices":[]}}"#;
//! if let Ok(ParsedFrame::Config(config)) = parse_frame(line) {
//!     assert_eq!(config.panel_id, "helm_main");
//!     assert!(config.devices.is_empty());
//! }
//! ```
//!
//! ## Building Frames
//!
//! ```
//! use panel_proto::heartbeat;
//!
//! let frame = heartbeat("helm_main", 42_000).unwrap();
//! assert!(frame.starts_with(r#"{"type":"panel_heartbeat""#));
//! assert!(frame.ends_with('\n'));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and requires only `alloc`, making
//! it suitable for embedded targets with a heap.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod builder;
pub mod framing;
pub mod parser;
pub mod types;

// Re-export types at crate root for convenience
pub use builder::{heartbeat, input, status, InputContext};
pub use framing::{Framed, LineAccumulator, MAX_FRAME_LENGTH};
pub use parser::{parse_frame, FrameError, ParsedFrame};
pub use types::{ConfigPayload, DeviceEntry, DeviceKind, Envelope, OutputCommand, PanelStatus};
