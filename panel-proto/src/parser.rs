//! Frame parser for inbound orchestrator traffic.
//!
//! Input is one complete line (the LF already stripped by the
//! [`LineAccumulator`](crate::framing::LineAccumulator)). The parser
//! validates the envelope, dispatches on the `type` field, and decodes the
//! payload for the frame kinds a panel consumes. Panel-id gating is the
//! caller's concern: a frame addressed to another panel still parses.

use serde::Deserialize;
use serde_json::Value;

use crate::types::{ConfigPayload, OutputCommand};

/// A successfully parsed inbound frame.
#[derive(Clone, Debug, PartialEq)]
#[must_use]
pub enum ParsedFrame {
    /// `panel_config` - replace the device table.
    Config(ConfigPayload),
    /// `panel_output` - command a single output device.
    Output(OutputCommand),
    /// `panel_heartbeat` - ack trace only, no payload of interest.
    Heartbeat,
}

/// Error type for frame parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// The line is not a valid JSON object.
    Json,
    /// The envelope has no `type` field.
    MissingType,
    /// The `type` value is not a frame kind this panel consumes.
    UnknownType,
    /// The envelope parsed but `data` does not match the kind's payload.
    Payload,
}

/// Parse one complete line into a [`ParsedFrame`].
///
/// Frames with an unknown `type` return [`FrameError::UnknownType`] so the
/// caller can drop them after debug logging; none of the error cases are
/// grounds for disconnecting.
pub fn parse_frame(line: &[u8]) -> Result<ParsedFrame, FrameError> {
    let value: Value = serde_json::from_slice(line).map_err(|_| FrameError::Json)?;

    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind,
        None => return Err(FrameError::MissingType),
    };

    let data = value.get("data").unwrap_or(&Value::Null);

    match kind {
        "panel_config" => ConfigPayload::deserialize(data)
            .map(ParsedFrame::Config)
            .map_err(|_| FrameError::Payload),
        "panel_output" => OutputCommand::deserialize(data)
            .map(ParsedFrame::Output)
            .map_err(|_| FrameError::Payload),
        "panel_heartbeat" => Ok(ParsedFrame::Heartbeat),
        _ => Err(FrameError::UnknownType),
    }
}
