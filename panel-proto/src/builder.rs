//! Outbound frame builders.
//!
//! Each builder produces one complete frame: compact JSON, envelope
//! included, terminated by `\n`, ready for the transport. All payloads are
//! built from owned values; nothing borrows into a parse buffer.

use alloc::string::{String, ToString};

use serde::Serialize;

use crate::parser::FrameError;
use crate::types::PanelStatus;

/// Per-reading context attached to a `panel_input` frame.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct InputContext {
    pub raw_value: f32,
    pub calibrated: bool,
}

#[derive(Serialize)]
struct Frame<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    timestamp: String,
    data: T,
}

#[derive(Serialize)]
struct HeartbeatData<'a> {
    client_id: &'a str,
    ping: String,
}

#[derive(Serialize)]
struct StatusData<'a> {
    panel_id: &'a str,
    status: &'static str,
    last_seen: String,
    device_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [&'a str]>,
}

#[derive(Serialize)]
struct InputData<'a> {
    panel_id: &'a str,
    device_id: &'a str,
    value: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<InputContext>,
}

fn encode<T: Serialize>(kind: &str, now_ms: u64, data: T) -> Result<String, FrameError> {
    let frame = Frame {
        kind,
        timestamp: now_ms.to_string(),
        data,
    };
    let mut line = serde_json::to_string(&frame).map_err(|_| FrameError::Json)?;
    line.push('\n');
    Ok(line)
}

/// Build a `panel_heartbeat` frame.
pub fn heartbeat(panel_id: &str, now_ms: u64) -> Result<String, FrameError> {
    encode(
        "panel_heartbeat",
        now_ms,
        HeartbeatData {
            client_id: panel_id,
            ping: now_ms.to_string(),
        },
    )
}

/// Build a `panel_status` frame.
///
/// The `errors` slice is included only when non-empty.
pub fn status(
    panel_id: &str,
    status: PanelStatus,
    device_count: u8,
    errors: &[&str],
    now_ms: u64,
) -> Result<String, FrameError> {
    encode(
        "panel_status",
        now_ms,
        StatusData {
            panel_id,
            status: status.wire_str(),
            last_seen: now_ms.to_string(),
            device_count,
            errors: if errors.is_empty() { None } else { Some(errors) },
        },
    )
}

/// Build a `panel_input` frame.
pub fn input(
    panel_id: &str,
    device_id: &str,
    value: f32,
    context: Option<InputContext>,
    now_ms: u64,
) -> Result<String, FrameError> {
    encode(
        "panel_input",
        now_ms,
        InputData {
            panel_id,
            device_id,
            value,
            context,
        },
    )
}
