//! The panel runtime: a cooperative scheduler pumped by the entry point.
//!
//! Each [`Panel::tick`] performs one pass, in order: pet the watchdog if
//! due, verify Wi-Fi and TCP (scheduling reconnection when either is
//! down), drain buffered inbound bytes and dispatch complete frames, emit
//! the heartbeat when due, poll every configured device, then yield to the
//! host I/O stack. All state transitions happen inside the pass; nothing
//! here blocks beyond the tail yield.

use alloc::vec::Vec;

use log::{debug, error, info, warn};

use crate::config::{bounded, NetworkConfig, PanelIdentity};
use crate::hal::{Board, TcpLink, Wifi, WifiStatus};
use crate::ledger::ErrorLedger;
use crate::link::{LinkManager, StartError};
use crate::registry::DeviceRegistry;
use crate::{FIRMWARE_VERSION, HEARTBEAT_INTERVAL_MS, LOOP_YIELD_MS};
use panel_proto::{
    builder, parse_frame, ConfigPayload, Framed, InputContext, LineAccumulator, OutputCommand,
    PanelStatus, ParsedFrame,
};

/// A bridge panel node: identity, device table, link state, and the
/// scheduler that ties them together.
///
/// The entry point owns the panel and its collaborators; there is no
/// process-wide instance.
pub struct Panel<B, W, T> {
    identity: PanelIdentity,
    name: heapless::String<64>,
    net: NetworkConfig,
    board: B,
    wifi: W,
    tcp: T,
    registry: DeviceRegistry,
    ledger: ErrorLedger,
    link: LinkManager,
    rx: LineAccumulator,
    last_heartbeat_ms: u64,
    configured: bool,
    started: bool,
}

impl<B, W, T> Panel<B, W, T>
where
    B: Board,
    W: Wifi,
    T: TcpLink,
{
    #[must_use]
    pub fn new(identity: PanelIdentity, board: B, wifi: W, tcp: T) -> Self {
        Self {
            identity,
            name: heapless::String::new(),
            net: NetworkConfig::default(),
            board,
            wifi,
            tcp,
            registry: DeviceRegistry::new(),
            ledger: ErrorLedger::new(),
            link: LinkManager::new(),
            rx: LineAccumulator::new(),
            last_heartbeat_ms: 0,
            configured: false,
            started: false,
        }
    }

    /// Override the network defaults. Only honored before [`start`](Self::start).
    pub fn set_network_config(&mut self, ssid: &str, password: &str, host: &str, port: u16) {
        if self.started {
            warn!("network config change ignored after start");
            return;
        }
        self.net = NetworkConfig {
            ssid: bounded(ssid),
            password: bounded(password),
            server_host: bounded(host),
            server_port: port,
        };
    }

    /// Bring the panel up: associate Wi-Fi (30 s deadline) and attempt the
    /// first TCP connect. A successful connect announces the panel with an
    /// immediate heartbeat.
    ///
    /// Keep ticking after an `Err`: the reconnect path retries on its own.
    pub fn start(&mut self) -> Result<(), StartError> {
        info!(
            "panel starting: id={} station={} version={}",
            self.identity.panel_id(),
            self.identity.station(),
            FIRMWARE_VERSION
        );
        self.started = true;
        self.link.start(
            &mut self.wifi,
            &mut self.tcp,
            &mut self.board,
            &self.net,
            &mut self.ledger,
        )?;
        if self.tcp.is_connected() {
            self.send_heartbeat();
        }
        Ok(())
    }

    /// One cooperative scheduler pass.
    pub fn tick(&mut self) {
        let now = self.board.now_ms();
        if self.link.watchdog_due(now) {
            self.board.feed_watchdog();
            self.link.note_watchdog_fed(now);
        }

        let wifi_up = self.wifi.status() == WifiStatus::Up;
        self.link.note_wifi(wifi_up, &mut self.ledger);
        if !wifi_up {
            if self.link.status() != PanelStatus::Error {
                self.ledger.push("WiFi disconnected");
                self.link.set_status(PanelStatus::Error);
            }
            self.link.maybe_reconnect(
                &mut self.wifi,
                &mut self.tcp,
                now,
                &self.net,
                &mut self.ledger,
            );
            return;
        }

        if !self.tcp.is_connected() {
            self.link.set_status(PanelStatus::Connecting);
            let established = self.link.maybe_reconnect(
                &mut self.wifi,
                &mut self.tcp,
                now,
                &self.net,
                &mut self.ledger,
            );
            if established {
                self.send_heartbeat();
            }
            return;
        }

        self.drain_inbound();

        if self
            .board
            .now_ms()
            .saturating_sub(self.last_heartbeat_ms)
            >= HEARTBEAT_INTERVAL_MS
        {
            self.send_heartbeat();
        }

        if self.configured {
            self.poll_devices();
        }

        self.board.sleep_ms(LOOP_YIELD_MS);
    }

    // --- Accessors for the entry point's status LED ---------------------

    #[inline]
    #[must_use]
    pub fn status(&self) -> PanelStatus {
        self.link.status()
    }

    #[inline]
    #[must_use]
    pub fn panel_id(&self) -> &str {
        self.identity.panel_id()
    }

    #[inline]
    #[must_use]
    pub fn station(&self) -> &str {
        self.identity.station()
    }

    /// Name assigned by the most recent configuration.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn device_count(&self) -> u8 {
        self.registry.len() as u8
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.tcp.is_connected()
    }

    // --- Inbound --------------------------------------------------------

    /// Pull every buffered byte into the line accumulator, dispatching each
    /// completed frame.
    fn drain_inbound(&mut self) {
        while self.tcp.available() > 0 {
            let Some(byte) = self.tcp.read_byte() else {
                break;
            };
            match self.rx.push(byte) {
                Framed::Line => {
                    // Owned copy so dispatch never aliases the receive buffer.
                    let line: Vec<u8> = self.rx.line().to_vec();
                    self.rx.clear();
                    self.dispatch(&line);
                }
                Framed::Discarded => debug!("oversized frame discarded"),
                Framed::Pending => {}
            }
        }
    }

    fn dispatch(&mut self, line: &[u8]) {
        match parse_frame(line) {
            Ok(ParsedFrame::Config(config)) => self.handle_config(config),
            Ok(ParsedFrame::Output(command)) => self.handle_output(command),
            Ok(ParsedFrame::Heartbeat) => debug!("heartbeat acknowledged"),
            Err(err) => debug!("frame dropped: {err:?}"),
        }
    }

    fn handle_config(&mut self, config: ConfigPayload) {
        if config.panel_id != self.identity.panel_id() {
            debug!(
                "config mismatch: expected {}, got {}",
                self.identity.panel_id(),
                config.panel_id
            );
            return;
        }
        info!("received configuration: {}", config.name);
        self.name = bounded(&config.name);

        let outcome = self
            .registry
            .apply_config(&config.devices, &mut self.board, &mut self.ledger);
        self.configured = true;
        if outcome.failures == 0 {
            self.ledger.clear();
            self.link.set_status(PanelStatus::Online);
        } else {
            self.link.set_status(PanelStatus::Partial);
        }
        self.send_status();
        info!("configuration complete: {} devices", outcome.device_count);
    }

    fn handle_output(&mut self, command: OutputCommand) {
        if command.panel_id != self.identity.panel_id() {
            debug!("output command for another panel: {}", command.panel_id);
            return;
        }
        let Some(slot) = self.registry.find_mut(&command.device_id) else {
            debug!("output command for unknown device {}", command.device_id);
            return;
        };
        if !slot.command_output(&command.command, &command.value, &mut self.board) {
            debug!(
                "command {} is a no-op for device {}",
                command.command, command.device_id
            );
        }
    }

    // --- Devices --------------------------------------------------------

    /// Poll every slot in config order. Input latches emit `panel_input`
    /// frames (after the slot committed its report state); outputs advance
    /// their timers.
    fn poll_devices(&mut self) {
        for slot in self.registry.slots_mut() {
            if let Some(value) = slot.poll_input(&mut self.board) {
                let context = InputContext {
                    raw_value: value,
                    calibrated: true,
                };
                match builder::input(
                    self.identity.panel_id(),
                    slot.id(),
                    value,
                    Some(context),
                    self.board.now_ms(),
                ) {
                    Ok(frame) => {
                        if let Err(err) = self.tcp.write_all(frame.as_bytes()) {
                            error!("input frame write failed: {err:?}");
                        }
                    }
                    Err(err) => error!("input frame encode failed: {err:?}"),
                }
            }
            slot.poll_output(&mut self.board);
        }
    }

    // --- Outbound -------------------------------------------------------

    fn send_frame(&mut self, frame: &str) {
        if let Err(err) = self.tcp.write_all(frame.as_bytes()) {
            error!("frame write failed: {err:?}");
        }
    }

    fn send_heartbeat(&mut self) {
        let now = self.board.now_ms();
        match builder::heartbeat(self.identity.panel_id(), now) {
            Ok(frame) => {
                self.send_frame(&frame);
                self.last_heartbeat_ms = now;
                debug!("heartbeat sent: {}", self.identity.panel_id());
            }
            Err(err) => error!("heartbeat encode failed: {err:?}"),
        }
    }

    fn send_status(&mut self) {
        let errors: Vec<&str> = self.ledger.iter().collect();
        let frame = builder::status(
            self.identity.panel_id(),
            self.link.status(),
            self.registry.len() as u8,
            &errors,
            self.board.now_ms(),
        );
        match frame {
            Ok(frame) => self.send_frame(&frame),
            Err(err) => error!("status frame encode failed: {err:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::hal::mock::{MockBoard, MockTcp, MockWifi};
    use crate::RECONNECT_DELAY_MS;
    use serde_json::{json, Value};
    use std::string::{String, ToString};
    use std::vec::Vec;

    fn panel() -> Panel<MockBoard, MockWifi, MockTcp> {
        let identity = PanelIdentity::new("helm_main", "helm");
        Panel::new(identity, MockBoard::new(), MockWifi::up(), MockTcp::new())
    }

    fn started_panel() -> Panel<MockBoard, MockWifi, MockTcp> {
        let mut panel = panel();
        panel.start().unwrap();
        panel
    }

    fn config_frame(devices: Value) -> String {
        json!({
            "type": "panel_config",
            "timestamp": "1000",
            "data": {"panel_id": "helm_main", "name": "Helm", "devices": devices}
        })
        .to_string()
    }

    fn frames_of_type(panel: &Panel<MockBoard, MockWifi, MockTcp>, kind: &str) -> Vec<Value> {
        panel
            .tcp
            .sent_frames()
            .into_iter()
            .filter(|frame| frame["type"] == kind)
            .collect()
    }

    #[test]
    fn test_start_emits_initial_heartbeat() {
        let panel = started_panel();
        assert_eq!(panel.status(), PanelStatus::Configuring);
        assert!(panel.is_connected());
        let heartbeats = frames_of_type(&panel, "panel_heartbeat");
        assert_eq!(heartbeats.len(), 1);
        assert_eq!(heartbeats[0]["data"]["client_id"], "helm_main");
    }

    #[test]
    fn test_config_roundtrip_reports_online() {
        // A valid config yields an online status frame.
        let mut panel = started_panel();
        panel.tcp.push_frame(&config_frame(json!([{
            "id": "throttle",
            "type": "potentiometer",
            "pin": 34,
            "config": {"min": 0, "max": 1023, "deadzone": 10}
        }])));

        panel.tick();

        assert_eq!(panel.status(), PanelStatus::Online);
        assert_eq!(panel.device_count(), 1);
        assert_eq!(panel.name(), "Helm");

        let statuses = frames_of_type(&panel, "panel_status");
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0]["data"]["status"], "online");
        assert_eq!(statuses[0]["data"]["device_count"], 1);
        assert!(statuses[0]["data"].get("errors").is_none());
    }

    #[test]
    fn test_input_emission_converges_to_full_scale() {
        // Driving the ADC from 0 to full scale emits input frames whose
        // final value is ~1.0, then the latch goes quiet.
        let mut panel = started_panel();
        panel.board.analog[34] = 0;
        panel.tcp.push_frame(&config_frame(json!([{
            "id": "throttle",
            "type": "potentiometer",
            "pin": 34,
            "config": {"min": 0, "max": 1023, "deadzone": 10}
        }])));
        panel.tick();

        panel.board.analog[34] = 1023;
        for _ in 0..300 {
            panel.tick();
        }

        let inputs = frames_of_type(&panel, "panel_input");
        assert!(!inputs.is_empty());
        let last = inputs.last().unwrap();
        assert_eq!(last["data"]["device_id"], "throttle");
        let value = last["data"]["value"].as_f64().unwrap();
        assert!((value - 1.0).abs() < 0.05, "final value {value}");
        assert_eq!(last["data"]["context"]["calibrated"], true);
        assert!(last["data"]["context"]["raw_value"].is_number());

        // Steady input: no further emissions.
        let settled = inputs.len();
        for _ in 0..50 {
            panel.tick();
        }
        assert_eq!(frames_of_type(&panel, "panel_input").len(), settled);
    }

    #[test]
    fn test_output_command_blinks_led() {
        // A blink command toggles the LED and then restores off.
        let mut panel = started_panel();
        panel.tcp.push_frame(&config_frame(
            json!([{"id": "lamp", "type": "led", "pin": 2, "config": {}}]),
        ));
        panel.tick();

        panel.tcp.push_frame(
            &json!({
                "type": "panel_output",
                "timestamp": "2000",
                "data": {
                    "panel_id": "helm_main",
                    "device_id": "lamp",
                    "command": "blink",
                    "value": {"rate": 200, "duration": 1000}
                }
            })
            .to_string(),
        );
        for _ in 0..130 {
            panel.tick();
        }

        let duties: Vec<u8> = panel.board.pwm_writes.iter().map(|&(_, duty)| duty).collect();
        assert!(duties.contains(&255), "LED lit during blink");
        assert!(duties.contains(&0), "LED dark during blink");
        assert_eq!(panel.board.pwm_writes.last(), Some(&(2, 0)));
    }

    #[test]
    fn test_mismatched_panel_id_is_ignored() {
        // A config addressed to another panel changes nothing.
        let mut panel = started_panel();
        panel.tcp.push_frame(
            &json!({
                "type": "panel_config",
                "timestamp": "1000",
                "data": {"panel_id": "other", "name": "Elsewhere", "devices": []}
            })
            .to_string(),
        );
        panel.tick();

        assert_eq!(panel.status(), PanelStatus::Configuring);
        assert_eq!(panel.device_count(), 0);
        assert!(frames_of_type(&panel, "panel_status").is_empty());
    }

    #[test]
    fn test_mismatched_output_panel_id_is_ignored() {
        let mut panel = started_panel();
        panel.tcp.push_frame(&config_frame(
            json!([{"id": "lamp", "type": "led", "pin": 2, "config": {}}]),
        ));
        panel.tick();
        let writes = panel.board.pwm_writes.len();

        panel.tcp.push_frame(
            &json!({
                "type": "panel_output",
                "timestamp": "2000",
                "data": {"panel_id": "other", "device_id": "lamp", "command": "set_value", "value": 1.0}
            })
            .to_string(),
        );
        panel.tick();
        assert_eq!(panel.board.pwm_writes.len(), writes);
    }

    #[test]
    fn test_partial_init_reports_errors() {
        // A pin collision disables the later device and the status
        // frame carries exactly that error.
        let mut panel = started_panel();
        panel.tcp.push_frame(&config_frame(json!([
            {"id": "nav", "type": "button", "pin": 4, "config": {}},
            {"id": "weapons", "type": "button", "pin": 4, "config": {}}
        ])));
        panel.tick();

        assert_eq!(panel.status(), PanelStatus::Partial);
        let statuses = frames_of_type(&panel, "panel_status");
        assert_eq!(statuses[0]["data"]["status"], "partial");
        let errors = statuses[0]["data"]["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0], "Input device weapons failed");
    }

    #[test]
    fn test_tcp_drop_reconnects_after_delay() {
        // On TCP drop the panel goes Connecting and the retry respects
        // the reconnect floor.
        let mut panel = started_panel();
        panel.tcp.push_frame(&config_frame(json!([])));
        panel.tick();
        assert_eq!(panel.status(), PanelStatus::Online);

        panel.tcp.connected = false;
        panel.tick();
        assert_eq!(panel.status(), PanelStatus::Connecting);
        assert_eq!(panel.tcp.connect_calls, 1); // only the connect from start

        // Not due yet: the reconnect timer is anchored at the last attempt.
        panel.board.advance(RECONNECT_DELAY_MS - 100);
        panel.tick();
        assert_eq!(panel.tcp.connect_calls, 1);

        panel.board.advance(200);
        panel.tick();
        assert_eq!(panel.tcp.connect_calls, 2);
        assert!(panel.is_connected());
        assert_eq!(panel.status(), PanelStatus::Configuring);

        // Re-establishment announces the panel again.
        assert_eq!(frames_of_type(&panel, "panel_heartbeat").len(), 2);
    }

    #[test]
    fn test_heartbeat_cadence() {
        let mut panel = started_panel();
        panel.tcp.push_frame(&config_frame(json!([])));
        panel.tick();

        for _ in 0..1100 {
            panel.tick();
        }

        let heartbeats = frames_of_type(&panel, "panel_heartbeat");
        assert!(heartbeats.len() >= 2);
        let stamps: Vec<u64> = heartbeats
            .iter()
            .map(|f| f["timestamp"].as_str().unwrap().parse().unwrap())
            .collect();
        for pair in stamps.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= HEARTBEAT_INTERVAL_MS, "gap {gap}");
            assert!(gap < HEARTBEAT_INTERVAL_MS + 2 * u64::from(LOOP_YIELD_MS), "gap {gap}");
        }
    }

    #[test]
    fn test_wifi_drop_sets_error_and_recovery_clears_ledger() {
        let mut panel = started_panel();

        panel.wifi.state = WifiStatus::Down;
        panel.board.advance(RECONNECT_DELAY_MS);
        panel.tick();
        assert_eq!(panel.status(), PanelStatus::Error);
        assert!(panel.ledger.iter().any(|e| e == "WiFi disconnected"));
        // The reconnect path kicked re-association (the mock comes back up).
        assert_eq!(panel.wifi.state, WifiStatus::Up);

        panel.tick();
        assert!(panel.ledger.is_empty());
    }

    #[test]
    fn test_network_config_is_frozen_after_start() {
        let mut panel = panel();
        panel.set_network_config("Bridge_2", "pw", "10.0.0.2", 9000);
        assert_eq!(panel.net.ssid.as_str(), "Bridge_2");
        assert_eq!(panel.net.server_port, 9000);

        panel.start().unwrap();
        panel.set_network_config("Other", "pw", "10.0.0.3", 9100);
        assert_eq!(panel.net.ssid.as_str(), "Bridge_2");
    }

    #[test]
    fn test_malformed_frames_are_dropped_without_disconnect() {
        let mut panel = started_panel();
        panel.tcp.push_frame("{not json at all");
        panel.tcp.push_frame(r#"{"timestamp":"1","data":{}}"#);
        panel.tcp.push_frame(r#"{"type":"panel_warp","timestamp":"1","data":{}}"#);
        panel.tick();

        assert!(panel.is_connected());
        assert_eq!(panel.status(), PanelStatus::Configuring);
        assert!(panel.ledger.is_empty());
    }

    #[test]
    fn test_config_replacement_is_atomic() {
        // After a new config applies, the old device is gone.
        let mut panel = started_panel();
        panel.board.levels[4] = false;
        panel.tcp.push_frame(&config_frame(
            json!([{"id": "old_button", "type": "button", "pin": 4, "config": {"debounce_ms": 1}}]),
        ));
        panel.tick();

        panel.tcp.push_frame(&config_frame(
            json!([{"id": "lamp", "type": "led", "pin": 2, "config": {}}]),
        ));
        panel.tick();

        // Toggle the old button's pin; no input frame may appear.
        panel.board.levels[4] = true;
        for _ in 0..20 {
            panel.tick();
        }
        assert!(frames_of_type(&panel, "panel_input").is_empty());
        assert_eq!(panel.device_count(), 1);
    }
}
