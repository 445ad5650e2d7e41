//! Connection state machine: Wi-Fi bring-up, TCP establishment,
//! rate-limited reconnection, and the watchdog cadence.
//!
//! ```text
//! Offline ──start──▶ Connecting
//! Connecting ── wifi up ──▶ Configuring        (TCP connect + heartbeat)
//! Connecting ── wifi timeout ──▶ Error
//! Configuring ── panel_config ──▶ Online | Partial
//! Online/Partial ── tcp closed ──▶ Connecting
//! Any ── wifi lost ──▶ Error ── backoff ──▶ Connecting
//! ```
//!
//! The runtime drives the transitions from its scheduler pass; this type
//! owns the status, the reconnect rate limit, and the watchdog timer.

use log::{debug, info};

use crate::config::NetworkConfig;
use crate::hal::{Board, TcpLink, Wifi, WifiStatus};
use crate::ledger::ErrorLedger;
use crate::{RECONNECT_DELAY_MS, WATCHDOG_TIMEOUT_MS, WIFI_TIMEOUT_MS};
use panel_proto::PanelStatus;

/// Error type for panel startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartError {
    /// Wi-Fi association did not come up within the deadline.
    WifiTimeout,
}

/// Owns the panel's connection status and retry/watchdog timing.
#[derive(Debug)]
pub struct LinkManager {
    status: PanelStatus,
    wifi_up: bool,
    last_reconnect_ms: u64,
    last_watchdog_ms: u64,
}

impl Default for LinkManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: PanelStatus::Offline,
            wifi_up: false,
            last_reconnect_ms: 0,
            last_watchdog_ms: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> PanelStatus {
        self.status
    }

    pub fn set_status(&mut self, status: PanelStatus) {
        if status != self.status {
            debug!("panel status {:?} -> {:?}", self.status, status);
            self.status = status;
        }
    }

    /// Whether the watchdog should be petted this pass.
    #[must_use]
    pub fn watchdog_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_watchdog_ms) >= WATCHDOG_TIMEOUT_MS
    }

    pub fn note_watchdog_fed(&mut self, now_ms: u64) {
        self.last_watchdog_ms = now_ms;
    }

    /// Track the observed Wi-Fi state; a re-association clears the
    /// transport errors accumulated while the link was down.
    pub fn note_wifi(&mut self, up: bool, ledger: &mut ErrorLedger) {
        if up && !self.wifi_up {
            info!("WiFi re-associated");
            ledger.clear();
        }
        self.wifi_up = up;
    }

    /// Whether a reconnection attempt is allowed at `now_ms`. The timer
    /// starts at boot, so the first attempt is rate-limited too.
    #[must_use]
    pub fn reconnect_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_reconnect_ms) >= RECONNECT_DELAY_MS
    }

    /// Bring the link up for the first time.
    ///
    /// Blocks up to [`WIFI_TIMEOUT_MS`] waiting for association (polling
    /// every 500 ms), then attempts the TCP connect. A failed TCP connect
    /// is not fatal: the runtime's reconnect path keeps retrying.
    pub fn start<W, T, B>(
        &mut self,
        wifi: &mut W,
        tcp: &mut T,
        board: &mut B,
        net: &NetworkConfig,
        ledger: &mut ErrorLedger,
    ) -> Result<(), StartError>
    where
        W: Wifi,
        T: TcpLink,
        B: Board,
    {
        self.set_status(PanelStatus::Connecting);
        info!("connecting to WiFi: {}", net.ssid);
        wifi.associate(&net.ssid, &net.password);

        let deadline = board.now_ms().saturating_add(WIFI_TIMEOUT_MS);
        while wifi.status() != WifiStatus::Up && board.now_ms() < deadline {
            board.sleep_ms(500);
        }

        if wifi.status() != WifiStatus::Up {
            ledger.push("WiFi timeout");
            self.set_status(PanelStatus::Error);
            return Err(StartError::WifiTimeout);
        }

        if let Some(address) = wifi.local_address() {
            info!("WiFi connected: {address}");
        }
        self.wifi_up = true;
        ledger.clear();

        self.connect_tcp(tcp, net, ledger);
        Ok(())
    }

    /// Attempt the TCP connect. On success the panel awaits configuration.
    pub fn connect_tcp<T: TcpLink>(
        &mut self,
        tcp: &mut T,
        net: &NetworkConfig,
        ledger: &mut ErrorLedger,
    ) -> bool {
        info!("connecting to server: {}:{}", net.server_host, net.server_port);
        if tcp.connect(&net.server_host, net.server_port) {
            self.set_status(PanelStatus::Configuring);
            true
        } else {
            ledger.push("Server unreachable");
            false
        }
    }

    /// Rate-limited recovery attempt.
    ///
    /// Kicks Wi-Fi re-association when the radio is down, else retries the
    /// TCP connect. Returns `true` when TCP was newly established this call
    /// (the caller owes the orchestrator an immediate heartbeat).
    pub fn maybe_reconnect<W, T>(
        &mut self,
        wifi: &mut W,
        tcp: &mut T,
        now_ms: u64,
        net: &NetworkConfig,
        ledger: &mut ErrorLedger,
    ) -> bool
    where
        W: Wifi,
        T: TcpLink,
    {
        if !self.reconnect_due(now_ms) {
            return false;
        }
        self.last_reconnect_ms = now_ms;
        info!("attempting reconnection");

        if wifi.status() != WifiStatus::Up {
            wifi.associate(&net.ssid, &net.password);
            return false;
        }
        if !tcp.is_connected() {
            return self.connect_tcp(tcp, net, ledger);
        }
        false
    }
}
