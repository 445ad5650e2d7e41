//! Boot-time identity and network configuration.

use heapless::String;

/// Construction-time identity constants. Immutable after boot.
#[derive(Debug, Clone)]
pub struct PanelIdentity {
    panel_id: String<32>,
    station: String<16>,
}

impl PanelIdentity {
    /// Build an identity, truncating over-long values to their field bounds.
    #[must_use]
    pub fn new(panel_id: &str, station: &str) -> Self {
        Self {
            panel_id: bounded(panel_id),
            station: bounded(station),
        }
    }

    /// Stable panel id, matched against inbound `panel_id` fields.
    #[inline]
    #[must_use]
    pub fn panel_id(&self) -> &str {
        &self.panel_id
    }

    /// Grouping label ("helm", "tactical", ...).
    #[inline]
    #[must_use]
    pub fn station(&self) -> &str {
        &self.station
    }
}

/// Build a [`PanelIdentity`] from the `PANEL_ID` and `STATION` build
/// environment variables, with the stock fallbacks when unset.
#[macro_export]
macro_rules! panel_identity {
    () => {
        $crate::PanelIdentity::new(
            ::core::option_env!("PANEL_ID").unwrap_or("unknown_panel"),
            ::core::option_env!("STATION").unwrap_or("unknown"),
        )
    };
}

/// Network parameters. Mutable only before `start`.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub ssid: String<32>,
    pub password: String<64>,
    pub server_host: String<32>,
    pub server_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid: bounded("Celestial_Bridge"),
            password: bounded("starship2024"),
            server_host: bounded("192.168.1.100"),
            server_port: 8081,
        }
    }
}

/// Copy `s` into a bounded string, truncating at the capacity on a char
/// boundary.
pub(crate) fn bounded<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
