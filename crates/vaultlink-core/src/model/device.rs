// ── Device domain type ──
//
// One normalized entry of the router's client roster. Every field has a
// concrete value; the only optional fields are the ones the router itself
// reports as nullable.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::mac::MacAddress;

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// How a device is attached to the router, derived from its interface name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Wifi,
    Ethernet,
    Other,
}

/// The canonical roster entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    // Identity
    pub mac: MacAddress,
    pub ip: String,
    pub alias: String,
    pub name: String,

    // Connectivity
    pub online: bool,
    pub blocked: bool,
    pub iface: String,
    pub client_class: String,
    pub client_type: u64,
    pub remote: bool,

    // Traffic: cumulative totals, current window, and the totals captured
    // at the router's reference point.
    pub total_rx: u64,
    pub total_tx: u64,
    pub rx: u64,
    pub tx: u64,
    pub total_rx_init: u64,
    pub total_tx_init: u64,

    // Rate limits
    pub limit_rx: u64,
    pub limit_tx: u64,

    // Reported as null until the router has sampled the device
    pub online_time: Option<u64>,
    pub last_update_rate: Option<u64>,
    pub last_rx: Option<u64>,
    pub last_tx: Option<u64>,
}

impl DeviceRecord {
    /// Alias if set, else hostname, else MAC.
    pub fn display_name(&self) -> &str {
        if !self.alias.is_empty() {
            &self.alias
        } else if !self.name.is_empty() {
            &self.name
        } else {
            self.mac.as_str()
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_rx.saturating_add(self.total_tx)
    }

    /// Bytes received since the reference point.
    pub fn rx_since_reference(&self) -> u64 {
        self.total_rx.saturating_sub(self.total_rx_init)
    }

    /// Bytes sent since the reference point.
    pub fn tx_since_reference(&self) -> u64 {
        self.total_tx.saturating_sub(self.total_tx_init)
    }

    pub fn is_wifi(&self) -> bool {
        self.iface.to_lowercase().contains("wifi")
    }

    pub fn is_ethernet(&self) -> bool {
        let iface = self.iface.to_lowercase();
        iface.contains("cable") || iface.contains("eth")
    }

    pub fn link(&self) -> LinkKind {
        if self.is_wifi() {
            LinkKind::Wifi
        } else if self.is_ethernet() {
            LinkKind::Ethernet
        } else {
            LinkKind::Other
        }
    }

    /// Connection label: `WiFi`, `Ethernet`, or the raw interface name.
    pub fn link_label(&self) -> &str {
        match self.link() {
            LinkKind::Wifi => "WiFi",
            LinkKind::Ethernet => "Ethernet",
            LinkKind::Other => &self.iface,
        }
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.online { "Online" } else { "Offline" };
        write!(
            f,
            "{} ({}) - {status} via {} - {}",
            self.display_name(),
            self.ip,
            self.link_label(),
            format_bytes(self.total_bytes())
        )
    }
}

/// Format a byte count with 1024-based units and one decimal ("1.5 KB").
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in BYTE_UNITS {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} PB")
}
