// ── Roster snapshot ──
//
// A snapshot is immutable once built. Publishing a new roster always
// means swapping in a whole new `Arc<RosterSnapshot>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::DeviceRecord;
use super::mac::MacAddress;

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Fetched from the router by the last successful tick.
    Live,
    /// Read back from the external cache.
    Cached,
    /// Empty placeholder: nothing fetched yet, or the last tick failed.
    Stale,
}

/// A complete roster at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterSnapshot {
    pub devices: Vec<DeviceRecord>,
    pub captured_at: DateTime<Utc>,
    pub source: SnapshotSource,
}

impl RosterSnapshot {
    pub fn live(devices: Vec<DeviceRecord>) -> Self {
        Self {
            devices,
            captured_at: Utc::now(),
            source: SnapshotSource::Live,
        }
    }

    /// The fail-closed empty snapshot.
    pub fn stale() -> Self {
        Self {
            devices: Vec::new(),
            captured_at: Utc::now(),
            source: SnapshotSource::Stale,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn online_count(&self) -> usize {
        self.devices.iter().filter(|d| d.online).count()
    }

    /// Look up a device by MAC, ignoring case and separator style.
    pub fn find(&self, mac: &str) -> Option<&DeviceRecord> {
        let mac = MacAddress::new(mac);
        if mac.is_empty() {
            return None;
        }
        self.devices.iter().find(|d| d.mac == mac)
    }

    pub fn contains_mac(&self, mac: &str) -> bool {
        self.find(mac).is_some()
    }

    /// The document stored in the external cache.
    pub fn to_payload(&self) -> RosterPayload {
        RosterPayload {
            clients: self.devices.clone(),
            last_updated: self.captured_at,
            total_clients: self.devices.len(),
        }
    }
}

/// Serialized form of a snapshot in the external cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPayload {
    pub clients: Vec<DeviceRecord>,
    pub last_updated: DateTime<Utc>,
    pub total_clients: usize,
}

impl RosterPayload {
    pub fn into_snapshot(self) -> RosterSnapshot {
        RosterSnapshot {
            devices: self.clients,
            captured_at: self.last_updated,
            source: SnapshotSource::Cached,
        }
    }
}
