// ── Domain model ──
//
// Canonical types for the router roster. Everything here is plain data;
// the router API's loosely typed JSON is turned into these in `convert`.

pub mod device;
pub mod mac;
pub mod snapshot;

pub use device::{DeviceRecord, LinkKind, format_bytes};
pub use mac::MacAddress;
pub use snapshot::{RosterPayload, RosterSnapshot, SnapshotSource};
