// ── Roster normalization ──
//
// Turns the router's loosely typed client entries into `DeviceRecord`s.
// Every field is read through one of four accessors, each with a named
// default, so a missing or mistyped field never leaks into the model.

use serde_json::{Map, Value};
use tracing::debug;

use crate::model::{DeviceRecord, MacAddress};

/// Default for text fields.
const NO_TEXT: &str = "";
/// Default for byte counters and numeric codes.
const NO_COUNT: u64 = 0;
/// Default for boolean flags.
const NO_FLAG: bool = false;

/// One raw roster entry as returned by `clients get_list`.
#[derive(Debug, Clone, Copy)]
pub struct RawDevice<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> RawDevice<'a> {
    /// Wrap a roster entry. Only JSON objects are device entries.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(|fields| Self { fields })
    }

    /// Text field. Numbers are rendered as text; anything else is empty.
    pub fn text(&self, key: &str) -> String {
        match self.fields.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => NO_TEXT.to_owned(),
        }
    }

    /// Counter field. Accepts non-negative integers, floats (truncated)
    /// and numeric strings; anything else counts as zero.
    pub fn counter(&self, key: &str) -> u64 {
        self.fields.get(key).and_then(coerce_count).unwrap_or(NO_COUNT)
    }

    /// Boolean field. Numbers are true when non-zero; `"true"`/`"1"` are
    /// accepted as strings.
    pub fn flag(&self, key: &str) -> bool {
        match self.fields.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => matches!(s.trim(), "true" | "1"),
            _ => NO_FLAG,
        }
    }

    /// Nullable counter. Absent, `null`, or non-numeric values are `None`.
    pub fn nullable(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(coerce_count)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
fn coerce_count(value: &Value) -> Option<u64> {
    let float_to_count = |f: f64| (f.is_finite() && f >= 0.0).then(|| f.trunc() as u64);
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_to_count)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_count))
        }
        _ => None,
    }
}

impl From<RawDevice<'_>> for DeviceRecord {
    fn from(raw: RawDevice<'_>) -> Self {
        Self {
            mac: MacAddress::new(raw.text("mac")),
            ip: raw.text("ip"),
            alias: raw.text("alias"),
            name: raw.text("name"),
            online: raw.flag("online"),
            blocked: raw.flag("blocked"),
            iface: raw.text("iface"),
            client_class: raw.text("class"),
            client_type: raw.counter("type"),
            remote: raw.flag("remote"),
            total_rx: raw.counter("total_rx"),
            total_tx: raw.counter("total_tx"),
            rx: raw.counter("rx"),
            tx: raw.counter("tx"),
            total_rx_init: raw.counter("total_rx_init"),
            total_tx_init: raw.counter("total_tx_init"),
            limit_rx: raw.counter("limit_rx"),
            limit_tx: raw.counter("limit_tx"),
            online_time: raw.nullable("online_time"),
            last_update_rate: raw.nullable("last_update_rate"),
            last_rx: raw.nullable("last_rx"),
            last_tx: raw.nullable("last_tx"),
        }
    }
}

/// Normalize a raw roster, preserving router order. Non-object entries
/// are skipped.
pub fn normalize_roster(raw: &[Value]) -> Vec<DeviceRecord> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let device = RawDevice::from_value(entry);
            if device.is_none() {
                debug!(index, "skipping non-object roster entry");
            }
            device.map(DeviceRecord::from)
        })
        .collect()
}
