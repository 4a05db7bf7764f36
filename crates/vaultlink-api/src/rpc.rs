// JSON-RPC envelope types
//
// Every router call is a single `{"jsonrpc":"2.0","id":N,"method":..,"params":..}`
// POST. Params are either a keyed object or a positional array; the session
// id is injected differently for each shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Issues a login challenge. Never carries a session id.
pub const METHOD_CHALLENGE: &str = "challenge";
/// Exchanges a challenge response for a session id. Never carries a session id.
pub const METHOD_LOGIN: &str = "login";
/// No-op liveness probe.
pub const METHOD_ALIVE: &str = "alive";
/// Ends the session.
pub const METHOD_LOGOUT: &str = "logout";
/// Generic `[sid, module, method, params]` dispatch.
pub const METHOD_CALL: &str = "call";

/// Methods that run before a session exists.
pub fn is_bootstrap_method(method: &str) -> bool {
    matches!(method, METHOD_CHALLENGE | METHOD_LOGIN)
}

// ── Params ───────────────────────────────────────────────────────────

/// Parameters of an RPC call.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// `{"key": value, ...}` -- the session id goes in as `sid`.
    Keyed(Map<String, Value>),
    /// `[value, ...]` -- the session id is prepended.
    Positional(Vec<Value>),
}

impl Default for Params {
    fn default() -> Self {
        Self::Keyed(Map::new())
    }
}

impl Params {
    /// Build keyed params from `(name, value)` pairs.
    pub fn keyed<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Keyed(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn positional(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }

    /// Apply the session injection rule for `sid`.
    ///
    /// Keyed params get (or overwrite) a `sid` field. Positional params get
    /// `sid` prepended unless the first element already is `sid`.
    pub fn with_session(self, sid: &str) -> Self {
        match self {
            Self::Keyed(mut map) => {
                map.insert("sid".into(), Value::String(sid.to_owned()));
                Self::Keyed(map)
            }
            Self::Positional(values) => {
                if values.first().and_then(Value::as_str) == Some(sid) {
                    Self::Positional(values)
                } else {
                    let mut injected = Vec::with_capacity(values.len() + 1);
                    injected.push(Value::String(sid.to_owned()));
                    injected.extend(values);
                    Self::Positional(injected)
                }
            }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Keyed(map) => Value::Object(map),
            Self::Positional(values) => Value::Array(values),
        }
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self::Keyed(map)
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

// ── Envelope ─────────────────────────────────────────────────────────

/// Outgoing request envelope.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Params) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params: params.into_value(),
        }
    }
}

/// Incoming response envelope. `result` and `error` are both optional;
/// a `null` error counts as no error.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl RpcResponse {
    /// Unwrap the envelope: the error payload wins, a missing result
    /// becomes an empty object.
    pub fn into_result(self) -> Result<Value, Error> {
        if let Some(payload) = self.error {
            return Err(Error::Rpc { payload });
        }
        Ok(self.result.unwrap_or_else(|| Value::Object(Map::new())))
    }
}

// ── Handshake payloads ───────────────────────────────────────────────

/// Result of the `challenge` method.
#[derive(Debug, Clone, Deserialize)]
pub struct Challenge {
    /// Crypt algorithm id. Routers send it as either `"1"` or `1`.
    #[serde(deserialize_with = "string_or_number")]
    pub alg: String,
    pub salt: String,
    pub nonce: String,
}

/// Result of the `login` method.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginGrant {
    #[serde(default)]
    pub sid: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
