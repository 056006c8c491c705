//! Stream message envelopes.
//!
//! Every frame is a JSON object `{"type": "...", "data": ...}`. Inbound
//! `traffic_update` carries an object keyed by intersection id; `ping` and
//! `pong` carry nothing and only prove the stream is alive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::stream::error::EnvelopeError;
use crate::traffic::{IntersectionId, SnapshotUpdate};

const TRAFFIC_UPDATE: &str = "traffic_update";

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// A recognised inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    TrafficUpdate(TrafficUpdate),
    Ping,
    Pong,
}

impl Inbound {
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::TrafficUpdate(_) => TRAFFIC_UPDATE,
            Inbound::Ping => "ping",
            Inbound::Pong => "pong",
        }
    }
}

/// Decoded `traffic_update` payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficUpdate {
    /// Entries in the order they appeared.
    pub entries: Vec<(IntersectionId, SnapshotUpdate)>,
    /// Entries that failed to decode: (intersection key, reason).
    pub rejected: Vec<(String, String)>,
}

/// Outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Ping,
}

impl Outbound {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Parse one inbound text frame.
pub fn parse_inbound(text: &str) -> Result<Inbound, EnvelopeError> {
    let raw: RawEnvelope = serde_json::from_str(text)?;
    let kind = raw.kind.ok_or(EnvelopeError::MissingType)?;

    match kind.as_str() {
        TRAFFIC_UPDATE => decode_traffic(raw.data).map(Inbound::TrafficUpdate),
        "ping" => Ok(Inbound::Ping),
        "pong" => Ok(Inbound::Pong),
        _ => Err(EnvelopeError::UnknownType(kind)),
    }
}

fn decode_traffic(data: Option<Value>) -> Result<TrafficUpdate, EnvelopeError> {
    let map: Map<String, Value> = match data {
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(EnvelopeError::InvalidData {
                kind: TRAFFIC_UPDATE,
                reason: format!("expected an object, got {}", json_kind(&other)),
            })
        }
        None => {
            return Err(EnvelopeError::InvalidData {
                kind: TRAFFIC_UPDATE,
                reason: "missing data".to_string(),
            })
        }
    };

    let mut update = TrafficUpdate::default();
    for (key, value) in map {
        match serde_json::from_value::<SnapshotUpdate>(value) {
            Ok(snapshot) => update.entries.push((IntersectionId::from(key), snapshot)),
            Err(e) => update.rejected.push((key, e.to_string())),
        }
    }
    Ok(update)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
