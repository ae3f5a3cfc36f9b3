//! Pusher protocol message types and decoding.

use crate::error::{BindingError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Discriminator carried by protocol-level error frames
pub const INTERNAL_ERROR: &str = "pusher:error";
/// Discriminator carried by server pings
pub const INTERNAL_PING: &str = "pusher:ping";
/// Discriminator carried by server pongs
pub const INTERNAL_PONG: &str = "pusher:pong";

/// Pusher event message structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PusherEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(
        default,
        deserialize_with = "data_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Pusher sends `data` as an encoded string, but some servers inline the
/// object; normalise both to text.
fn data_as_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl PusherEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            channel: None,
            data: None,
            user_id: None,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_string_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Check if this is an internal Pusher event
    pub fn is_internal(&self) -> bool {
        self.event.starts_with("pusher_internal:") || self.event.starts_with("pusher:")
    }

    /// Get data field as Value
    pub fn data_as_value(&self) -> Option<Value> {
        self.data
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
    }

    /// Parse data as a specific type
    pub fn parse_data<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| BindingError::protocol("No data in event"))?;
        serde_json::from_str(data).map_err(Into::into)
    }
}

/// Raw payload as delivered by the transport: an opaque JSON object that
/// supports key lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent(Map<String, Value>);

impl RawEvent {
    pub fn new(event: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("event".to_string(), Value::String(event.into()));
        Self(map)
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn with_channel(self, channel: impl Into<String>) -> Self {
        self.with_field("channel", Value::String(channel.into()))
    }

    pub fn with_data(self, data: Value) -> Self {
        self.with_field("data", data)
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Look up a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `event` discriminator, if present and a string
    pub fn event_name(&self) -> Option<&str> {
        self.get("event").and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for RawEvent {
    type Error = BindingError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(BindingError::protocol(format!(
                "Expected a JSON object, got {}",
                other
            ))),
        }
    }
}

/// Logical events exposed on the connection scope.
///
/// The transport surfaces all of them on one callback slot; the `event` key of
/// the raw payload tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
    Error,
    Ping,
    Pong,
}

impl ConnectionEvent {
    pub const ALL: [ConnectionEvent; 3] = [Self::Error, Self::Ping, Self::Pong];

    /// Logical name used by application code
    pub fn name(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }

    /// Value of the `event` key identifying this event on the wire
    pub fn discriminator(&self) -> &'static str {
        match self {
            Self::Error => INTERNAL_ERROR,
            Self::Ping => INTERNAL_PING,
            Self::Pong => INTERNAL_PONG,
        }
    }

    pub fn from_discriminator(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.discriminator() == value)
    }
}

impl FromStr for ConnectionEvent {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| BindingError::invalid_event(format!("Unknown connection event: {}", s)))
    }
}

impl std::fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Protocol helper
pub struct Protocol;

impl Protocol {
    /// Decode a text frame into a raw payload
    pub fn decode_message(raw: &str) -> Result<RawEvent> {
        let value: Value = serde_json::from_str(raw)?;
        RawEvent::try_from(value)
    }

    /// Turn a raw payload into a typed event
    pub fn deserialize(raw: &RawEvent) -> Result<PusherEvent> {
        PusherEvent::deserialize(Value::Object(raw.as_map().clone())).map_err(Into::into)
    }

    /// Which internal connection event, if any, a raw payload carries
    pub fn internal_event(raw: &RawEvent) -> Option<ConnectionEvent> {
        raw.event_name().and_then(ConnectionEvent::from_discriminator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_string_data() {
        let raw = Protocol::decode_message(
            r#"{"event":"price-update","channel":"order-42","data":"{\"price\":10}"}"#,
        )
        .unwrap();
        let event = Protocol::deserialize(&raw).unwrap();

        assert_eq!(event.event, "price-update");
        assert_eq!(event.channel.as_deref(), Some("order-42"));
        assert_eq!(event.data_as_value(), Some(json!({"price": 10})));
    }

    #[test]
    fn test_deserialize_inline_object_data() {
        let raw = RawEvent::new("pusher:error").with_data(json!({"message": "boom", "code": 4001}));
        let event = Protocol::deserialize(&raw).unwrap();

        assert!(event.is_internal());
        let data: Value = event.parse_data().unwrap();
        assert_eq!(data["code"], 4001);
    }

    #[test]
    fn test_deserialize_requires_event_name() {
        let raw = RawEvent::default().with_data(json!("x"));
        assert!(Protocol::deserialize(&raw).is_err());
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            Protocol::decode_message("[1,2]"),
            Err(BindingError::ProtocolError { .. })
        ));
    }

    #[test]
    fn test_internal_event_discriminator() {
        assert_eq!(
            Protocol::internal_event(&RawEvent::new("pusher:ping")),
            Some(ConnectionEvent::Ping)
        );
        assert_eq!(
            Protocol::internal_event(&RawEvent::new("pusher:pong")),
            Some(ConnectionEvent::Pong)
        );
        assert_eq!(Protocol::internal_event(&RawEvent::new("my-event")), None);
        assert_eq!(Protocol::internal_event(&RawEvent::default()), None);
    }

    #[test]
    fn test_connection_event_names() {
        assert_eq!("ping".parse::<ConnectionEvent>().unwrap(), ConnectionEvent::Ping);
        assert_eq!(ConnectionEvent::Error.to_string(), "error");
        assert!("pusher:ping".parse::<ConnectionEvent>().is_err());
    }
}
