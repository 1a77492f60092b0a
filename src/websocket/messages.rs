//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! clients and the IronLog server.

use serde::{Deserialize, Serialize};

use crate::store::{Change, EventTarget, Origin, StoreEvent};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics, e.g. `collections.workouts` or `collections.*`
    Subscribe { topics: Vec<String> },
    Unsubscribe { topics: Vec<String> },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Something in the store changed; clients re-fetch what they show
    Change {
        topic: String,
        target: EventTarget,
        change: Change,
        origin: Origin,
    },
    /// Session and sync notices
    System { message: String },
    Subscribed { topics: Vec<String> },
    Unsubscribed { topics: Vec<String> },
    Pong,
    Error { message: String },
    Connected { connection_id: String },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to (e.g., "collections.workouts")
    pub topic: String,
    pub message: ServerMessage,
}

impl WsEvent {
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            topic: "system".to_string(),
            message: ServerMessage::System {
                message: message.into(),
            },
        }
    }
}

impl From<StoreEvent> for WsEvent {
    fn from(event: StoreEvent) -> Self {
        let topic = event.topic();
        Self {
            topic: topic.clone(),
            message: ServerMessage::Change {
                topic,
                target: event.target,
                change: event.change,
                origin: event.origin,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CollectionKind;

    #[test]
    fn test_client_message_deserialize_subscribe() {
        let json = r#"{"type": "subscribe", "topics": ["collections.workouts", "collections.*"]}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe { topics } => {
                assert_eq!(topics.len(), 2);
                assert_eq!(topics[0], "collections.workouts");
            }
            _ => panic!("Expected Subscribe"),
        }
    }

    #[test]
    fn test_client_message_deserialize_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_store_event_becomes_change_message() {
        let event = WsEvent::from(StoreEvent::local(
            EventTarget::Collection(CollectionKind::Workouts),
            Change::Removed { id: "w1".into() },
        ));
        assert_eq!(event.topic, "collections.workouts");

        let json = serde_json::to_value(&event.message).unwrap();
        assert_eq!(json["type"], "change");
        assert_eq!(json["target"]["type"], "collection");
        assert_eq!(json["target"]["name"], "workouts");
        assert_eq!(json["change"]["kind"], "removed");
        assert_eq!(json["change"]["id"], "w1");
        assert_eq!(json["origin"], "local");
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }
}
