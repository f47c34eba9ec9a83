//! Wire Protocol
//!
//! Encoding of renderer messages and decoding of client events. Transport
//! adapters pick a [`WireFormat`] and use it on both directions of a
//! connection.
//!
//! MessagePack frames use named fields, so both formats carry the same
//! shape:
//!
//! ```text
//! server → client: {"root", "src", "new", "old", "error"?}
//! client → server: {"target", "data"}
//! ```

use serde::Deserialize;

use crate::error::ProtocolError;
use crate::render::{LayoutEvent, RendererMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Json,
    MessagePack,
}

impl WireFormat {
    pub fn encode(self, message: &RendererMessage) -> Result<Vec<u8>, ProtocolError> {
        match self {
            WireFormat::Json => Ok(serde_json::to_vec(message)?),
            WireFormat::MessagePack => Ok(rmp_serde::to_vec_named(message)?),
        }
    }

    pub fn decode_event(self, frame: &[u8]) -> Result<LayoutEvent, ProtocolError> {
        match self {
            WireFormat::Json => Ok(serde_json::from_slice(frame)?),
            WireFormat::MessagePack => Ok(rmp_serde::from_slice(frame)?),
        }
    }
}

/// Encode a message as a JSON text frame.
pub fn encode_json(message: &RendererMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode_json_event(frame: &str) -> Result<LayoutEvent, ProtocolError> {
    Ok(serde_json::from_str(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::LayoutUpdate;
    use crate::vdom::{EventHandler, VdomNode};
    use serde_json::{json, Value};

    fn message() -> RendererMessage {
        let node = VdomNode::new("button")
            .with_key(1i64)
            .with_attribute("id", "go")
            .with_child("Go")
            .with_event_handler("onClick", EventHandler::new(|_| {}).with_target("t1"));
        RendererMessage::from_update("root", LayoutUpdate::new("root").with_new("root", node))
    }

    #[test]
    fn json_frames_match_the_wire_shape() {
        let frame = encode_json(&message()).unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "root": "root",
                "src": "root",
                "new": {"root": {
                    "tagName": "button",
                    "key": 1,
                    "attributes": {"id": "go"},
                    "children": ["Go"],
                    "eventHandlers": {"onClick": {"target": "t1", "preventDefault": false, "stopPropagation": false}}
                }},
                "old": []
            })
        );
    }

    #[test]
    fn messagepack_frames_keep_field_names() {
        let frame = WireFormat::MessagePack.encode(&message()).unwrap();
        let value: Value = rmp_serde::from_slice(&frame).unwrap();
        let json = serde_json::to_value(message()).unwrap();
        assert_eq!(value, json);
    }

    #[test]
    fn events_decode_from_both_formats() {
        let event = LayoutEvent::new("t1", vec![json!({"value": "x"})]);

        let json_frame = serde_json::to_vec(&event).unwrap();
        assert_eq!(WireFormat::Json.decode_event(&json_frame).unwrap(), event);

        let msgpack_frame = rmp_serde::to_vec_named(&event).unwrap();
        assert_eq!(WireFormat::MessagePack.decode_event(&msgpack_frame).unwrap(), event);
    }

    #[test]
    fn malformed_events_are_errors() {
        assert!(matches!(decode_json_event("{\"data\": []}"), Err(ProtocolError::Json(_))));
        assert!(matches!(
            WireFormat::MessagePack.decode_event(&[0xc1]),
            Err(ProtocolError::MessagePackDecode(_))
        ));
    }

    #[test]
    fn unrendered_components_cannot_be_encoded() {
        use crate::vdom::{Child, FnComponent};
        use std::sync::Arc;

        let component = Arc::new(FnComponent::new("Lazy", || Ok(VdomNode::new("p"))));
        let node = VdomNode::new("div").with_child(Child::Component(component));
        let message = RendererMessage::from_update("root", LayoutUpdate::new("root").with_new("root", node));
        assert!(encode_json(&message).is_err());
    }
}
