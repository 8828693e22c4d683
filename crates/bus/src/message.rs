use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A message on the assistant's bus. Serialized as
/// `{"type": ..., "data": {...}, "context": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub msg_type: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub context: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Converts a `json!` value into message data. Anything other than an object
/// yields empty data.
fn into_map(data: Value) -> Map<String, Value> {
    match data {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            warn!("discarding non-object message data: {}", other);
            Map::new()
        }
    }
}

impl Message {
    pub fn new(msg_type: impl Into<String>, data: Value) -> Self {
        Self {
            msg_type: msg_type.into(),
            data: into_map(data),
            context: Map::new(),
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = into_map(context);
        self
    }

    /// A new message travelling back to whoever sent this one: `source` and
    /// `destination` in the context are swapped.
    pub fn reply(&self, msg_type: impl Into<String>, data: Value) -> Self {
        let mut context = self.context.clone();
        let source = self.context.get("source").cloned();
        let destination = self.context.get("destination").cloned();

        match destination {
            Some(d) => context.insert("source".into(), d),
            None => context.remove("source"),
        };
        match source {
            Some(s) => context.insert("destination".into(), s),
            None => context.remove("destination"),
        };

        Self {
            msg_type: msg_type.into(),
            data: into_map(data),
            context,
        }
    }

    /// A reply of type `<type>.response`.
    pub fn response(&self, data: Value) -> Self {
        self.reply(format!("{}.response", self.msg_type), data)
    }

    /// A new message that keeps this message's context unchanged.
    pub fn forward(&self, msg_type: impl Into<String>, data: Value) -> Self {
        Self {
            msg_type: msg_type.into(),
            data: into_map(data),
            context: self.context.clone(),
        }
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_message_without_data_or_context() {
        let msg = Message::from_json(r#"{"type": "mycroft.stop"}"#).unwrap();

        assert_eq!(msg.msg_type, "mycroft.stop");
        assert!(msg.data.is_empty());
        assert!(msg.context.is_empty());
    }

    #[test]
    fn parses_null_data() {
        let msg = Message::from_json(r#"{"type": "x", "data": null, "context": null}"#).unwrap();

        assert!(msg.data.is_empty());
        assert!(msg.context.is_empty());
    }

    #[test]
    fn rejects_message_without_type() {
        assert!(Message::from_json(r#"{"data": {}}"#).is_err());
    }

    #[test]
    fn serializes_type_field() {
        let msg = Message::new("gui.page.show", json!({ "index": 0 }));
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({ "type": "gui.page.show", "data": { "index": 0 }, "context": {} })
        );
    }

    #[test]
    fn reply_swaps_source_and_destination() {
        let msg = Message::new("skill.ping", json!({}))
            .with_context(json!({ "source": "audio", "destination": "skills", "session": "s1" }));

        let reply = msg.reply("skill.pong", json!({ "ok": true }));

        assert_eq!(reply.context["source"], json!("skills"));
        assert_eq!(reply.context["destination"], json!("audio"));
        assert_eq!(reply.context["session"], json!("s1"));
        assert_eq!(reply.data["ok"], json!(true));
    }

    #[test]
    fn reply_without_destination_drops_source() {
        let msg = Message::new("a", json!({})).with_context(json!({ "source": "audio" }));

        let reply = msg.reply("b", json!({}));

        assert!(reply.context.get("source").is_none());
        assert_eq!(reply.context["destination"], json!("audio"));
    }

    #[test]
    fn response_appends_suffix() {
        let msg = Message::new("skill-camera.openvoiceos.public_api", json!({}));

        assert_eq!(
            msg.response(json!({})).msg_type,
            "skill-camera.openvoiceos.public_api.response"
        );
    }

    #[test]
    fn forward_keeps_context() {
        let msg = Message::new("a", json!({})).with_context(json!({ "source": "audio" }));

        let fwd = msg.forward("speak", json!({ "utterance": "hi" }));

        assert_eq!(fwd.context, msg.context);
        assert_eq!(fwd.data_str("utterance"), Some("hi"));
    }
}
