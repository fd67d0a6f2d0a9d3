//! Serialization of the model back into event-data wire shape.
//!
//! The output parses back through [`crate::deserialize`] to an equal value.

use serde_json::{json, Value};

use crate::types::*;

impl Offer {
    /// `{id, etag, score, schema, meta, data: {id, type, content, language, characteristics}}`.
    pub fn to_event_data(&self) -> Value {
        json!({
            "id": self.id(),
            "etag": self.etag(),
            "score": self.score(),
            "schema": self.schema(),
            "meta": self.meta(),
            "data": {
                "id": self.id(),
                "type": self.offer_type().as_format(),
                "content": self.content(),
                "language": self.language(),
                "characteristics": self.characteristics(),
            }
        })
    }
}

impl Proposition {
    /// `{id, scope, scopeDetails?, activity?, placement?, items}`.
    pub fn to_event_data(&self) -> Value {
        let mut map = JsonMap::new();
        map.insert("id".to_string(), Value::String(self.id().to_string()));
        map.insert("scope".to_string(), Value::String(self.scope().to_string()));
        for (key, value) in [
            ("scopeDetails", self.scope_details()),
            ("activity", self.activity()),
            ("placement", self.placement()),
        ] {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::Object(value.clone()));
            }
        }
        map.insert(
            "items".to_string(),
            Value::Array(self.offers().iter().map(Offer::to_event_data).collect()),
        );
        Value::Object(map)
    }
}

impl DecisionScope {
    /// `{name}`, the form carried in a request's `decisionscopes` list.
    pub fn to_event_data(&self) -> Value {
        json!({ "name": self.name() })
    }
}
