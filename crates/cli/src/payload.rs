//! Loading response payloads from disk.

use std::path::Path;
use std::sync::Arc;

use decisioning_bridge::event::keys;
use decisioning_interchange::{JsonMap, Offer, PayloadError, Proposition};
use serde_json::Value;

/// Read a response payload. A bare proposition list is accepted and
/// wrapped as `{"propositions": [...]}`.
pub(crate) fn read_payload(path: &Path) -> Result<JsonMap, String> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
    let value: Value = serde_json::from_str(&src)
        .map_err(|e| format!("error parsing JSON in '{}': {}", path.display(), e))?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Array(list) => {
            let mut map = JsonMap::new();
            map.insert(keys::PROPOSITIONS.to_string(), Value::Array(list));
            Ok(map)
        }
        _ => Err(format!(
            "'{}' is neither a response payload nor a list of propositions",
            path.display()
        )),
    }
}

/// Propositions in payload order. Malformed entries are skipped; an absent
/// or null `propositions` field yields an empty list.
pub(crate) fn propositions(payload: &JsonMap) -> Result<Vec<Arc<Proposition>>, PayloadError> {
    match payload.get(keys::PROPOSITIONS) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(list)) => Ok(list
            .iter()
            .filter_map(Proposition::from_event_data)
            .collect()),
        Some(_) => Err(PayloadError::TypeMismatch {
            record: "response",
            field: keys::PROPOSITIONS.to_string(),
            expected: "array",
        }),
    }
}

/// Offers of `propositions` in payload order, restricted to `ids` when
/// any are given.
pub(crate) fn select_offers(propositions: &[Arc<Proposition>], ids: &[String]) -> Vec<Offer> {
    propositions
        .iter()
        .flat_map(|p| p.offers().iter())
        .filter(|offer| ids.is_empty() || ids.iter().any(|id| id == offer.id()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> JsonMap {
        match json!({"propositions": [
            {"id": "p1", "scope": "s1", "items": [
                {"id": "a", "data": {"id": "a", "format": "text/plain", "content": "A"}},
                {"id": "b", "data": {"id": "b", "format": "text/plain", "content": "B"}}
            ]},
            {"id": "p2", "scope": "s2", "items": [
                {"id": "c", "data": {"id": "c", "format": "text/plain", "content": "C"}}
            ]},
            {"scope": "no id"}
        ]}) {
            Value::Object(map) => map,
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn malformed_propositions_are_skipped() {
        let list = propositions(&payload()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].id(), "p2");
    }

    #[test]
    fn selection_keeps_payload_order() {
        let list = propositions(&payload()).unwrap();
        let all: Vec<String> = select_offers(&list, &[])
            .iter()
            .map(|o| o.id().to_string())
            .collect();
        assert_eq!(all, ["a", "b", "c"]);

        let picked: Vec<String> = select_offers(&list, &["c".to_string(), "a".to_string()])
            .iter()
            .map(|o| o.id().to_string())
            .collect();
        assert_eq!(picked, ["a", "c"]);
    }

    #[test]
    fn non_array_propositions_are_rejected() {
        let mut map = JsonMap::new();
        map.insert("propositions".into(), json!({"id": "p1"}));
        let err = propositions(&map).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::TypeMismatch { expected: "array", .. }
        ));

        assert!(propositions(&JsonMap::new()).unwrap().is_empty());
        map.insert("propositions".into(), Value::Null);
        assert!(propositions(&map).unwrap().is_empty());
    }
}
