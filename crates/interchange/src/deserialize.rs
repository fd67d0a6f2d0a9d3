//! Parsing of event-data payloads into propositions and offers.
//!
//! The strict entry points [`parse_offer`] and [`parse_proposition`] return a
//! classified [`PayloadError`]. The lenient `from_event_data` constructors
//! log the failure and return `None`, which is how response handling
//! consumes them: one malformed record never aborts its batch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::types::*;

const OFFER: &str = "offer";
const OFFER_DATA: &str = "offer data";
const PROPOSITION: &str = "proposition";

/// Errors while parsing a proposition or offer payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The payload is absent, not an object, or an empty object.
    Empty { record: &'static str },
    /// A required field is missing or empty.
    MissingField { record: &'static str, field: String },
    /// A field is present with the wrong JSON type.
    TypeMismatch {
        record: &'static str,
        field: String,
        expected: &'static str,
    },
    /// The nested item-data id is missing or differs from the item id.
    IdMismatch { id: String, data_id: String },
    /// Item data carries neither `content` nor `deliveryURL`.
    MissingContent { id: String },
    /// Item data is absent and the item is not a default-content item.
    NotDefaultContent { id: String, schema: String },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Empty { record } => {
                write!(f, "{} payload is empty or not an object", record)
            }
            PayloadError::MissingField { record, field } => {
                write!(f, "{} missing required field: '{}'", record, field)
            }
            PayloadError::TypeMismatch {
                record,
                field,
                expected,
            } => {
                write!(f, "{} field '{}': expected {}", record, field, expected)
            }
            PayloadError::IdMismatch { id, data_id } => {
                write!(
                    f,
                    "offer '{}': item data id '{}' does not match item id",
                    id, data_id
                )
            }
            PayloadError::MissingContent { id } => {
                write!(f, "offer '{}': item data has no content or deliveryURL", id)
            }
            PayloadError::NotDefaultContent { id, schema } => {
                write!(
                    f,
                    "offer '{}': missing item data for non-default schema '{}'",
                    id, schema
                )
            }
        }
    }
}

impl std::error::Error for PayloadError {}

impl Offer {
    /// Build an offer from event data, or `None` if the payload is malformed.
    pub fn from_event_data(data: &Value) -> Option<Offer> {
        match parse_offer(data) {
            Ok(offer) => Some(offer),
            Err(e @ PayloadError::TypeMismatch { .. }) => {
                tracing::warn!(error = %e, "cannot create offer, payload contains invalid fields");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "cannot create offer");
                None
            }
        }
    }
}

impl Proposition {
    /// Build a proposition from event data, or `None` if the payload is malformed.
    ///
    /// Individual offers that fail to parse are dropped; the proposition
    /// is kept with the offers that survived.
    pub fn from_event_data(data: &Value) -> Option<Arc<Proposition>> {
        match parse_proposition(data) {
            Ok(proposition) => Some(proposition),
            Err(e @ PayloadError::TypeMismatch { .. }) => {
                tracing::warn!(error = %e, "cannot create proposition, payload contains invalid fields");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "cannot create proposition");
                None
            }
        }
    }
}

/// Parse one proposition item (`{id, etag, score, schema, meta, data}`).
pub fn parse_offer(value: &Value) -> Result<Offer, PayloadError> {
    let obj = non_empty_object(value, OFFER)?;

    let id = opt_str(obj, OFFER, "id")?;
    let etag = opt_str(obj, OFFER, "etag")?.unwrap_or_default();
    let score = opt_f64(obj, OFFER, "score")?.unwrap_or(0.0);
    let schema = opt_str(obj, OFFER, "schema")?.unwrap_or_default();
    let meta = opt_object(obj, OFFER, "meta")?.cloned().unwrap_or_default();

    let Some(data) = opt_object(obj, OFFER, "data")?.filter(|d| !d.is_empty()) else {
        if schema != DEFAULT_CONTENT_SCHEMA {
            return Err(PayloadError::NotDefaultContent {
                id: id.unwrap_or_default(),
                schema,
            });
        }
        tracing::trace!("default content item, offer content will be empty");
        return Ok(OfferBuilder::new(id.unwrap_or_default(), OfferType::Unknown, "")
            .etag(etag)
            .score(score)
            .schema(schema)
            .meta(meta)
            .build());
    };

    let data_id = opt_str(data, OFFER_DATA, "id")?.unwrap_or_default();
    let id = match id {
        Some(id) if !data_id.is_empty() && id == data_id => id,
        other => {
            return Err(PayloadError::IdMismatch {
                id: other.unwrap_or_default(),
                data_id,
            })
        }
    };

    let offer_type = match opt_str(data, OFFER_DATA, "format")? {
        Some(format) => OfferType::from_format(&format),
        None => opt_str(data, OFFER_DATA, "type")?
            .map(|t| OfferType::from_format(&t))
            .unwrap_or_default(),
    };
    let language = opt_string_list(data, OFFER_DATA, "language")?.unwrap_or_default();
    let characteristics =
        opt_string_map(data, OFFER_DATA, "characteristics")?.unwrap_or_default();

    let content = match content_from(data) {
        Some(content) => content,
        None => opt_str(data, OFFER_DATA, "deliveryURL")?
            .ok_or_else(|| PayloadError::MissingContent { id: id.clone() })?,
    };

    Ok(OfferBuilder::new(id, offer_type, content)
        .etag(etag)
        .score(score)
        .schema(schema)
        .meta(meta)
        .language(language)
        .characteristics(characteristics)
        .build())
}

/// Parse one proposition (`{id, scope, scopeDetails, activity, placement, items}`).
///
/// Offers that fail to parse are logged and dropped.
pub fn parse_proposition(value: &Value) -> Result<Arc<Proposition>, PayloadError> {
    let obj = non_empty_object(value, PROPOSITION)?;

    let id = required_str(obj, PROPOSITION, "id")?;
    let scope = required_str(obj, PROPOSITION, "scope")?;
    let scope_details = opt_object(obj, PROPOSITION, "scopeDetails")?.cloned();
    let activity = opt_object(obj, PROPOSITION, "activity")?.cloned();
    let placement = opt_object(obj, PROPOSITION, "placement")?.cloned();

    let items = match obj.get("items") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => return Err(type_mismatch(PROPOSITION, "items", "array")),
    };

    let offers = items
        .iter()
        .filter_map(|item| match parse_offer(item) {
            Ok(offer) => Some(offer),
            Err(e) => {
                tracing::debug!(proposition = %id, error = %e, "dropping malformed offer");
                None
            }
        })
        .collect();

    Ok(Proposition::builder(id, scope)
        .offers(offers)
        .scope_details(scope_details)
        .activity(activity)
        .placement(placement)
        .build())
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn type_mismatch(record: &'static str, field: &str, expected: &'static str) -> PayloadError {
    PayloadError::TypeMismatch {
        record,
        field: field.to_string(),
        expected,
    }
}

fn non_empty_object<'a>(value: &'a Value, record: &'static str) -> Result<&'a JsonMap, PayloadError> {
    value
        .as_object()
        .filter(|obj| !obj.is_empty())
        .ok_or(PayloadError::Empty { record })
}

/// Absent and `null` read as `None`; any non-string value is a mismatch.
fn opt_str(obj: &JsonMap, record: &'static str, field: &str) -> Result<Option<String>, PayloadError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(type_mismatch(record, field, "string")),
    }
}

fn required_str(obj: &JsonMap, record: &'static str, field: &str) -> Result<String, PayloadError> {
    opt_str(obj, record, field)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PayloadError::MissingField {
            record,
            field: field.to_string(),
        })
}

fn opt_f64(obj: &JsonMap, record: &'static str, field: &str) -> Result<Option<f64>, PayloadError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| type_mismatch(record, field, "number")),
        Some(_) => Err(type_mismatch(record, field, "number")),
    }
}

fn opt_object<'a>(
    obj: &'a JsonMap,
    record: &'static str,
    field: &str,
) -> Result<Option<&'a JsonMap>, PayloadError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(type_mismatch(record, field, "object")),
    }
}

fn opt_string_list(
    obj: &JsonMap,
    record: &'static str,
    field: &str,
) -> Result<Option<Vec<String>>, PayloadError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(arr)) => arr
            .iter()
            .map(|v| v.as_str().map(|s| s.to_string()))
            .collect::<Option<Vec<_>>>()
            .map(Some)
            .ok_or_else(|| type_mismatch(record, field, "array of strings")),
        Some(_) => Err(type_mismatch(record, field, "array of strings")),
    }
}

fn opt_string_map(
    obj: &JsonMap,
    record: &'static str,
    field: &str,
) -> Result<Option<BTreeMap<String, String>>, PayloadError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect::<Option<BTreeMap<_, _>>>()
            .map(Some)
            .ok_or_else(|| type_mismatch(record, field, "object of strings")),
        Some(_) => Err(type_mismatch(record, field, "object of strings")),
    }
}

/// String content verbatim, object content re-serialized in compact form.
fn content_from(data: &JsonMap) -> Option<String> {
    match data.get("content")? {
        Value::String(s) => Some(s.clone()),
        v @ Value::Object(_) => Some(v.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_offer() -> Value {
        json!({
            "id": "xcore:personalized-offer:1111111111111111",
            "etag": "10",
            "score": 1,
            "schema": "https://ns.adobe.com/experience/offer-management/content-component-json",
            "data": {
                "id": "xcore:personalized-offer:1111111111111111",
                "format": "application/json",
                "content": {"testing": "ho-ho"},
                "language": ["en-us"],
                "characteristics": {"mobile": "true"}
            }
        })
    }

    fn target_proposition() -> Value {
        json!({
            "id": "AT:eyJhY3Rpdml0eUlkIjoiMTExMTExIiwiZXhwZXJpZW5jZUlkIjoiMCJ9",
            "scope": "myMbox",
            "scopeDetails": {
                "decisionProvider": "TGT",
                "activity": {"id": "111111"},
                "experience": {"id": "0"},
                "strategies": [{"algorithmID": "0", "trafficType": "0"}]
            },
            "items": [{
                "id": "0",
                "schema": "https://ns.adobe.com/personalization/json-content-item",
                "meta": {"activity.name": "Demo"},
                "data": {
                    "id": "0",
                    "format": "application/json",
                    "content": {"device": "mobile"}
                }
            }]
        })
    }

    #[test]
    fn test_parse_json_offer() {
        let offer = parse_offer(&json_offer()).unwrap();
        assert_eq!(offer.id(), "xcore:personalized-offer:1111111111111111");
        assert_eq!(offer.etag(), "10");
        assert_eq!(offer.score(), 1.0);
        assert_eq!(offer.offer_type(), OfferType::Json);
        assert_eq!(offer.content(), r#"{"testing":"ho-ho"}"#);
        assert_eq!(offer.language(), ["en-us".to_string()]);
        assert_eq!(offer.characteristics()["mobile"], "true");
        assert!(offer.proposition().is_none());
    }

    #[test]
    fn test_parse_text_offer_from_type_field() {
        let offer = parse_offer(&json!({
            "id": "t1",
            "schema": "https://ns.adobe.com/personalization/text-content-item",
            "data": {"id": "t1", "type": "text/plain", "content": "Hello"}
        }))
        .unwrap();
        assert_eq!(offer.offer_type(), OfferType::Text);
        assert_eq!(offer.content(), "Hello");
        assert_eq!(offer.score(), 0.0);
    }

    #[test]
    fn test_format_wins_over_type() {
        let offer = parse_offer(&json!({
            "id": "h1",
            "data": {"id": "h1", "format": "text/html", "type": "text/plain", "content": "<h1/>"}
        }))
        .unwrap();
        assert_eq!(offer.offer_type(), OfferType::Html);
    }

    #[test]
    fn test_unknown_format() {
        let offer = parse_offer(&json!({
            "id": "u1",
            "data": {"id": "u1", "format": "application/x-custom", "content": "?"}
        }))
        .unwrap();
        assert_eq!(offer.offer_type(), OfferType::Unknown);
    }

    #[test]
    fn test_delivery_url_fallback() {
        let offer = parse_offer(&json!({
            "id": "img",
            "data": {
                "id": "img",
                "format": "image/png",
                "deliveryURL": "https://example.com/img1.png"
            }
        }))
        .unwrap();
        assert_eq!(offer.offer_type(), OfferType::Image);
        assert_eq!(offer.content(), "https://example.com/img1.png");
    }

    #[test]
    fn test_missing_content() {
        let result = parse_offer(&json!({
            "id": "img",
            "data": {"id": "img", "format": "image/png"}
        }));
        assert_eq!(
            result.unwrap_err(),
            PayloadError::MissingContent {
                id: "img".to_string()
            }
        );
    }

    #[test]
    fn test_data_id_mismatch() {
        let mut value = json_offer();
        value["data"]["id"] = json!("xcore:personalized-offer:2222222222222222");
        match parse_offer(&value).unwrap_err() {
            PayloadError::IdMismatch { id, data_id } => {
                assert_eq!(id, "xcore:personalized-offer:1111111111111111");
                assert_eq!(data_id, "xcore:personalized-offer:2222222222222222");
            }
            other => panic!("expected IdMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_outer_id_is_mismatch() {
        let mut value = json_offer();
        value.as_object_mut().unwrap().remove("id");
        assert!(matches!(
            parse_offer(&value),
            Err(PayloadError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_score() {
        let mut value = json_offer();
        value["score"] = json!("high");
        match parse_offer(&value).unwrap_err() {
            PayloadError::TypeMismatch { record, field, .. } => {
                assert_eq!(record, "offer");
                assert_eq!(field, "score");
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_non_string_id() {
        let mut value = json_offer();
        value["id"] = json!(42);
        assert!(matches!(
            parse_offer(&value),
            Err(PayloadError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_language() {
        let mut value = json_offer();
        value["data"]["language"] = json!(["en-us", 7]);
        match parse_offer(&value).unwrap_err() {
            PayloadError::TypeMismatch { record, field, .. } => {
                assert_eq!(record, "offer data");
                assert_eq!(field, "language");
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(
            parse_offer(&json!({})).unwrap_err(),
            PayloadError::Empty { record: "offer" }
        );
        assert!(parse_offer(&Value::Null).is_err());
        assert!(Offer::from_event_data(&json!([])).is_none());
    }

    #[test]
    fn test_default_content_item() {
        let offer = parse_offer(&json!({
            "id": "246315",
            "schema": "https://ns.adobe.com/personalization/default-content-item"
        }))
        .unwrap();
        assert_eq!(offer.id(), "246315");
        assert_eq!(offer.offer_type(), OfferType::Unknown);
        assert_eq!(offer.content(), "");
        assert_eq!(offer.schema(), DEFAULT_CONTENT_SCHEMA);
    }

    #[test]
    fn test_missing_data_for_regular_item() {
        let result = parse_offer(&json!({
            "id": "1",
            "schema": "https://ns.adobe.com/personalization/json-content-item"
        }));
        assert!(matches!(
            result,
            Err(PayloadError::NotDefaultContent { .. })
        ));
    }

    #[test]
    fn test_parse_target_proposition() {
        let proposition = parse_proposition(&target_proposition()).unwrap();
        assert_eq!(proposition.scope(), "myMbox");
        assert_eq!(
            proposition.scope_details().unwrap()["decisionProvider"],
            "TGT"
        );
        assert!(proposition.activity().is_none());
        assert_eq!(proposition.offers().len(), 1);

        let offer = &proposition.offers()[0];
        assert_eq!(offer.content(), r#"{"device":"mobile"}"#);
        assert_eq!(offer.meta()["activity.name"], "Demo");
        let owner = offer.proposition().expect("back-reference");
        assert!(Arc::ptr_eq(&owner, &proposition));
    }

    #[test]
    fn test_parse_ode_proposition() {
        let proposition = parse_proposition(&json!({
            "id": "de03ac85-802a-4331-a905-a57053164d35",
            "scope": "eyJhY3Rpdml0eUlkIjoieGNvcmU6b2ZmZXItYWN0aXZpdHk6MTExMTExMTExMTExMTExMSIsInBsYWNlbWVudElkIjoieGNvcmU6b2ZmZXItcGxhY2VtZW50OjExMTExMTExMTExMTExMTEifQ==",
            "activity": {"id": "xcore:offer-activity:1111111111111111", "etag": "8"},
            "placement": {"id": "xcore:offer-placement:1111111111111111", "etag": "1"},
            "items": [json_offer()]
        }))
        .unwrap();
        assert!(proposition.scope_details().is_none());
        assert_eq!(proposition.activity().unwrap()["etag"], "8");
        assert_eq!(proposition.placement().unwrap()["etag"], "1");
        assert_eq!(proposition.offers().len(), 1);
    }

    #[test]
    fn test_malformed_offer_dropped() {
        let mut payload = target_proposition();
        let mut bad = json_offer();
        bad["data"]["id"] = json!("someone-else");
        payload["items"].as_array_mut().unwrap().push(bad);

        let proposition = parse_proposition(&payload).unwrap();
        assert_eq!(proposition.offers().len(), 1);
        assert_eq!(proposition.offers()[0].id(), "0");
    }

    #[test]
    fn test_proposition_without_items() {
        let proposition = parse_proposition(&json!({"id": "p", "scope": "s"})).unwrap();
        assert!(proposition.offers().is_empty());
    }

    #[test]
    fn test_proposition_missing_scope() {
        let result = parse_proposition(&json!({"id": "p", "scope": "", "items": []}));
        match result.unwrap_err() {
            PayloadError::MissingField { record, field } => {
                assert_eq!(record, "proposition");
                assert_eq!(field, "scope");
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_proposition_items_not_array() {
        let result = parse_proposition(&json!({"id": "p", "scope": "s", "items": {}}));
        assert!(matches!(result, Err(PayloadError::TypeMismatch { .. })));
        assert!(Proposition::from_event_data(&json!({"id": "p", "scope": "s", "items": 3})).is_none());
    }

    #[test]
    fn test_error_display() {
        let e = PayloadError::TypeMismatch {
            record: "offer",
            field: "score".to_string(),
            expected: "number",
        };
        assert_eq!(e.to_string(), "offer field 'score': expected number");
    }
}
