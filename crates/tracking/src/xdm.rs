//! Encoder for the `Experience Event - Proposition Interactions` XDM field group.
//!
//! Output shape:
//!
//! ```json
//! {
//!   "_experience": { "decisioning": { "propositions": [ ... ] } },
//!   "eventType": "decisioning.propositionDisplay"
//! }
//! ```
//!
//! Every proposition entry carries `id`, `scope` and `scopeDetails`. Only a
//! single-proposition document carries per-offer `items`; documents for
//! several propositions summarize at proposition granularity.

use serde_json::{json, Value};

use decisioning_interchange::{JsonMap, Proposition};

use crate::grouping::TrackedProposition;

pub const EVENT_TYPE_PROPOSITION_DISPLAY: &str = "decisioning.propositionDisplay";
pub const EVENT_TYPE_PROPOSITION_INTERACT: &str = "decisioning.propositionInteract";

/// What an interaction document describes.
#[derive(Debug, Clone)]
pub enum InteractionTarget {
    /// One proposition, encoded with an `items` entry per tracked offer.
    Single(TrackedProposition),
    /// Several propositions, encoded without `items`.
    Multiple(Vec<TrackedProposition>),
}

/// Encode `target` into an interaction XDM document for `event_type`.
pub fn encode_interaction(event_type: &str, target: &InteractionTarget) -> JsonMap {
    let propositions: Vec<Value> = match target {
        InteractionTarget::Single(tracked) => {
            let mut entry = proposition_entry(tracked.proposition());
            let items: Vec<Value> = tracked
                .offers()
                .iter()
                .filter(|offer| !offer.id().is_empty())
                .map(|offer| json!({ "id": offer.id() }))
                .collect();
            entry.insert("items".to_string(), Value::Array(items));
            vec![Value::Object(entry)]
        }
        InteractionTarget::Multiple(list) => list
            .iter()
            .map(|tracked| Value::Object(proposition_entry(tracked.proposition())))
            .collect(),
    };

    let mut xdm = JsonMap::new();
    xdm.insert(
        "_experience".to_string(),
        json!({ "decisioning": { "propositions": propositions } }),
    );
    xdm.insert(
        "eventType".to_string(),
        Value::String(event_type.to_string()),
    );
    xdm
}

fn proposition_entry(proposition: &Proposition) -> JsonMap {
    let mut entry = JsonMap::new();
    entry.insert("id".to_string(), Value::String(proposition.id().to_string()));
    entry.insert(
        "scope".to_string(),
        Value::String(proposition.scope().to_string()),
    );
    entry.insert(
        "scopeDetails".to_string(),
        Value::Object(scope_details(proposition)),
    );
    entry
}

/// Own scope details when populated; otherwise synthesized from activity/placement.
fn scope_details(proposition: &Proposition) -> JsonMap {
    if let Some(details) = proposition.scope_details().filter(|d| !d.is_empty()) {
        return details.clone();
    }

    let mut details = JsonMap::new();
    if let Some(activity) = proposition.activity().filter(|a| !a.is_empty()) {
        details.insert("activity".to_string(), Value::Object(activity.clone()));
    }
    if let Some(placement) = proposition.placement().filter(|p| !p.is_empty()) {
        details.insert("placement".to_string(), Value::Object(placement.clone()));
    }
    details
}
