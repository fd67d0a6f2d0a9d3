//! Typed structs for propositions, offers, and decision scopes.
//!
//! Values are immutable once built. Offers are created through
//! [`OfferBuilder`] and propositions through [`PropositionBuilder`]; both
//! builders are consumed by `build()`, so a finished value cannot be
//! mutated through the builder that produced it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// String-keyed JSON object, the shape of every event-data map.
pub type JsonMap = serde_json::Map<String, Value>;

/// Schema of Target default-content items, the only items allowed to omit `data`.
pub const DEFAULT_CONTENT_SCHEMA: &str =
    "https://ns.adobe.com/personalization/default-content-item";

// ── OfferType ───────────────────────────────────────────────────────

/// Content type of an offer, resolved from a declared mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OfferType {
    /// Unrecognized format; also the type of default-content items.
    #[default]
    Unknown,
    Json,
    Text,
    Html,
    Image,
}

impl OfferType {
    /// Map a mime-type string (`format` or `type` field) to an offer type.
    pub fn from_format(format: &str) -> Self {
        let format = format.trim().to_ascii_lowercase();
        match format.as_str() {
            "application/json" => OfferType::Json,
            "text/plain" => OfferType::Text,
            "text/html" => OfferType::Html,
            f if f.starts_with("image/") => OfferType::Image,
            _ => OfferType::Unknown,
        }
    }

    /// The mime-type string written back to event data.
    pub fn as_format(&self) -> &'static str {
        match self {
            OfferType::Unknown => "",
            OfferType::Json => "application/json",
            OfferType::Text => "text/plain",
            OfferType::Html => "text/html",
            OfferType::Image => "image/*",
        }
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_format())
    }
}

// ── Offer ───────────────────────────────────────────────────────────

/// One piece of decisioned content within a [`Proposition`].
///
/// Equality compares every attribute except the proposition back-reference.
#[derive(Debug, Clone)]
pub struct Offer {
    id: String,
    etag: String,
    score: f64,
    schema: String,
    meta: JsonMap,
    offer_type: OfferType,
    language: Vec<String>,
    content: String,
    characteristics: BTreeMap<String, String>,
    /// Non-owning handle to the proposition that contains this offer.
    proposition: Weak<Proposition>,
}

impl Offer {
    /// Start building an offer.
    pub fn builder(
        id: impl Into<String>,
        offer_type: OfferType,
        content: impl Into<String>,
    ) -> OfferBuilder {
        OfferBuilder::new(id, offer_type, content)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn meta(&self) -> &JsonMap {
        &self.meta
    }

    pub fn offer_type(&self) -> OfferType {
        self.offer_type
    }

    pub fn language(&self) -> &[String] {
        &self.language
    }

    /// Raw text, a URL, or a serialized JSON object depending on the offer type.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn characteristics(&self) -> &BTreeMap<String, String> {
        &self.characteristics
    }

    /// Resolve the owning proposition.
    ///
    /// Returns `None` when the offer was never placed in a proposition or
    /// the proposition has since been dropped.
    pub fn proposition(&self) -> Option<Arc<Proposition>> {
        self.proposition.upgrade()
    }

    pub(crate) fn linked_to(mut self, owner: Weak<Proposition>) -> Self {
        self.proposition = owner;
        self
    }
}

impl PartialEq for Offer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.etag == other.etag
            && self.score == other.score
            && self.schema == other.schema
            && self.meta == other.meta
            && self.offer_type == other.offer_type
            && self.language == other.language
            && self.content == other.content
            && self.characteristics == other.characteristics
    }
}

/// Staging type for an [`Offer`]. Consumed by [`OfferBuilder::build`].
#[derive(Debug, Clone)]
#[must_use]
pub struct OfferBuilder {
    offer: Offer,
}

impl OfferBuilder {
    pub fn new(id: impl Into<String>, offer_type: OfferType, content: impl Into<String>) -> Self {
        OfferBuilder {
            offer: Offer {
                id: id.into(),
                etag: String::new(),
                score: 0.0,
                schema: String::new(),
                meta: JsonMap::new(),
                offer_type,
                language: Vec::new(),
                content: content.into(),
                characteristics: BTreeMap::new(),
                proposition: Weak::new(),
            },
        }
    }

    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.offer.etag = etag.into();
        self
    }

    pub fn score(mut self, score: f64) -> Self {
        self.offer.score = score;
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.offer.schema = schema.into();
        self
    }

    pub fn meta(mut self, meta: JsonMap) -> Self {
        self.offer.meta = meta;
        self
    }

    pub fn language(mut self, language: Vec<String>) -> Self {
        self.offer.language = language;
        self
    }

    pub fn characteristics(mut self, characteristics: BTreeMap<String, String>) -> Self {
        self.offer.characteristics = characteristics;
        self
    }

    /// Finish the offer. It has no owning proposition until one is built around it.
    pub fn build(self) -> Offer {
        self.offer
    }
}

// ── Proposition ─────────────────────────────────────────────────────

/// A server-returned bundle of offers matched to one decision scope.
///
/// Always handled behind an `Arc` so that the offers it owns can hold
/// weak handles back to it.
#[derive(Debug, PartialEq)]
pub struct Proposition {
    id: String,
    offers: Vec<Offer>,
    scope: String,
    scope_details: Option<JsonMap>,
    activity: Option<JsonMap>,
    placement: Option<JsonMap>,
}

impl Proposition {
    /// Start building a proposition.
    pub fn builder(id: impl Into<String>, scope: impl Into<String>) -> PropositionBuilder {
        PropositionBuilder::new(id, scope)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Offers in server-declared order.
    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Target scope details, present for Target-fulfilled propositions.
    pub fn scope_details(&self) -> Option<&JsonMap> {
        self.scope_details.as_ref()
    }

    /// Offer-decisioning activity, present for ODE-fulfilled propositions.
    pub fn activity(&self) -> Option<&JsonMap> {
        self.activity.as_ref()
    }

    /// Offer-decisioning placement, present for ODE-fulfilled propositions.
    pub fn placement(&self) -> Option<&JsonMap> {
        self.placement.as_ref()
    }

    /// XDM for the `Experience Event - Proposition Reference` field group.
    ///
    /// The result carries no `eventType`.
    pub fn generate_reference_xdm(&self) -> JsonMap {
        let mut decisioning = JsonMap::new();
        decisioning.insert("propositionID".to_string(), Value::String(self.id.clone()));

        let mut experience = JsonMap::new();
        experience.insert("decisioning".to_string(), Value::Object(decisioning));

        let mut xdm = JsonMap::new();
        xdm.insert("_experience".to_string(), Value::Object(experience));
        xdm
    }
}

/// Staging type for a [`Proposition`]. Consumed by [`PropositionBuilder::build`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct PropositionBuilder {
    id: String,
    scope: String,
    offers: Vec<Offer>,
    scope_details: Option<JsonMap>,
    activity: Option<JsonMap>,
    placement: Option<JsonMap>,
}

impl PropositionBuilder {
    pub fn new(id: impl Into<String>, scope: impl Into<String>) -> Self {
        PropositionBuilder {
            id: id.into(),
            scope: scope.into(),
            ..Default::default()
        }
    }

    pub fn offers(mut self, offers: Vec<Offer>) -> Self {
        self.offers = offers;
        self
    }

    pub fn scope_details(mut self, scope_details: impl Into<Option<JsonMap>>) -> Self {
        self.scope_details = scope_details.into();
        self
    }

    pub fn activity(mut self, activity: impl Into<Option<JsonMap>>) -> Self {
        self.activity = activity.into();
        self
    }

    pub fn placement(mut self, placement: impl Into<Option<JsonMap>>) -> Self {
        self.placement = placement.into();
        self
    }

    /// Finish the proposition and point every contained offer back at it.
    pub fn build(self) -> Arc<Proposition> {
        let PropositionBuilder {
            id,
            scope,
            offers,
            scope_details,
            activity,
            placement,
        } = self;

        Arc::new_cyclic(|owner| Proposition {
            id,
            offers: offers
                .into_iter()
                .map(|offer| offer.linked_to(owner.clone()))
                .collect(),
            scope,
            scope_details,
            activity,
            placement,
        })
    }
}

// ── DecisionScope ───────────────────────────────────────────────────

/// A named request key identifying the content a client asks for.
///
/// Converts to the request wire shape `{"name": <scope>}` through
/// [`DecisionScope::to_event_data`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecisionScope {
    name: String,
}

/// Decoded form of an offer-decisioning scope name.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncodedScope {
    #[serde(default)]
    activity_id: String,
    #[serde(default)]
    placement_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item_count: Option<i64>,
}

impl DecisionScope {
    pub fn new(name: impl Into<String>) -> Self {
        DecisionScope { name: name.into() }
    }

    /// Build an encoded offer-decisioning scope from activity and placement ids.
    ///
    /// The scope name is the base64 encoding of
    /// `{"activityId":..,"placementId":..}`, with `itemCount` appended only
    /// when it differs from 1.
    pub fn from_activity_placement(activity_id: &str, placement_id: &str, item_count: u32) -> Self {
        let encoded = EncodedScope {
            activity_id: activity_id.to_string(),
            placement_id: placement_id.to_string(),
            item_count: (item_count != 1).then_some(i64::from(item_count)),
        };
        let name = match serde_json::to_string(&encoded) {
            Ok(json) => BASE64.encode(json),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode decision scope");
                String::new()
            }
        };
        DecisionScope { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this scope may be sent in a request.
    ///
    /// Blank names are invalid. Names that decode to an encoded
    /// offer-decisioning scope must also carry non-empty `activityId` and
    /// `placementId` and, if present, a positive integer `itemCount`.
    pub fn is_valid(&self) -> bool {
        if self.name.trim().is_empty() {
            tracing::debug!("invalid decision scope: name is empty");
            return false;
        }

        let Some(map) = self.decoded() else {
            return true;
        };

        let encoded: EncodedScope = match serde_json::from_value(Value::Object(map)) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::debug!(scope = %self.name, error = %e, "invalid decision scope: malformed encoding");
                return false;
            }
        };
        if encoded.activity_id.is_empty() {
            tracing::debug!(scope = %self.name, "invalid decision scope: activityId is missing");
            return false;
        }
        if encoded.placement_id.is_empty() {
            tracing::debug!(scope = %self.name, "invalid decision scope: placementId is missing");
            return false;
        }
        if encoded.item_count.is_some_and(|n| n < 1) {
            tracing::debug!(scope = %self.name, "invalid decision scope: itemCount must be positive");
            return false;
        }
        true
    }

    fn decoded(&self) -> Option<JsonMap> {
        let bytes = BASE64.decode(self.name.as_bytes()).ok()?;
        match serde_json::from_slice::<Value>(&bytes).ok()? {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
