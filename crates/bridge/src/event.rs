//! Events exchanged with the host hub, and the names and keys they carry.

use decisioning_interchange::JsonMap;
use rand::Rng;
use time::OffsetDateTime;

pub mod event_type {
    pub const OPTIMIZE: &str = "com.adobe.eventType.optimize";
}

pub mod event_source {
    pub const REQUEST_CONTENT: &str = "com.adobe.eventSource.requestContent";
    pub const REQUEST_RESET: &str = "com.adobe.eventSource.requestReset";
    pub const REQUEST_CONFIGURATION: &str = "com.adobe.eventSource.requestConfiguration";
    pub const RESPONSE_CONTENT: &str = "com.adobe.eventSource.responseContent";
    pub const NOTIFICATION: &str = "com.adobe.eventSource.notification";
}

pub mod event_name {
    pub const GET_PROPOSITIONS_REQUEST: &str = "Optimize Get Propositions Request";
    pub const UPDATE_PROPOSITIONS_REQUEST: &str = "Optimize Update Propositions Request";
    pub const TRACK_PROPOSITIONS_REQUEST: &str = "Optimize Track Propositions Request";
    pub const CLEAR_PROPOSITIONS_REQUEST: &str = "Optimize Clear Propositions Request";
    pub const GET_CONFIGURATIONS_REQUEST: &str = "Get Configurations Request";
}

/// Event-data keys.
pub mod keys {
    pub const REQUEST_TYPE: &str = "requesttype";
    pub const DECISION_SCOPES: &str = "decisionscopes";
    pub const XDM: &str = "xdm";
    pub const DATA: &str = "data";
    pub const TIMEOUT: &str = "timeout";
    pub const PROPOSITIONS: &str = "propositions";
    pub const RESPONSE_ERROR: &str = "responseerror";
    pub const PROPOSITION_INTERACTIONS: &str = "propositioninteractions";
    /// Configuration shared-state key, in seconds.
    pub const CONFIGS_TIMEOUT: &str = "optimize.timeout";
}

/// Values of [`keys::REQUEST_TYPE`].
pub mod request_type {
    pub const GET: &str = "getpropositions";
    pub const UPDATE: &str = "updatepropositions";
    pub const TRACK: &str = "trackpropositions";
}

/// Shared-state owner holding the SDK configuration.
pub const CONFIGURATION_STATE: &str = "com.adobe.module.configuration";

/// A named, typed event with a map payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    id: String,
    name: String,
    event_type: String,
    source: String,
    data: JsonMap,
    timestamp: OffsetDateTime,
    response_id: Option<String>,
}

impl Event {
    pub fn new(name: &str, event_type: &str, source: &str) -> Self {
        Event {
            id: format!("{:032x}", rand::thread_rng().gen::<u128>()),
            name: name.to_string(),
            event_type: event_type.to_string(),
            source: source.to_string(),
            data: JsonMap::new(),
            timestamp: OffsetDateTime::now_utc(),
            response_id: None,
        }
    }

    /// A response-content event correlated with `request`.
    pub fn response_to(request: &Event, data: JsonMap) -> Self {
        let mut event = Event::new(
            &format!("{} Response", request.name),
            &request.event_type,
            event_source::RESPONSE_CONTENT,
        )
        .with_data(data);
        event.response_id = Some(request.id.clone());
        event
    }

    #[must_use]
    pub fn with_data(mut self, data: JsonMap) -> Self {
        self.data = data;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn data(&self) -> &JsonMap {
        &self.data
    }

    pub fn into_data(self) -> JsonMap {
        self.data
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Id of the request this event answers, if it is a response.
    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }
}
