//! decisioning-bridge: request adapters and configuration fetch over a host event hub.
//!
//! The host bus is abstracted by [`EventHub`]; [`InMemoryHub`] is an
//! in-process implementation for tests and offline tools. Response payloads
//! are reshaped into propositions keyed by scope:
//!
//! ```
//! use decisioning_bridge::propositions_from_response;
//! use decisioning_interchange::DecisionScope;
//! use serde_json::{json, Value};
//!
//! let data = match json!({"propositions": [{"id": "p1", "scope": "s1", "items": []}]}) {
//!     Value::Object(map) => map,
//!     other => panic!("expected object, got {:?}", other),
//! };
//! let propositions = propositions_from_response(&data).unwrap();
//! assert_eq!(propositions[&DecisionScope::new("s1")].id(), "p1");
//! ```

mod client;
mod config;
mod error;
pub mod event;
mod hub;
pub mod memory;

pub use client::{
    propositions_from_notification, propositions_from_response, DecisioningClient,
    PropositionMap, UpdateRequest,
};
pub use config::{
    resolve_request_timeout, seconds_value, ConfigFetcher, RequestConfig, SharedStateConfig,
    CONFIG_FETCH_TIMEOUT, DEFAULT_CONFIGURABLE_TIMEOUT_SECS, DEFAULT_GET_TIMEOUT,
    DEFAULT_UPDATE_TIMEOUT,
};
pub use error::{AdobeError, BridgeError, OptimizeError, TIMEOUT_STATUS};
pub use event::Event;
pub use hub::{EventHub, SharedStateResolution};
pub use memory::InMemoryHub;
