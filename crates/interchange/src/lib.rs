//! decisioning-interchange: proposition and offer model for decisioning payloads.
//!
//! Provides the typed [`Proposition`] / [`Offer`] object graph, the
//! validating parsers that build it from loosely typed event data
//! (`serde_json::Value`), and the inverse serializer that turns it back
//! into the event-data wire shape.
//!
//! Offers are owned by their proposition. Every offer also holds a weak
//! handle to its owner, so tracking code can navigate from an offer to the
//! proposition it came from without extending the proposition's lifetime.

pub mod deserialize;
pub mod serialize;
pub mod types;

pub use deserialize::{parse_offer, parse_proposition, PayloadError};
pub use types::*;
