//! decisioning-tracking: display and tap tracking for decisioned offers.
//!
//! - [`grouping`] regroups an arbitrary list of offers by owning proposition
//! - [`xdm`] encodes one or many propositions into the interaction XDM document
//! - [`interaction`] ties both together behind `tapped()` / `displayed()`

pub mod grouping;
pub mod interaction;
pub mod xdm;

pub use grouping::{group_for_tracking, TrackedProposition};
pub use interaction::{InteractionSink, OfferInteraction, OfferListInteraction};
pub use xdm::{
    encode_interaction, InteractionTarget, EVENT_TYPE_PROPOSITION_DISPLAY,
    EVENT_TYPE_PROPOSITION_INTERACT,
};
