//! Display and tap tracking entry points on offers.
//!
//! Generated documents are handed to an [`InteractionSink`], which is the
//! tracking dispatcher (normally the bridge client). Every path resolves
//! the offer's weak proposition handle first; an expired handle turns the
//! call into a no-op.

use decisioning_interchange::{JsonMap, Offer};

use crate::grouping::{group_for_tracking, TrackedProposition};
use crate::xdm::{
    encode_interaction, InteractionTarget, EVENT_TYPE_PROPOSITION_DISPLAY,
    EVENT_TYPE_PROPOSITION_INTERACT,
};

/// Receives interaction XDM documents for dispatch as tracking events.
pub trait InteractionSink {
    fn track(&self, xdm: JsonMap);
}

impl<F> InteractionSink for F
where
    F: Fn(JsonMap),
{
    fn track(&self, xdm: JsonMap) {
        self(xdm)
    }
}

/// Tracking for a single offer, scoped to that offer within its proposition.
pub trait OfferInteraction {
    /// Interact document for this offer, or `None` if its proposition is gone.
    fn generate_tap_interaction_xdm(&self) -> Option<JsonMap>;

    /// Display document for this offer, or `None` if its proposition is gone.
    fn generate_display_interaction_xdm(&self) -> Option<JsonMap>;

    fn tapped(&self, sink: &dyn InteractionSink);

    fn displayed(&self, sink: &dyn InteractionSink);
}

impl OfferInteraction for Offer {
    fn generate_tap_interaction_xdm(&self) -> Option<JsonMap> {
        single_offer_xdm(self, EVENT_TYPE_PROPOSITION_INTERACT)
    }

    fn generate_display_interaction_xdm(&self) -> Option<JsonMap> {
        single_offer_xdm(self, EVENT_TYPE_PROPOSITION_DISPLAY)
    }

    fn tapped(&self, sink: &dyn InteractionSink) {
        match self.generate_tap_interaction_xdm() {
            Some(xdm) => sink.track(xdm),
            None => {
                tracing::debug!(offer = %self.id(), "proposition released, tap not tracked");
            }
        }
    }

    fn displayed(&self, sink: &dyn InteractionSink) {
        match self.generate_display_interaction_xdm() {
            Some(xdm) => sink.track(xdm),
            None => {
                tracing::debug!(offer = %self.id(), "proposition released, display not tracked");
            }
        }
    }
}

fn single_offer_xdm(offer: &Offer, event_type: &str) -> Option<JsonMap> {
    let proposition = offer.proposition()?;
    let target = InteractionTarget::Single(TrackedProposition::new(proposition, vec![offer.clone()]));
    Some(encode_interaction(event_type, &target))
}

/// Batched display tracking for offers that may span many propositions.
pub trait OfferListInteraction {
    /// Display document for the grouped propositions, or `None` if no
    /// offer resolves to a live proposition.
    fn generate_display_interaction_xdm(&self) -> Option<JsonMap>;

    fn displayed(&self, sink: &dyn InteractionSink);
}

impl OfferListInteraction for [Offer] {
    fn generate_display_interaction_xdm(&self) -> Option<JsonMap> {
        let groups = group_for_tracking(self);
        if groups.is_empty() {
            return None;
        }
        Some(encode_interaction(
            EVENT_TYPE_PROPOSITION_DISPLAY,
            &InteractionTarget::Multiple(groups),
        ))
    }

    fn displayed(&self, sink: &dyn InteractionSink) {
        match OfferListInteraction::generate_display_interaction_xdm(self) {
            Some(xdm) => sink.track(xdm),
            None => {
                tracing::debug!(offers = self.len(), "no live propositions, display not tracked");
            }
        }
    }
}
