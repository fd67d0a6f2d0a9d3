//! Regrouping of offers by owning proposition for tracking calls.

use std::collections::HashSet;
use std::sync::Arc;

use decisioning_interchange::{Offer, Proposition};

/// A proposition paired with the subset of its offers being tracked.
#[derive(Debug, Clone)]
pub struct TrackedProposition {
    proposition: Arc<Proposition>,
    offers: Vec<Offer>,
}

impl TrackedProposition {
    pub fn new(proposition: Arc<Proposition>, offers: Vec<Offer>) -> Self {
        TrackedProposition {
            proposition,
            offers,
        }
    }

    /// Track a proposition with every offer it contains.
    pub fn whole(proposition: Arc<Proposition>) -> Self {
        let offers = proposition.offers().to_vec();
        TrackedProposition {
            proposition,
            offers,
        }
    }

    pub fn proposition(&self) -> &Arc<Proposition> {
        &self.proposition
    }

    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }
}

/// Compute the minimal set of propositions needed to track `offers`.
///
/// Offers are matched by id, not identity. Each distinct proposition
/// (by id, in first-seen order) is kept with only the offers whose ids
/// appear in the input, deduplicated by id. Offers whose proposition has
/// been dropped are skipped, and propositions left with no offers are
/// omitted.
pub fn group_for_tracking(offers: &[Offer]) -> Vec<TrackedProposition> {
    if offers.is_empty() {
        return Vec::new();
    }

    let offer_ids: HashSet<&str> = offers.iter().map(Offer::id).collect();
    let mut seen_propositions = HashSet::new();
    let mut groups = Vec::new();

    for proposition in offers.iter().filter_map(Offer::proposition) {
        if !seen_propositions.insert(proposition.id().to_string()) {
            continue;
        }

        let tracked: Vec<Offer> = {
            let mut seen_offers = HashSet::new();
            proposition
                .offers()
                .iter()
                .filter(|o| offer_ids.contains(o.id()) && seen_offers.insert(o.id()))
                .cloned()
                .collect()
        };

        if tracked.is_empty() {
            tracing::debug!(proposition = %proposition.id(), "no tracked offers left in proposition");
            continue;
        }
        groups.push(TrackedProposition::new(proposition, tracked));
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use decisioning_interchange::OfferType;

    fn offer(id: &str) -> Offer {
        Offer::builder(id, OfferType::Text, format!("content {}", id)).build()
    }

    fn proposition(id: &str, offer_ids: &[&str]) -> Arc<Proposition> {
        Proposition::builder(id, format!("scope-{}", id))
            .offers(offer_ids.iter().map(|o| offer(o)).collect())
            .build()
    }

    fn ids(offers: &[Offer]) -> Vec<&str> {
        offers.iter().map(Offer::id).collect()
    }

    #[test]
    fn groups_by_proposition_in_first_seen_order() {
        let p1 = proposition("P1", &["A1", "A2", "A3"]);
        let p2 = proposition("P2", &["B1"]);
        let input = vec![
            p1.offers()[0].clone(),
            p1.offers()[1].clone(),
            p2.offers()[0].clone(),
        ];

        let groups = group_for_tracking(&input);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].proposition().id(), "P1");
        assert_eq!(ids(groups[0].offers()), ["A1", "A2"]);
        assert_eq!(groups[1].proposition().id(), "P2");
        assert_eq!(ids(groups[1].offers()), ["B1"]);
    }

    #[test]
    fn order_follows_input_not_construction() {
        let p1 = proposition("P1", &["A1"]);
        let p2 = proposition("P2", &["B1"]);
        let input = vec![p2.offers()[0].clone(), p1.offers()[0].clone()];

        let groups = group_for_tracking(&input);
        let order: Vec<&str> = groups.iter().map(|g| g.proposition().id()).collect();
        assert_eq!(order, ["P2", "P1"]);
    }

    #[test]
    fn duplicate_offer_ids_collapse() {
        let p1 = proposition("P1", &["A1", "A1", "A2"]);
        let input = vec![
            p1.offers()[0].clone(),
            p1.offers()[1].clone(),
            p1.offers()[0].clone(),
        ];

        let groups = group_for_tracking(&input);
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(groups[0].offers()), ["A1"]);
    }

    #[test]
    fn empty_input() {
        assert!(group_for_tracking(&[]).is_empty());
    }

    #[test]
    fn expired_references_are_skipped() {
        let p1 = proposition("P1", &["A1"]);
        let p2 = proposition("P2", &["B1"]);
        let input = vec![p1.offers()[0].clone(), p2.offers()[0].clone()];
        drop(p1);

        let groups = group_for_tracking(&input);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].proposition().id(), "P2");

        drop(groups);
        drop(p2);
        assert!(group_for_tracking(&input).is_empty());
    }

    #[test]
    fn unlinked_offers_are_skipped() {
        assert!(group_for_tracking(&[offer("loose")]).is_empty());
    }

    #[test]
    fn whole_keeps_every_offer() {
        let p1 = proposition("P1", &["A1", "A2"]);
        let tracked = TrackedProposition::whole(p1.clone());
        assert_eq!(ids(tracked.offers()), ["A1", "A2"]);
        assert!(Arc::ptr_eq(tracked.proposition(), &p1));
    }
}
