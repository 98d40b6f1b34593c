//! Access-relation membership and vote aggregation.
//!
//! Pure reads plus idempotent set mutations over the store state. Nothing
//! here has side effects outside the unit of work it runs in.

use uuid::Uuid;

use super::StoreInner;
use crate::model::{Vote, ACCEPTANCE_MAX};

impl StoreInner {
    /// Whether the user holds admin standing on the consensus. The creator
    /// is seeded as admin at creation; more admins are addable out of band.
    pub fn is_admin(&self, consensus_id: Uuid, user_id: Uuid) -> bool {
        self.admins
            .get(&consensus_id)
            .is_some_and(|set| set.contains(&user_id))
    }

    /// Whether the user may view and vote. Everyone is implicitly an
    /// accessor of a public consensus.
    pub fn is_accessor(&self, consensus_id: Uuid, user_id: Uuid) -> bool {
        match self.consensuses.get(&consensus_id) {
            Some(c) if c.is_public => true,
            Some(_) => self
                .accessors
                .get(&consensus_id)
                .is_some_and(|set| set.contains(&user_id)),
            None => false,
        }
    }

    pub fn is_following(&self, consensus_id: Uuid, user_id: Uuid) -> bool {
        self.followers
            .get(&consensus_id)
            .is_some_and(|set| set.contains(&user_id))
    }

    /// Idempotent admin grant.
    pub fn add_admin(&mut self, consensus_id: Uuid, user_id: Uuid) {
        self.admins.entry(consensus_id).or_default().insert(user_id);
    }

    /// Idempotent accessor grant.
    pub fn grant_access(&mut self, consensus_id: Uuid, user_id: Uuid) {
        self.accessors
            .entry(consensus_id)
            .or_default()
            .insert(user_id);
    }

    /// Idempotent follow; adding an already-present follower is a no-op.
    pub fn follow(&mut self, consensus_id: Uuid, user_id: Uuid) {
        self.followers
            .entry(consensus_id)
            .or_default()
            .insert(user_id);
    }

    /// Idempotent un-follow; removing an absent follower is a no-op.
    pub fn unfollow(&mut self, consensus_id: Uuid, user_id: Uuid) {
        if let Some(set) = self.followers.get_mut(&consensus_id) {
            set.remove(&user_id);
        }
    }

    /// De-duplicated usernames of everyone who voted on any suggestion of
    /// the consensus, in order of first appearance.
    pub fn distinct_voters(&self, consensus_id: Uuid) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut voters = Vec::new();
        for suggestion in self.suggestions_of(consensus_id) {
            for vote in self.votes_of(suggestion.id) {
                if seen.insert(vote.voter_id) {
                    if let Some(user) = self.users.get(&vote.voter_id) {
                        voters.push(user.username.clone());
                    }
                }
            }
        }
        voters
    }

    /// Voter usernames for one suggestion, in cast order (not de-duplicated
    /// because a voter appears at most once per suggestion).
    pub fn voter_names(&self, suggestion_id: Uuid) -> Vec<String> {
        self.votes_of(suggestion_id)
            .iter()
            .filter_map(|v| self.users.get(&v.voter_id))
            .map(|u| u.username.clone())
            .collect()
    }

    /// The caller's own vote on a suggestion, if any.
    pub fn own_acceptance(&self, suggestion_id: Uuid, user_id: Uuid) -> Option<f32> {
        self.votes_of(suggestion_id)
            .iter()
            .find(|v| v.voter_id == user_id)
            .map(|v| v.acceptance)
    }

    /// Distinct push tokens of the consensus followers — the notification
    /// fan-out list. Followers without a registered token are skipped.
    pub fn follower_push_tokens(&self, consensus_id: Uuid) -> Vec<String> {
        let Some(followers) = self.followers.get(&consensus_id) else {
            return Vec::new();
        };
        let mut seen = std::collections::HashSet::new();
        let mut tokens = Vec::new();
        for user_id in followers {
            if let Some(token) = self.users.get(user_id).and_then(|u| u.push_token.clone()) {
                if seen.insert(token.clone()) {
                    tokens.push(token);
                }
            }
        }
        tokens
    }
}

/// Mean acceptance across the given votes; `None` for zero votes.
pub fn overall_acceptance(votes: &[&Vote]) -> Option<f32> {
    if votes.is_empty() {
        return None;
    }
    let sum: f32 = votes.iter().map(|v| v.acceptance).sum();
    Some(sum / votes.len() as f32)
}

/// Count of votes at the maximum acceptance value.
pub fn heavy_objections(votes: &[&Vote]) -> usize {
    votes
        .iter()
        .filter(|v| v.acceptance == ACCEPTANCE_MAX)
        .count()
}
