//! In-memory entity store with an atomic unit-of-work primitive.
//!
//! The store exclusively owns Consensus, Suggestion, Vote, User, and
//! access-relation state. Every compound operation runs inside [`EntityStore::write`],
//! a closure under the store's write lock — the single point of mutual
//! exclusion between API-driven callers and firing lifecycle timers, the
//! in-process equivalent of a database transaction. Callers never cache
//! entity data across units of work.
//!
//! A database-backed deployment replaces this module behind the same
//! surface; nothing above it assumes in-memory storage.

pub mod access;

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{Consensus, ConsensusDraft, Suggestion, User, Vote};
use crate::types::{ConclaveError, ErrorKind, Result};

/// All persisted state, guarded by the store's lock.
///
/// Exposed to the lifecycle and API modules so their compound operations
/// compose inside one unit of work.
#[derive(Default)]
pub struct StoreInner {
    /// Monotonic insertion counter; gives entities a stable order.
    seq: u64,
    pub(crate) users: HashMap<Uuid, User>,
    pub(crate) consensuses: HashMap<Uuid, Consensus>,
    pub(crate) suggestions: HashMap<Uuid, Suggestion>,
    pub(crate) votes: HashMap<Uuid, Vote>,
    pub(crate) admins: HashMap<Uuid, HashSet<Uuid>>,
    pub accessors: HashMap<Uuid, HashSet<Uuid>>,
    pub followers: HashMap<Uuid, HashSet<Uuid>>,
}

/// Handle to the shared entity store.
#[derive(Default)]
pub struct EntityStore {
    inner: RwLock<StoreInner>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic unit of work. Everything inside the closure observes and
    /// mutates one consistent snapshot; no other caller interleaves.
    pub fn write<R>(&self, f: impl FnOnce(&mut StoreInner) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Read-only unit of work.
    pub fn read<R>(&self, f: impl FnOnce(&StoreInner) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Snapshot of a consensus by id.
    pub fn find_consensus(&self, id: Uuid) -> Option<Consensus> {
        self.read(|state| state.consensuses.get(&id).cloned())
    }

    /// Snapshots of every consensus with `finished = false`, used by timer
    /// recovery at process start.
    pub fn unfinished_consensuses(&self) -> Vec<Consensus> {
        self.read(|state| {
            state
                .consensuses
                .values()
                .filter(|c| !c.finished)
                .cloned()
                .collect()
        })
    }

    /// Create a user record. The username must be unique; the push token,
    /// if supplied, is stolen from any user currently holding it.
    pub fn create_user(&self, username: &str, push_token: Option<String>) -> Result<User> {
        self.write(|state| {
            if state.users.values().any(|u| u.username == username) {
                return Err(ConclaveError::Validation(vec![crate::types::FieldError::on(
                    ErrorKind::UsernameTaken,
                    "userName",
                )]));
            }
            if let Some(token) = &push_token {
                state.release_push_token(token);
            }
            let user = User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                push_token,
            };
            state.users.insert(user.id, user.clone());
            Ok(user)
        })
    }

    pub fn find_user(&self, id: Uuid) -> Option<User> {
        self.read(|state| state.users.get(&id).cloned())
    }

    pub fn find_user_by_name(&self, username: &str) -> Option<User> {
        self.read(|state| {
            state
                .users
                .values()
                .find(|u| u.username == username)
                .cloned()
        })
    }

    /// Assign or clear a user's push token. Assigning a token held by
    /// another user silently clears it there first, so every token belongs
    /// to at most one user.
    pub fn set_push_token(&self, user_id: Uuid, token: Option<String>) -> Result<()> {
        self.write(|state| {
            if !state.users.contains_key(&user_id) {
                return Err(ConclaveError::NotFound);
            }
            if let Some(token) = &token {
                state.release_push_token(token);
            }
            if let Some(user) = state.users.get_mut(&user_id) {
                user.push_token = token;
            }
            Ok(())
        })
    }
}

impl StoreInner {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn release_push_token(&mut self, token: &str) {
        for user in self.users.values_mut() {
            if user.push_token.as_deref() == Some(token) {
                user.push_token = None;
            }
        }
    }

    pub fn consensus(&self, id: Uuid) -> Option<&Consensus> {
        self.consensuses.get(&id)
    }

    pub fn consensus_mut(&mut self, id: Uuid) -> Option<&mut Consensus> {
        self.consensuses.get_mut(&id)
    }

    pub fn suggestion(&self, id: Uuid) -> Option<&Suggestion> {
        self.suggestions.get(&id)
    }

    /// Suggestion lookup scoped to its owning consensus; a suggestion id
    /// under the wrong parent reads as absent.
    pub fn suggestion_of(&self, consensus_id: Uuid, id: Uuid) -> Option<&Suggestion> {
        self.suggestions
            .get(&id)
            .filter(|s| s.consensus_id == consensus_id)
    }

    /// Suggestions of a consensus in creation order.
    pub fn suggestions_of(&self, consensus_id: Uuid) -> Vec<&Suggestion> {
        let mut suggestions: Vec<&Suggestion> = self
            .suggestions
            .values()
            .filter(|s| s.consensus_id == consensus_id)
            .collect();
        suggestions.sort_by_key(|s| s.seq);
        suggestions
    }

    /// Votes on a suggestion in cast order.
    pub fn votes_of(&self, suggestion_id: Uuid) -> Vec<&Vote> {
        let mut votes: Vec<&Vote> = self
            .votes
            .values()
            .filter(|v| v.suggestion_id == suggestion_id)
            .collect();
        votes.sort_by_key(|v| v.seq);
        votes
    }

    /// Case-sensitive per-consensus title uniqueness check.
    pub fn title_taken(&self, consensus_id: Uuid, title: &str) -> bool {
        self.suggestions
            .values()
            .any(|s| s.consensus_id == consensus_id && s.title == title)
    }

    /// Insert a consensus and seed its access relations: the creator is
    /// admin by construction, an accessor, and an initial follower.
    pub fn insert_consensus(
        &mut self,
        draft: ConsensusDraft,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Consensus {
        let seq = self.next_seq();
        let consensus = Consensus {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            creator_id,
            creation_date: now,
            end_date: draft.end_date,
            voting_start_date: draft.voting_start_date,
            is_public: draft.is_public,
            secret_hash: draft.secret_hash,
            finished: false,
            seq,
        };
        let id = consensus.id;
        self.consensuses.insert(id, consensus.clone());
        self.admins.entry(id).or_default().insert(creator_id);
        self.accessors.entry(id).or_default().insert(creator_id);
        self.followers.entry(id).or_default().insert(creator_id);
        consensus
    }

    /// Overwrite the editable fields of a consensus. Creator, creation
    /// timestamp, and the finished flag are untouched.
    pub fn apply_consensus_update(&mut self, id: Uuid, draft: ConsensusDraft) -> Option<Consensus> {
        let consensus = self.consensuses.get_mut(&id)?;
        consensus.title = draft.title;
        consensus.description = draft.description;
        consensus.is_public = draft.is_public;
        consensus.end_date = draft.end_date;
        consensus.voting_start_date = draft.voting_start_date;
        consensus.secret_hash = draft.secret_hash;
        Some(consensus.clone())
    }

    /// Delete a consensus, cascading to its suggestions, their votes, and
    /// all three access relations.
    pub fn remove_consensus(&mut self, id: Uuid) -> bool {
        if self.consensuses.remove(&id).is_none() {
            return false;
        }
        let suggestion_ids: HashSet<Uuid> = self
            .suggestions
            .values()
            .filter(|s| s.consensus_id == id)
            .map(|s| s.id)
            .collect();
        self.suggestions.retain(|_, s| s.consensus_id != id);
        self.votes
            .retain(|_, v| !suggestion_ids.contains(&v.suggestion_id));
        self.admins.remove(&id);
        self.accessors.remove(&id);
        self.followers.remove(&id);
        true
    }

    pub fn insert_suggestion(
        &mut self,
        consensus_id: Uuid,
        creator_id: Uuid,
        title: String,
        now: DateTime<Utc>,
    ) -> Suggestion {
        let seq = self.next_seq();
        let suggestion = Suggestion {
            id: Uuid::new_v4(),
            consensus_id,
            creator_id,
            title,
            creation_date: now,
            overall_acceptance: None,
            seq,
        };
        self.suggestions.insert(suggestion.id, suggestion.clone());
        suggestion
    }

    pub fn rename_suggestion(&mut self, id: Uuid, title: String) -> Option<Suggestion> {
        let suggestion = self.suggestions.get_mut(&id)?;
        suggestion.title = title;
        Some(suggestion.clone())
    }

    /// Delete a suggestion, cascading to its votes.
    pub fn remove_suggestion(&mut self, id: Uuid) -> bool {
        if self.suggestions.remove(&id).is_none() {
            return false;
        }
        self.votes.retain(|_, v| v.suggestion_id != id);
        true
    }

    /// Cast or update a vote. A repeat vote from the same voter updates
    /// the acceptance in place, keeping the original cast order.
    pub fn upsert_vote(&mut self, suggestion_id: Uuid, voter_id: Uuid, acceptance: f32) -> Vote {
        if let Some(vote) = self
            .votes
            .values_mut()
            .find(|v| v.suggestion_id == suggestion_id && v.voter_id == voter_id)
        {
            vote.acceptance = acceptance;
            return vote.clone();
        }
        let seq = self.next_seq();
        let vote = Vote {
            id: Uuid::new_v4(),
            suggestion_id,
            voter_id,
            acceptance,
            seq,
        };
        self.votes.insert(vote.id, vote.clone());
        vote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft(title: &str) -> ConsensusDraft {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        ConsensusDraft {
            title: title.to_string(),
            description: String::new(),
            is_public: true,
            end_date: start + chrono::Duration::hours(2),
            voting_start_date: start + chrono::Duration::hours(1),
            secret_hash: String::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_create_seeds_access_relations() {
        let store = EntityStore::new();
        let creator = store.create_user("alice", None).unwrap();
        let consensus = store.write(|state| state.insert_consensus(draft("Lunch"), creator.id, now()));

        store.read(|state| {
            assert!(state.is_admin(consensus.id, creator.id));
            assert!(state.is_accessor(consensus.id, creator.id));
            assert!(state.is_following(consensus.id, creator.id));
        });
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = EntityStore::new();
        store.create_user("alice", None).unwrap();
        let err = store.create_user("alice", None).unwrap_err();
        assert!(matches!(err, ConclaveError::Validation(_)));
    }

    #[test]
    fn test_push_token_stolen_from_previous_holder() {
        let store = EntityStore::new();
        let alice = store.create_user("alice", Some("shared-device".into())).unwrap();
        let bob = store.create_user("bob", Some("shared-device".into())).unwrap();

        assert_eq!(
            store.find_user(alice.id).unwrap().push_token,
            None,
            "token must move to the newest registrant"
        );
        assert_eq!(
            store.find_user(bob.id).unwrap().push_token,
            Some("shared-device".into())
        );
    }

    #[test]
    fn test_vote_upsert_updates_in_place() {
        let store = EntityStore::new();
        let alice = store.create_user("alice", None).unwrap();
        let (suggestion, first, second) = store.write(|state| {
            let consensus = state.insert_consensus(draft("Lunch"), alice.id, now());
            let suggestion = state.insert_suggestion(consensus.id, alice.id, "Pizza".into(), now());
            let first = state.upsert_vote(suggestion.id, alice.id, 3.0);
            let second = state.upsert_vote(suggestion.id, alice.id, 8.0);
            (suggestion, first, second)
        });

        assert_eq!(first.id, second.id);
        assert_eq!(second.acceptance, 8.0);
        store.read(|state| {
            assert_eq!(state.votes_of(suggestion.id).len(), 1);
        });
    }

    #[test]
    fn test_remove_consensus_cascades() {
        let store = EntityStore::new();
        let alice = store.create_user("alice", None).unwrap();
        let consensus = store.write(|state| {
            let consensus = state.insert_consensus(draft("Lunch"), alice.id, now());
            let suggestion = state.insert_suggestion(consensus.id, alice.id, "Pizza".into(), now());
            state.upsert_vote(suggestion.id, alice.id, 5.0);
            consensus
        });

        assert!(store.write(|state| state.remove_consensus(consensus.id)));
        store.read(|state| {
            assert!(state.consensuses.is_empty());
            assert!(state.suggestions.is_empty());
            assert!(state.votes.is_empty());
            assert!(state.admins.is_empty());
            assert!(state.accessors.is_empty());
            assert!(state.followers.is_empty());
        });

        // Deleting again is a safe no-op.
        assert!(!store.write(|state| state.remove_consensus(consensus.id)));
    }

    #[test]
    fn test_suggestion_scoped_lookup() {
        let store = EntityStore::new();
        let alice = store.create_user("alice", None).unwrap();
        store.write(|state| {
            let a = state.insert_consensus(draft("A"), alice.id, now());
            let b = state.insert_consensus(draft("B"), alice.id, now());
            let suggestion = state.insert_suggestion(a.id, alice.id, "Pizza".into(), now());

            assert!(state.suggestion_of(a.id, suggestion.id).is_some());
            assert!(state.suggestion_of(b.id, suggestion.id).is_none());
        });
    }
}
