//! Consensus entity, derived lifecycle phase, and API view models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle phase of a consensus, derived on read.
///
/// Never stored: the `finished` flag plus the two deadlines are the
/// authoritative state, so a phase can never go stale between the
/// scheduler and a read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Before the voting-start deadline; suggestions may be added.
    Pending,
    /// Voting window is open; votes accepted, no new suggestions.
    Voting,
    /// Terminal; read-only, aggregates computed.
    Finished,
}

/// A time-boxed decision process containing suggestions and votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consensus {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator_id: Uuid,
    pub creation_date: DateTime<Utc>,
    /// Deadline after which the finish transition runs. Overwritten with
    /// the actual finish instant when the transition fires.
    pub end_date: DateTime<Utc>,
    /// Deadline after which votes (but not new suggestions) are accepted.
    pub voting_start_date: DateTime<Utc>,
    pub is_public: bool,
    /// Argon2 hash of the private-access secret; empty when public.
    #[serde(skip_serializing, default)]
    pub secret_hash: String,
    /// Monotonic: set once by the finish transition, never reset.
    pub finished: bool,
    /// Insertion sequence assigned by the store, for stable ordering.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Consensus {
    /// Derive the lifecycle phase at the given instant.
    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        if self.finished {
            Phase::Finished
        } else if now >= self.voting_start_date {
            Phase::Voting
        } else {
            Phase::Pending
        }
    }

    /// Whether votes are accepted at the given instant.
    pub fn voting_open(&self, now: DateTime<Utc>) -> bool {
        !self.finished && now >= self.voting_start_date
    }

    /// Whether suggestions may still be added or edited at the given
    /// instant. Exactly at the voting-start boundary both windows overlap.
    pub fn accepts_suggestions(&self, now: DateTime<Utc>) -> bool {
        !self.finished && now <= self.voting_start_date
    }
}

/// Request body for creating or fully updating a consensus.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsensusInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    pub end_date: DateTime<Utc>,
    pub voting_start_date: DateTime<Utc>,
    /// Secret granting accessor standing; ignored for public consensuses.
    #[serde(default)]
    pub private_secret: String,
}

fn default_public() -> bool {
    true
}

/// Validated fields written by create/update, with the secret already
/// hashed. Never constructed from unvalidated input.
#[derive(Debug, Clone)]
pub struct ConsensusDraft {
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub end_date: DateTime<Utc>,
    pub voting_start_date: DateTime<Utc>,
    pub secret_hash: String,
}

impl ConsensusDraft {
    pub fn from_input(input: ConsensusInput, secret_hash: String) -> Self {
        Self {
            title: input.title,
            description: input.description.unwrap_or_default(),
            is_public: input.is_public,
            end_date: input.end_date,
            voting_start_date: input.voting_start_date,
            secret_hash,
        }
    }
}

/// Request body for requesting accessor standing on a private consensus.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessRequest {
    pub secret: String,
}

/// Request body for the follow toggle.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FollowInput {
    pub follow: bool,
}

/// Consensus view model, built relative to the (optional) calling user.
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator: String,
    pub creation_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub voting_start_date: DateTime<Utc>,
    pub phase: Phase,
    pub public: bool,
    pub finished: bool,
    pub suggestions_count: usize,
    /// Distinct usernames that voted on any suggestion, in order of first
    /// appearance.
    pub voters: Vec<String>,
    pub admin: bool,
    pub has_access: bool,
    pub following: bool,
}
