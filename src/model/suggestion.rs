//! Suggestion and vote entities with their API view models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lower bound of the acceptance scale.
pub const ACCEPTANCE_MIN: f32 = 0.0;
/// Upper bound of the acceptance scale; a vote at exactly this value
/// counts as a heavy objection.
pub const ACCEPTANCE_MAX: f32 = 10.0;

/// A proposed option within a consensus, votable once voting opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub consensus_id: Uuid,
    pub creator_id: Uuid,
    /// Unique per consensus, matched case-sensitively.
    pub title: String,
    pub creation_date: DateTime<Utc>,
    /// Mean acceptance across votes; set once by the finish transition,
    /// absent for a suggestion nobody voted on.
    pub overall_acceptance: Option<f32>,
    /// Insertion sequence assigned by the store, for stable ordering.
    #[serde(skip)]
    pub(crate) seq: u64,
}

/// A single user's acceptance score for one suggestion.
///
/// At most one vote exists per (suggestion, voter); a repeat vote updates
/// the acceptance in place and keeps the original cast order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub suggestion_id: Uuid,
    pub voter_id: Uuid,
    pub acceptance: f32,
    #[serde(skip)]
    pub(crate) seq: u64,
}

/// Request body for creating or renaming a suggestion.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionInput {
    pub title: String,
}

/// Request body for casting a vote.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VoteInput {
    pub acceptance: f32,
}

/// Suggestion view model, built relative to the (optional) calling user.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionResponse {
    pub id: Uuid,
    pub consensus_id: Uuid,
    pub title: String,
    pub creation_date: DateTime<Utc>,
    /// Absent until the owning consensus finishes.
    pub overall_acceptance: Option<f32>,
    /// Whether the caller may edit this suggestion (its creator or a
    /// consensus admin).
    pub admin: bool,
    /// The caller's own vote value; always visible, it is their own data.
    pub own_acceptance: Option<f32>,
    /// Voter usernames in cast order.
    pub voters: Vec<String>,
    /// Count of votes at the maximum acceptance value. Absent while the
    /// owning consensus is unfinished: exposing it earlier would leak
    /// in-progress sentiment.
    pub heavy_objections_count: Option<usize>,
}
