//! Domain entities and API view models.

pub mod consensus;
pub mod suggestion;
pub mod user;

pub use consensus::{
    AccessRequest, Consensus, ConsensusDraft, ConsensusInput, ConsensusResponse, FollowInput, Phase,
};
pub use suggestion::{
    Suggestion, SuggestionInput, SuggestionResponse, Vote, VoteInput, ACCEPTANCE_MAX, ACCEPTANCE_MIN,
};
pub use user::User;
