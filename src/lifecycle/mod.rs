//! Consensus lifecycle: deadline scheduling and state transitions.
//!
//! The scheduler owns at most two timer slots per consensus (voting-start
//! and finish) and fires the transition engine when a deadline passes; the
//! engine re-checks its precondition inside the store's atomic unit of
//! work, which makes timer/API races resolve deterministically.

pub mod engine;
pub mod scheduler;

pub use engine::{TransitionEngine, VotingStartOutcome};
pub use scheduler::{LifecycleScheduler, TimerKind};
