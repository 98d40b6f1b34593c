//! Access-secret handling for private consensuses.
//!
//! User authentication and token issuance live outside this crate; the
//! only credential the engine itself stores is the private-access secret
//! of a consensus, hashed with Argon2.

pub mod secret;

pub use secret::{hash_secret, verify_secret};
