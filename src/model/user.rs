//! User records referenced by votes, access relations, and push fan-out.
//!
//! Registration, login, and password storage sit behind the authentication
//! boundary; the lifecycle engine only needs an identity, a display name,
//! and the optional device push token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique display name, also shown in voter lists.
    pub username: String,
    /// Device push token for lifecycle notifications, if one is registered.
    /// A token belongs to at most one user at a time.
    pub push_token: Option<String>,
}
