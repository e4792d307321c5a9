//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use super::UserId;

/// The identity returned by the auth endpoint of the record store.
///
/// The ledger looks this up once per insert to stamp row ownership; it
/// does not manage sessions itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Unique user identifier.
    pub id: UserId,
    /// Email address, when the auth backend exposes one.
    pub email: Option<String>,
}
