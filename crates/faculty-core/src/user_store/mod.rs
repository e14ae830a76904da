//! User storage
//!
//! [`CredentialStore`] is the narrow surface the authentication core needs.
//! [`UserStore`] adds the admin operations on top of it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Identity, NewIdentity, UpdateUserRequest, UserFilter};
use crate::Result;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryUserStore;
pub use sqlite::SqliteUserStore;

/// Account lookups used by login and by the per-request identity filter.
///
/// Implementations must be safe for concurrent readers.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>>;

    async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<()>;
}

/// Admin operations over accounts
#[async_trait]
pub trait UserStore: CredentialStore {
    async fn create_user(&self, user: NewIdentity) -> Result<Identity>;

    async fn get_user(&self, user_id: i64) -> Result<Option<Identity>>;

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<Identity>>;

    /// Set the active flag, returning the updated account
    async fn set_active(&self, user_id: i64, active: bool) -> Result<Identity>;

    /// Apply a partial update. A changed email must still be unique.
    async fn update_user(&self, user_id: i64, update: UpdateUserRequest) -> Result<Identity>;

    /// Soft delete: the account stays but can no longer sign in
    async fn delete_user(&self, user_id: i64) -> Result<()> {
        self.set_active(user_id, false).await.map(|_| ())
    }
}
