//! User lookup against the Shimmie2 database.
//!
//! The gate only needs to resolve a username into its stored password hash,
//! so it depends on [`UserGetter`] rather than on a concrete datastore.

pub mod mysql;

use chrono::NaiveDateTime;
use serde::Serialize;
use std::future::Future;
use thiserror::Error;
use utoipa::ToSchema;

pub use mysql::Datastore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A row of the Shimmie2 `users` table.
#[derive(Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    /// Stored password hash, see [`crate::auth::codec::password_hash`].
    #[serde(skip)]
    pub pass: String,
    pub join_date: NaiveDateTime,
    pub admin: bool,
    pub email: Option<String>,
    pub class: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pass", &"***")
            .field("join_date", &self.join_date)
            .field("admin", &self.admin)
            .field("email", &self.email)
            .field("class", &self.class)
            .finish()
    }
}

/// Resolve a user by name.
///
/// `Ok(None)` means the user does not exist; `Err` is reserved for storage
/// failures so callers can tell the two apart.
pub trait UserGetter: Send + Sync + 'static {
    fn get_user_by_name(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;
}
