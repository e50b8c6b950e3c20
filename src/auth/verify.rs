//! Username/password check against the stored Shimmie2 hash.

use thiserror::Error;

use super::codec::{password_hash, sessions_match};
use crate::store::{StoreError, User, UserGetter};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("user not found")]
    NotFound,
    #[error("wrong username or password")]
    WrongCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Check `password` for `username`, returning the user on success.
///
/// # Errors
/// `NotFound` if the username does not exist, `WrongCredentials` if the hash
/// does not match, `Store` if the lookup fails.
pub async fn verify_credentials<U: UserGetter>(
    users: &U,
    username: &str,
    password: &str,
) -> Result<User, VerifyError> {
    let user = users
        .get_user_by_name(username)
        .await?
        .ok_or(VerifyError::NotFound)?;

    if sessions_match(&user.pass, &password_hash(username, password)) {
        Ok(user)
    } else {
        Err(VerifyError::WrongCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneUser(Option<User>);

    impl UserGetter for OneUser {
        async fn get_user_by_name(&self, username: &str) -> Result<Option<User>, StoreError> {
            Ok(self.0.clone().filter(|user| user.name == username))
        }
    }

    struct Broken;

    impl UserGetter for Broken {
        async fn get_user_by_name(&self, _username: &str) -> Result<Option<User>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
    }

    fn john() -> OneUser {
        OneUser(Some(User {
            id: 1,
            name: "john".to_string(),
            pass: password_hash("john", "1234"),
            join_date: chrono::NaiveDateTime::default(),
            admin: false,
            email: Some("john@doe.com".to_string()),
            class: "user".to_string(),
        }))
    }

    #[tokio::test]
    async fn verify_accepts_correct_password() {
        let user = verify_credentials(&john(), "john", "1234").await;
        assert_eq!(user.ok().map(|user| user.id), Some(1));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let result = verify_credentials(&john(), "john", "wrongpassword").await;
        assert!(matches!(result, Err(VerifyError::WrongCredentials)));
    }

    #[tokio::test]
    async fn verify_reports_unknown_user() {
        let result = verify_credentials(&john(), "nonexistentuser", "wrongpassword").await;
        assert!(matches!(result, Err(VerifyError::NotFound)));
    }

    #[tokio::test]
    async fn verify_propagates_store_errors() {
        let result = verify_credentials(&Broken, "john", "1234").await;
        assert!(matches!(result, Err(VerifyError::Store(_))));
    }
}
