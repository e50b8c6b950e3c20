//! `sqlx` datastore over the Shimmie2 MySQL schema.

use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions, MySqlRow},
    Connection, Row,
};
use std::time::Duration;
use tracing::{debug, warn, Instrument};

use super::{StoreError, User, UserGetter};

const PING_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Columns of `users` in the order Shimmie2 creates them.
const USER_COLUMNS: &str =
    "id, name, pass, joindate, CAST(admin AS CHAR) AS admin, class, email";

#[derive(Clone, Debug)]
pub struct Datastore {
    pool: MySqlPool,
}

impl Datastore {
    /// Open a pool and wait until the database answers.
    ///
    /// The database is pinged up to `ping_attempts` times, one second apart.
    ///
    /// # Errors
    /// Returns an error if the DSN is invalid or every ping fails.
    pub async fn connect(dsn: &str, ping_attempts: u32) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect_lazy(dsn)?;
        let store = Self::from_pool(pool);

        let attempts = ping_attempts.max(1);
        let mut attempt = 1;
        loop {
            match store.ping().await {
                Ok(()) => return Ok(store),
                Err(err) if attempt < attempts => {
                    warn!(attempt, "database ping failed, retry in 1s: {err}");
                    tokio::time::sleep(PING_RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    #[must_use]
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// # Errors
    /// Returns an error if no connection can be acquired or the ping fails.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = tracing::info_span!(
            "db.acquire",
            db.system = "mysql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = tracing::info_span!("db.ping", db.system = "mysql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }

    /// Look up a user by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let span = tracing::info_span!(
            "db.query",
            db.system = "mysql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.as_ref().map(user_from_row).transpose().map_err(Into::into)
    }

    /// Look up a user by name. Matching follows the column collation.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?");
        let span = tracing::info_span!(
            "db.query",
            db.system = "mysql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        debug!(found = row.is_some(), "user lookup by name");

        row.as_ref().map(user_from_row).transpose().map_err(Into::into)
    }
}

impl UserGetter for Datastore {
    async fn get_user_by_name(&self, username: &str) -> Result<Option<User>, StoreError> {
        Datastore::get_user_by_name(self, username).await
    }
}

fn user_from_row(row: &MySqlRow) -> Result<User, sqlx::Error> {
    let pass: Option<String> = row.try_get("pass")?;
    let admin: String = row.try_get("admin")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        pass: pass.unwrap_or_default(),
        join_date: row.try_get("joindate")?,
        admin: admin == "Y",
        email: row.try_get("email")?,
        class: row.try_get("class")?,
    })
}
