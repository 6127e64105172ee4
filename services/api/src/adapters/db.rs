//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `CardStore`, `AccountStore` and `AuthSessionStore` ports from the `core` crate.
//! It handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashdeck_core::domain::{
    CardId, FlashCard, NewCard, NewUser, Role, User, UserCredentials, UserId,
};
use flashdeck_core::ports::{
    AccountStore, AuthSessionStore, CardMutation, CardStore, PortError, PortResult,
};
use sqlx::{FromRow, PgPool, Postgres};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every storage port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const CARD_COLUMNS: &str = "id, user_id, topic, question, answer, seen, last_seen, \
                            times_seen, times_correct, times_wrong, ease";

const USER_COLUMNS: &str = "id, username, email, role, password_hash";

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CardRecord {
    id: i64,
    user_id: i64,
    topic: String,
    question: String,
    answer: String,
    seen: bool,
    last_seen: Option<DateTime<Utc>>,
    times_seen: i32,
    times_correct: i32,
    times_wrong: i32,
    ease: i16,
}
impl CardRecord {
    fn to_domain(self) -> FlashCard {
        FlashCard {
            id: self.id,
            user_id: self.user_id,
            topic: self.topic,
            question: self.question,
            answer: self.answer,
            seen: self.seen,
            last_seen: self.last_seen,
            times_seen: u32::try_from(self.times_seen).unwrap_or(0),
            times_correct: u32::try_from(self.times_correct).unwrap_or(0),
            times_wrong: u32::try_from(self.times_wrong).unwrap_or(0),
            ease: u8::try_from(self.ease.clamp(0, 100)).unwrap_or(0),
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    username: String,
    email: String,
    role: String,
    password_hash: String,
}
impl UserRecord {
    fn to_credentials(self) -> PortResult<UserCredentials> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| PortError::Unexpected(format!("User {} has unknown role '{}'", self.id, self.role)))?;
        Ok(UserCredentials {
            user: User {
                id: self.id,
                username: self.username,
                email: self.email,
                role,
            },
            hashed_password: self.password_hash,
        })
    }

    fn to_domain(self) -> PortResult<User> {
        self.to_credentials().map(|c| c.user)
    }
}

fn counter(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Maps driver failures onto the port's error vocabulary.
fn db_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound("Row not found".to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PortError::StoreUnavailable(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

/// Writes every mutable column of `card` back to the row with id `card_id`.
async fn write_card<'e, E>(executor: E, card_id: CardId, card: &FlashCard) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        "UPDATE flash_cards SET topic = $1, question = $2, answer = $3, seen = $4, last_seen = $5, \
         times_seen = $6, times_correct = $7, times_wrong = $8, ease = $9 WHERE id = $10",
    )
    .bind(&card.topic)
    .bind(&card.question)
    .bind(&card.answer)
    .bind(card.seen)
    .bind(card.last_seen)
    .bind(counter(card.times_seen))
    .bind(counter(card.times_correct))
    .bind(counter(card.times_wrong))
    .bind(i16::from(card.ease))
    .bind(card_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

//=========================================================================================
// `CardStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CardStore for DbAdapter {
    async fn get_card(&self, card_id: CardId) -> PortResult<FlashCard> {
        let record = sqlx::query_as::<_, CardRecord>(&format!(
            "SELECT {} FROM flash_cards WHERE id = $1",
            CARD_COLUMNS
        ))
        .bind(card_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Card {} not found", card_id)),
            _ => db_error(e),
        })?;
        Ok(record.to_domain())
    }

    async fn list_cards_by_user(&self, user_id: UserId) -> PortResult<Vec<FlashCard>> {
        let records = sqlx::query_as::<_, CardRecord>(&format!(
            "SELECT {} FROM flash_cards WHERE user_id = $1 ORDER BY id ASC",
            CARD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_card(&self, user_id: UserId, card: NewCard) -> PortResult<FlashCard> {
        let record = sqlx::query_as::<_, CardRecord>(&format!(
            "INSERT INTO flash_cards (user_id, topic, question, answer) VALUES ($1, $2, $3, $4) RETURNING {}",
            CARD_COLUMNS
        ))
        .bind(user_id)
        .bind(&card.topic)
        .bind(&card.question)
        .bind(&card.answer)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(record.to_domain())
    }

    async fn update_card(&self, card: &FlashCard) -> PortResult<()> {
        let updated = write_card(&self.pool, card.id, card).await.map_err(db_error)?;
        if updated == 0 {
            return Err(PortError::NotFound(format!("Card {} not found", card.id)));
        }
        Ok(())
    }

    async fn delete_card(&self, card_id: CardId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM flash_cards WHERE id = $1")
            .bind(card_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Card {} not found", card_id)));
        }
        Ok(())
    }

    async fn delete_cards_by_user(&self, user_id: UserId) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM flash_cards WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn modify_user_cards(&self, user_id: UserId, op: &mut CardMutation<'_>) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Row locks serialize concurrent review requests for the same user.
        let records = sqlx::query_as::<_, CardRecord>(&format!(
            "SELECT {} FROM flash_cards WHERE user_id = $1 ORDER BY id ASC FOR UPDATE",
            CARD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error)?;

        let original: Vec<FlashCard> = records.into_iter().map(|r| r.to_domain()).collect();
        let mut working = original.clone();
        // An error here drops `tx`, which rolls it back.
        op(working.as_mut_slice())?;

        let mut written = 0;
        for (before, after) in original.iter().zip(working.iter()) {
            if before != after {
                write_card(&mut *tx, before.id, after).await.map_err(db_error)?;
                written += 1;
            }
        }
        tx.commit().await.map_err(db_error)?;
        debug!(user_id, written, "committed card mutation");
        Ok(())
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for DbAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    let message = match db.constraint() {
                        Some("users_email_key") => "Email already used",
                        _ => "Username not available",
                    };
                    return PortError::Conflict(message.to_string());
                }
            }
            db_error(e)
        })?;
        record.to_domain()
    }

    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("User with ID: {} does not exist", user_id))
                }
                _ => db_error(e),
            })?
            .to_domain()
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", username)),
            _ => db_error(e),
        })?
        .to_credentials()
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users ORDER BY id ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn set_role(&self, user_id: UserId, role: Role) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User with ID: {} does not exist", user_id)));
        }
        Ok(())
    }

    async fn set_password_hash(&self, user_id: UserId, hashed_password: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(hashed_password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User with ID: {} does not exist", user_id)));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User with ID: {} does not exist", user_id)));
        }
        Ok(())
    }

    async fn count_admins(&self) -> PortResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(Role::Admin.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

//=========================================================================================
// `AuthSessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthSessionStore for DbAdapter {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId> {
        let user_id: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
