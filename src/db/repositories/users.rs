use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::db::models::user::{ActiveMember, User};
use crate::error::Result;
use crate::identity::ChatIdKind;

#[derive(Debug, Clone)]
pub struct UsersRepo {
    pool: &'static Pool<Postgres>,
}

impl UsersRepo {
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Registers the user on first sight and refreshes the display name on
    /// every later one. Always returns the row as stored.
    #[instrument(skip(self))]
    pub async fn create_or_update(&self, uid: i64, name: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (uid, name, created_at)
            VALUES ($1, $2, current_timestamp)
            ON CONFLICT (uid)
            DO UPDATE SET name = $2
            RETURNING uid, name, created_at
            "#,
        )
        .bind(uid)
        .bind(name)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, uid: i64) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT uid, name, created_at FROM users WHERE uid = $1")
                .bind(uid)
                .fetch_optional(self.pool)
                .await?;

        Ok(user)
    }

    /// Everyone with a progress record in the chat, regardless of recency.
    #[instrument(skip(self))]
    pub async fn get_chat_members(&self, chat_id: &ChatIdKind) -> Result<Vec<User>> {
        let query = format!(
            r#"
            SELECT u.uid, u.name, u.created_at
            FROM users u
            JOIN dicks d ON u.uid = d.uid
            JOIN chats c ON d.chat_id = c.id
            WHERE c.{column} = $1::{ty}
            "#,
            column = chat_id.sql_column(),
            ty = chat_id.sql_type(),
        );
        let members = sqlx::query_as::<_, User>(&query)
            .bind(chat_id.value())
            .fetch_all(self.pool)
            .await?;

        Ok(members)
    }

    /// Members whose record changed within the last week, with their current
    /// lengths. This is the candidate pool for the daily-winner draw.
    #[instrument(skip(self))]
    pub async fn get_active_members(&self, chat_id: &ChatIdKind) -> Result<Vec<ActiveMember>> {
        let query = format!(
            r#"
            SELECT u.uid, u.name, d.length
            FROM users u
            JOIN dicks d ON u.uid = d.uid
            JOIN chats c ON d.chat_id = c.id
            WHERE c.{column} = $1::{ty}
                AND d.updated_at > current_timestamp - interval '1 week'
            "#,
            column = chat_id.sql_column(),
            ty = chat_id.sql_type(),
        );
        let members = sqlx::query_as::<_, ActiveMember>(&query)
            .bind(chat_id.value())
            .fetch_all(self.pool)
            .await?;

        Ok(members)
    }
}
