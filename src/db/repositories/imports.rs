use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::db::models::import::ExternalUser;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ImportRepo {
    pool: &'static Pool<Postgres>,
}

impl ImportRepo {
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Users of this chat who already went through an import. Used to keep
    /// a repeated import from crediting anyone twice.
    #[instrument(skip(self))]
    pub async fn get_imported_users(&self, chat_id: i64) -> Result<Vec<ExternalUser>> {
        let users = sqlx::query_as::<_, ExternalUser>(
            r#"
            SELECT i.uid, i.original_length AS length
            FROM imports i
            JOIN chats c ON i.chat_id = c.id
            WHERE c.chat_id = $1
            "#,
        )
        .bind(chat_id)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Records the imported originals and credits each user's length in one
    /// transaction.
    #[instrument(skip(self, users))]
    pub async fn import_users(&self, chat_id: i64, users: &[ExternalUser]) -> Result<()> {
        let uids: Vec<i64> = users.iter().map(|u| u.uid).collect();
        let lengths: Vec<i64> = users.iter().map(|u| u.length).collect();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO imports (chat_id, uid, original_length)
            SELECT c.id, imported.uid, imported.original_length
            FROM unnest($2::bigint[], $3::bigint[]) AS imported(uid, original_length)
            JOIN chats c ON c.chat_id = $1
            "#,
        )
        .bind(chat_id)
        .bind(&uids)
        .bind(&lengths)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            UPDATE dicks d
            SET length = d.length + imported.original_length,
                bonus_attempts = d.bonus_attempts + 1
            FROM unnest($2::bigint[], $3::bigint[]) AS imported(uid, original_length)
            JOIN chats c ON c.chat_id = $1
            WHERE d.uid = imported.uid AND d.chat_id = c.id
            "#,
        )
        .bind(chat_id)
        .bind(&uids)
        .bind(&lengths)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }
}
