use sqlx::{Pool, Postgres};
use tracing::{info, instrument, warn};

use crate::config::FeatureToggles;
use crate::db::models::chat::Chat;
use crate::error::{Error, Result};
use crate::identity::{ChatIdKind, ChatIdPartiality};

#[derive(Debug, Clone)]
pub struct ChatsRepo {
    pool: &'static Pool<Postgres>,
    features: FeatureToggles,
}

impl ChatsRepo {
    pub fn new(pool: &'static Pool<Postgres>, features: FeatureToggles) -> Self {
        Self { pool, features }
    }

    /// Resolves an external chat reference to the internal surrogate id,
    /// creating the row on first sight, filling in a newly learned identifier
    /// on a later one, and merging two half-known rows once a reference ties
    /// them together (merging feature only).
    #[instrument(skip(self))]
    pub async fn upsert_chat(&self, chat_id: &ChatIdPartiality) -> Result<i64> {
        let (target_id, target_instance) = chat_id.columns(self.features.chats_merging);

        let matched = sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, chat_id, chat_instance
            FROM chats
            WHERE chat_id = $1 OR chat_instance = $2
            "#,
        )
        .bind(target_id)
        .bind(target_instance.as_deref())
        .fetch_all(self.pool)
        .await?;

        match matched.as_slice() {
            [] => self.create_chat(target_id, target_instance.as_deref()).await,
            [row] => {
                let learned_id = target_id.is_some() && row.chat_id.is_none();
                let learned_instance = target_instance.is_some() && row.chat_instance.is_none();
                if learned_id || learned_instance {
                    self.update_chat(row.id, target_id, target_instance.as_deref())
                        .await
                } else {
                    Ok(row.id)
                }
            }
            [a, b] if self.features.chats_merging && mergeable(a, b) => {
                self.merge_chats(a, b).await
            }
            rows => Err(Error::Inconsistency {
                reference: chat_id.to_string(),
                matches: rows.len(),
            }),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_internal_id(&self, chat_id: &ChatIdKind) -> Result<i64> {
        let query = format!(
            "SELECT id FROM chats WHERE {column} = $1::{ty}",
            column = chat_id.sql_column(),
            ty = chat_id.sql_type(),
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(chat_id.value())
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| Error::ChatNotFound(chat_id.to_string()))
    }

    async fn create_chat(&self, chat_id: Option<i64>, chat_instance: Option<&str>) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO chats (chat_id, chat_instance) VALUES ($1, $2) RETURNING id",
        )
        .bind(chat_id)
        .bind(chat_instance)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    async fn update_chat(
        &self,
        internal_id: i64,
        chat_id: Option<i64>,
        chat_instance: Option<&str>,
    ) -> Result<i64> {
        sqlx::query(
            r#"
            UPDATE chats
            SET chat_id = coalesce(chat_id, $2),
                chat_instance = coalesce(chat_instance, $3)
            WHERE id = $1
            "#,
        )
        .bind(internal_id)
        .bind(chat_id)
        .bind(chat_instance)
        .execute(self.pool)
        .await?;

        Ok(internal_id)
    }

    /// Collapses two rows that turned out to describe the same chat: one
    /// known only by numeric id, the other only by instance string (the
    /// caller guarantees that shape). Progress records of players present
    /// in both are summed into the surviving row.
    async fn merge_chats(&self, a: &Chat, b: &Chat) -> Result<i64> {
        let (main, other) = if a.chat_id.is_some() { (a, b) } else { (b, a) };
        let instance = other.chat_instance.as_deref();

        let mut tx = self.pool.begin().await?;

        let merged = sqlx::query(
            r#"
            WITH merged AS (
                SELECT uid, sum(length)::bigint AS length
                FROM dicks
                WHERE chat_id IN ($1, $2)
                GROUP BY uid
            )
            INSERT INTO dicks (uid, chat_id, length, updated_at, bonus_attempts)
            SELECT uid, $1, length, current_timestamp, 0
            FROM merged
            ON CONFLICT (uid, chat_id)
            DO UPDATE SET
                length = excluded.length,
                bonus_attempts = dicks.bonus_attempts + 1
            "#,
        )
        .bind(main.id)
        .bind(other.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM dicks WHERE chat_id = $1")
            .bind(other.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(other.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE chats SET chat_instance = $2 WHERE id = $1")
            .bind(main.id)
            .bind(instance)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if merged.rows_affected() > 0 {
            info!(
                main = main.id,
                absorbed = other.id,
                records = merged.rows_affected(),
                "chats merged"
            );
        } else {
            warn!(main = main.id, absorbed = other.id, "merged chats had no records");
        }
        Ok(main.id)
    }
}

/// A pair of chat rows may only be merged when one carries exactly the
/// numeric id and the other exactly the instance string. Any other shape
/// would overwrite a value that is already present, so it is treated as an
/// inconsistency instead.
fn mergeable(a: &Chat, b: &Chat) -> bool {
    let id_only = |c: &Chat| c.chat_id.is_some() && c.chat_instance.is_none();
    let instance_only = |c: &Chat| c.chat_id.is_none() && c.chat_instance.is_some();
    (id_only(a) && instance_only(b)) || (instance_only(a) && id_only(b))
}

#[cfg(test)]
mod test {
    use super::*;

    fn chat(id: i64, chat_id: Option<i64>, chat_instance: Option<&str>) -> Chat {
        Chat {
            id,
            chat_id,
            chat_instance: chat_instance.map(str::to_owned),
        }
    }

    #[test]
    fn half_known_rows_are_mergeable_either_way_around() {
        let by_id = chat(1, Some(100), None);
        let by_instance = chat(2, None, Some("abc"));
        assert!(mergeable(&by_id, &by_instance));
        assert!(mergeable(&by_instance, &by_id));
    }

    #[test]
    fn a_row_already_holding_both_identifiers_is_not_mergeable() {
        let full = chat(1, Some(100), Some("xyz"));
        let by_instance = chat(2, None, Some("abc"));
        assert!(!mergeable(&full, &by_instance));
        assert!(!mergeable(&by_instance, &full));
    }

    #[test]
    fn two_rows_of_the_same_kind_are_not_mergeable() {
        assert!(!mergeable(
            &chat(1, Some(100), None),
            &chat(2, Some(200), None)
        ));
        assert!(!mergeable(
            &chat(1, None, Some("abc")),
            &chat(2, None, Some("def"))
        ));
    }
}
