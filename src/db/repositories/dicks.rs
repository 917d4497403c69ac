use sqlx::{PgExecutor, Pool, Postgres};
use tracing::instrument;

use crate::config::FeatureToggles;
use crate::db::models::growth::{DickRow, GrowthResult, PersonalStats};
use crate::db::repositories::chats::ChatsRepo;
use crate::error::{Error, Result};
use crate::identity::{ChatIdKind, ChatIdPartiality};

/// Ordering shared by tops, single-record ranks and post-growth positions.
/// Ties go to the most recently grown, then to the name.
const TOP_ORDER: &str = "d.length DESC, d.updated_at DESC, u.name";

#[derive(Debug, Clone)]
pub struct DicksRepo {
    pool: &'static Pool<Postgres>,
    features: FeatureToggles,
    chats: ChatsRepo,
}

impl DicksRepo {
    pub fn new(pool: &'static Pool<Postgres>, features: FeatureToggles) -> Self {
        Self {
            pool,
            features,
            chats: ChatsRepo::new(pool, features),
        }
    }

    /// The natural once-a-day growth. Creates the record on first use;
    /// afterwards the store-side gate rejects a second change on the same
    /// calendar day.
    #[instrument(skip(self))]
    pub async fn create_or_grow(
        &self,
        uid: i64,
        chat: &ChatIdPartiality,
        increment: i64,
    ) -> Result<GrowthResult> {
        let internal_id = self.chats.upsert_chat(chat).await?;

        let new_length = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO dicks (uid, chat_id, length, updated_at)
            VALUES ($1, $2, $3, current_timestamp)
            ON CONFLICT (uid, chat_id)
            DO UPDATE SET
                length = dicks.length + $3,
                updated_at = current_timestamp
            RETURNING length
            "#,
        )
        .bind(uid)
        .bind(internal_id)
        .bind(increment)
        .fetch_one(self.pool)
        .await
        .map_err(Error::growth_gate)?;

        let pos_in_top = if self.features.top_unlimited {
            Some(self.position_in_top(internal_id, uid).await?)
        } else {
            None
        };

        Ok(GrowthResult {
            new_length,
            pos_in_top,
        })
    }

    #[instrument(skip(self))]
    pub async fn fetch_length(&self, uid: i64, chat_id: &ChatIdKind) -> Result<i64> {
        let query = format!(
            r#"
            SELECT d.length
            FROM dicks d
            JOIN chats c ON d.chat_id = c.id
            WHERE d.uid = $1 AND c.{column} = $2::{ty}
            "#,
            column = chat_id.sql_column(),
            ty = chat_id.sql_type(),
        );
        let length = sqlx::query_scalar::<_, i64>(&query)
            .bind(uid)
            .bind(chat_id.value())
            .fetch_optional(self.pool)
            .await?;

        Ok(length.unwrap_or(0))
    }

    /// One ranked record, or `None` if the player never grew in this chat.
    #[instrument(skip(self))]
    pub async fn fetch_dick(&self, uid: i64, chat_id: &ChatIdKind) -> Result<Option<DickRow>> {
        let query = format!(
            r#"
            SELECT length, owner_uid, owner_name, grown_at, position
            FROM (
                SELECT d.length, d.uid AS owner_uid, u.name AS owner_name,
                    d.updated_at AS grown_at,
                    row_number() OVER (ORDER BY {TOP_ORDER}) AS position
                FROM dicks d
                JOIN users u ON d.uid = u.uid
                JOIN chats c ON d.chat_id = c.id
                WHERE c.{column} = $2::{ty}
            ) ranked
            WHERE owner_uid = $1
            "#,
            column = chat_id.sql_column(),
            ty = chat_id.sql_type(),
        );
        let row = sqlx::query_as::<_, DickRow>(&query)
            .bind(uid)
            .bind(chat_id.value())
            .fetch_optional(self.pool)
            .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    pub async fn get_top(
        &self,
        chat_id: &ChatIdKind,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DickRow>> {
        let query = format!(
            r#"
            SELECT d.length, d.uid AS owner_uid, u.name AS owner_name,
                d.updated_at AS grown_at,
                row_number() OVER (ORDER BY {TOP_ORDER}) AS position
            FROM dicks d
            JOIN users u ON d.uid = u.uid
            JOIN chats c ON d.chat_id = c.id
            WHERE c.{column} = $1::{ty}
            ORDER BY {TOP_ORDER}
            OFFSET $2 LIMIT $3
            "#,
            column = chat_id.sql_column(),
            ty = chat_id.sql_type(),
        );
        let rows = sqlx::query_as::<_, DickRow>(&query)
            .bind(chat_id.value())
            .bind(offset)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }

    /// Whether the player can cover a wager of `threshold`. A missing record
    /// counts as zero length, so a zero wager always passes.
    #[instrument(skip(self))]
    pub async fn check_length(
        &self,
        uid: i64,
        chat_id: &ChatIdKind,
        threshold: i64,
    ) -> Result<bool> {
        Ok(self.fetch_length(uid, chat_id).await? >= threshold)
    }

    /// Transfers `amount` from the loser to the winner atomically. Both
    /// records must already exist. Returns the updated results as
    /// `(loser, winner)`, rank-aware like [`Self::create_or_grow`].
    #[instrument(skip(self))]
    pub async fn move_length(
        &self,
        chat: &ChatIdPartiality,
        from_uid: i64,
        to_uid: i64,
        amount: i64,
    ) -> Result<(GrowthResult, GrowthResult)> {
        let internal_id = self.chats.upsert_chat(chat).await?;
        let chat_label = chat.to_string();

        let mut tx = self.pool.begin().await?;
        let from_length = self
            .apply_change(&mut *tx, from_uid, internal_id, -amount, &chat_label)
            .await?;
        let to_length = self
            .apply_change(&mut *tx, to_uid, internal_id, amount, &chat_label)
            .await?;
        tx.commit().await?;

        let (from_pos, to_pos) = if self.features.top_unlimited {
            (
                Some(self.position_in_top(internal_id, from_uid).await?),
                Some(self.position_in_top(internal_id, to_uid).await?),
            )
        } else {
            (None, None)
        };

        Ok((
            GrowthResult {
                new_length: from_length,
                pos_in_top: from_pos,
            },
            GrowthResult {
                new_length: to_length,
                pos_in_top: to_pos,
            },
        ))
    }

    /// A bonus change outside the daily cycle: loan clawbacks, manual fixes.
    /// Works against an already-resolved chat and never creates one; bumping
    /// `bonus_attempts` is what lets it through the daily gate.
    #[instrument(skip(self))]
    pub async fn grow_no_attempts_check(
        &self,
        uid: i64,
        chat_id: &ChatIdKind,
        delta: i64,
    ) -> Result<GrowthResult> {
        let internal_id = self.chats.get_internal_id(chat_id).await?;
        let new_length = self
            .apply_change(self.pool, uid, internal_id, delta, &chat_id.to_string())
            .await?;

        let pos_in_top = if self.features.top_unlimited {
            Some(self.position_in_top(internal_id, uid).await?)
        } else {
            None
        };

        Ok(GrowthResult {
            new_length,
            pos_in_top,
        })
    }

    /// Credits the daily winner and records the draw. The insert into
    /// `dick_of_day` is what enforces one draw per chat per day.
    #[instrument(skip(self))]
    pub async fn set_dod_winner(
        &self,
        chat: &ChatIdPartiality,
        winner_uid: i64,
        bonus: i64,
    ) -> Result<i64> {
        let internal_id = self.chats.upsert_chat(chat).await?;

        let mut tx = self.pool.begin().await?;
        let new_length = self
            .apply_change(&mut *tx, winner_uid, internal_id, bonus, &chat.to_string())
            .await?;
        sqlx::query(
            "INSERT INTO dick_of_day (chat_id, winner_uid, created_at) VALUES ($1, $2, current_timestamp)",
        )
        .bind(internal_id)
        .bind(winner_uid)
        .execute(&mut *tx)
        .await
        .map_err(Error::dod_gate)?;
        tx.commit().await?;

        Ok(new_length)
    }

    #[instrument(skip(self))]
    pub async fn personal_stats(&self, uid: i64) -> Result<PersonalStats> {
        let stats = sqlx::query_as::<_, PersonalStats>(
            r#"
            SELECT count(distinct chat_id) AS chats,
                coalesce(max(length), 0) AS max_length,
                coalesce(sum(length), 0)::bigint AS total_length
            FROM dicks
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    async fn position_in_top(&self, internal_chat_id: i64, uid: i64) -> Result<i64> {
        let query = format!(
            r#"
            SELECT position
            FROM (
                SELECT d.uid, row_number() OVER (ORDER BY {TOP_ORDER}) AS position
                FROM dicks d
                JOIN users u ON d.uid = u.uid
                WHERE d.chat_id = $1
            ) ranked
            WHERE uid = $2
            "#,
        );
        let position = sqlx::query_scalar::<_, i64>(&query)
            .bind(internal_chat_id)
            .bind(uid)
            .fetch_one(self.pool)
            .await?;

        Ok(position)
    }

    async fn apply_change<'e, E>(
        &self,
        executor: E,
        uid: i64,
        internal_chat_id: i64,
        delta: i64,
        chat_label: &str,
    ) -> Result<i64>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE dicks
            SET length = length + $3,
                bonus_attempts = bonus_attempts + 1
            WHERE uid = $1 AND chat_id = $2
            RETURNING length
            "#,
        )
        .bind(uid)
        .bind(internal_chat_id)
        .bind(delta)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound {
            uid,
            chat: chat_label.to_owned(),
        })
    }
}
