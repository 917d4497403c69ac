use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::db::models::battle::UserPvpStats;
use crate::db::repositories::chats::ChatsRepo;
use crate::error::Result;
use crate::identity::{ChatIdKind, ChatIdPartiality};

/// What a finished battle looks like in the counters: the winner's fresh
/// row plus the loser numbers a caller may want to comment on.
#[derive(Debug, Clone, Copy)]
pub struct BattleStatsUpdate {
    pub winner: UserPvpStats,
    pub loser_win_rate: f64,
    pub loser_prev_streak: i64,
}

#[derive(Debug, Clone)]
pub struct BattleStatsRepo {
    pool: &'static Pool<Postgres>,
    chats: ChatsRepo,
}

impl BattleStatsRepo {
    pub fn new(pool: &'static Pool<Postgres>, chats: ChatsRepo) -> Self {
        Self { pool, chats }
    }

    /// Counters for one player, all zeroes if they never battled here.
    #[instrument(skip(self))]
    pub async fn get_stats(&self, uid: i64, chat_id: &ChatIdKind) -> Result<UserPvpStats> {
        let query = format!(
            r#"
            SELECT s.battles_total, s.battles_won, s.win_streak_max,
                s.win_streak_current, s.acquired_length, s.lost_length
            FROM battle_stats s
            JOIN chats c ON s.chat_id = c.id
            WHERE s.uid = $1 AND c.{column} = $2::{ty}
            "#,
            column = chat_id.sql_column(),
            ty = chat_id.sql_type(),
        );
        let stats = sqlx::query_as::<_, UserPvpStats>(&query)
            .bind(uid)
            .bind(chat_id.value())
            .fetch_optional(self.pool)
            .await?;

        Ok(stats.unwrap_or_default())
    }

    /// Applies one battle to both sides' counters atomically. The winner's
    /// best streak is maintained in the same statement, so it can never lag
    /// behind the current one.
    #[instrument(skip(self))]
    pub async fn send_battle_result(
        &self,
        chat: &ChatIdPartiality,
        winner_uid: i64,
        loser_uid: i64,
        bet: i64,
    ) -> Result<BattleStatsUpdate> {
        let internal_id = self.chats.upsert_chat(chat).await?;

        let mut tx = self.pool.begin().await?;

        let winner = sqlx::query_as::<_, UserPvpStats>(
            r#"
            INSERT INTO battle_stats (
                uid, chat_id,
                battles_total, battles_won, win_streak_max, win_streak_current,
                acquired_length, lost_length
            )
            VALUES ($1, $2, 1, 1, 1, 1, $3, 0)
            ON CONFLICT (uid, chat_id)
            DO UPDATE SET
                battles_total = battle_stats.battles_total + 1,
                battles_won = battle_stats.battles_won + 1,
                win_streak_max = greatest(
                    battle_stats.win_streak_max,
                    battle_stats.win_streak_current + 1
                ),
                win_streak_current = battle_stats.win_streak_current + 1,
                acquired_length = battle_stats.acquired_length + $3
            RETURNING battles_total, battles_won, win_streak_max,
                win_streak_current, acquired_length, lost_length
            "#,
        )
        .bind(winner_uid)
        .bind(internal_id)
        .bind(bet)
        .fetch_one(&mut *tx)
        .await?;

        let loser_prev_streak = sqlx::query_scalar::<_, i64>(
            "SELECT win_streak_current FROM battle_stats WHERE uid = $1 AND chat_id = $2",
        )
        .bind(loser_uid)
        .bind(internal_id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(0);

        let loser = sqlx::query_as::<_, UserPvpStats>(
            r#"
            INSERT INTO battle_stats (
                uid, chat_id,
                battles_total, battles_won, win_streak_max, win_streak_current,
                acquired_length, lost_length
            )
            VALUES ($1, $2, 1, 0, 0, 0, 0, $3)
            ON CONFLICT (uid, chat_id)
            DO UPDATE SET
                battles_total = battle_stats.battles_total + 1,
                win_streak_current = 0,
                lost_length = battle_stats.lost_length + $3
            RETURNING battles_total, battles_won, win_streak_max,
                win_streak_current, acquired_length, lost_length
            "#,
        )
        .bind(loser_uid)
        .bind(internal_id)
        .bind(bet)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BattleStatsUpdate {
            winner,
            loser_win_rate: loser.win_rate_percentage(),
            loser_prev_streak,
        })
    }
}
