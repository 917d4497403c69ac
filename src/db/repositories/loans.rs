use sqlx::{Pool, Postgres};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::db::models::loan::Loan;
use crate::db::repositories::chats::ChatsRepo;
use crate::error::{Error, Result};
use crate::identity::ChatIdKind;

#[derive(Debug, Clone)]
pub struct LoansRepo {
    pool: &'static Pool<Postgres>,
    chats: ChatsRepo,
    payout_ratio: f64,
    multiple_loans: bool,
}

impl LoansRepo {
    pub fn new(pool: &'static Pool<Postgres>, config: &Config) -> Self {
        Self {
            pool,
            chats: ChatsRepo::new(pool, config.features),
            payout_ratio: config.loan_payout_ratio,
            multiple_loans: config.features.multiple_loans,
        }
    }

    /// The most recent unrepaid loan of the player in this chat, if any.
    #[instrument(skip(self))]
    pub async fn get_active_loan(&self, uid: i64, chat_id: &ChatIdKind) -> Result<Option<Loan>> {
        let query = format!(
            r#"
            SELECT l.debt, l.payout_ratio
            FROM loans l
            JOIN chats c ON l.chat_id = c.id
            WHERE l.uid = $1 AND c.{column} = $2::{ty} AND l.repaid_at IS NULL
            ORDER BY l.id DESC
            LIMIT 1
            "#,
            column = chat_id.sql_column(),
            ty = chat_id.sql_type(),
        );
        let loan = sqlx::query_as::<_, Loan>(&query)
            .bind(uid)
            .bind(chat_id.value())
            .fetch_optional(self.pool)
            .await?;

        Ok(loan)
    }

    /// Opens a loan and zeroes the borrower's length in one transaction. The
    /// payout ratio is snapshotted so later config changes never reprice old
    /// debts.
    #[instrument(skip(self))]
    pub async fn borrow(&self, uid: i64, chat_id: &ChatIdKind, value: i64) -> Result<()> {
        if !self.multiple_loans && self.get_active_loan(uid, chat_id).await?.is_some() {
            return Err(Error::LoanAlreadyActive(uid));
        }
        let internal_id = self.chats.get_internal_id(chat_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO loans (uid, chat_id, debt, payout_ratio, created_at)
            VALUES ($1, $2, $3, $4, current_timestamp)
            "#,
        )
        .bind(uid)
        .bind(internal_id)
        .bind(value)
        .bind(self.payout_ratio)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            UPDATE dicks
            SET length = 0, bonus_attempts = bonus_attempts + 1
            WHERE uid = $1 AND chat_id = $2
            "#,
        )
        .bind(uid)
        .bind(internal_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Reduces the active debt by `value`, never below zero. A fully paid
    /// loan keeps its row; only its debt reaches zero.
    #[instrument(skip(self))]
    pub async fn pay(&self, uid: i64, chat_id: &ChatIdKind, value: i64) -> Result<()> {
        if value <= 0 {
            return Ok(());
        }

        let query = format!(
            r#"
            UPDATE loans l
            SET debt = greatest(l.debt - $3, 0)
            FROM chats c
            WHERE l.chat_id = c.id
                AND l.uid = $1 AND c.{column} = $2::{ty} AND l.repaid_at IS NULL
            "#,
            column = chat_id.sql_column(),
            ty = chat_id.sql_type(),
        );
        let result = sqlx::query(&query)
            .bind(uid)
            .bind(chat_id.value())
            .bind(value)
            .execute(self.pool)
            .await?;

        debug!(uid, value, loans = result.rows_affected(), "loan payment applied");
        Ok(())
    }
}
