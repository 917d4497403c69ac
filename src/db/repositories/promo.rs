use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::db::models::promo::PromoActivationResult;
use crate::error::{Error, PromoError, Result};

/// Primary key of the activations table; a conflict on it means this user
/// already redeemed this code.
const ACTIVATIONS_PK: &str = "promo_code_activations_pkey";

#[derive(Debug, sqlx::FromRow)]
struct CodeRow {
    code: String,
    bonus_length: i64,
}

/// Codes of 4 to 16 characters from a conservative alphabet; anything else
/// is rejected before touching the store.
pub fn is_valid_code(code: &str) -> bool {
    (4..=16).contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[derive(Debug, Clone)]
pub struct PromoRepo {
    pool: &'static Pool<Postgres>,
}

impl PromoRepo {
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Redeems a code for a user: decrements the remaining capacity, credits
    /// the bonus to every progress record the user has, and pins the
    /// activation so a second redemption of the same code is impossible.
    /// All three steps share one transaction.
    #[instrument(skip(self, code))]
    pub async fn activate(&self, uid: i64, code: &str) -> Result<PromoActivationResult> {
        let mut tx = self.pool.begin().await?;

        let code_row = sqlx::query_as::<_, CodeRow>(
            r#"
            UPDATE promo_codes
            SET capacity = capacity - 1
            WHERE lower(code) = lower($1)
                AND capacity > 0
                AND (since IS NULL OR since::date <= current_date)
                AND (until IS NULL OR until::date >= current_date)
            RETURNING code, bonus_length
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PromoError::NoActivationsLeft)?;

        let credited = sqlx::query(
            r#"
            UPDATE dicks
            SET length = length + $2,
                bonus_attempts = bonus_attempts + 1
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .bind(code_row.bonus_length)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if credited < 1 {
            return Err(PromoError::NoDicks.into());
        }

        sqlx::query(
            "INSERT INTO promo_code_activations (uid, code, affected_chats) VALUES ($1, $2, $3)",
        )
        .bind(uid)
        .bind(&code_row.code)
        .bind(credited as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| match constraint_of(&e).as_deref() {
            Some(ACTIVATIONS_PK) => PromoError::AlreadyActivated.into(),
            _ => Error::Database(e),
        })?;

        tx.commit().await?;

        Ok(PromoActivationResult {
            chats_affected: credited as i64,
            bonus_length: code_row.bonus_length,
        })
    }
}

fn constraint_of(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.constraint().map(str::to_owned),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn code_validation() {
        assert!(is_valid_code("GROW2024"));
        assert!(is_valid_code("ab-c_"));
        assert!(!is_valid_code("abc"));
        assert!(!is_valid_code("waaaaaaaaaaaaaytoolong"));
        assert!(!is_valid_code("with space"));
        assert!(!is_valid_code("емодзи"));
    }
}
