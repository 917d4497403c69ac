use thiserror::Error;

use crate::battle::BattleSide;
use crate::config::ConfigError;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom SQLSTATEs raised by the store-side daily gates (see migrations).
pub(crate) mod sqlstate {
    pub const DAILY_GROWTH: &str = "GD0E1";
    pub const DAILY_WINNER: &str = "GD0E2";
}

#[derive(Debug, Error)]
pub enum Error {
    /// More chat rows match one reference than the merge algorithm can ever
    /// produce. This is a fatal inconsistency, never pick a row silently.
    #[error("{matches} chat rows match {reference}")]
    Inconsistency { reference: String, matches: usize },

    #[error("no chat found for {0}")]
    ChatNotFound(String),

    #[error("no progress record for uid {uid} in chat {chat}")]
    RecordNotFound { uid: i64, chat: String },

    /// The store rejected a second natural growth for the same day.
    #[error("already grown today")]
    AlreadyGrownToday,

    /// The store rejected a second daily-winner draw for the same day.
    #[error("daily winner already chosen today")]
    AlreadyChosenToday,

    #[error("the {side} does not have enough length for the wager")]
    NotEnoughLength { side: BattleSide },

    #[error("an open loan already exists for uid {0}")]
    LoanAlreadyActive(i64),

    #[error("no active members to choose a daily winner from")]
    NoCandidates,

    #[error(transparent)]
    Promo(#[from] PromoError),

    #[error("import text contains {} unparseable lines", .0.len())]
    ImportInvalidLines(Vec<String>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("sqlx error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromoError {
    #[error("no activations left for this code")]
    NoActivationsLeft,

    #[error("no progress records to credit")]
    NoDicks,

    #[error("code already activated")]
    AlreadyActivated,
}

impl Error {
    /// Translates the daily natural-growth gate into its domain condition;
    /// everything else propagates as a storage failure.
    pub(crate) fn growth_gate(e: sqlx::Error) -> Self {
        match code_of(&e).as_deref() {
            Some(sqlstate::DAILY_GROWTH) => Self::AlreadyGrownToday,
            _ => Self::Database(e),
        }
    }

    /// Same for the once-per-day daily-winner gate.
    pub(crate) fn dod_gate(e: sqlx::Error) -> Self {
        match code_of(&e).as_deref() {
            Some(sqlstate::DAILY_WINNER) => Self::AlreadyChosenToday,
            _ => Self::Database(e),
        }
    }
}

fn code_of(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}
