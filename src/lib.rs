//! Growth-ledger backend for a multiplayer chat game: per-chat progress
//! records with a once-a-day random growth, chat identity resolution across
//! two kinds of external identifiers, loans, battles, promo codes, daily
//! winners and imports from a predecessor bot.
//!
//! The crate is transport-agnostic. Build an [`engine::Engine`] on top of a
//! pool from [`db::db_pool`] and call into it from whatever frontend
//! receives the commands.

pub mod battle;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod identity;
pub mod imports;
pub mod incrementor;
pub mod perks;
pub mod selector;
pub mod util;

pub mod prelude {
    pub use crate::battle::{BattleOutcome, BattleResolver, BattleSide};
    pub use crate::config::{Config, FeatureToggles, SelectionMode};
    pub use crate::db::prelude::*;
    pub use crate::engine::{Engine, GrowthReport, ImportSummary};
    pub use crate::error::{Error, PromoError, Result};
    pub use crate::identity::{ChatIdKind, ChatIdPartiality, ChatIdSource};
    pub use crate::incrementor::{Increment, Incrementor};
    pub use crate::selector::{DailyWinner, DailyWinnerSelector};
}
