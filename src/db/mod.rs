use std::sync::LazyLock;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::Result;

pub mod models;
pub mod repositories;

pub mod prelude {
    pub use super::models::battle::UserPvpStats;
    pub use super::models::chat::Chat;
    pub use super::models::growth::{DickRow, GrowthResult, PersonalStats};
    pub use super::models::import::ExternalUser;
    pub use super::models::loan::Loan;
    pub use super::models::promo::PromoActivationResult;
    pub use super::models::user::{ActiveMember, User};
    pub use super::repositories::battle_stats::{BattleStatsRepo, BattleStatsUpdate};
    pub use super::repositories::chats::ChatsRepo;
    pub use super::repositories::dicks::DicksRepo;
    pub use super::repositories::imports::ImportRepo;
    pub use super::repositories::loans::LoansRepo;
    pub use super::repositories::promo::PromoRepo;
    pub use super::repositories::users::UsersRepo;
    pub use super::{db_pool, migrate};
}

static DB_POOL: LazyLock<OnceCell<PgPool>> = LazyLock::new(OnceCell::new);

fn database_url() -> Result<String> {
    dotenvy::var("DATABASE_URL")
        .map_err(|_| crate::config::ConfigError::Missing("DATABASE_URL").into())
}

async fn connect() -> Result<PgPool> {
    let url = database_url()?;
    let max_connections = dotenvy::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await?;

    info!(max_connections, "database pool initialized");
    Ok(pool)
}

/// Returns the process-wide connection pool, connecting on first use.
pub async fn db_pool() -> Result<&'static PgPool> {
    DB_POOL.get_or_try_init(connect).await
}

/// Applies any pending migrations from the bundled `migrations/` directory.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!().run(pool).await?;
    info!("migrations are up to date");
    Ok(())
}
