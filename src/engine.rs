//! Wires the repositories and game components together on top of one
//! connection pool. Transports talk to this; nothing below it knows how a
//! request arrived.

use chrono::Utc;
use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::battle::{BattleOutcome, BattleResolver};
use crate::config::{Config, FeatureToggles};
use crate::db::models::growth::{DickRow, GrowthResult};
use crate::db::models::import::ExternalUser;
use crate::db::repositories::battle_stats::BattleStatsRepo;
use crate::db::repositories::chats::ChatsRepo;
use crate::db::repositories::dicks::DicksRepo;
use crate::db::repositories::imports::ImportRepo;
use crate::db::repositories::loans::LoansRepo;
use crate::db::repositories::promo::PromoRepo;
use crate::db::repositories::users::UsersRepo;
use crate::error::Result;
use crate::identity::{ChatIdKind, ChatIdPartiality};
use crate::imports::parse_exported_top;
use crate::incrementor::{Increment, Incrementor};
use crate::perks::default_perks;
use crate::selector::DailyWinnerSelector;

/// One daily growth, fully explained.
#[derive(Debug, Clone)]
pub struct GrowthReport {
    pub increment: Increment,
    pub result: GrowthResult,
}

/// What happened to each parsed line of an imported leaderboard.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub imported: Vec<ExternalUser>,
    pub already_imported: Vec<ExternalUser>,
    pub not_found: Vec<String>,
}

pub struct Engine {
    pub users: UsersRepo,
    pub chats: ChatsRepo,
    pub dicks: DicksRepo,
    pub loans: LoansRepo,
    pub battle_stats: BattleStatsRepo,
    pub promo: PromoRepo,
    pub imports: ImportRepo,
    pub incrementor: Incrementor,
    pub battles: BattleResolver,
    pub daily_winner: DailyWinnerSelector,
    features: FeatureToggles,
    top_limit: i64,
    pvp_default_bet: i64,
}

impl Engine {
    pub fn new(pool: &'static Pool<Postgres>, config: &Config) -> Self {
        let features = config.features;
        let users = UsersRepo::new(pool);
        let chats = ChatsRepo::new(pool, features);
        let dicks = DicksRepo::new(pool, features);
        let loans = LoansRepo::new(pool, config);
        let battle_stats = BattleStatsRepo::new(pool, chats.clone());

        // perk sets are not cloneable, so each consumer gets its own
        let incrementor = Incrementor::new(
            dicks.clone(),
            default_perks(config, loans.clone()),
            config.growth,
            features.chats_merging,
        );
        let selector_incrementor = Incrementor::new(
            dicks.clone(),
            default_perks(config, loans.clone()),
            config.growth,
            features.chats_merging,
        );

        let battles = BattleResolver::new(
            dicks.clone(),
            loans.clone(),
            battle_stats.clone(),
            features.pvp,
            features.chats_merging,
        );
        let daily_winner = DailyWinnerSelector::new(
            users.clone(),
            dicks.clone(),
            selector_incrementor,
            features.dod_selection_mode,
            config.dod_rich_exclusion_ratio,
            features.chats_merging,
        );

        Self {
            users,
            chats,
            dicks,
            loans,
            battle_stats,
            promo: PromoRepo::new(pool),
            imports: ImportRepo::new(pool),
            incrementor,
            battles,
            daily_winner,
            features,
            top_limit: config.top_limit,
            pvp_default_bet: config.pvp_default_bet,
        }
    }

    /// One page of the chat leaderboard, `top_limit` entries per page.
    /// Paging past the first page only makes sense with the unlimited-top
    /// feature; page 0 is always valid.
    #[instrument(skip(self))]
    pub async fn top(&self, chat_id: &ChatIdKind, page: i64) -> Result<Vec<DickRow>> {
        let page = if self.features.top_unlimited { page.max(0) } else { 0 };
        self.dicks
            .get_top(chat_id, page * self.top_limit, self.top_limit)
            .await
    }

    /// Runs a battle with the configured default bet when none is given.
    #[instrument(skip(self, chat), fields(chat = %chat))]
    pub async fn battle(
        &self,
        chat: &ChatIdPartiality,
        initiator_uid: i64,
        acceptor_uid: i64,
        bet: Option<i64>,
    ) -> Result<BattleOutcome> {
        let bet = bet.unwrap_or(self.pvp_default_bet);
        self.battles.resolve(chat, initiator_uid, acceptor_uid, bet).await
    }

    /// The daily growth command: registers or refreshes the user, rolls
    /// their increment and applies it. Fails with
    /// [`crate::error::Error::AlreadyGrownToday`] on a repeat.
    #[instrument(skip(self, chat), fields(chat = %chat))]
    pub async fn grow(&self, uid: i64, name: &str, chat: &ChatIdPartiality) -> Result<GrowthReport> {
        let user = self.users.create_or_update(uid, name).await?;
        let days = user.days_since_registration(Utc::now());
        let increment = self.incrementor.growth_increment(uid, chat, days).await?;
        let result = self.dicks.create_or_grow(uid, chat, increment.total).await?;

        Ok(GrowthReport { increment, result })
    }

    /// Imports a leaderboard exported from the predecessor bot into a
    /// persistent chat. Lines are matched to chat members by display name;
    /// `name_limit` is the exporter's truncation width, letting ellipsised
    /// lines match members whose full name is longer. Members imported
    /// earlier are reported but not credited again.
    #[instrument(skip(self, text))]
    pub async fn import_top(
        &self,
        chat_id: i64,
        text: &str,
        name_limit: Option<usize>,
    ) -> Result<ImportSummary> {
        let lines = parse_exported_top(text)?;
        let members = self
            .users
            .get_chat_members(&ChatIdKind::Id(chat_id))
            .await?;
        let previous = self.imports.get_imported_users(chat_id).await?;

        let mut imported = Vec::new();
        let mut already_imported = Vec::new();
        let mut not_found = Vec::new();
        for line in lines {
            let Some(member) = members
                .iter()
                .find(|m| name_matches(&m.name, &line.name, name_limit))
            else {
                not_found.push(line.name);
                continue;
            };
            let candidate = ExternalUser {
                uid: member.uid,
                length: line.length,
            };
            if previous.iter().any(|p| p.uid == member.uid) {
                already_imported.push(candidate);
            } else {
                imported.push(candidate);
            }
        }

        if !imported.is_empty() {
            self.imports.import_users(chat_id, &imported).await?;
        }

        Ok(ImportSummary {
            imported,
            already_imported,
            not_found,
        })
    }

    pub fn features(&self) -> FeatureToggles {
        self.features
    }
}

/// Whether an imported leaderboard name refers to this member. Exact match
/// always wins; with a truncation width, a name the exporter cut short
/// matches any member it is a prefix of at exactly that width.
fn name_matches(member: &str, imported: &str, name_limit: Option<usize>) -> bool {
    if member == imported {
        return true;
    }
    match name_limit {
        Some(limit) if imported.chars().count() == limit => {
            member.chars().take(limit).eq(imported.chars())
        }
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::name_matches;

    #[test]
    fn exact_names_match_with_or_without_a_limit() {
        assert!(name_matches("Alice", "Alice", None));
        assert!(name_matches("Alice", "Alice", Some(13)));
        assert!(!name_matches("Alice", "Bob", None));
    }

    #[test]
    fn truncated_names_match_their_prefix_at_the_export_width() {
        // a 13-char exporter cut "Maximilian the Great" down to its prefix
        assert!(name_matches("Maximilian the Great", "Maximilian th", Some(13)));
        assert!(!name_matches("Maximilian the Great", "Maximilian th", None));
        // a shorter-than-limit name must still match exactly
        assert!(!name_matches("Maximilian the Great", "Maximilian", Some(13)));
    }
}
