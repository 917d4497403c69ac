//! Picks the daily bonus recipient from the chat's active members and
//! credits them. Three strategies: a uniform draw, a uniform draw with the
//! richest excluded, and a draw weighted against long records.

use tracing::{info, instrument};

use crate::config::SelectionMode;
use crate::db::models::user::ActiveMember;
use crate::db::repositories::dicks::DicksRepo;
use crate::db::repositories::users::UsersRepo;
use crate::error::{Error, Result};
use crate::identity::ChatIdPartiality;
use crate::incrementor::Incrementor;
use crate::util::rng::Rng;

#[derive(Debug, Clone)]
pub struct DailyWinner {
    pub uid: i64,
    pub name: String,
    /// The winner's new length after the bonus.
    pub new_length: i64,
    /// The bonus credited.
    pub bonus: i64,
}

pub struct DailyWinnerSelector {
    users: UsersRepo,
    dicks: DicksRepo,
    incrementor: Incrementor,
    rng: Rng,
    mode: SelectionMode,
    exclusion_ratio: Option<f64>,
    chats_merging: bool,
}

impl DailyWinnerSelector {
    pub fn new(
        users: UsersRepo,
        dicks: DicksRepo,
        incrementor: Incrementor,
        mode: SelectionMode,
        exclusion_ratio: Option<f64>,
        chats_merging: bool,
    ) -> Self {
        Self {
            users,
            dicks,
            incrementor,
            rng: Rng::new(),
            mode,
            exclusion_ratio,
            chats_merging,
        }
    }

    /// Draws today's winner and credits their bonus. Fails with
    /// [`Error::AlreadyChosenToday`] on a second draw the same day and with
    /// [`Error::NoCandidates`] when nobody was active this week.
    #[instrument(skip(self, chat), fields(chat = %chat))]
    pub async fn select_and_award(&self, chat: &ChatIdPartiality) -> Result<DailyWinner> {
        let chat_id = chat.kind(self.chats_merging);
        let pool = self.users.get_active_members(&chat_id).await?;

        let winner = match (self.mode, self.exclusion_ratio) {
            (SelectionMode::Weights, _) => pick_weighted(&pool, self.rng.uniform_f64()),
            (SelectionMode::Exclusion, Some(ratio)) => {
                pick_uniform(&exclude_richest(&pool, ratio), &self.rng)
            }
            _ => pick_uniform(&pool, &self.rng),
        }
        .ok_or(Error::NoCandidates)?;

        let increment = self.incrementor.dod_increment(winner.uid, chat).await?;
        let new_length = self
            .dicks
            .set_dod_winner(chat, winner.uid, increment.total)
            .await?;

        info!(uid = winner.uid, bonus = increment.total, "daily winner chosen");
        Ok(DailyWinner {
            uid: winner.uid,
            name: winner.name,
            new_length,
            bonus: increment.total,
        })
    }
}

/// Selection weight of one member: long records asymptotically never win,
/// short and negative ones almost always can.
fn logistic_weight(length: i64) -> f64 {
    1.0 / (1.0 + (length as f64 / 6.0).exp())
}

/// Weighted draw by inverting `draw` (uniform in `[0, 1)`) over the
/// cumulative weights.
fn pick_weighted(pool: &[ActiveMember], draw: f64) -> Option<ActiveMember> {
    let total: f64 = pool.iter().map(|m| logistic_weight(m.length)).sum();
    if total <= 0.0 {
        return None;
    }

    let mut cursor = draw * total;
    for member in pool {
        cursor -= logistic_weight(member.length);
        if cursor < 0.0 {
            return Some(member.clone());
        }
    }
    pool.last().cloned()
}

fn pick_uniform(pool: &[ActiveMember], rng: &Rng) -> Option<ActiveMember> {
    if pool.is_empty() {
        return None;
    }
    let idx = rng.range_i64(0, pool.len() as i64 - 1) as usize;
    Some(pool[idx].clone())
}

/// Drops the top `ratio` fraction of the pool by length, by percent rank.
/// A member at rank zero always survives, so a non-empty pool never empties.
fn exclude_richest(pool: &[ActiveMember], ratio: f64) -> Vec<ActiveMember> {
    if pool.len() <= 1 {
        return pool.to_vec();
    }

    let cutoff = 1.0 - ratio;
    let n = (pool.len() - 1) as f64;
    pool.iter()
        .filter(|m| {
            let below = pool.iter().filter(|o| o.length < m.length).count() as f64;
            below / n <= cutoff
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn member(uid: i64, length: i64) -> ActiveMember {
        ActiveMember {
            uid,
            name: format!("u{uid}"),
            length,
        }
    }

    #[test]
    fn weights_favor_short_records() {
        let pool = vec![member(1, -10), member(2, 0), member(3, 60)];
        let mut wins = [0u32; 3];
        for i in 0..10_000 {
            let draw = (i as f64 + 0.5) / 10_000.0;
            let picked = pick_weighted(&pool, draw).unwrap();
            wins[(picked.uid - 1) as usize] += 1;
        }
        assert!(wins[0] > wins[1], "wins: {wins:?}");
        assert!(wins[1] > wins[2], "wins: {wins:?}");
        // a 60 cm record is practically out of the running
        assert!(wins[2] < 10, "wins: {wins:?}");
    }

    #[test]
    fn weighted_draw_of_empty_pool_is_none() {
        assert!(pick_weighted(&[], 0.5).is_none());
    }

    #[test]
    fn exclusion_drops_only_the_richest() {
        let pool: Vec<_> = (1..=10).map(|i| member(i, i * 10)).collect();
        let kept = exclude_richest(&pool, 0.3);
        let kept_uids: Vec<_> = kept.iter().map(|m| m.uid).collect();
        assert_eq!(kept_uids, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn exclusion_never_empties_a_pool() {
        let solo = vec![member(1, 100)];
        assert_eq!(exclude_richest(&solo, 0.9).len(), 1);

        let pair = vec![member(1, 1), member(2, 100)];
        let kept = exclude_richest(&pair, 0.99);
        assert!(!kept.is_empty());
        assert!(kept.iter().any(|m| m.uid == 1));
    }

    #[test]
    fn uniform_draw_respects_the_pool() {
        let rng = Rng::new();
        assert!(pick_uniform(&[], &rng).is_none());

        let pool = vec![member(1, 5), member(2, 7)];
        for _ in 0..50 {
            let picked = pick_uniform(&pool, &rng).unwrap();
            assert!(pool.contains(&picked));
        }
    }
}
