//! Player-versus-player wagers: a fair coin decides, the bet moves from the
//! loser to the winner, loans take their cut, counters get updated.

use core::fmt;

use tracing::{info, instrument};

use crate::config::BattleToggles;
use crate::db::models::growth::GrowthResult;
use crate::db::repositories::battle_stats::{BattleStatsRepo, BattleStatsUpdate};
use crate::db::repositories::dicks::DicksRepo;
use crate::db::repositories::loans::LoansRepo;
use crate::error::{Error, Result};
use crate::identity::ChatIdPartiality;
use crate::util::rng::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleSide {
    Initiator,
    Acceptor,
}

impl fmt::Display for BattleSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiator => f.write_str("initiator"),
            Self::Acceptor => f.write_str("acceptor"),
        }
    }
}

/// Everything a caller needs to narrate a finished battle.
#[derive(Debug, Clone, Copy)]
pub struct BattleOutcome {
    pub winner_uid: i64,
    pub loser_uid: i64,
    pub winner: GrowthResult,
    pub loser: GrowthResult,
    /// Part of the winnings withheld towards the winner's loan, if any.
    pub withheld: Option<i64>,
    pub stats: Option<BattleStatsUpdate>,
}

pub struct BattleResolver {
    dicks: DicksRepo,
    loans: LoansRepo,
    stats: BattleStatsRepo,
    rng: Rng,
    toggles: BattleToggles,
    chats_merging: bool,
}

impl BattleResolver {
    pub fn new(
        dicks: DicksRepo,
        loans: LoansRepo,
        stats: BattleStatsRepo,
        toggles: BattleToggles,
        chats_merging: bool,
    ) -> Self {
        Self {
            dicks,
            loans,
            stats,
            rng: Rng::new(),
            toggles,
            chats_merging,
        }
    }

    /// Plays one battle to completion. Both sides must cover the bet (the
    /// acceptor's check is optional by configuration); the transfer and the
    /// loan cut are applied before the counters.
    #[instrument(skip(self, chat), fields(chat = %chat))]
    pub async fn resolve(
        &self,
        chat: &ChatIdPartiality,
        initiator_uid: i64,
        acceptor_uid: i64,
        bet: i64,
    ) -> Result<BattleOutcome> {
        if bet <= 0 {
            return Err(Error::NotEnoughLength {
                side: BattleSide::Initiator,
            });
        }

        let chat_id = chat.kind(self.chats_merging);

        let initiator_length = self.dicks.fetch_length(initiator_uid, &chat_id).await?;
        let acceptor_length = self.dicks.fetch_length(acceptor_uid, &chat_id).await?;
        if let Some(side) = underfunded_side(
            initiator_length,
            acceptor_length,
            bet,
            self.toggles.check_acceptor_length,
        ) {
            return Err(Error::NotEnoughLength { side });
        }

        let (winner_uid, loser_uid) = if self.rng.coin_flip() {
            (initiator_uid, acceptor_uid)
        } else {
            (acceptor_uid, initiator_uid)
        };

        let (loser, mut winner) = self
            .dicks
            .move_length(chat, loser_uid, winner_uid, bet)
            .await?;

        let withheld = match self.loans.get_active_loan(winner_uid, &chat_id).await? {
            Some(loan) => {
                let payout = loan.withholding(bet);
                if payout > 0 {
                    self.loans.pay(winner_uid, &chat_id, payout).await?;
                    winner = self
                        .dicks
                        .grow_no_attempts_check(winner_uid, &chat_id, -payout)
                        .await?;
                    Some(payout)
                } else {
                    None
                }
            }
            None => None,
        };

        let stats = if self.toggles.show_stats {
            Some(
                self.stats
                    .send_battle_result(chat, winner_uid, loser_uid, bet)
                    .await?,
            )
        } else {
            None
        };

        info!(winner_uid, loser_uid, bet, withheld, "battle resolved");
        Ok(BattleOutcome {
            winner_uid,
            loser_uid,
            winner,
            loser,
            withheld,
            stats,
        })
    }
}

/// Which side, if any, cannot cover the wager. The acceptor is checked
/// first, and only when the acceptor check is enabled; otherwise they may
/// accept with any length, debt included.
fn underfunded_side(
    initiator_length: i64,
    acceptor_length: i64,
    bet: i64,
    check_acceptor_length: bool,
) -> Option<BattleSide> {
    if check_acceptor_length && acceptor_length < bet {
        return Some(BattleSide::Acceptor);
    }
    if initiator_length < bet {
        return Some(BattleSide::Initiator);
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn acceptor_check_gates_a_short_acceptor() {
        // wager 5, initiator at 10, acceptor at 3
        assert_eq!(underfunded_side(10, 3, 5, false), None);
        assert_eq!(underfunded_side(10, 3, 5, true), Some(BattleSide::Acceptor));
    }

    #[test]
    fn initiator_must_always_cover_the_wager() {
        assert_eq!(underfunded_side(4, 10, 5, false), Some(BattleSide::Initiator));
        assert_eq!(underfunded_side(5, 10, 5, true), None);
    }

    #[test]
    fn short_acceptor_is_reported_before_short_initiator() {
        assert_eq!(underfunded_side(1, 2, 5, true), Some(BattleSide::Acceptor));
    }

    #[test]
    fn indebted_acceptor_may_accept_without_the_check() {
        assert_eq!(underfunded_side(10, -2, 5, false), None);
        assert_eq!(underfunded_side(10, -2, 5, true), Some(BattleSide::Acceptor));
    }
}
