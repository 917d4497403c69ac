//! Optional modifiers applied on top of the base daily increment. Each perk
//! sees the player's current length and the base roll, and contributes a
//! delta of its own.

use async_trait::async_trait;

use crate::config::Config;
use crate::db::repositories::loans::LoansRepo;
use crate::error::Result;
use crate::identity::ChatIdPartiality;

/// Snapshot handed to every perk for one growth event.
#[derive(Debug, Clone, Copy)]
pub struct ChangeIntent {
    pub current_length: i64,
    pub base_increment: i64,
}

#[async_trait]
pub trait Perk: Send + Sync {
    /// Stable key the perk's contribution is reported under.
    fn name(&self) -> &'static str;

    fn enabled(&self) -> bool {
        true
    }

    /// The perk's own delta for this event. Side effects (like loan
    /// repayment) happen here too.
    async fn apply(&self, uid: i64, chat: &ChatIdPartiality, intent: ChangeIntent) -> Result<i64>;
}

/// Softens the fall of players deep in the negative: adds back a configured
/// fraction of their (negative) length on every growth event.
pub struct HelpInDebtPerk {
    coefficient: f64,
}

impl HelpInDebtPerk {
    pub fn new(coefficient: f64) -> Self {
        Self { coefficient }
    }

    fn compensation(&self, current_length: i64) -> i64 {
        if current_length >= 0 {
            return 0;
        }
        (self.coefficient * current_length.unsigned_abs() as f64).round() as i64
    }
}

#[async_trait]
impl Perk for HelpInDebtPerk {
    fn name(&self) -> &'static str {
        "help-in-debt"
    }

    fn enabled(&self) -> bool {
        self.coefficient > 0.0
    }

    async fn apply(
        &self,
        _uid: i64,
        _chat: &ChatIdPartiality,
        intent: ChangeIntent,
    ) -> Result<i64> {
        Ok(self.compensation(intent.current_length))
    }
}

/// Withholds part of a positive base increment towards the player's active
/// loan. The withheld amount both pays the debt down and is subtracted from
/// the growth.
pub struct LoanPayoutPerk {
    loans: LoansRepo,
    chats_merging: bool,
}

impl LoanPayoutPerk {
    pub fn new(loans: LoansRepo, chats_merging: bool) -> Self {
        Self {
            loans,
            chats_merging,
        }
    }
}

#[async_trait]
impl Perk for LoanPayoutPerk {
    fn name(&self) -> &'static str {
        "loan-payout"
    }

    async fn apply(&self, uid: i64, chat: &ChatIdPartiality, intent: ChangeIntent) -> Result<i64> {
        let chat_id = chat.kind(self.chats_merging);
        let Some(loan) = self.loans.get_active_loan(uid, &chat_id).await? else {
            return Ok(0);
        };

        let payout = loan.withholding(intent.base_increment);
        if payout > 0 {
            self.loans.pay(uid, &chat_id, payout).await?;
        }
        Ok(-payout)
    }
}

/// The full perk set for a given configuration; disabled perks are dropped
/// up front so the incrementor never iterates them.
pub fn default_perks(config: &Config, loans: LoansRepo) -> Vec<Box<dyn Perk>> {
    let perks: Vec<Box<dyn Perk>> = vec![
        Box::new(HelpInDebtPerk::new(config.help_in_debt_coef)),
        Box::new(LoanPayoutPerk::new(loans, config.features.chats_merging)),
    ];
    perks.into_iter().filter(|p| p.enabled()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn help_in_debt_compensates_negative_lengths_only() {
        let perk = HelpInDebtPerk::new(0.5);
        assert_eq!(perk.compensation(-10), 5);
        assert_eq!(perk.compensation(-5), 3); // 2.5 rounds away from zero
        assert_eq!(perk.compensation(0), 0);
        assert_eq!(perk.compensation(42), 0);
    }

    #[test]
    fn help_in_debt_is_disabled_at_zero_coefficient() {
        assert!(!HelpInDebtPerk::new(0.0).enabled());
        assert!(HelpInDebtPerk::new(0.1).enabled());
    }
}
