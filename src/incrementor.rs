//! Computes how much a player grows or shrinks on each event: a random base
//! roll shaped by the configured sign ratio, plus whatever the enabled perks
//! contribute.

use std::collections::HashMap;

use tracing::instrument;

use crate::config::GrowthSettings;
use crate::db::repositories::dicks::DicksRepo;
use crate::error::Result;
use crate::identity::ChatIdPartiality;
use crate::perks::{ChangeIntent, Perk};
use crate::util::rng::Rng;

/// A fully computed increment: the base roll and each perk's contribution,
/// keyed by perk name so callers can explain the total.
#[derive(Debug, Clone)]
pub struct Increment {
    pub base: i64,
    pub by_perks: HashMap<&'static str, i64>,
    pub total: i64,
}

pub struct Incrementor {
    dicks: DicksRepo,
    perks: Vec<Box<dyn Perk>>,
    rng: Rng,
    settings: GrowthSettings,
    chats_merging: bool,
}

impl Incrementor {
    pub fn new(
        dicks: DicksRepo,
        perks: Vec<Box<dyn Perk>>,
        settings: GrowthSettings,
        chats_merging: bool,
    ) -> Self {
        Self {
            dicks,
            perks,
            rng: Rng::new(),
            settings,
            chats_merging,
        }
    }

    /// The daily roll. Newcomers inside the grace period always roll
    /// positive; everyone else grows or shrinks per the configured ratio.
    #[instrument(skip(self, chat), fields(chat = %chat))]
    pub async fn growth_increment(
        &self,
        uid: i64,
        chat: &ChatIdPartiality,
        days_since_registration: i64,
    ) -> Result<Increment> {
        let sign_ratio = effective_sign_ratio(
            days_since_registration,
            self.settings.newcomers_grace_days,
            self.settings.grow_shrink_ratio,
        );
        let base = base_increment(&self.rng, self.settings.min, self.settings.max, sign_ratio);
        self.with_perks(uid, chat, base).await
    }

    /// The daily-winner bonus, always positive.
    #[instrument(skip(self, chat), fields(chat = %chat))]
    pub async fn dod_increment(&self, uid: i64, chat: &ChatIdPartiality) -> Result<Increment> {
        let base = self.rng.range_i64(1, self.settings.dod_bonus_max.max(1));
        self.with_perks(uid, chat, base).await
    }

    async fn with_perks(
        &self,
        uid: i64,
        chat: &ChatIdPartiality,
        base: i64,
    ) -> Result<Increment> {
        let current_length = self
            .dicks
            .fetch_length(uid, &chat.kind(self.chats_merging))
            .await?;
        let intent = ChangeIntent {
            current_length,
            base_increment: base,
        };

        let mut by_perks = HashMap::new();
        let mut total = base;
        for perk in &self.perks {
            let delta = perk.apply(uid, chat, intent).await?;
            if delta != 0 {
                by_perks.insert(perk.name(), delta);
                total += delta;
            }
        }

        Ok(Increment {
            base,
            by_perks,
            total,
        })
    }
}

/// The grow/shrink ratio in force for a player of the given account age.
/// The grace period is inclusive of its last day.
fn effective_sign_ratio(days_since_registration: i64, grace_days: i64, ratio: f64) -> f64 {
    if days_since_registration <= grace_days {
        1.0
    } else {
        ratio
    }
}

/// One base roll in `[min, max]` excluding zero, with the sign decided by
/// `sign_ratio` (probability of a positive roll). Ranges lying entirely on
/// one side of zero ignore the ratio.
fn base_increment(rng: &Rng, min: i64, max: i64, sign_ratio: f64) -> i64 {
    if min >= 1 {
        return rng.range_i64(min, max);
    }
    if max <= -1 {
        return rng.range_i64(min, max);
    }

    let percent = (sign_ratio * 100.0).round().clamp(0.0, 100.0) as i64;
    let positive = rng.range_i64(0, 99) < percent;
    if positive && max >= 1 {
        rng.range_i64(1, max)
    } else if !positive && min <= -1 {
        rng.range_i64(min, -1)
    } else {
        0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rolls_stay_in_range() {
        let rng = Rng::new();
        for _ in 0..200 {
            let v = base_increment(&rng, -5, 10, 0.5);
            assert!((-5..=10).contains(&v) && v != 0, "rolled {v}");
        }
    }

    #[test]
    fn single_sign_ranges_ignore_the_ratio() {
        let rng = Rng::new();
        for _ in 0..100 {
            assert!(base_increment(&rng, 1, 10, 0.0) > 0);
            assert!(base_increment(&rng, -10, -1, 1.0) < 0);
        }
    }

    #[test]
    fn extreme_ratios_fix_the_sign() {
        let rng = Rng::new();
        for _ in 0..100 {
            assert!(base_increment(&rng, -5, 10, 1.0) > 0);
            assert!(base_increment(&rng, -5, 10, 0.0) < 0);
        }
    }

    #[test]
    fn newcomers_always_grow() {
        assert_eq!(effective_sign_ratio(0, 7, 0.5), 1.0);
        assert_eq!(effective_sign_ratio(6, 7, 0.5), 1.0);
        // the last grace day still counts
        assert_eq!(effective_sign_ratio(7, 7, 0.5), 1.0);
        assert_eq!(effective_sign_ratio(8, 7, 0.5), 0.5);
        assert_eq!(effective_sign_ratio(100, 7, 0.5), 0.5);
    }
}
