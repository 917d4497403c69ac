//! Process-wide feature toggles and tuning knobs, read once from the
//! environment into an immutable value that gets passed explicitly to every
//! component constructor.

use std::collections::HashMap;
use std::str::FromStr;

use thiserror::Error;

/// Strategy for picking the daily bonus recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Random,
    Exclusion,
    Weights,
}

impl FromStr for SelectionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RANDOM" => Ok(Self::Random),
            "EXCLUSION" => Ok(Self::Exclusion),
            "WEIGHTS" => Ok(Self::Weights),
            other => Err(ConfigError::Invalid {
                key: "DOD_SELECTION_MODE",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BattleToggles {
    pub check_acceptor_length: bool,
    pub show_stats: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureToggles {
    pub chats_merging: bool,
    pub top_unlimited: bool,
    pub multiple_loans: bool,
    pub dod_selection_mode: SelectionMode,
    pub pvp: BattleToggles,
}

#[derive(Debug, Clone, Copy)]
pub struct GrowthSettings {
    pub min: i64,
    pub max: i64,
    pub grow_shrink_ratio: f64,
    pub newcomers_grace_days: i64,
    pub dod_bonus_max: i64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub features: FeatureToggles,
    pub growth: GrowthSettings,
    pub top_limit: i64,
    pub loan_payout_ratio: f64,
    pub dod_rich_exclusion_ratio: Option<f64>,
    pub pvp_default_bet: i64,
    pub help_in_debt_coef: f64,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_iter(dotenvy::vars())
    }

    /// Builds a config from any `(key, value)` source; `load` feeds it the
    /// process environment, tests feed it literal pairs.
    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let exclusion_ratio = get_f64(&vars, "DOD_RICH_EXCLUSION_RATIO", -1.0)?;
        let dod_rich_exclusion_ratio =
            (exclusion_ratio > 0.0 && exclusion_ratio < 1.0).then_some(exclusion_ratio);

        Ok(Self {
            features: FeatureToggles {
                chats_merging: get_bool(&vars, "CHATS_MERGING_ENABLED", false)?,
                top_unlimited: get_bool(&vars, "TOP_UNLIMITED_ENABLED", false)?,
                multiple_loans: get_bool(&vars, "MULTIPLE_LOANS_ENABLED", false)?,
                dod_selection_mode: match vars.get("DOD_SELECTION_MODE") {
                    Some(v) if !v.trim().is_empty() => v.parse()?,
                    _ => SelectionMode::Random,
                },
                pvp: BattleToggles {
                    check_acceptor_length: get_bool(&vars, "PVP_CHECK_ACCEPTOR_LENGTH", false)?,
                    show_stats: get_bool(&vars, "PVP_STATS_SHOW", true)?,
                },
            },
            growth: GrowthSettings {
                min: get_i64(&vars, "GROWTH_MIN", -5)?,
                max: get_i64(&vars, "GROWTH_MAX", 10)?,
                grow_shrink_ratio: get_f64(&vars, "GROW_SHRINK_RATIO", 0.5)?,
                newcomers_grace_days: get_i64(&vars, "NEWCOMERS_GRACE_DAYS", 7)?,
                dod_bonus_max: get_i64(&vars, "GROWTH_DOD_BONUS_MAX", 5)?,
            },
            top_limit: get_i64(&vars, "TOP_LIMIT", 10)?,
            loan_payout_ratio: get_f64(&vars, "LOAN_PAYOUT_COEF", 0.0)?,
            dod_rich_exclusion_ratio,
            pvp_default_bet: get_i64(&vars, "PVP_DEFAULT_BET", 1)?,
            help_in_debt_coef: get_f64(&vars, "HELP_PUSSIES_COEF", 0.0)?,
        })
    }
}

fn raw<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn get_bool(
    vars: &HashMap<String, String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match raw(vars, key) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Ok(true),
            "0" | "false" | "no" | "n" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value: v.to_owned(),
            }),
        },
    }
}

fn get_i64(
    vars: &HashMap<String, String>,
    key: &'static str,
    default: i64,
) -> Result<i64, ConfigError> {
    match raw(vars, key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: v.to_owned(),
        }),
    }
}

fn get_f64(
    vars: &HashMap<String, String>,
    key: &'static str,
    default: f64,
) -> Result<f64, ConfigError> {
    match raw(vars, key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: v.to_owned(),
        }),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("environment variable not found: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod test {
    use super::*;

    fn pairs(kv: &[(&str, &str)]) -> Vec<(String, String)> {
        kv.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = Config::from_iter(pairs(&[])).unwrap();
        assert_eq!(cfg.growth.min, -5);
        assert_eq!(cfg.growth.max, 10);
        assert_eq!(cfg.growth.grow_shrink_ratio, 0.5);
        assert_eq!(cfg.growth.newcomers_grace_days, 7);
        assert_eq!(cfg.top_limit, 10);
        assert_eq!(cfg.loan_payout_ratio, 0.0);
        assert_eq!(cfg.pvp_default_bet, 1);
        assert_eq!(cfg.features.dod_selection_mode, SelectionMode::Random);
        assert!(!cfg.features.chats_merging);
        assert!(!cfg.features.pvp.check_acceptor_length);
        assert!(cfg.features.pvp.show_stats);
        assert_eq!(cfg.dod_rich_exclusion_ratio, None);
    }

    #[test]
    fn values_override_defaults() {
        let cfg = Config::from_iter(pairs(&[
            ("GROWTH_MIN", "-3"),
            ("GROWTH_MAX", "7"),
            ("CHATS_MERGING_ENABLED", "true"),
            ("DOD_SELECTION_MODE", "weights"),
            ("LOAN_PAYOUT_COEF", "0.25"),
            ("DOD_RICH_EXCLUSION_RATIO", "0.3"),
        ]))
        .unwrap();
        assert_eq!(cfg.growth.min, -3);
        assert_eq!(cfg.growth.max, 7);
        assert!(cfg.features.chats_merging);
        assert_eq!(cfg.features.dod_selection_mode, SelectionMode::Weights);
        assert_eq!(cfg.loan_payout_ratio, 0.25);
        assert_eq!(cfg.dod_rich_exclusion_ratio, Some(0.3));
    }

    #[test]
    fn out_of_range_exclusion_ratio_is_dropped() {
        for ratio in ["0", "1", "1.5", "-0.2"] {
            let cfg =
                Config::from_iter(pairs(&[("DOD_RICH_EXCLUSION_RATIO", ratio)])).unwrap();
            assert_eq!(cfg.dod_rich_exclusion_ratio, None, "ratio {ratio}");
        }
    }

    #[test]
    fn garbage_values_are_rejected() {
        assert!(Config::from_iter(pairs(&[("GROWTH_MIN", "abc")])).is_err());
        assert!(Config::from_iter(pairs(&[("CHATS_MERGING_ENABLED", "maybe")])).is_err());
        assert!(Config::from_iter(pairs(&[("DOD_SELECTION_MODE", "COSMIC")])).is_err());
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let cfg = Config::from_iter(pairs(&[("GROWTH_MIN", ""), ("TOP_LIMIT", "  ")])).unwrap();
        assert_eq!(cfg.growth.min, -5);
        assert_eq!(cfg.top_limit, 10);
    }
}
