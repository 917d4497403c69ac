use serde::Serialize;

/// Rolling PvP counters for one player in one chat. Everything is
/// monotonically non-decreasing except the current streak, which resets to
/// zero on a loss.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
pub struct UserPvpStats {
    pub battles_total: i64,
    pub battles_won: i64,
    pub win_streak_max: i64,
    pub win_streak_current: i64,
    pub acquired_length: i64,
    pub lost_length: i64,
}

impl UserPvpStats {
    pub fn win_rate_percentage(&self) -> f64 {
        if self.battles_total <= 0 {
            return 0.0;
        }
        self.battles_won as f64 / self.battles_total as f64 * 100.0
    }

    pub fn win_rate_formatted(&self) -> String {
        format!("{:.2}%", self.win_rate_percentage())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn win_rate_of_a_fresh_player_is_zero() {
        assert_eq!(UserPvpStats::default().win_rate_percentage(), 0.0);
    }

    #[test]
    fn win_rate_is_a_percentage() {
        let stats = UserPvpStats {
            battles_total: 8,
            battles_won: 2,
            ..Default::default()
        };
        assert_eq!(stats.win_rate_percentage(), 25.0);
        assert_eq!(stats.win_rate_formatted(), "25.00%");
    }
}
