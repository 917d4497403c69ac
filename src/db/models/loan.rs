/// The open loan of one player in one chat: the remaining debt and the
/// payout ratio snapshotted when the loan was taken.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct Loan {
    pub debt: i64,
    pub payout_ratio: f64,
}

impl Loan {
    /// How much of a positive gain is withheld towards this loan: the
    /// snapshotted fraction of the gain, rounded, capped by the remaining
    /// debt. Non-positive gains are never taxed.
    pub fn withholding(&self, gain: i64) -> i64 {
        if gain <= 0 || self.debt <= 0 {
            return 0;
        }
        ((gain as f64 * self.payout_ratio).round() as i64)
            .min(self.debt)
            .max(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn withholding_rounds_the_fraction() {
        let loan = Loan {
            debt: 100,
            payout_ratio: 0.3,
        };
        assert_eq!(loan.withholding(10), 3);
        assert_eq!(loan.withholding(5), 2); // 1.5 rounds away from zero
    }

    #[test]
    fn withholding_is_capped_by_debt() {
        let loan = Loan {
            debt: 2,
            payout_ratio: 0.5,
        };
        assert_eq!(loan.withholding(100), 2);
    }

    #[test]
    fn non_positive_gains_are_never_taxed() {
        let loan = Loan {
            debt: 10,
            payout_ratio: 0.5,
        };
        assert_eq!(loan.withholding(0), 0);
        assert_eq!(loan.withholding(-6), 0);
    }

    #[test]
    fn settled_loan_is_inert() {
        let loan = Loan {
            debt: 0,
            payout_ratio: 0.5,
        };
        assert_eq!(loan.withholding(100), 0);
    }
}
