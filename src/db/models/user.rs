use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub uid: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn days_since_registration(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

/// A chat member whose progress record updated within the activity window,
/// carried with their length so selection strategies can weigh them.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ActiveMember {
    pub uid: i64,
    pub name: String,
    pub length: i64,
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn registration_age_counts_whole_days() {
        let now = Utc::now();
        let user = User {
            uid: 1,
            name: "fresh".to_owned(),
            created_at: now - TimeDelta::hours(30),
        };
        assert_eq!(user.days_since_registration(now), 1);
    }
}
