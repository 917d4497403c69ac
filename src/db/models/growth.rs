use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a single length mutation. The rank is populated only when the
/// unlimited-top feature is on; computing it costs a full-chat window scan.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GrowthResult {
    pub new_length: i64,
    pub pos_in_top: Option<i64>,
}

/// One ranked progress record as shown in tops and personal stats.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DickRow {
    pub length: i64,
    pub owner_uid: i64,
    pub owner_name: String,
    pub grown_at: DateTime<Utc>,
    pub position: Option<i64>,
}

/// Cross-chat aggregate for one player.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct PersonalStats {
    pub chats: i64,
    pub max_length: i64,
    pub total_length: i64,
}
