/// Internal chat row. At least one of the two external identifiers is
/// always present; each may appear in at most one row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Chat {
    pub id: i64,
    pub chat_id: Option<i64>,
    pub chat_instance: Option<String>,
}
