/// A player as known to the legacy bot an import originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct ExternalUser {
    pub uid: i64,
    pub length: i64,
}
