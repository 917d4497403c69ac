use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromoActivationResult {
    pub chats_affected: i64,
    pub bonus_length: i64,
}
