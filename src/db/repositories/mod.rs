pub mod battle_stats;
pub mod chats;
pub mod dicks;
pub mod imports;
pub mod loans;
pub mod promo;
pub mod users;
