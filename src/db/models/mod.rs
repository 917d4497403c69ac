pub mod battle;
pub mod chat;
pub mod growth;
pub mod import;
pub mod loan;
pub mod promo;
pub mod user;
