pub mod advisory;
pub mod chat;
pub mod user;
