//! Chat-bot front end: webhook routes, command dispatch and the chat client.

pub mod chat;
pub mod commands;
pub mod routes;

pub use chat::{ChatError, ChatSender, TelegramClient};
pub use routes::{router, AppState};
