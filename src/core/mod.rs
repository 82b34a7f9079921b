pub mod auth;
pub mod chat_stream;
pub mod client;
pub mod config;
pub mod ndjson;
pub mod rich_text;
pub mod session;
pub mod status;
pub mod transcript;
