pub mod commands;
pub mod config;
pub mod data;
pub mod handlers;
pub mod logging;
pub mod moderation;
pub mod status;
pub mod web;

pub const BOT_NAME: &str = "modwarden";
pub const COMMAND_TARGET: &str = "modwarden::command";
pub const ERROR_TARGET: &str = "modwarden::error";
pub const EVENT_TARGET: &str = "modwarden::handlers";
pub const CONSOLE_TARGET: &str = "modwarden";
pub const STORE_TARGET: &str = "modwarden::store";
pub const WEB_TARGET: &str = "modwarden::web";

pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
