pub mod persona;
pub mod search;
pub mod slack_bot_config;
