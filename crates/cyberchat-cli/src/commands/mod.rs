pub mod chat;
pub mod plugins;
