#![deny(rust_2018_idioms)]

pub mod config;
pub mod economy;
pub mod events;
pub mod generator;
pub mod messages;
pub mod permissions;
pub mod player;
pub mod plot;
pub mod plugin;
pub mod utils;
