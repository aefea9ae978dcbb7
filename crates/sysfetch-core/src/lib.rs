pub mod config;
pub mod logging;

pub mod fetcher;
pub mod manifest;
pub mod pipeline;
pub mod platform;
pub mod settings;
pub mod verify;
