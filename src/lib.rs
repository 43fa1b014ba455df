pub mod app;
pub mod cli;
pub mod config;
pub mod handler;
pub mod synthesis;
pub mod version;
