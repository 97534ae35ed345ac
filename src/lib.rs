//! Tailrelay - tail log folders and relay classified lines and JSON payloads.

pub mod config;
pub mod display;
pub mod server;
pub mod sink;
pub mod watcher;
