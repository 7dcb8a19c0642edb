//! I/O helpers for conversion commands.

pub mod config;
pub mod inference;
pub mod model;
pub mod prompt;
pub mod session_log;
pub mod sources;
