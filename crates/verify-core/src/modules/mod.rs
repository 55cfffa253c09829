//! Logging setup and configuration file handling.

pub mod config;
pub mod logger;
