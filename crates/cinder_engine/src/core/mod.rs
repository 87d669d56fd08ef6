//! Core engine services: configuration and logging

pub mod config;
pub mod logging;
