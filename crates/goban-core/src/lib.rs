//! # goban-core
//!
//! Core types, traits, configuration, and error handling for Goban.

pub mod config;
pub mod cookie;
pub mod error;
pub mod keywords;
pub mod model;
pub mod traits;
