//! # goban-store
//!
//! SQLite-backed store for tasks, accounts, complaint records, and task logs.

pub mod store;

pub use store::Store;
