//! # goban-remote
//!
//! Clients for the content platform: the retry executor every call runs
//! through, the per-account API client, and the passport login-code client.

pub mod client;
pub mod passport;
pub mod retry;
mod wire;

pub use client::{BiliClient, HttpClientFactory};
pub use passport::{extract_credential, PassportClient};
pub use retry::RetryExecutor;
