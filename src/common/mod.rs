//! Shared utilities for the calendar and language-model clients.

pub mod retry;

pub use retry::{with_retry, RetryPolicy};
