//! Armory Workshop - Shared item store for budget editing
//!
//! This crate ties the budget engine to stored items:
//!
//! ```text
//! Workshop
//!  │
//!  ├── RwLock<State>
//!  │    ├── Items (by ItemId)
//!  │    ├── BudgetConfig
//!  │    └── History ← one record per create/update/delete
//!  │
//!  └── RateLimiter<S: RateLimitStore> ← per-actor token buckets
//! ```
//!
//! ## Key Components
//!
//! - [`Workshop`]: Item store whose mutations record before/after budgets
//! - [`RateLimiter`]: Token bucket limiter over a pluggable [`RateLimitStore`]
//! - [`WorkshopConfig`]: Rate limit and history retention settings

mod config;
mod error;
mod rate_limit;
mod workshop;

pub use config::WorkshopConfig;
pub use error::{Error, Result};
pub use rate_limit::{
    MemoryStore, RateLimitConfig, RateLimitResult, RateLimitStore, RateLimiter, TokenBucket,
};
pub use workshop::Workshop;
