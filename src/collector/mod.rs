//! Activity Collector Module
//!
//! Objective activity signals (commits, merges, logged work time) used to
//! tell idle non-reporters apart from members who worked but skipped their standup.

pub mod client;
pub mod types;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::database::models::Member;
use crate::error::Result;

pub use client::CollectorClient;
pub use types::{ActivitySnapshot, CollectorScope};

#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Activity for `member` over the inclusive local date range `[from, to]`.
    async fn fetch_activity(&self, member: &Member, from: NaiveDate, to: NaiveDate) -> Result<ActivitySnapshot>;
}
