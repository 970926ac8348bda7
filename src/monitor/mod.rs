//! Standup monitoring
//!
//! Each tick recomputes everything from the store: which groups have a
//! deadline, who has not reported for today, which escalation phase is due.
//! Nothing is remembered between ticks, so the process can restart at any point.

pub mod compliance;
pub mod engine;
pub mod messages;
pub mod period;
pub mod phases;
pub mod rooks;

use chrono::FixedOffset;
use std::time::Duration;

use crate::database::models::Deadline;

pub use compliance::ComplianceEvaluator;
pub use engine::{EscalationEngine, RookReport, TickSummary};
pub use period::{Period, PeriodResolver};
pub use phases::Phase;
pub use rooks::{RookEntry, RookVerdict};

#[derive(Debug, Clone)]
pub struct EscalationConfig {
    /// Minutes between engine ticks; every phase fires on exactly one tick.
    pub tick_interval_minutes: i64,
    pub warning_lead_minutes: i64,
    pub reminder_interval_minutes: i64,
    pub reminder_repeats_max: u32,
    pub worklog_sufficient_seconds: i64,
    /// Local time of day the rook report goes out.
    pub rook_report_time: Deadline,
    pub operator_channel: String,
    pub utc_offset: FixedOffset,
    pub collector_timeout: Duration,
    pub collector_concurrency: usize,
}
