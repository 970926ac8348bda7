//! Escalation Engine
//!
//! Driven by a single timer. Every tick walks all groups sequentially, works
//! out which phase each one is in and sends what that phase calls for. Phase D
//! (the rook report) runs once a day and fans out to the collector.
//!
//! A failure in one group or for one member is logged and counted, never
//! allowed to stop the rest of the tick.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::collector::ActivitySource;
use crate::database::models::{Group, Member};
use crate::database::Store;
use crate::error::{MonitorError, Result};
use crate::monitor::compliance::ComplianceEvaluator;
use crate::monitor::period::{Period, PeriodResolver};
use crate::monitor::phases::{due_phases, rook_report_due, Phase};
use crate::monitor::rooks::{render_report, RookEntry};
use crate::monitor::{messages, EscalationConfig};
use crate::notifier::Notifier;

/// Messages handed to the notifier by one phase of one group.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub group_messages: usize,
    pub direct_messages: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RookReport {
    pub entries: Vec<RookEntry>,
    /// `group/user` pairs whose activity could not be fetched this time.
    pub unknown: Vec<String>,
    pub delivered: bool,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct TickSummary {
    pub groups_evaluated: usize,
    pub groups_skipped: usize,
    pub warnings_sent: usize,
    pub summaries_sent: usize,
    pub direct_messages_sent: usize,
    pub failures: usize,
    pub rook_report: Option<RookReport>,
}

impl TickSummary {
    fn record(&mut self, phase: Phase, delivery: Delivery) {
        match phase {
            Phase::Warning => self.warnings_sent += delivery.group_messages,
            Phase::Summary | Phase::Reminder { .. } => {
                self.summaries_sent += delivery.group_messages
            }
        }
        self.direct_messages_sent += delivery.direct_messages;
        self.failures += delivery.failed;
    }
}

pub struct EscalationEngine {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    activity: Arc<dyn ActivitySource>,
    clock: Arc<dyn Clock>,
    compliance: ComplianceEvaluator,
    resolver: PeriodResolver,
    config: EscalationConfig,
}

impl EscalationEngine {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        activity: Arc<dyn ActivitySource>,
        clock: Arc<dyn Clock>,
        config: EscalationConfig,
    ) -> Self {
        Self {
            compliance: ComplianceEvaluator::new(store.clone()),
            resolver: PeriodResolver::new(config.utc_offset),
            store,
            notifier,
            activity,
            clock,
            config,
        }
    }

    /// Tick forever, first on the next whole minute, until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let minutes = u64::try_from(self.config.tick_interval_minutes.max(1)).unwrap_or(1);
        let period = Duration::from_secs(minutes * 60);
        let into_minute =
            u64::try_from(self.clock.now().timestamp_millis().rem_euclid(60_000)).unwrap_or(0);
        let first = tokio::time::Instant::now() + Duration::from_millis(60_000 - into_minute);

        let mut interval = tokio::time::interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Escalation engine ticking every {} minute(s)", minutes);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Escalation engine stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One pass over every group. Never fails; problems end up in the summary and the log.
    pub async fn tick(&self) -> TickSummary {
        let now = self.clock.now();
        let mut summary = TickSummary::default();

        match self.store.all_groups().await {
            Ok(groups) => {
                for group in &groups {
                    self.process_group(group, now, &mut summary).await;
                }
            }
            Err(e) => {
                error!("Could not list groups, skipping this tick: {}", e);
                summary.failures += 1;
            }
        }

        let report_at = self.config.rook_report_time.minutes_since_midnight();
        if rook_report_due(
            self.resolver.minutes_since_local_midnight(now),
            report_at,
            self.config.tick_interval_minutes,
        ) {
            match self.reveal_rooks(now).await {
                Ok(report) => summary.rook_report = Some(report),
                Err(e) => {
                    error!("Rook report failed: {}", e);
                    summary.failures += 1;
                }
            }
        }

        info!(
            "Tick done: {} groups evaluated, {} skipped, {} warnings, {} summaries, {} direct messages, {} failures",
            summary.groups_evaluated,
            summary.groups_skipped,
            summary.warnings_sent,
            summary.summaries_sent,
            summary.direct_messages_sent,
            summary.failures
        );
        summary
    }

    async fn process_group(&self, group: &Group, now: DateTime<Utc>, summary: &mut TickSummary) {
        let resolved = (group.deadline, self.resolver.resolve(group.deadline, now));
        let (Some(deadline), Some(today)) = resolved else {
            debug!("Group {} has no deadline, not monitored", group.group_id);
            summary.groups_skipped += 1;
            return;
        };
        summary.groups_evaluated += 1;

        let window = self.resolver.deadline_window(deadline, now);
        if window.period != today {
            debug!(
                "Group {}: timing phases against the deadline at {}",
                group.group_id, window.deadline_at
            );
        }
        let (period, minutes_until) = (window.period, window.minutes_until);
        for phase in due_phases(minutes_until, &self.config) {
            debug!("Group {}: {:?} due ({} minutes to deadline)", group.group_id, phase, minutes_until);
            let outcome = match phase {
                Phase::Warning => self.send_warning(group, &period, minutes_until).await,
                Phase::Summary => self.send_summary(group, &period).await,
                Phase::Reminder { repeat } => self.send_reminders(group, &period, repeat).await,
            };

            match outcome {
                Ok(delivery) => summary.record(phase, delivery),
                Err(e) => {
                    warn!("Group {}: {:?} skipped: {}", group.group_id, phase, e);
                    summary.failures += 1;
                }
            }
        }
    }

    /// Phase A. Silent when everybody has reported.
    pub async fn send_warning(&self, group: &Group, period: &Period, minutes_until: i64) -> Result<Delivery> {
        let non_reporters = self.compliance.non_reporters(&group.group_id, period).await?;
        let mut delivery = Delivery::default();
        if non_reporters.is_empty() {
            return Ok(delivery);
        }

        let text = messages::warning(&non_reporters, minutes_until);
        match self.notifier.send_group_message(&group.group_id, &text).await {
            Ok(()) => delivery.group_messages += 1,
            Err(e) => {
                warn!("Warning to group {} not delivered: {}", group.group_id, e);
                delivery.failed += 1;
            }
        }
        Ok(delivery)
    }

    /// Phase B. Congratulates the group, or messages each non-reporter directly.
    pub async fn send_summary(&self, group: &Group, period: &Period) -> Result<Delivery> {
        let non_reporters = self.compliance.non_reporters(&group.group_id, period).await?;
        if non_reporters.is_empty() {
            let mut delivery = Delivery::default();
            match self
                .notifier
                .send_group_message(&group.group_id, &messages::all_reported())
                .await
            {
                Ok(()) => delivery.group_messages += 1,
                Err(e) => {
                    warn!("Summary to group {} not delivered: {}", group.group_id, e);
                    delivery.failed += 1;
                }
            }
            return Ok(delivery);
        }

        Ok(self
            .message_each(&non_reporters, messages::missed_deadline)
            .await)
    }

    /// Phase C. Only members still missing a report right now are reminded.
    pub async fn send_reminders(&self, group: &Group, period: &Period, repeat: u32) -> Result<Delivery> {
        let non_reporters = self.compliance.non_reporters(&group.group_id, period).await?;
        let max = self.config.reminder_repeats_max;
        Ok(self
            .message_each(&non_reporters, |member| messages::reminder(member, repeat, max))
            .await)
    }

    async fn message_each<F>(&self, members: &[Member], render: F) -> Delivery
    where
        F: Fn(&Member) -> String,
    {
        let mut delivery = Delivery::default();
        for member in members {
            match self
                .notifier
                .send_direct_message(&member.user_id, &render(member))
                .await
            {
                Ok(()) => delivery.direct_messages += 1,
                Err(e) => {
                    warn!(
                        "Direct message to {} ({}) not delivered: {}",
                        member.user_id, member.group_id, e
                    );
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }

    /// Phase D. Judge yesterday's non-reporters of every monitored group
    /// against their collector activity and send one report to the operator channel.
    pub async fn reveal_rooks(&self, now: DateTime<Utc>) -> Result<RookReport> {
        let period = self.resolver.previous_period(now);
        let (from, to) = self.resolver.date_range(&period);

        let mut candidates = Vec::new();
        for group in self.store.all_groups().await? {
            if group.deadline.is_none() {
                continue;
            }
            match self.compliance.non_reporters(&group.group_id, &period).await {
                Ok(members) => candidates.extend(members),
                Err(e) => warn!("Rook check skipped group {}: {}", group.group_id, e),
            }
        }

        let timeout = self.config.collector_timeout;
        let fetched: Vec<(Member, Result<_>)> = stream::iter(candidates)
            .map(|member| async move {
                let fetch = self.activity.fetch_activity(&member, from, to);
                let result = match tokio::time::timeout(timeout, fetch).await {
                    Ok(result) => result,
                    Err(_) => Err(MonitorError::CollectorUnavailable(format!(
                        "no answer within {:?}",
                        timeout
                    ))),
                };
                (member, result)
            })
            .buffered(self.config.collector_concurrency.max(1))
            .collect()
            .await;

        let mut report = RookReport::default();
        for (member, result) in fetched {
            match result {
                Ok(snapshot) => report.entries.push(RookEntry::new(
                    member,
                    snapshot,
                    self.config.worklog_sufficient_seconds,
                )),
                Err(e) => {
                    warn!(
                        "Activity for {} in {} unknown: {}",
                        member.user_id, member.group_id, e
                    );
                    report
                        .unknown
                        .push(format!("{}/{}", member.group_id, member.user_id));
                }
            }
        }

        if report.entries.is_empty() {
            info!("Rook report for {} has nobody to flag", from);
            return Ok(report);
        }

        let text = render_report(&report.entries);
        match self
            .notifier
            .send_group_message(&self.config.operator_channel, &text)
            .await
        {
            Ok(()) => {
                info!("Rook report for {} sent with {} entries", from, report.entries.len());
                report.delivered = true;
            }
            Err(e) => error!("Rook report for {} not delivered: {}", from, e),
        }
        Ok(report)
    }
}
