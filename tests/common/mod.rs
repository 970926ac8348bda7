#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use standup_monitor::clock::FixedClock;
use standup_monitor::collector::{ActivitySnapshot, ActivitySource};
use standup_monitor::database::models::{Deadline, Member, NewMember, NewReport, Report, Role};
use standup_monitor::database::{Database, Store};
use standup_monitor::error::{MonitorError, Result};
use standup_monitor::monitor::{EscalationConfig, EscalationEngine};
use standup_monitor::notifier::Notifier;

pub const GROUP: &str = "QWERTY123";
pub const OPERATOR_CHANNEL: &str = "CGENERAL";

pub fn registered_at() -> DateTime<Utc> {
    utc(2018, 1, 1, 9, 0)
}

/// Setup an in-memory SQLite database for testing
pub async fn setup_test_db() -> Database {
    Database::new_in_memory().await.expect("Failed to create test database")
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

/// One-minute ticks, UTC, warnings 10 minutes ahead, reminders every 5 minutes up to 3 times.
pub fn escalation_config() -> EscalationConfig {
    EscalationConfig {
        tick_interval_minutes: 1,
        warning_lead_minutes: 10,
        reminder_interval_minutes: 5,
        reminder_repeats_max: 3,
        worklog_sufficient_seconds: 8 * 3600,
        rook_report_time: Deadline::new(13, 5).unwrap(),
        operator_channel: OPERATOR_CHANNEL.to_string(),
        utc_offset: FixedOffset::east_opt(0).unwrap(),
        collector_timeout: Duration::from_millis(200),
        collector_concurrency: 2,
    }
}

pub async fn add_member(db: &Database, user_id: &str, name: &str, group_id: &str) -> Member {
    db.create_member(NewMember {
        user_id: user_id.to_string(),
        name: name.to_string(),
        group_id: group_id.to_string(),
        group_name: format!("{}-name", group_id),
        role: Role::User,
        created_at: registered_at(),
    })
    .await
    .expect("Failed to create member")
}

pub async fn add_report(db: &Database, user_id: &str, group_id: &str, at: DateTime<Utc>) -> Report {
    db.create_report(NewReport {
        user_id: user_id.to_string(),
        group_id: group_id.to_string(),
        content: "yesterday: tests, today: more tests, blockers: none".to_string(),
        message_ref: format!("{}-{}-{}", group_id, user_id, at.timestamp_millis()),
        created_at: at,
    })
    .await
    .expect("Failed to create report")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Group { channel: String, text: String },
    Direct { user_id: String, text: String },
}

/// Notifier double that records every message and can be told to fail for a destination.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, destination: &str) {
        self.failing.lock().unwrap().insert(destination.to_string());
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn group_messages(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Group { channel, text } => Some((channel, text)),
                Sent::Direct { .. } => None,
            })
            .collect()
    }

    pub fn direct_messages(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Direct { user_id, text } => Some((user_id, text)),
                Sent::Group { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    fn check(&self, destination: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(destination) {
            return Err(MonitorError::DeliveryError(format!("{} unreachable", destination)));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_group_message(&self, group_id: &str, text: &str) -> Result<()> {
        self.check(group_id)?;
        self.sent.lock().unwrap().push(Sent::Group {
            channel: group_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<()> {
        self.check(user_id)?;
        self.sent.lock().unwrap().push(Sent::Direct {
            user_id: user_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Activity double: canned snapshots per user, optional delays, unknown users fail.
#[derive(Default)]
pub struct ScriptedActivity {
    snapshots: Mutex<HashMap<String, ActivitySnapshot>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl ScriptedActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user_id: &str, commits: i64, merges: i64, worked_seconds: i64) {
        self.snapshots.lock().unwrap().insert(
            user_id.to_string(),
            ActivitySnapshot {
                commit_count: commits,
                merge_count: merges,
                worked_seconds,
            },
        );
    }

    pub fn delay(&self, user_id: &str, by: Duration) {
        self.delays.lock().unwrap().insert(user_id.to_string(), by);
    }

    pub fn calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivitySource for ScriptedActivity {
    async fn fetch_activity(&self, member: &Member, from: NaiveDate, to: NaiveDate) -> Result<ActivitySnapshot> {
        self.calls
            .lock()
            .unwrap()
            .push((member.user_id.clone(), from, to));

        let delay = self.delays.lock().unwrap().get(&member.user_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let snapshot = self.snapshots.lock().unwrap().get(&member.user_id).copied();
        snapshot.ok_or_else(|| MonitorError::CollectorUnavailable(format!("no data for {}", member.user_id)))
    }
}

pub struct TestHarness {
    pub db: Database,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub activity: Arc<ScriptedActivity>,
    pub engine: EscalationEngine,
}

impl TestHarness {
    pub async fn new(now: DateTime<Utc>) -> Self {
        Self::with_config(now, escalation_config()).await
    }

    pub async fn with_config(now: DateTime<Utc>, config: EscalationConfig) -> Self {
        let db = setup_test_db().await;
        let clock = Arc::new(FixedClock::new(now));
        let notifier = Arc::new(RecordingNotifier::new());
        let activity = Arc::new(ScriptedActivity::new());
        let engine = EscalationEngine::new(
            Arc::new(db.clone()),
            notifier.clone(),
            activity.clone(),
            clock.clone(),
            config,
        );

        Self {
            db,
            clock,
            notifier,
            activity,
            engine,
        }
    }

    pub async fn set_deadline(&self, group_id: &str, hour: u32, minute: u32) {
        self.db
            .set_deadline(group_id, &format!("{}-name", group_id), Deadline::new(hour, minute).unwrap())
            .await
            .expect("Failed to set deadline");
    }
}
