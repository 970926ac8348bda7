pub mod loader;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::database::models::Deadline;
use crate::error::MonitorError;
use crate::monitor::EscalationConfig;

/// Process-wide settings, built once in `main` and handed to each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_http_bind_addr")]
    pub http_bind_addr: String,
    #[serde(default = "default_chat_api_url")]
    pub chat_api_url: String,
    pub chat_token: String,
    pub operator_channel: String,
    pub collector_url: String,
    pub collector_token: String,
    #[serde(default = "default_collector_timeout_secs")]
    pub collector_timeout_secs: u64,
    #[serde(default = "default_collector_concurrency")]
    pub collector_concurrency: usize,
    #[serde(default = "default_tick_interval_minutes")]
    pub tick_interval_minutes: i64,
    #[serde(default = "default_warning_lead_minutes")]
    pub warning_lead_minutes: i64,
    #[serde(default = "default_reminder_interval_minutes")]
    pub reminder_interval_minutes: i64,
    #[serde(default = "default_reminder_repeats_max")]
    pub reminder_repeats_max: u32,
    #[serde(default = "default_worklog_sufficient_seconds")]
    pub worklog_sufficient_seconds: i64,
    #[serde(default = "default_rook_report_time")]
    pub rook_report_time: String,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_database_url() -> String {
    "sqlite://standup.db".to_string()
}

fn default_http_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_chat_api_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_collector_timeout_secs() -> u64 {
    10
}

fn default_collector_concurrency() -> usize {
    4
}

fn default_tick_interval_minutes() -> i64 {
    1
}

fn default_warning_lead_minutes() -> i64 {
    10
}

fn default_reminder_interval_minutes() -> i64 {
    5
}

fn default_reminder_repeats_max() -> u32 {
    5
}

fn default_worklog_sufficient_seconds() -> i64 {
    8 * 3600
}

fn default_rook_report_time() -> String {
    "13:05".to_string()
}

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

impl AppConfig {
    /// Check value ranges that serde alone cannot express.
    pub fn validate(&self) -> Result<(), MonitorError> {
        for (key, value) in [
            ("chat_token", &self.chat_token),
            ("operator_channel", &self.operator_channel),
            ("collector_url", &self.collector_url),
            ("collector_token", &self.collector_token),
        ] {
            if value.trim().is_empty() {
                return Err(MonitorError::ConfigError(format!("{} must be set", key)));
            }
        }

        if self.tick_interval_minutes < 1 {
            return Err(MonitorError::ConfigError(format!(
                "tick_interval_minutes ({}) must be at least 1",
                self.tick_interval_minutes
            )));
        }

        if self.reminder_interval_minutes < 1 {
            return Err(MonitorError::ConfigError(format!(
                "reminder_interval_minutes ({}) must be at least 1",
                self.reminder_interval_minutes
            )));
        }

        if self.warning_lead_minutes < 0 {
            return Err(MonitorError::ConfigError(format!(
                "warning_lead_minutes ({}) cannot be negative",
                self.warning_lead_minutes
            )));
        }

        // Each phase window must be at least one tick wide.
        if self.tick_interval_minutes > self.warning_lead_minutes + 1 {
            return Err(MonitorError::ConfigError(format!(
                "tick_interval_minutes ({}) exceeds warning_lead_minutes + 1 ({}); the warning could never fire",
                self.tick_interval_minutes,
                self.warning_lead_minutes + 1
            )));
        }

        if self.reminder_interval_minutes < self.tick_interval_minutes {
            return Err(MonitorError::ConfigError(format!(
                "reminder_interval_minutes ({}) is shorter than tick_interval_minutes ({}); reminders would be skipped",
                self.reminder_interval_minutes, self.tick_interval_minutes
            )));
        }

        if self.worklog_sufficient_seconds < 0 {
            return Err(MonitorError::ConfigError(format!(
                "worklog_sufficient_seconds ({}) cannot be negative",
                self.worklog_sufficient_seconds
            )));
        }

        if self.collector_concurrency == 0 {
            return Err(MonitorError::ConfigError(
                "collector_concurrency must be at least 1".to_string(),
            ));
        }

        if self.collector_timeout_secs == 0 {
            return Err(MonitorError::ConfigError(
                "collector_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(MonitorError::ConfigError(format!(
                "utc_offset_minutes ({}) is outside +/-{}",
                self.utc_offset_minutes, MAX_OFFSET_MINUTES
            )));
        }

        self.rook_report_time
            .parse::<Deadline>()
            .map_err(|e| MonitorError::ConfigError(format!("rook_report_time: {}", e)))?;

        Ok(())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, MonitorError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            MonitorError::ConfigError(format!(
                "utc_offset_minutes ({}) is not a valid offset",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs)
    }

    /// Derive the engine settings.
    pub fn escalation(&self) -> Result<EscalationConfig, MonitorError> {
        let rook_report_time = self
            .rook_report_time
            .parse::<Deadline>()
            .map_err(|e| MonitorError::ConfigError(format!("rook_report_time: {}", e)))?;

        Ok(EscalationConfig {
            tick_interval_minutes: self.tick_interval_minutes,
            warning_lead_minutes: self.warning_lead_minutes,
            reminder_interval_minutes: self.reminder_interval_minutes,
            reminder_repeats_max: self.reminder_repeats_max,
            worklog_sufficient_seconds: self.worklog_sufficient_seconds,
            rook_report_time,
            operator_channel: self.operator_channel.clone(),
            utc_offset: self.utc_offset()?,
            collector_timeout: self.collector_timeout(),
            collector_concurrency: self.collector_concurrency,
        })
    }
}
