use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MonitorError;

/// Local time of day, minute resolution, by which a group's standups are due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Deadline(NaiveTime);

impl Deadline {
    pub fn new(hour: u32, minute: u32) -> Result<Self, MonitorError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| {
                MonitorError::ValidationError(format!("invalid deadline {}:{:02}", hour, minute))
            })
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn minutes_since_midnight(&self) -> i64 {
        i64::from(self.0.hour() * 60 + self.0.minute())
    }
}

impl FromStr for Deadline {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| {
            MonitorError::ValidationError(format!("invalid deadline {:?}: {}", s, e))
        })?;
        Ok(Self(time))
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: String,
    pub name: String,
    /// `None` disables monitoring for the group.
    pub deadline: Option<Deadline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" | "" => Ok(Role::User),
            other => Err(MonitorError::ValidationError(format!("unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub group_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub user_id: String,
    pub name: String,
    pub group_id: String,
    pub group_name: String,
    pub role: Role,
    /// Registration time, supplied by the caller's clock.
    pub created_at: DateTime<Utc>,
}

impl NewMember {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.user_id.trim().is_empty() {
            return Err(MonitorError::empty_field("user_id"));
        }
        if self.name.trim().is_empty() {
            return Err(MonitorError::empty_field("name"));
        }
        if self.group_id.trim().is_empty() {
            return Err(MonitorError::empty_field("group_id"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub user_id: String,
    pub group_id: String,
    pub content: String,
    /// External message reference, unique across reports.
    pub message_ref: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: String,
    pub group_id: String,
    pub content: String,
    pub message_ref: String,
    pub created_at: DateTime<Utc>,
}

impl NewReport {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.user_id.trim().is_empty() {
            return Err(MonitorError::empty_field("user_id"));
        }
        if self.group_id.trim().is_empty() {
            return Err(MonitorError::empty_field("group_id"));
        }
        if self.content.trim().is_empty() {
            return Err(MonitorError::empty_field("content"));
        }
        if self.message_ref.trim().is_empty() {
            return Err(MonitorError::empty_field("message_ref"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEdit {
    pub id: i64,
    pub report_id: i64,
    pub previous_content: String,
    pub edited_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_parses_hours_and_minutes() {
        let deadline: Deadline = "10:00".parse().unwrap();
        assert_eq!(deadline, Deadline::new(10, 0).unwrap());
        assert_eq!(deadline.to_string(), "10:00");
        assert_eq!(deadline.minutes_since_midnight(), 600);

        let early: Deadline = "9:05".parse().unwrap();
        assert_eq!(early.to_string(), "09:05");
    }

    #[test]
    fn deadline_rejects_garbage() {
        assert!("24:00".parse::<Deadline>().is_err());
        assert!("noon".parse::<Deadline>().is_err());
        assert!(Deadline::new(12, 60).is_err());
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!(Role::Admin.as_str(), "admin");
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn new_report_requires_content_and_reference() {
        let report = NewReport {
            user_id: "userID1".to_string(),
            group_id: "QWERTY123".to_string(),
            content: String::new(),
            message_ref: String::new(),
            created_at: Utc::now(),
        };
        assert!(matches!(report.validate(), Err(MonitorError::ValidationError(_))));
    }
}
