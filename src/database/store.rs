//! Storage contract the monitor depends on.
//!
//! Every period query is half-open: a report counts for `[from, to)` when
//! `from <= created_at < to`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::models::*;
use crate::error::Result;

#[async_trait]
pub trait Store: Send + Sync {
    /// Every group that has members or a deadline.
    async fn all_groups(&self) -> Result<Vec<Group>>;

    /// Members of one group in registration order.
    async fn list_members(&self, group_id: &str) -> Result<Vec<Member>>;

    async fn list_all_members(&self) -> Result<Vec<Member>>;

    async fn create_member(&self, member: NewMember) -> Result<Member>;

    /// Removing a member that is not registered is not an error.
    async fn delete_member(&self, name: &str, group_id: &str) -> Result<()>;

    async fn find_member(&self, user_id: &str, group_id: &str) -> Result<Member>;

    async fn is_admin(&self, user_id: &str, group_id: &str) -> Result<bool>;

    /// `NotFound` when the group has no deadline.
    async fn get_deadline(&self, group_id: &str) -> Result<Deadline>;

    async fn set_deadline(&self, group_id: &str, group_name: &str, deadline: Deadline) -> Result<()>;

    async fn delete_deadline(&self, group_id: &str) -> Result<()>;

    async fn create_report(&self, report: NewReport) -> Result<Report>;

    async fn find_report_by_message_ref(&self, message_ref: &str) -> Result<Report>;

    /// Replace a report's text, keeping the old text in the edit history.
    async fn update_report(
        &self,
        message_ref: &str,
        content: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<Report>;

    async fn list_report_edits(&self, report_id: i64) -> Result<Vec<ReportEdit>>;

    async fn delete_report(&self, id: i64) -> Result<()>;

    async fn list_reports_in_period(
        &self,
        user_id: &str,
        group_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Report>>;

    async fn list_group_reports_in_period(
        &self,
        group_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Report>>;

    /// Members of the group with no report created in `[from, to)`, registration order.
    async fn non_reporting_members(
        &self,
        group_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Member>>;
}
