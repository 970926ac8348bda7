use std::sync::Arc;

use crate::database::models::Member;
use crate::database::Store;
use crate::error::Result;
use crate::monitor::period::Period;

/// Answers "who has not reported yet" straight from the store, never cached.
///
/// Only a report's creation time decides which period it counts for.
#[derive(Clone)]
pub struct ComplianceEvaluator {
    store: Arc<dyn Store>,
}

impl ComplianceEvaluator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Members of `group_id` without a report in `period`, in registration order.
    pub async fn non_reporters(&self, group_id: &str, period: &Period) -> Result<Vec<Member>> {
        self.store
            .non_reporting_members(group_id, period.start, period.end)
            .await
    }

    pub async fn is_non_reporter(&self, member: &Member, period: &Period) -> Result<bool> {
        let reports = self
            .store
            .list_reports_in_period(&member.user_id, &member.group_id, period.start, period.end)
            .await?;
        Ok(reports.is_empty())
    }
}
