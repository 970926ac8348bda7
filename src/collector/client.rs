//! Collector Client
//!
//! Read-only access to the activity collector, which aggregates commits,
//! merges and logged work time per member or per group over a date range.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{ActivitySnapshot, CollectorScope};
use super::ActivitySource;
use crate::database::models::Member;
use crate::error::{MonitorError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CollectorClient {
    base_url: String,
    token: String,
    http_client: Client,
}

impl CollectorClient {
    /// Every request made by this client is cut off after `timeout`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::ConfigError(format!("Failed to build collector client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch totals for `key` within the inclusive date range `[from, to]`.
    pub async fn fetch(
        &self,
        scope: CollectorScope,
        key: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ActivitySnapshot> {
        let url = format!(
            "{}/activity/{}/{}/{}/{}",
            self.base_url,
            scope,
            key,
            from.format(DATE_FORMAT),
            to.format(DATE_FORMAT)
        );
        debug!("Collector request: {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| unavailable(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Collector answered {} for {}", status, url);
            return Err(MonitorError::CollectorUnavailable(format!(
                "{} returned {}",
                url, status
            )));
        }

        response
            .json::<ActivitySnapshot>()
            .await
            .map_err(|e| unavailable(&url, e))
    }

    pub async fn fetch_member_activity(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ActivitySnapshot> {
        self.fetch(CollectorScope::Member, user_id, from, to).await
    }

    pub async fn fetch_group_activity(
        &self,
        group_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ActivitySnapshot> {
        self.fetch(CollectorScope::Group, group_id, from, to).await
    }

    pub async fn fetch_group_member_activity(
        &self,
        group_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ActivitySnapshot> {
        let key = format!("{}/{}", group_id, user_id);
        self.fetch(CollectorScope::GroupMember, &key, from, to).await
    }
}

fn unavailable(url: &str, err: reqwest::Error) -> MonitorError {
    if err.is_timeout() {
        MonitorError::CollectorUnavailable(format!("{} timed out", url))
    } else {
        MonitorError::CollectorUnavailable(format!("{}: {}", url, err))
    }
}

#[async_trait]
impl ActivitySource for CollectorClient {
    async fn fetch_activity(
        &self,
        member: &Member,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ActivitySnapshot> {
        self.fetch_member_activity(&member.user_id, from, to).await
    }
}
