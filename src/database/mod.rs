pub mod models;
pub mod queries;
pub mod schema;
pub mod store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{MonitorError, Result};
use models::*;
use queries::{to_millis, Queries};
pub use store::Store;

/// SQLite-backed [`Store`].
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| MonitorError::ConfigError(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Database { pool })
    }

    /// Single-connection in-memory database with the schema applied.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let database = Database { pool };
        database.run_migrations().await?;
        Ok(database)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(schema::INITIAL_SCHEMA)
            .execute(&self.pool)
            .await?;
        info!("Database schema is up to date");
        Ok(())
    }
}

/// Duplicate keys are caller mistakes, not outages.
fn reject_duplicate(err: sqlx::Error, what: &str) -> MonitorError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            MonitorError::ValidationError(format!("{} already exists", what))
        }
        _ => err.into(),
    }
}

#[async_trait]
impl Store for Database {
    async fn all_groups(&self) -> Result<Vec<Group>> {
        Queries::all_groups(&self.pool).await
    }

    async fn list_members(&self, group_id: &str) -> Result<Vec<Member>> {
        Queries::members_by_group(&self.pool, group_id).await
    }

    async fn list_all_members(&self) -> Result<Vec<Member>> {
        Queries::all_members(&self.pool).await
    }

    async fn create_member(&self, member: NewMember) -> Result<Member> {
        member.validate()?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO groups (group_id, name)
            VALUES (?, ?)
            ON CONFLICT (group_id) DO NOTHING
            "#,
        )
        .bind(&member.group_id)
        .bind(&member.group_name)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO members (user_id, name, group_id, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&member.user_id)
        .bind(&member.name)
        .bind(&member.group_id)
        .bind(member.role.as_str())
        .bind(to_millis(member.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            reject_duplicate(
                e,
                &format!("member {} in group {}", member.user_id, member.group_id),
            )
        })?;

        tx.commit().await?;

        let id = result.last_insert_rowid();
        debug!("Registered member {} in group {}", member.user_id, member.group_id);
        Queries::member_by_id(&self.pool, id).await
    }

    async fn delete_member(&self, name: &str, group_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM members WHERE name = ? AND group_id = ?")
            .bind(name)
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_member(&self, user_id: &str, group_id: &str) -> Result<Member> {
        Queries::member_in_group(&self.pool, user_id, group_id)
            .await?
            .ok_or_else(|| {
                MonitorError::NotFound(format!("member {} in group {}", user_id, group_id))
            })
    }

    async fn is_admin(&self, user_id: &str, group_id: &str) -> Result<bool> {
        Ok(Queries::member_in_group(&self.pool, user_id, group_id)
            .await?
            .map(|member| member.is_admin())
            .unwrap_or(false))
    }

    async fn get_deadline(&self, group_id: &str) -> Result<Deadline> {
        Queries::deadline(&self.pool, group_id)
            .await?
            .ok_or_else(|| MonitorError::NotFound(format!("deadline for group {}", group_id)))
    }

    async fn set_deadline(&self, group_id: &str, group_name: &str, deadline: Deadline) -> Result<()> {
        if group_id.trim().is_empty() {
            return Err(MonitorError::empty_field("group_id"));
        }

        sqlx::query(
            r#"
            INSERT INTO groups (group_id, name, deadline)
            VALUES (?, ?, ?)
            ON CONFLICT (group_id) DO UPDATE SET
                name = excluded.name,
                deadline = excluded.deadline
            "#,
        )
        .bind(group_id)
        .bind(group_name)
        .bind(deadline.to_string())
        .execute(&self.pool)
        .await?;

        info!("Deadline for group {} set to {}", group_id, deadline);
        Ok(())
    }

    async fn delete_deadline(&self, group_id: &str) -> Result<()> {
        sqlx::query("UPDATE groups SET deadline = NULL WHERE group_id = ?")
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        info!("Deadline for group {} removed", group_id);
        Ok(())
    }

    async fn create_report(&self, report: NewReport) -> Result<Report> {
        report.validate()?;

        let created_at = to_millis(report.created_at);
        let result = sqlx::query(
            r#"
            INSERT INTO reports (user_id, group_id, content, message_ref, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.user_id)
        .bind(&report.group_id)
        .bind(&report.content)
        .bind(&report.message_ref)
        .bind(created_at)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| reject_duplicate(e, &format!("report {}", report.message_ref)))?;

        Queries::report_by_id(&self.pool, result.last_insert_rowid()).await
    }

    async fn find_report_by_message_ref(&self, message_ref: &str) -> Result<Report> {
        Queries::report_by_message_ref(&self.pool, message_ref)
            .await?
            .ok_or_else(|| MonitorError::NotFound(format!("report {}", message_ref)))
    }

    async fn update_report(
        &self,
        message_ref: &str,
        content: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<Report> {
        if content.trim().is_empty() {
            return Err(MonitorError::empty_field("content"));
        }

        let existing = self.find_report_by_message_ref(message_ref).await?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO report_edits (report_id, previous_content, edited_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(existing.id)
        .bind(&existing.content)
        .bind(to_millis(modified_at))
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE reports SET content = ?, modified_at = ? WHERE id = ?")
            .bind(content)
            .bind(to_millis(modified_at))
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Queries::report_by_id(&self.pool, existing.id).await
    }

    async fn list_report_edits(&self, report_id: i64) -> Result<Vec<ReportEdit>> {
        Queries::report_edits(&self.pool, report_id).await
    }

    async fn delete_report(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM report_edits WHERE report_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_reports_in_period(
        &self,
        user_id: &str,
        group_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Report>> {
        Queries::reports_for_member(&self.pool, user_id, group_id, from, to).await
    }

    async fn list_group_reports_in_period(
        &self,
        group_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Report>> {
        Queries::reports_for_group(&self.pool, group_id, from, to).await
    }

    async fn non_reporting_members(
        &self,
        group_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Member>> {
        Queries::non_reporting_members(&self.pool, group_id, from, to).await
    }
}
