use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::database::models::*;
use crate::error::{MonitorError, Result};

const MEMBER_COLUMNS: &str = "m.id, m.user_id, m.name, m.group_id, m.role, m.created_at";
const REPORT_COLUMNS: &str = "id, user_id, group_id, content, message_ref, created_at, modified_at";

pub struct Queries;

impl Queries {
    pub async fn all_groups(pool: &SqlitePool) -> Result<Vec<Group>> {
        let rows = sqlx::query("SELECT group_id, name, deadline FROM groups ORDER BY rowid")
            .fetch_all(pool)
            .await?;

        rows.iter().map(group_from_row).collect()
    }

    pub async fn members_by_group(pool: &SqlitePool, group_id: &str) -> Result<Vec<Member>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM members m WHERE m.group_id = ? ORDER BY m.id",
            MEMBER_COLUMNS
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        rows.iter().map(member_from_row).collect()
    }

    pub async fn all_members(pool: &SqlitePool) -> Result<Vec<Member>> {
        let rows = sqlx::query(&format!("SELECT {} FROM members m ORDER BY m.id", MEMBER_COLUMNS))
            .fetch_all(pool)
            .await?;

        rows.iter().map(member_from_row).collect()
    }

    pub async fn member_by_id(pool: &SqlitePool, id: i64) -> Result<Member> {
        let row = sqlx::query(&format!("SELECT {} FROM members m WHERE m.id = ?", MEMBER_COLUMNS))
            .bind(id)
            .fetch_one(pool)
            .await?;

        member_from_row(&row)
    }

    pub async fn member_in_group(
        pool: &SqlitePool,
        user_id: &str,
        group_id: &str,
    ) -> Result<Option<Member>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM members m WHERE m.user_id = ? AND m.group_id = ?",
            MEMBER_COLUMNS
        ))
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(pool)
        .await?;

        row.as_ref().map(member_from_row).transpose()
    }

    pub async fn deadline(pool: &SqlitePool, group_id: &str) -> Result<Option<Deadline>> {
        let row = sqlx::query("SELECT deadline FROM groups WHERE group_id = ?")
            .bind(group_id)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => {
                let raw: Option<String> = row.try_get("deadline")?;
                raw.map(|value| parse_stored_deadline(&value)).transpose()
            }
            None => Ok(None),
        }
    }

    pub async fn report_by_id(pool: &SqlitePool, id: i64) -> Result<Report> {
        let row = sqlx::query(&format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS))
            .bind(id)
            .fetch_one(pool)
            .await?;

        report_from_row(&row)
    }

    pub async fn report_by_message_ref(pool: &SqlitePool, message_ref: &str) -> Result<Option<Report>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reports WHERE message_ref = ?",
            REPORT_COLUMNS
        ))
        .bind(message_ref)
        .fetch_optional(pool)
        .await?;

        row.as_ref().map(report_from_row).transpose()
    }

    pub async fn reports_for_member(
        pool: &SqlitePool,
        user_id: &str,
        group_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM reports
            WHERE user_id = ? AND group_id = ? AND created_at >= ? AND created_at < ?
            ORDER BY created_at, id
            "#,
            REPORT_COLUMNS
        ))
        .bind(user_id)
        .bind(group_id)
        .bind(to_millis(from))
        .bind(to_millis(to))
        .fetch_all(pool)
        .await?;

        rows.iter().map(report_from_row).collect()
    }

    pub async fn reports_for_group(
        pool: &SqlitePool,
        group_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM reports
            WHERE group_id = ? AND created_at >= ? AND created_at < ?
            ORDER BY created_at, id
            "#,
            REPORT_COLUMNS
        ))
        .bind(group_id)
        .bind(to_millis(from))
        .bind(to_millis(to))
        .fetch_all(pool)
        .await?;

        rows.iter().map(report_from_row).collect()
    }

    pub async fn non_reporting_members(
        pool: &SqlitePool,
        group_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Member>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM members m
            WHERE m.group_id = ?
              AND NOT EXISTS (
                SELECT 1 FROM reports r
                WHERE r.user_id = m.user_id
                  AND r.group_id = m.group_id
                  AND r.created_at >= ?
                  AND r.created_at < ?
              )
            ORDER BY m.id
            "#,
            MEMBER_COLUMNS
        ))
        .bind(group_id)
        .bind(to_millis(from))
        .bind(to_millis(to))
        .fetch_all(pool)
        .await?;

        rows.iter().map(member_from_row).collect()
    }

    pub async fn report_edits(pool: &SqlitePool, report_id: i64) -> Result<Vec<ReportEdit>> {
        let rows = sqlx::query(
            r#"
            SELECT id, report_id, previous_content, edited_at
            FROM report_edits
            WHERE report_id = ?
            ORDER BY id
            "#,
        )
        .bind(report_id)
        .fetch_all(pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ReportEdit> {
                Ok(ReportEdit {
                    id: row.try_get("id")?,
                    report_id: row.try_get("report_id")?,
                    previous_content: row.try_get("previous_content")?,
                    edited_at: from_millis(row.try_get("edited_at")?)?,
                })
            })
            .collect()
    }
}

pub(crate) fn to_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| MonitorError::TransientIo(format!("stored timestamp out of range: {}", millis)))
}

fn parse_stored_deadline(value: &str) -> Result<Deadline> {
    value
        .parse()
        .map_err(|e| MonitorError::TransientIo(format!("corrupt deadline {:?}: {}", value, e)))
}

fn group_from_row(row: &SqliteRow) -> Result<Group> {
    let deadline: Option<String> = row.try_get("deadline")?;
    Ok(Group {
        group_id: row.try_get("group_id")?,
        name: row.try_get("name")?,
        deadline: deadline.map(|value| parse_stored_deadline(&value)).transpose()?,
    })
}

fn member_from_row(row: &SqliteRow) -> Result<Member> {
    let role: String = row.try_get("role")?;
    Ok(Member {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        group_id: row.try_get("group_id")?,
        role: role
            .parse()
            .map_err(|e| MonitorError::TransientIo(format!("corrupt member role: {}", e)))?,
        created_at: from_millis(row.try_get("created_at")?)?,
    })
}

fn report_from_row(row: &SqliteRow) -> Result<Report> {
    Ok(Report {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        group_id: row.try_get("group_id")?,
        content: row.try_get("content")?,
        message_ref: row.try_get("message_ref")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        modified_at: from_millis(row.try_get("modified_at")?)?,
    })
}
