//! Rook classification: a non-reporter judged against their collector activity.

use serde::Serialize;

use crate::collector::ActivitySnapshot;
use crate::database::models::Member;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RookVerdict {
    EnoughWorklogsEnoughCommits,
    NotEnoughWorklogsEnoughCommits,
    NoActivity,
    NotEnoughWorklogsNoCommits,
}

/// Total over every snapshot: commits decide the first split, worklogs the second.
pub fn classify(snapshot: &ActivitySnapshot, worklog_sufficient_seconds: i64) -> RookVerdict {
    if snapshot.commit_count > 0 {
        if snapshot.worked_seconds > worklog_sufficient_seconds {
            RookVerdict::EnoughWorklogsEnoughCommits
        } else {
            RookVerdict::NotEnoughWorklogsEnoughCommits
        }
    } else if snapshot.worked_seconds <= 0 {
        RookVerdict::NoActivity
    } else {
        RookVerdict::NotEnoughWorklogsNoCommits
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RookEntry {
    pub member: Member,
    pub snapshot: ActivitySnapshot,
    pub verdict: RookVerdict,
}

impl RookEntry {
    pub fn new(member: Member, snapshot: ActivitySnapshot, worklog_sufficient_seconds: i64) -> Self {
        let verdict = classify(&snapshot, worklog_sufficient_seconds);
        Self {
            member,
            snapshot,
            verdict,
        }
    }

    pub fn render(&self) -> String {
        let hours = self.snapshot.worked_hours();
        let commits = self.snapshot.commit_count;
        let detail = match self.verdict {
            RookVerdict::EnoughWorklogsEnoughCommits => {
                format!("Has enough worklogs: {}, enough commits: {}", hours, commits)
            }
            RookVerdict::NotEnoughWorklogsEnoughCommits => {
                format!("Not enough worklogs: {}, enough commits: {}", hours, commits)
            }
            RookVerdict::NoActivity => format!("Not enough worklogs: {}, no commits at all", hours),
            RookVerdict::NotEnoughWorklogsNoCommits => {
                format!("Not enough worklogs: {}, no commits", hours)
            }
        };
        format!(
            "<@{}> is a rook in <#{}>! ({}, and did not write standup!!!)",
            self.member.user_id, self.member.group_id, detail
        )
    }
}

/// One line per entry, each newline-terminated.
pub fn render_report(entries: &[RookEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}\n", entry.render()))
        .collect()
}
