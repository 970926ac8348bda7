//! Which escalation phase a tick owes a group.
//!
//! Ticks arrive every `tick_interval_minutes` (T). Each phase has a target
//! minute, and exactly one tick lands within T minutes of it, so a phase fires
//! once per day without any memory of earlier ticks.

use serde::Serialize;

use crate::monitor::EscalationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Phase A: the deadline is close; ping the group about who is missing.
    Warning,
    /// Phase B: the deadline just passed.
    Summary,
    /// Phase C: repeat number `repeat` (1-based) of the post-deadline reminders.
    Reminder { repeat: u32 },
}

/// Phases due for a group whose deadline is `minutes_until` minutes away.
pub fn due_phases(minutes_until: i64, config: &EscalationConfig) -> Vec<Phase> {
    let mut phases = Vec::new();

    if warning_due(minutes_until, config.warning_lead_minutes, config.tick_interval_minutes) {
        phases.push(Phase::Warning);
    }

    if summary_due(minutes_until, config.tick_interval_minutes) {
        phases.push(Phase::Summary);
    }

    if let Some(repeat) = reminder_due(
        -minutes_until,
        config.reminder_interval_minutes,
        config.reminder_repeats_max,
        config.tick_interval_minutes,
    ) {
        phases.push(Phase::Reminder { repeat });
    }

    phases
}

/// First tick inside `0 <= minutes_until <= lead`.
pub fn warning_due(minutes_until: i64, lead: i64, tick: i64) -> bool {
    (0..=lead).contains(&minutes_until) && minutes_until > lead - tick
}

pub fn summary_due(minutes_until: i64, tick: i64) -> bool {
    minutes_until <= 0 && minutes_until > -tick
}

/// Reminder `k` targets `k * interval` minutes past the deadline, for `k` in `1..=max`.
pub fn reminder_due(minutes_past: i64, interval: i64, max: u32, tick: i64) -> Option<u32> {
    if minutes_past <= 0 || interval <= 0 || max == 0 {
        return None;
    }

    let repeat = (minutes_past / interval).min(i64::from(max));
    if repeat >= 1 && minutes_past - repeat * interval < tick {
        u32::try_from(repeat).ok()
    } else {
        None
    }
}

/// The tick that lands within `tick` minutes after the configured time of day.
pub fn rook_report_due(minutes_since_midnight: i64, report_at: i64, tick: i64) -> bool {
    (minutes_since_midnight - report_at).rem_euclid(24 * 60) < tick
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Deadline;
    use chrono::FixedOffset;
    use std::time::Duration;

    fn config(tick: i64, lead: i64, interval: i64, max: u32) -> EscalationConfig {
        EscalationConfig {
            tick_interval_minutes: tick,
            warning_lead_minutes: lead,
            reminder_interval_minutes: interval,
            reminder_repeats_max: max,
            worklog_sufficient_seconds: 8 * 3600,
            rook_report_time: Deadline::new(13, 5).unwrap(),
            operator_channel: "CGENERAL".to_string(),
            utc_offset: FixedOffset::east_opt(0).unwrap(),
            collector_timeout: Duration::from_secs(1),
            collector_concurrency: 2,
        }
    }

    #[test]
    fn warning_fires_once_when_window_opens() {
        let fired: Vec<i64> = (-30..=30).filter(|m| warning_due(*m, 10, 1)).collect();
        assert_eq!(fired, vec![10]);

        // With a 3 minute cadence the first tick at or under the lead fires.
        let fired: Vec<i64> = (-30..=30).filter(|m| warning_due(*m, 10, 3)).collect();
        assert_eq!(fired, vec![8, 9, 10]);
        assert!(!warning_due(-1, 10, 3));
    }

    #[test]
    fn zero_lead_warns_at_the_deadline() {
        assert!(warning_due(0, 0, 1));
        assert!(!warning_due(1, 0, 1));
    }

    #[test]
    fn summary_fires_in_the_minute_after_deadline() {
        let fired: Vec<i64> = (-30..=30).filter(|m| summary_due(*m, 1)).collect();
        assert_eq!(fired, vec![0]);
        let fired: Vec<i64> = (-30..=30).filter(|m| summary_due(*m, 5)).collect();
        assert_eq!(fired, vec![-4, -3, -2, -1, 0]);
    }

    #[test]
    fn reminders_follow_interval_and_stop_at_max() {
        let fired: Vec<(i64, u32)> = (0..=60)
            .filter_map(|past| reminder_due(past, 5, 3, 1).map(|k| (past, k)))
            .collect();
        assert_eq!(fired, vec![(5, 1), (10, 2), (15, 3)]);
    }

    #[test]
    fn reminders_with_coarse_ticks_still_fire_once_each() {
        // Ticks every 2 minutes starting one minute past the deadline.
        let fired: Vec<u32> = (0..30)
            .map(|i| 1 + 2 * i)
            .filter_map(|past| reminder_due(past, 5, 4, 2))
            .collect();
        assert_eq!(fired, vec![1, 2, 3, 4]);
    }

    #[test]
    fn accepted_cadences_never_miss_a_phase() {
        for tick in 1..=6 {
            for lead in (tick - 1)..=12 {
                for interval in tick..=8 {
                    for start in 0..tick {
                        // Minutes until the deadline seen by successive ticks.
                        let ticks: Vec<i64> = (0..200).map(|i| 40 + start - i * tick).collect();
                        let warnings = ticks.iter().filter(|m| warning_due(**m, lead, tick)).count();
                        let summaries = ticks.iter().filter(|m| summary_due(**m, tick)).count();
                        let repeats: Vec<u32> = ticks
                            .iter()
                            .filter_map(|m| reminder_due(-m, interval, 3, tick))
                            .collect();
                        assert_eq!(warnings, 1, "tick {} lead {} start {}", tick, lead, start);
                        assert_eq!(summaries, 1);
                        assert_eq!(repeats, vec![1, 2, 3], "tick {} interval {}", tick, interval);
                    }
                }
            }
        }
    }

    #[test]
    fn no_reminders_when_disabled() {
        assert_eq!(reminder_due(5, 5, 0, 1), None);
        assert_eq!(reminder_due(0, 5, 3, 1), None);
    }

    #[test]
    fn due_phases_at_the_deadline() {
        let cfg = config(1, 0, 5, 5);
        assert_eq!(due_phases(0, &cfg), vec![Phase::Warning, Phase::Summary]);
        assert_eq!(due_phases(-5, &cfg), vec![Phase::Reminder { repeat: 1 }]);
        assert!(due_phases(-6, &cfg).is_empty());
        assert!(due_phases(120, &cfg).is_empty());
    }

    #[test]
    fn rook_report_fires_once_a_day() {
        let at = 13 * 60 + 5;
        let fired: Vec<i64> = (0..24 * 60).filter(|m| rook_report_due(*m, at, 1)).collect();
        assert_eq!(fired, vec![at]);

        // Wraps around midnight.
        assert!(rook_report_due(2, 23 * 60 + 59, 5));
    }
}
