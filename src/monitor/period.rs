//! Day-aligned reporting periods.
//!
//! A period is always one local calendar day `[midnight, next midnight)`.
//! The deadline only decides when during that day the engine speaks up.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::Serialize;

use crate::database::models::Deadline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// One deadline occurrence and the reporting day it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineWindow {
    pub period: Period,
    pub deadline_at: DateTime<Utc>,
    pub minutes_until: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct PeriodResolver {
    offset: FixedOffset,
}

impl PeriodResolver {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Today's period, or `None` when the group has no deadline and is not monitored.
    pub fn resolve(&self, deadline: Option<Deadline>, now: DateTime<Utc>) -> Option<Period> {
        deadline.map(|_| self.current_period(now))
    }

    pub fn current_period(&self, now: DateTime<Utc>) -> Period {
        self.period_for_date(self.local_date(now))
    }

    /// The full local day before `now`'s.
    pub fn previous_period(&self, now: DateTime<Utc>) -> Period {
        self.period_for_date(self.local_date(now) - Duration::days(1))
    }

    pub fn period_for_date(&self, date: NaiveDate) -> Period {
        let start = self.local_to_utc(date, NaiveTime::MIN);
        Period {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn minutes_since_local_midnight(&self, instant: DateTime<Utc>) -> i64 {
        let local = instant.with_timezone(&self.offset);
        i64::from(local.hour() * 60 + local.minute())
    }

    /// The deadline occurrence closest to `now`: yesterday's, today's or tomorrow's.
    ///
    /// Phases are timed against this occurrence and compliance is judged over its
    /// own local day, so a deadline near midnight keeps its warning and reminders.
    pub fn deadline_window(&self, deadline: Deadline, now: DateTime<Utc>) -> DeadlineWindow {
        let today = self.local_date(now);
        let (date, deadline_at) = [today.pred_opt(), Some(today), today.succ_opt()]
            .into_iter()
            .flatten()
            .map(|date| (date, self.local_to_utc(date, deadline.time())))
            .min_by_key(|(_, at)| (*at - now).num_milliseconds().abs())
            .unwrap_or_else(|| (today, self.local_to_utc(today, deadline.time())));

        let millis = (deadline_at - now).num_milliseconds();
        DeadlineWindow {
            period: self.period_for_date(date),
            deadline_at,
            minutes_until: -((-millis).div_euclid(60_000)),
        }
    }

    /// Whole minutes left until the nearest deadline, rounded up.
    ///
    /// Zero during the first minute after the deadline, negative afterwards.
    pub fn minutes_until_deadline(&self, deadline: Deadline, now: DateTime<Utc>) -> i64 {
        self.deadline_window(deadline, now).minutes_until
    }

    /// Inclusive local date range covered by `period`, for date-granular services.
    pub fn date_range(&self, period: &Period) -> (NaiveDate, NaiveDate) {
        let last_instant = period.end - Duration::milliseconds(1);
        (self.local_date(period.start), self.local_date(last_instant))
    }

    fn local_to_utc(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let local = date.and_time(time);
        (local - Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn resolver() -> PeriodResolver {
        PeriodResolver::new(FixedOffset::east_opt(0).unwrap())
    }

    #[test]
    fn no_deadline_means_disabled() {
        assert_eq!(resolver().resolve(None, utc(2018, 1, 2, 10, 0, 0)), None);
    }

    #[test]
    fn period_spans_the_local_day() {
        let deadline = Deadline::new(10, 0).unwrap();
        let period = resolver()
            .resolve(Some(deadline), utc(2018, 1, 2, 10, 0, 0))
            .unwrap();
        assert_eq!(period.start, utc(2018, 1, 2, 0, 0, 0));
        assert_eq!(period.end, utc(2018, 1, 3, 0, 0, 0));
        assert!(period.contains(utc(2018, 1, 2, 23, 59, 59)));
        assert!(!period.contains(utc(2018, 1, 3, 0, 0, 0)));
    }

    #[test]
    fn period_follows_the_configured_offset() {
        let resolver = PeriodResolver::new(FixedOffset::east_opt(6 * 3600).unwrap());
        // 20:00 UTC is already 02:00 the next day at UTC+6.
        let period = resolver.current_period(utc(2018, 1, 2, 20, 0, 0));
        assert_eq!(period.start, utc(2018, 1, 2, 18, 0, 0));
        assert_eq!(period.end, utc(2018, 1, 3, 18, 0, 0));
        assert_eq!(
            resolver.date_range(&period),
            (
                NaiveDate::from_ymd_opt(2018, 1, 3).unwrap(),
                NaiveDate::from_ymd_opt(2018, 1, 3).unwrap()
            )
        );
    }

    #[test]
    fn previous_period_is_yesterday() {
        let period = resolver().previous_period(utc(2018, 6, 25, 13, 5, 0));
        assert_eq!(period.start, utc(2018, 6, 24, 0, 0, 0));
        assert_eq!(period.end, utc(2018, 6, 25, 0, 0, 0));
    }

    #[test]
    fn minutes_until_deadline_rounds_up() {
        let deadline = Deadline::new(10, 0).unwrap();
        let r = resolver();
        assert_eq!(r.minutes_until_deadline(deadline, utc(2018, 1, 2, 9, 50, 0)), 10);
        assert_eq!(r.minutes_until_deadline(deadline, utc(2018, 1, 2, 9, 59, 30)), 1);
        assert_eq!(r.minutes_until_deadline(deadline, utc(2018, 1, 2, 10, 0, 0)), 0);
        assert_eq!(r.minutes_until_deadline(deadline, utc(2018, 1, 2, 10, 0, 59)), 0);
        assert_eq!(r.minutes_until_deadline(deadline, utc(2018, 1, 2, 10, 1, 0)), -1);
        assert_eq!(r.minutes_until_deadline(deadline, utc(2018, 1, 2, 12, 0, 0)), -120);
    }

    #[test]
    fn late_deadline_is_still_behind_us_after_midnight() {
        let deadline = Deadline::new(23, 55).unwrap();
        let window = resolver().deadline_window(deadline, utc(2018, 1, 3, 0, 10, 0));
        assert_eq!(window.minutes_until, -15);
        assert_eq!(window.deadline_at, utc(2018, 1, 2, 23, 55, 0));
        assert_eq!(window.period.start, utc(2018, 1, 2, 0, 0, 0));
    }

    #[test]
    fn early_deadline_is_ahead_before_midnight() {
        let deadline = Deadline::new(0, 5).unwrap();
        let window = resolver().deadline_window(deadline, utc(2018, 1, 2, 23, 55, 0));
        assert_eq!(window.minutes_until, 10);
        assert_eq!(window.period.start, utc(2018, 1, 3, 0, 0, 0));
        assert_eq!(window.period.end, utc(2018, 1, 4, 0, 0, 0));
    }

    #[test]
    fn local_clock_reading() {
        let resolver = PeriodResolver::new(FixedOffset::west_opt(3600).unwrap());
        assert_eq!(resolver.minutes_since_local_midnight(utc(2018, 1, 2, 14, 5, 0)), 13 * 60 + 5);
    }
}
