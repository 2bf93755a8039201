//! Rebalance schedules.
//!
//! A schedule decides, period by period, whether a strategy recomputes its
//! weights. Monthly activation compares the calendar (year, month) against
//! the previous period on which this schedule actually fired, so it behaves
//! the same on daily, weekly, or irregular timelines.

use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fire on the first period only.
    Once,
    /// Fire every period.
    Daily,
    /// Fire on the first period and whenever the calendar month changes
    /// relative to the last active period.
    Monthly,
}

impl Schedule {
    /// Whether the schedule fires at `index`/`date`. `last_active` is the
    /// date of the most recent period on which it fired, if any.
    pub fn is_active(&self, index: usize, date: NaiveDate, last_active: Option<NaiveDate>) -> bool {
        match self {
            Schedule::Once => index == 0,
            Schedule::Daily => true,
            Schedule::Monthly => match last_active {
                None => true,
                Some(prev) => (date.year(), date.month()) != (prev.year(), prev.month()),
            },
        }
    }

    /// Parse a config name (`once`, `daily`, `monthly`).
    pub fn parse(name: &str) -> Option<Schedule> {
        match name.trim().to_ascii_lowercase().as_str() {
            "once" => Some(Schedule::Once),
            "daily" => Some(Schedule::Daily),
            "monthly" => Some(Schedule::Monthly),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn once_fires_only_on_the_first_period() {
        let s = Schedule::Once;
        assert!(s.is_active(0, date(2024, 1, 1), None));
        assert!(!s.is_active(1, date(2024, 1, 2), Some(date(2024, 1, 1))));
        assert!(!s.is_active(50, date(2024, 3, 1), Some(date(2024, 1, 1))));
    }

    #[test]
    fn daily_fires_every_period() {
        let s = Schedule::Daily;
        for i in 0..5 {
            assert!(s.is_active(i, date(2024, 1, (i + 1) as u32), None));
        }
    }

    #[test]
    fn monthly_fires_on_the_first_period() {
        assert!(Schedule::Monthly.is_active(0, date(2024, 1, 15), None));
    }

    #[test]
    fn monthly_suppressed_within_a_month() {
        let s = Schedule::Monthly;
        let last = Some(date(2024, 1, 1));
        assert!(!s.is_active(1, date(2024, 1, 2), last));
        assert!(!s.is_active(20, date(2024, 1, 31), last));
    }

    #[test]
    fn monthly_fires_on_month_change() {
        let s = Schedule::Monthly;
        assert!(s.is_active(31, date(2024, 2, 1), Some(date(2024, 1, 1))));
    }

    #[test]
    fn monthly_compares_against_the_last_active_period() {
        let s = Schedule::Monthly;
        // Timeline with a hole: nothing in February. March still fires
        // because the comparison is against January's activation.
        let last = Some(date(2024, 1, 31));
        assert!(s.is_active(5, date(2024, 3, 1), last));
    }

    #[test]
    fn monthly_distinguishes_years() {
        let s = Schedule::Monthly;
        assert!(s.is_active(10, date(2025, 1, 3), Some(date(2024, 1, 30))));
    }

    #[test]
    fn single_period_table_activates_every_variant() {
        let d = date(2024, 6, 1);
        assert!(Schedule::Once.is_active(0, d, None));
        assert!(Schedule::Daily.is_active(0, d, None));
        assert!(Schedule::Monthly.is_active(0, d, None));
    }

    #[test]
    fn parse_recognizes_known_names() {
        assert_eq!(Schedule::parse("once"), Some(Schedule::Once));
        assert_eq!(Schedule::parse("Daily"), Some(Schedule::Daily));
        assert_eq!(Schedule::parse(" monthly "), Some(Schedule::Monthly));
        assert_eq!(Schedule::parse("weekly"), None);
    }
}
