//! Days-of-operation schedules for airspace volumes.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Mask of weekdays on which an airspace is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirspaceActivity {
    mask: u8,
}

impl Default for AirspaceActivity {
    fn default() -> Self {
        Self::every_day()
    }
}

impl AirspaceActivity {
    pub fn every_day() -> Self {
        Self { mask: 0x7f }
    }

    pub fn no_days() -> Self {
        Self { mask: 0 }
    }

    pub fn from_days(days: &[Weekday]) -> Self {
        let mut activity = Self::no_days();
        for day in days {
            activity.set(*day, true);
        }
        activity
    }

    pub fn set(&mut self, day: Weekday, active: bool) {
        let bit = 1 << day.num_days_from_monday();
        if active {
            self.mask |= bit;
        } else {
            self.mask &= !bit;
        }
    }

    pub fn matches(&self, day: Weekday) -> bool {
        self.mask & (1 << day.num_days_from_monday()) != 0
    }

    pub fn matches_date(&self, date: NaiveDate) -> bool {
        self.matches(date.weekday())
    }

    /// Whether both masks share at least one active day.
    pub fn intersects(&self, other: &AirspaceActivity) -> bool {
        self.mask & other.mask != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_every_day() {
        let activity = AirspaceActivity::default();
        assert!(activity.matches(Weekday::Mon));
        assert!(activity.matches(Weekday::Sun));
    }

    #[test]
    fn selected_days_only() {
        let activity = AirspaceActivity::from_days(&[Weekday::Sat, Weekday::Sun]);
        assert!(!activity.matches(Weekday::Wed));
        assert!(activity.matches(Weekday::Sat));

        // 2026-08-01 is a Saturday
        let date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert!(activity.matches_date(date));
        assert!(!activity.matches_date(date.succ_opt().unwrap().succ_opt().unwrap()));
    }

    #[test]
    fn set_and_clear() {
        let mut activity = AirspaceActivity::no_days();
        activity.set(Weekday::Fri, true);
        assert!(activity.matches(Weekday::Fri));
        activity.set(Weekday::Fri, false);
        assert!(!activity.matches(Weekday::Fri));
    }
}
