use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::models::milestone::{Milestone, MilestoneOffset, DEFAULT_MILESTONES};

/// Maps an expiry date and the current time to the reminders due today.
///
/// Comparison is by UTC calendar day. With `catch_up_days == 0` a milestone is
/// due only on the exact day `expiry - offset`; a scan that misses that day
/// never fires it. A positive window also accepts notify days up to that many
/// days in the past, as long as the item has not expired yet.
#[derive(Debug, Clone)]
pub struct MilestoneCalculator {
    table: &'static [MilestoneOffset],
    catch_up_days: u32,
}

impl MilestoneCalculator {
    pub fn new(table: &'static [MilestoneOffset], catch_up_days: u32) -> Self {
        Self { table, catch_up_days }
    }

    pub fn with_catch_up(catch_up_days: u32) -> Self {
        Self::new(DEFAULT_MILESTONES, catch_up_days)
    }

    pub fn due_milestones(&self, expiry_date: DateTime<Utc>, now: DateTime<Utc>) -> Vec<Milestone> {
        let today = now.date_naive();
        let expiry_day = expiry_date.date_naive();

        self.table
            .iter()
            .filter(|offset| match notify_day(expiry_day, offset.days_before) {
                Some(day) if day == today => true,
                Some(day) if self.catch_up_days > 0 => {
                    day < today
                        && (today - day).num_days() <= i64::from(self.catch_up_days)
                        && expiry_day >= today
                }
                _ => false,
            })
            .map(|offset| offset.milestone)
            .collect()
    }

    /// Start of the earliest notify day that is today or later.
    pub fn next_notification_date(&self, expiry_date: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        let expiry_day = expiry_date.date_naive();

        self.table
            .iter()
            .filter_map(|offset| notify_day(expiry_day, offset.days_before))
            .filter(|day| *day >= today)
            .min()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

impl Default for MilestoneCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_MILESTONES, 0)
    }
}

fn notify_day(expiry_day: NaiveDate, days_before: u64) -> Option<NaiveDate> {
    expiry_day.checked_sub_days(Days::new(days_before))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_thirty_days_out() {
        let calc = MilestoneCalculator::default();
        let now = at(2025, 6, 1);
        assert_eq!(calc.due_milestones(now + Duration::days(30), now), vec![Milestone::ThirtyDays]);
    }

    #[test]
    fn test_non_offset_day_is_quiet() {
        let calc = MilestoneCalculator::default();
        let now = at(2025, 6, 1);
        assert!(calc.due_milestones(now + Duration::days(29), now).is_empty());
    }

    #[test]
    fn test_one_day_out() {
        let calc = MilestoneCalculator::default();
        let now = at(2025, 6, 1);
        assert_eq!(calc.due_milestones(now + Duration::days(1), now), vec![Milestone::OneDay]);
    }

    #[test]
    fn test_time_of_day_is_ignored() {
        let calc = MilestoneCalculator::default();
        let expiry = Utc.with_ymd_and_hms(2025, 7, 8, 23, 59, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 0, 1, 0).unwrap();
        assert_eq!(calc.due_milestones(expiry, now), vec![Milestone::SevenDays]);
    }

    #[test]
    fn test_expiry_scenario_across_a_year() {
        let calc = MilestoneCalculator::default();
        let expiry = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

        // 2024-03-01 .. 2025-03-01 spans 365 days.
        assert_eq!(calc.due_milestones(expiry, at(2024, 3, 1)), vec![Milestone::OneYear]);
        assert!(calc.due_milestones(expiry, at(2024, 3, 2)).is_empty());
        assert_eq!(calc.due_milestones(expiry, at(2024, 9, 2)), vec![Milestone::SixMonths]);
        assert_eq!(calc.due_milestones(expiry, at(2025, 1, 30)), vec![Milestone::ThirtyDays]);
        assert_eq!(calc.due_milestones(expiry, at(2025, 2, 22)), vec![Milestone::SevenDays]);
        assert_eq!(calc.due_milestones(expiry, at(2025, 2, 28)), vec![Milestone::OneDay]);
        assert!(calc.due_milestones(expiry, at(2025, 3, 1)).is_empty());
    }

    #[test]
    fn test_missed_day_never_fires_without_catch_up() {
        let calc = MilestoneCalculator::default();
        let now = at(2025, 6, 1);
        assert!(calc.due_milestones(now + Duration::days(28), now).is_empty());
    }

    #[test]
    fn test_catch_up_window_recovers_recent_misses() {
        let calc = MilestoneCalculator::with_catch_up(3);
        let now = at(2025, 6, 1);

        assert_eq!(calc.due_milestones(now + Duration::days(28), now), vec![Milestone::ThirtyDays]);
        assert_eq!(calc.due_milestones(now + Duration::days(27), now), vec![Milestone::ThirtyDays]);
        assert!(calc.due_milestones(now + Duration::days(26), now).is_empty());
    }

    #[test]
    fn test_catch_up_skips_expired_items() {
        let calc = MilestoneCalculator::with_catch_up(5);
        let now = at(2025, 6, 1);
        assert!(calc.due_milestones(now - Duration::days(1), now).is_empty());
    }

    #[test]
    fn test_coinciding_offsets_fire_together() {
        static TABLE: &[MilestoneOffset] = &[
            MilestoneOffset { days_before: 7, milestone: Milestone::SevenDays },
            MilestoneOffset { days_before: 7, milestone: Milestone::OneDay },
        ];
        let calc = MilestoneCalculator::new(TABLE, 0);
        let now = at(2025, 6, 1);
        assert_eq!(
            calc.due_milestones(now + Duration::days(7), now),
            vec![Milestone::SevenDays, Milestone::OneDay]
        );
    }

    #[test]
    fn test_next_notification_date() {
        let calc = MilestoneCalculator::default();
        let now = at(2025, 6, 1);

        let next = calc.next_notification_date(at(2025, 6, 21), now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 14, 0, 0, 0).unwrap());

        assert!(calc.next_notification_date(at(2025, 6, 1), now).is_none());
    }
}
