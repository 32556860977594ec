use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::ContributionDay;

/// Aggregated streak view of a contribution series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakStats {
    pub current: u32,
    pub longest: u32,
    pub active_days: u32,
}

impl StreakStats {
    pub fn compute(days: &[ContributionDay], today: NaiveDate) -> Self {
        Self {
            current: current_streak(days, today),
            longest: longest_streak(days),
            active_days: days.iter().filter(|d| d.contribution_count > 0).count() as u32,
        }
    }
}

/// Walks backward from `today` one calendar day at a time, counting days with
/// at least one contribution. A contribution-free `today` does not break the
/// streak (the day may not be over yet); the first earlier day without
/// contributions does. Order-independent: the series is indexed internally.
pub fn current_streak(days: &[ContributionDay], today: NaiveDate) -> u32 {
    if days.is_empty() {
        return 0;
    }

    // Last-seen entry wins on duplicate dates
    let mut by_date: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for day in days {
        by_date.insert(day.date, day.contribution_count);
    }

    let mut streak = 0;
    let mut cursor = today;
    loop {
        let count = by_date.get(&cursor).copied().unwrap_or(0);
        if count > 0 {
            streak += 1;
        } else if cursor != today {
            break;
        }
        cursor = match cursor.pred_opt() {
            Some(prev) => prev,
            None => break,
        };
    }
    streak
}

/// Longest run of consecutive active days anywhere in the series.
pub fn longest_streak(days: &[ContributionDay]) -> u32 {
    let mut active: Vec<NaiveDate> = days
        .iter()
        .filter(|d| d.contribution_count > 0)
        .map(|d| d.date)
        .collect();
    active.sort();
    active.dedup();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for date in active {
        run = match prev.and_then(|p| p.succ_opt()) {
            Some(next) if next == date => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32, count: u32) -> ContributionDay {
        ContributionDay {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            contribution_count: count,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn empty_series_has_no_streak() {
        assert_eq!(current_streak(&[], today()), 0);
    }

    #[test]
    fn all_zero_series_has_no_streak() {
        let days = vec![day(2024, 3, 10, 0), day(2024, 3, 9, 0), day(2024, 3, 8, 0)];
        assert_eq!(current_streak(&days, today()), 0);
    }

    #[test]
    fn three_consecutive_days_then_zero() {
        let days = vec![
            day(2024, 3, 10, 1),
            day(2024, 3, 9, 4),
            day(2024, 3, 8, 2),
            day(2024, 3, 7, 0),
            day(2024, 3, 6, 9),
        ];
        assert_eq!(current_streak(&days, today()), 3);
    }

    #[test]
    fn streak_is_order_independent() {
        let mut days = vec![
            day(2024, 3, 8, 2),
            day(2024, 3, 10, 1),
            day(2024, 3, 7, 0),
            day(2024, 3, 9, 4),
        ];
        assert_eq!(current_streak(&days, today()), 3);
        days.reverse();
        assert_eq!(current_streak(&days, today()), 3);
    }

    #[test]
    fn contribution_free_today_does_not_break_streak() {
        let days = vec![
            day(2024, 3, 10, 0),
            day(2024, 3, 9, 3),
            day(2024, 3, 8, 1),
            day(2024, 3, 7, 0),
        ];
        assert_eq!(current_streak(&days, today()), 2);
    }

    #[test]
    fn gap_before_today_ends_streak_immediately() {
        // Active three days ago, nothing since yesterday
        let days = vec![day(2024, 3, 7, 5), day(2024, 3, 6, 5)];
        assert_eq!(current_streak(&days, today()), 0);
    }

    #[test]
    fn longest_streak_spans_past_runs() {
        let days = vec![
            day(2024, 3, 10, 1),
            day(2024, 3, 5, 2),
            day(2024, 3, 4, 2),
            day(2024, 3, 3, 1),
            day(2024, 3, 2, 0),
            day(2024, 3, 1, 7),
        ];
        assert_eq!(longest_streak(&days), 3);
        assert_eq!(longest_streak(&[]), 0);
    }

    #[test]
    fn stats_aggregate_matches_parts() {
        let days = vec![day(2024, 3, 10, 1), day(2024, 3, 9, 2), day(2024, 3, 1, 4)];
        let stats = StreakStats::compute(&days, today());
        assert_eq!(stats.current, 2);
        assert_eq!(stats.longest, 2);
        assert_eq!(stats.active_days, 3);
    }
}
