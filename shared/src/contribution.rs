use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One calendar day of the contribution series supplied by the GitHub
/// contribution source. Counts are unsigned, so negative counts are
/// unrepresentable by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub contribution_count: u32,
}

/// The trailing contribution window for a single user. This is untrusted
/// input: it may be empty, and it may contain dates outside the window the
/// caller asked for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContributionCalendar {
    pub total_contributions: u32,
    pub days: Vec<ContributionDay>,
}

impl ContributionCalendar {
    pub fn new(days: Vec<ContributionDay>) -> Self {
        let total_contributions = days.iter().map(|d| d.contribution_count).sum();
        Self {
            total_contributions,
            days,
        }
    }

    /// Dates must be unique within a series. Everything else (empty series,
    /// out-of-window dates) is tolerated.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::with_capacity(self.days.len());
        for day in &self.days {
            if !seen.insert(day.date) {
                anyhow::bail!("duplicate contribution date in series: {}", day.date);
            }
        }
        Ok(())
    }

    pub fn count_on(&self, date: NaiveDate) -> u32 {
        // Last-seen entry wins if the caller violated date uniqueness
        self.days
            .iter()
            .rev()
            .find(|d| d.date == date)
            .map(|d| d.contribution_count)
            .unwrap_or(0)
    }

    /// Number of days in the given month with at least one contribution.
    pub fn active_days_in(&self, year: i32, month: u32) -> u32 {
        self.days
            .iter()
            .filter(|d| {
                d.date.year() == year && d.date.month() == month && d.contribution_count > 0
            })
            .map(|d| d.date)
            .collect::<HashSet<_>>()
            .len() as u32
    }

    pub fn contributions_in(&self, year: i32, month: u32) -> u32 {
        self.days
            .iter()
            .filter(|d| d.date.year() == year && d.date.month() == month)
            .map(|d| d.contribution_count)
            .sum()
    }

    pub fn contributions_in_year(&self, year: i32) -> u32 {
        self.days
            .iter()
            .filter(|d| d.date.year() == year)
            .map(|d| d.contribution_count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
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

    #[test]
    fn validate_rejects_duplicate_dates() {
        let calendar = ContributionCalendar::new(vec![day(2024, 3, 1, 2), day(2024, 3, 1, 5)]);
        assert!(calendar.validate().is_err());
    }

    #[test]
    fn validate_accepts_empty_series() {
        assert!(ContributionCalendar::default().validate().is_ok());
    }

    #[test]
    fn monthly_aggregates_ignore_other_months() {
        let calendar = ContributionCalendar::new(vec![
            day(2024, 3, 1, 3),
            day(2024, 3, 2, 0),
            day(2024, 3, 5, 4),
            day(2024, 2, 28, 9),
        ]);
        assert_eq!(calendar.active_days_in(2024, 3), 2);
        assert_eq!(calendar.contributions_in(2024, 3), 7);
        assert_eq!(calendar.contributions_in_year(2024), 16);
    }

    #[test]
    fn count_on_prefers_last_seen_entry() {
        let calendar = ContributionCalendar {
            total_contributions: 7,
            days: vec![day(2024, 3, 1, 2), day(2024, 3, 1, 5)],
        };
        assert_eq!(calendar.count_on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()), 5);
        assert_eq!(calendar.count_on(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()), 0);
    }
}
