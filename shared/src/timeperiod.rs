use chrono::{Datelike, Months, NaiveDate};

pub type TimePeriodString = String;

/// Leaderboard partitioning periods. Monthly partitions are keyed by the
/// month string `MMYYYY`; the all-time partition is keyed by the literal
/// `all-time`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TimePeriod {
    Month,
    Year,
    AllTime,
}

impl TimePeriod {
    pub fn from_time_period_string(period: &str) -> Option<Self> {
        match period {
            "all-time" => Some(TimePeriod::AllTime),
            a if a.len() == 6 && a.chars().all(|c| c.is_ascii_digit()) => Some(TimePeriod::Month),
            a if a.len() == 4 && a.chars().all(|c| c.is_ascii_digit()) => Some(TimePeriod::Year),
            _ => None,
        }
    }

    pub fn time_string(&self, date: NaiveDate) -> TimePeriodString {
        match self {
            TimePeriod::Month => format!("{:02}{:04}", date.month(), date.year()),
            TimePeriod::Year => date.year().to_string(),
            TimePeriod::AllTime => "all-time".to_string(),
        }
    }
}

/// Parses a `MMYYYY` month string back into its (year, month) pair.
pub fn parse_month_string(period: &str) -> Option<(i32, u32)> {
    if period.len() != 6 || !period.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let month: u32 = period[..2].parse().ok()?;
    let year: i32 = period[2..].parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| {
            let next = first.checked_add_months(Months::new(1))?;
            Some(next.signed_duration_since(first).num_days() as u32)
        })
        .unwrap_or_default()
}

/// Month string of the month preceding `date`'s month.
pub fn previous_month_string(date: NaiveDate) -> Option<TimePeriodString> {
    let prev = date.checked_sub_months(Months::new(1))?;
    Some(TimePeriod::Month.time_string(prev))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_string_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let period = TimePeriod::Month.time_string(date);
        assert_eq!(period, "032024");
        assert_eq!(parse_month_string(&period), Some((2024, 3)));
        assert_eq!(
            TimePeriod::from_time_period_string(&period),
            Some(TimePeriod::Month)
        );
    }

    #[test]
    fn all_time_string_recognized() {
        assert_eq!(
            TimePeriod::from_time_period_string("all-time"),
            Some(TimePeriod::AllTime)
        );
        assert_eq!(TimePeriod::from_time_period_string("march"), None);
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 3), 31);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn previous_month_crosses_year_boundary() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(previous_month_string(date).unwrap(), "122023");
    }
}
