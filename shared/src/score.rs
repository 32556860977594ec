use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{current_streak, days_in_month, ContributionCalendar};

/// Static profile attributes feeding the quality bonus. All fields default,
/// so an unavailable profile source degrades to a zero bonus instead of an
/// error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStats {
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,
    pub has_bio: bool,
}

/// Per-day score components persisted as the `aura_calculations` breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBreakdown {
    pub contributions_count: u32,
    pub base_aura: i64,
    pub streak_bonus: i64,
    pub consistency_bonus: i64,
    pub quality_bonus: i64,
    pub total_aura: i64,
}

/// The scoring constant table. These are policy choices, not contracts:
/// deployments may tune them, so nothing outside this struct hard-codes a
/// tier threshold or multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorePolicy {
    /// Flat (negative) score for a day with zero contributions.
    pub zero_day_penalty: i64,
    /// Per-contribution multiplier by daily volume, `(min_count, multiplier)`
    /// sorted ascending. Higher-volume days earn progressively more per
    /// contribution.
    pub base_tiers: Vec<(u32, i64)>,
    /// Streak-length bonus steps, `(min_length, bonus)` sorted ascending.
    /// The last step is the cap.
    pub streak_steps: Vec<(u32, i64)>,
    /// Bonus at 100% active days in a month.
    pub consistency_max: i64,
    /// Flat points per active day in the monthly score.
    pub per_active_day: i64,
    /// Quality bonus steps on public repository count, `(min_repos, bonus)`.
    pub repo_tiers: Vec<(u32, i64)>,
    /// Quality bonus steps on follower count, `(min_followers, bonus)`.
    pub follower_tiers: Vec<(u32, i64)>,
    /// Quality bonus for having a bio at all.
    pub bio_bonus: i64,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            zero_day_penalty: -2,
            base_tiers: vec![(1, 5), (3, 8), (6, 12), (11, 15)],
            streak_steps: vec![(1, 10), (3, 25), (7, 50), (14, 100), (30, 200), (100, 500)],
            consistency_max: 1000,
            per_active_day: 50,
            repo_tiers: vec![(5, 25), (20, 50), (50, 100)],
            follower_tiers: vec![(10, 25), (50, 50), (100, 100)],
            bio_bonus: 25,
        }
    }
}

fn step_lookup(steps: &[(u32, i64)], value: u32) -> i64 {
    steps
        .iter()
        .take_while(|(min, _)| value >= *min)
        .last()
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0)
}

impl ScorePolicy {
    /// Tiered linear scaling of a single day's contribution count. Zero
    /// contributions earn the flat penalty.
    pub fn base_aura(&self, contributions: u32) -> i64 {
        if contributions == 0 {
            return self.zero_day_penalty;
        }
        contributions as i64 * step_lookup(&self.base_tiers, contributions)
    }

    /// Step function on streak length, monotonic non-decreasing, capped at
    /// the last step.
    pub fn streak_bonus(&self, streak: u32) -> i64 {
        step_lookup(&self.streak_steps, streak)
    }

    /// Proportional to the fraction of the month with at least one
    /// contribution, scaled to `consistency_max`.
    pub fn consistency_bonus(&self, active_days: u32, days_in_month: u32) -> i64 {
        if days_in_month == 0 {
            return 0;
        }
        let fraction = active_days.min(days_in_month) as f64 / days_in_month as f64;
        (fraction * self.consistency_max as f64).round() as i64
    }

    /// Additive bonus from static profile attributes, independent of the
    /// contribution history.
    pub fn quality_bonus(&self, profile: &ProfileStats) -> i64 {
        let bio = if profile.has_bio { self.bio_bonus } else { 0 };
        step_lookup(&self.repo_tiers, profile.public_repos)
            + step_lookup(&self.follower_tiers, profile.followers)
            + bio
    }

    pub fn monthly_aura(
        &self,
        monthly_contributions: u32,
        active_days: u32,
        days_in_month: u32,
    ) -> i64 {
        self.base_aura(monthly_contributions)
            + active_days as i64 * self.per_active_day
            + self.consistency_bonus(active_days, days_in_month)
    }

    /// All-time score: the daily base auras summed over the full window plus
    /// the streak bonus for the streak held at evaluation time.
    pub fn total_aura(&self, calendar: &ContributionCalendar, current_streak: u32) -> i64 {
        let base: i64 = calendar
            .days
            .iter()
            .map(|d| self.base_aura(d.contribution_count))
            .sum();
        base + self.streak_bonus(current_streak)
    }

    /// Today's breakdown row: today's base, the live streak bonus, the
    /// month-to-date consistency bonus and the profile quality bonus.
    pub fn score_day(
        &self,
        calendar: &ContributionCalendar,
        profile: &ProfileStats,
        today: NaiveDate,
    ) -> DailyBreakdown {
        let contributions_count = calendar.count_on(today);
        let base_aura = self.base_aura(contributions_count);
        let streak_bonus = self.streak_bonus(current_streak(&calendar.days, today));
        let consistency_bonus = self.consistency_bonus(
            calendar.active_days_in(today.year(), today.month()),
            days_in_month(today.year(), today.month()),
        );
        let quality_bonus = self.quality_bonus(profile);
        DailyBreakdown {
            contributions_count,
            base_aura,
            streak_bonus,
            consistency_bonus,
            quality_bonus,
            total_aura: base_aura + streak_bonus + consistency_bonus + quality_bonus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContributionDay;

    fn policy() -> ScorePolicy {
        ScorePolicy::default()
    }

    #[test]
    fn base_aura_is_deterministic_and_total() {
        let p = policy();
        for count in 0..200 {
            assert_eq!(p.base_aura(count), p.base_aura(count));
        }
    }

    #[test]
    fn base_aura_penalizes_empty_days() {
        assert!(policy().base_aura(0) < 0);
    }

    #[test]
    fn base_aura_monotonic_within_and_across_tiers() {
        let p = policy();
        let mut prev = p.base_aura(1);
        for count in 2..=60 {
            let current = p.base_aura(count);
            assert!(
                current >= prev,
                "base aura regressed at {count}: {prev} -> {current}"
            );
            prev = current;
        }
        // strictly increasing across the reference tier boundaries
        for boundary in [3u32, 6, 11] {
            assert!(p.base_aura(boundary) > p.base_aura(boundary - 1));
        }
    }

    #[test]
    fn streak_bonus_monotonic_and_capped() {
        let p = policy();
        let mut prev = p.streak_bonus(0);
        for len in 1..=400 {
            let current = p.streak_bonus(len);
            assert!(current >= prev);
            prev = current;
        }
        assert_eq!(p.streak_bonus(100), p.streak_bonus(4000));
    }

    #[test]
    fn consistency_bonus_scales_to_max() {
        let p = policy();
        assert_eq!(p.consistency_bonus(0, 31), 0);
        assert_eq!(p.consistency_bonus(31, 31), p.consistency_max);
        assert_eq!(p.consistency_bonus(20, 31), 645);
        assert_eq!(p.consistency_bonus(5, 0), 0);
    }

    #[test]
    fn quality_bonus_defaults_to_zero() {
        assert_eq!(policy().quality_bonus(&ProfileStats::default()), 0);
    }

    #[test]
    fn quality_bonus_adds_tiers() {
        let p = policy();
        let profile = ProfileStats {
            public_repos: 25,
            followers: 120,
            following: 3,
            has_bio: true,
        };
        assert_eq!(p.quality_bonus(&profile), 50 + 100 + 25);
    }

    #[test]
    fn march_example_scenario() {
        // 31-day March: 20 days with count 3, 11 with count 0
        let mut days = Vec::new();
        for d in 1..=31 {
            days.push(ContributionDay {
                date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                contribution_count: if d <= 20 { 3 } else { 0 },
            });
        }
        let calendar = ContributionCalendar::new(days);
        let active = calendar.active_days_in(2024, 3);
        let monthly = calendar.contributions_in(2024, 3);
        assert_eq!(active, 20);
        assert_eq!(monthly, 60);

        let p = policy();
        assert_eq!(p.consistency_bonus(active, 31), 645);
        assert_eq!(p.base_aura(monthly), 900);
        assert_eq!(p.monthly_aura(monthly, active, 31), 2545);
    }

    #[test]
    fn total_aura_sums_window_and_streak() {
        let p = policy();
        let calendar = ContributionCalendar::new(vec![
            ContributionDay {
                date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
                contribution_count: 2,
            },
            ContributionDay {
                date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                contribution_count: 4,
            },
        ]);
        // 2*5 + 4*8 + streak bonus for a 2-day streak
        assert_eq!(p.total_aura(&calendar, 2), 10 + 32 + 10);
    }

    #[test]
    fn score_day_components_add_up() {
        let p = policy();
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let calendar = ContributionCalendar::new(vec![
            ContributionDay {
                date: today,
                contribution_count: 4,
            },
            ContributionDay {
                date: today.pred_opt().unwrap(),
                contribution_count: 1,
            },
        ]);
        let breakdown = p.score_day(&calendar, &ProfileStats::default(), today);
        assert_eq!(breakdown.contributions_count, 4);
        assert_eq!(
            breakdown.total_aura,
            breakdown.base_aura
                + breakdown.streak_bonus
                + breakdown.consistency_bonus
                + breakdown.quality_bonus
        );
    }
}
