use anyhow::bail;
use chrono::{Datelike, Duration, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use shared::{
    days_in_month, plan_leaderboard_writes, ProfileStats, ScorePolicy, StreakStats, TimePeriod,
    WriteSource,
};

use crate::{db::DB, github::GithubClient};

/// Scoring knobs shared by both write paths, managed as Rocket state.
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub policy: ScorePolicy,
    pub grace_window: Duration,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            policy: ScorePolicy::default(),
            grace_window: Duration::seconds(30),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuraSummary {
    pub login: String,
    pub total_aura: i64,
    pub monthly_aura: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub active_days: u32,
    pub monthly_written: bool,
}

/// Scores one user from their full contribution series and persists the
/// result: per-day breakdown, denormalized user fields and both leaderboard
/// partitions. Ordered so the breakdown row lands before either leaderboard
/// upsert. Ranks are left to the recalculation job.
#[instrument(skip(db, github, config))]
pub async fn score_user(
    db: &DB,
    github: &GithubClient,
    config: &ScoreConfig,
    login: &str,
    source: WriteSource,
) -> anyhow::Result<AuraSummary> {
    let login = login.trim();
    if login.is_empty() {
        bail!("missing user login");
    }

    // Contribution data is mandatory; the profile degrades to a zero
    // quality bonus when the source is unavailable.
    let calendar = github.contribution_calendar(login).await?;
    calendar.validate()?;
    let profile = match github.profile_stats(login).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Falling back to empty profile for {login}: {e:#}");
            ProfileStats::default()
        }
    };

    let policy = &config.policy;
    let now = Utc::now();
    let today = now.date_naive();
    let month = TimePeriod::Month.time_string(today);

    let streaks = StreakStats::compute(&calendar.days, today);
    let breakdown = policy.score_day(&calendar, &profile, today);
    let total_aura = policy.total_aura(&calendar, streaks.current);
    let yearly_aura: i64 = calendar
        .days
        .iter()
        .filter(|d| d.date.year() == today.year())
        .map(|d| policy.base_aura(d.contribution_count))
        .sum();
    let active_days = calendar.active_days_in(today.year(), today.month());
    let monthly_contributions = calendar.contributions_in(today.year(), today.month());
    let monthly_aura = policy.monthly_aura(
        monthly_contributions,
        active_days,
        days_in_month(today.year(), today.month()),
    );
    let last_contribution = calendar
        .days
        .iter()
        .filter(|d| d.contribution_count > 0)
        .map(|d| d.date)
        .max();

    let mut tx = db.begin().await?;

    let (user_id, is_banned) = DB::upsert_user(&mut tx, login).await?;
    DB::update_user_aura(
        &mut tx,
        user_id,
        total_aura,
        streaks.current as i32,
        streaks.longest as i32,
        last_contribution,
    )
    .await?;
    DB::upsert_aura_calculation(&mut tx, user_id, today, &breakdown).await?;

    // A banned user must stay off both leaderboards; scoring keeps the
    // profile stats current but never re-inserts their rows.
    let last_written = if is_banned {
        None
    } else {
        DB::monthly_row_written_at(&mut tx, user_id, &month).await?
    };
    let writes = plan_leaderboard_writes(is_banned, source, last_written, now, config.grace_window);

    if writes.global {
        DB::upsert_global_leaderboard(&mut tx, user_id, total_aura, yearly_aura).await?;
    }
    let monthly_written = if writes.monthly {
        DB::upsert_monthly_leaderboard(
            &mut tx,
            user_id,
            &month,
            monthly_aura,
            monthly_contributions as i32,
        )
        .await?;
        true
    } else if is_banned {
        info!("Skipping leaderboard writes for banned user {login}");
        false
    } else {
        // Not an error: a live write inside the grace window yields to the
        // recent authoritative write.
        info!("Skipping monthly upsert for {login}/{month}: row written within grace window");
        false
    };

    tx.commit().await?;

    Ok(AuraSummary {
        login: login.to_string(),
        total_aura,
        monthly_aura,
        current_streak: streaks.current,
        longest_streak: streaks.longest,
        active_days,
        monthly_written,
    })
}
