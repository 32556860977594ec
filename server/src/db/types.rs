use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i32,
    pub login: String,
    pub total_aura: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_contribution_date: Option<NaiveDate>,
    pub is_banned: bool,
}

/// One row of a leaderboard partition as fetched for rank recalculation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PartitionRow {
    pub user_id: i32,
    pub total_aura: i64,
    pub contributions_count: i32,
    pub current_streak: i32,
    pub rank: i32,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    pub login: String,
    pub total_aura: i64,
    pub contributions_count: i32,
    pub current_streak: i32,
    pub rank: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopRecord {
    pub user_id: i32,
    pub total_aura: i64,
    pub contributions_count: i32,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserBadgeRecord {
    pub name: String,
    pub description: String,
    pub rarity: String,
    pub icon: String,
    pub month_year: String,
    pub rank: i32,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MonthlyWinnerRecord {
    pub month_year: String,
    pub rank: i32,
    pub login: String,
    pub total_aura: i64,
    pub contributions_count: i32,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuraCalculationRecord {
    pub date: NaiveDate,
    pub contributions_count: i32,
    pub base_aura: i64,
    pub streak_bonus: i64,
    pub consistency_bonus: i64,
    pub quality_bonus: i64,
    pub total_aura: i64,
}
