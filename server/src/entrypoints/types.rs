use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use aura_server::db::types::{
    AuraCalculationRecord, LeaderboardRecord, MonthlyWinnerRecord, UserBadgeRecord, UserRecord,
};

#[derive(Clone, Debug, Serialize, Deserialize, Default, ToSchema)]
#[aliases(PaginatedLeaderboardResponse = PaginatedResponse<LeaderboardResponse>)]
pub struct PaginatedResponse<T: Serialize> {
    pub records: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub limit: u64,
    pub total_records: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(records: Vec<T>, page: u64, limit: u64, total_records: u64) -> Self {
        // A zero limit would divide by zero below
        let limit = limit.max(1);
        let extra_page = if total_records % limit == 0 { 0 } else { 1 };
        let total_pages = (total_records / limit) + extra_page;
        Self {
            records,
            page,
            total_pages,
            limit,
            total_records,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GithubMeta {
    login: String,
    image: String,
}

impl GithubMeta {
    pub fn new(login: String) -> Self {
        let image = format!("https://github.com/{}.png", login);
        Self { login, image }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardResponse {
    pub user: GithubMeta,
    pub aura: i64,
    pub contributions: i32,
    pub streak: i32,
    pub rank: i32,
}

impl From<LeaderboardRecord> for LeaderboardResponse {
    fn from(record: LeaderboardRecord) -> Self {
        Self {
            user: GithubMeta::new(record.login),
            aura: record.total_aura,
            contributions: record.contributions_count,
            streak: record.current_streak,
            rank: record.rank,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BadgeResponse {
    pub name: String,
    pub description: String,
    pub rarity: String,
    pub icon: String,
    pub month_year: String,
    pub rank: i32,
    pub awarded_at: DateTime<Utc>,
}

impl From<UserBadgeRecord> for BadgeResponse {
    fn from(record: UserBadgeRecord) -> Self {
        Self {
            name: record.name,
            description: record.description,
            rarity: record.rarity,
            icon: record.icon,
            month_year: record.month_year,
            rank: record.rank,
            awarded_at: record.awarded_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AuraCalculationResponse {
    pub date: NaiveDate,
    pub contributions_count: i32,
    pub base_aura: i64,
    pub streak_bonus: i64,
    pub consistency_bonus: i64,
    pub quality_bonus: i64,
    pub total_aura: i64,
}

impl From<AuraCalculationRecord> for AuraCalculationResponse {
    fn from(record: AuraCalculationRecord) -> Self {
        Self {
            date: record.date,
            contributions_count: record.contributions_count,
            base_aura: record.base_aura,
            streak_bonus: record.streak_bonus,
            consistency_bonus: record.consistency_bonus,
            quality_bonus: record.quality_bonus,
            total_aura: record.total_aura,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfileResponse {
    pub user: GithubMeta,
    pub total_aura: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_contribution_date: Option<NaiveDate>,
    /// 0 means "not yet ranked" in the requested partition.
    pub monthly_rank: i32,
    pub global_rank: i32,
    pub badges: Vec<BadgeResponse>,
    pub recent_calculations: Vec<AuraCalculationResponse>,
}

impl UserProfileResponse {
    pub fn new(
        user: UserRecord,
        monthly_rank: Option<i32>,
        global_rank: Option<i32>,
        badges: Vec<UserBadgeRecord>,
        recent: Vec<AuraCalculationRecord>,
    ) -> Self {
        Self {
            user: GithubMeta::new(user.login),
            total_aura: user.total_aura,
            current_streak: user.current_streak,
            longest_streak: user.longest_streak,
            last_contribution_date: user.last_contribution_date,
            monthly_rank: monthly_rank.unwrap_or(0),
            global_rank: global_rank.unwrap_or(0),
            badges: badges.into_iter().map(Into::into).collect(),
            recent_calculations: recent.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WinnerResponse {
    pub rank: i32,
    pub user: GithubMeta,
    pub total_aura: i64,
    pub contributions: i32,
    pub captured_at: DateTime<Utc>,
}

impl From<MonthlyWinnerRecord> for WinnerResponse {
    fn from(record: MonthlyWinnerRecord) -> Self {
        Self {
            rank: record.rank,
            user: GithubMeta::new(record.login),
            total_aura: record.total_aura,
            contributions: record.contributions_count,
            captured_at: record.captured_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct BanRequest {
    pub reason: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_zero_limit() {
        let page: PaginatedResponse<LeaderboardResponse> =
            PaginatedResponse::new(Vec::new(), 1, 0, 10);
        assert_eq!(page.limit, 1);
        assert_eq!(page.total_pages, 10);
    }

    #[test]
    fn pagination_rounds_up_partial_page() {
        let page: PaginatedResponse<LeaderboardResponse> =
            PaginatedResponse::new(Vec::new(), 1, 50, 101);
        assert_eq!(page.total_pages, 3);
    }
}
