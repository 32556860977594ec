use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rocket::{
    fairing::{self, AdHoc},
    Build, Rocket,
};
use rocket_db_pools::Database;
use shared::{BadgeGrant, DailyBreakdown, RankUpdate, RankedEntry, TimePeriod, UNRANKED};
use sqlx::{PgPool, Postgres, Transaction};

pub mod types;

use types::{
    AuraCalculationRecord, LeaderboardRecord, MonthlyWinnerRecord, PartitionRow, TopRecord,
    UserBadgeRecord, UserRecord,
};

#[derive(Database, Clone, Debug)]
#[database("aura")]
pub struct DB(PgPool);

impl DB {
    pub async fn begin(&self) -> anyhow::Result<Transaction<'static, Postgres>> {
        Ok(self.0.begin().await?)
    }

    /// Returns the user's id and ban flag so callers can gate leaderboard
    /// writes within the same transaction.
    pub async fn upsert_user(
        tx: &mut Transaction<'static, Postgres>,
        login: &str,
    ) -> anyhow::Result<(i32, bool)> {
        // First try to update the user
        let rec: Option<(i32, bool)> = sqlx::query_as(
            r#"
            UPDATE users
            SET login = $1
            WHERE login = $1
            RETURNING id, is_banned
            "#,
        )
        .bind(login)
        .fetch_optional(tx.as_mut())
        .await?;

        // If the update did not find a matching row, insert the user
        if let Some(rec) = rec {
            Ok(rec)
        } else {
            let rec: (i32, bool) = sqlx::query_as(
                r#"
                INSERT INTO users (login)
                VALUES ($1)
                ON CONFLICT (login) DO NOTHING
                RETURNING id, is_banned
                "#,
            )
            .bind(login)
            .fetch_one(tx.as_mut())
            .await?;

            Ok(rec)
        }
    }

    pub async fn update_user_aura(
        tx: &mut Transaction<'static, Postgres>,
        user_id: i32,
        total_aura: i64,
        current_streak: i32,
        longest_streak: i32,
        last_contribution_date: Option<NaiveDate>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET total_aura = $2, current_streak = $3, longest_streak = $4, last_contribution_date = $5
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(total_aura)
        .bind(current_streak)
        .bind(longest_streak)
        .bind(last_contribution_date)
        .execute(tx.as_mut())
        .await?;
        Ok(())
    }

    pub async fn upsert_aura_calculation(
        tx: &mut Transaction<'static, Postgres>,
        user_id: i32,
        date: NaiveDate,
        breakdown: &DailyBreakdown,
    ) -> anyhow::Result<()> {
        // First try to update the breakdown row for this day
        let rec: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE aura_calculations
            SET contributions_count = $3, base_aura = $4, streak_bonus = $5,
                consistency_bonus = $6, quality_bonus = $7, total_aura = $8
            WHERE user_id = $1 AND date = $2
            RETURNING user_id
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(breakdown.contributions_count as i32)
        .bind(breakdown.base_aura)
        .bind(breakdown.streak_bonus)
        .bind(breakdown.consistency_bonus)
        .bind(breakdown.quality_bonus)
        .bind(breakdown.total_aura)
        .fetch_optional(tx.as_mut())
        .await?;

        // If the update did not find a matching row, insert it
        if rec.is_none() {
            sqlx::query(
                r#"
                INSERT INTO aura_calculations
                    (user_id, date, contributions_count, base_aura, streak_bonus,
                     consistency_bonus, quality_bonus, total_aura)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (user_id, date) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(date)
            .bind(breakdown.contributions_count as i32)
            .bind(breakdown.base_aura)
            .bind(breakdown.streak_bonus)
            .bind(breakdown.consistency_bonus)
            .bind(breakdown.quality_bonus)
            .bind(breakdown.total_aura)
            .execute(tx.as_mut())
            .await?;
        }
        Ok(())
    }

    /// Write stamp of the user's monthly row, consulted by the merge policy.
    pub async fn monthly_row_written_at(
        tx: &mut Transaction<'static, Postgres>,
        user_id: i32,
        month: &str,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(sqlx::query_scalar(
            r#"
            SELECT created_at
            FROM monthly_leaderboard
            WHERE user_id = $1 AND month_year = $2
            "#,
        )
        .bind(user_id)
        .bind(month)
        .fetch_optional(tx.as_mut())
        .await?)
    }

    /// Writes the month's score and refreshes the row's write stamp. The rank
    /// is never touched here; fresh rows carry the unranked sentinel until
    /// the next recalculation pass.
    pub async fn upsert_monthly_leaderboard(
        tx: &mut Transaction<'static, Postgres>,
        user_id: i32,
        month: &str,
        total_aura: i64,
        contributions_count: i32,
    ) -> anyhow::Result<()> {
        let rec: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE monthly_leaderboard
            SET total_aura = $3, contributions_count = $4, created_at = now()
            WHERE user_id = $1 AND month_year = $2
            RETURNING user_id
            "#,
        )
        .bind(user_id)
        .bind(month)
        .bind(total_aura)
        .bind(contributions_count)
        .fetch_optional(tx.as_mut())
        .await?;

        if rec.is_none() {
            sqlx::query(
                r#"
                INSERT INTO monthly_leaderboard (user_id, month_year, total_aura, contributions_count, rank)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_id, month_year) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(month)
            .bind(total_aura)
            .bind(contributions_count)
            .bind(UNRANKED)
            .execute(tx.as_mut())
            .await?;
        }
        Ok(())
    }

    pub async fn upsert_global_leaderboard(
        tx: &mut Transaction<'static, Postgres>,
        user_id: i32,
        total_aura: i64,
        yearly_aura: i64,
    ) -> anyhow::Result<()> {
        let rec: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE global_leaderboard
            SET total_aura = $2, yearly_aura = $3, last_updated = now()
            WHERE user_id = $1
            RETURNING user_id
            "#,
        )
        .bind(user_id)
        .bind(total_aura)
        .bind(yearly_aura)
        .fetch_optional(tx.as_mut())
        .await?;

        if rec.is_none() {
            sqlx::query(
                r#"
                INSERT INTO global_leaderboard (user_id, total_aura, yearly_aura, rank)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(total_aura)
            .bind(yearly_aura)
            .bind(UNRANKED)
            .execute(tx.as_mut())
            .await?;
        }
        Ok(())
    }

    pub async fn monthly_partition(
        tx: &mut Transaction<'static, Postgres>,
        month: &str,
    ) -> anyhow::Result<Vec<RankedEntry>> {
        let rows: Vec<PartitionRow> = sqlx::query_as(
            r#"
            SELECT ml.user_id, ml.total_aura, ml.contributions_count, u.current_streak, ml.rank
            FROM monthly_leaderboard ml
            JOIN users u ON u.id = ml.user_id
            WHERE ml.month_year = $1
            "#,
        )
        .bind(month)
        .fetch_all(tx.as_mut())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn global_partition(
        tx: &mut Transaction<'static, Postgres>,
    ) -> anyhow::Result<Vec<RankedEntry>> {
        // The global table carries no contribution count; ties fall through
        // to the streak tie-breaker.
        let rows: Vec<PartitionRow> = sqlx::query_as(
            r#"
            SELECT gl.user_id, gl.total_aura, 0 AS contributions_count, u.current_streak, gl.rank
            FROM global_leaderboard gl
            JOIN users u ON u.id = gl.user_id
            "#,
        )
        .fetch_all(tx.as_mut())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update_monthly_ranks(
        tx: &mut Transaction<'static, Postgres>,
        month: &str,
        updates: &[RankUpdate],
    ) -> anyhow::Result<()> {
        let user_ids: Vec<i32> = updates.iter().map(|u| u.user_id).collect();
        let ranks: Vec<i32> = updates.iter().map(|u| u.rank).collect();
        sqlx::query(
            r#"
            UPDATE monthly_leaderboard AS ml
            SET rank = v.rank
            FROM unnest($2::int[], $3::int[]) AS v(user_id, rank)
            WHERE ml.user_id = v.user_id AND ml.month_year = $1
            "#,
        )
        .bind(month)
        .bind(&user_ids)
        .bind(&ranks)
        .execute(tx.as_mut())
        .await?;
        Ok(())
    }

    pub async fn update_global_ranks(
        tx: &mut Transaction<'static, Postgres>,
        updates: &[RankUpdate],
    ) -> anyhow::Result<()> {
        let user_ids: Vec<i32> = updates.iter().map(|u| u.user_id).collect();
        let ranks: Vec<i32> = updates.iter().map(|u| u.rank).collect();
        sqlx::query(
            r#"
            UPDATE global_leaderboard AS gl
            SET rank = v.rank
            FROM unnest($1::int[], $2::int[]) AS v(user_id, rank)
            WHERE gl.user_id = v.user_id
            "#,
        )
        .bind(&user_ids)
        .bind(&ranks)
        .execute(tx.as_mut())
        .await?;
        Ok(())
    }

    pub async fn get_leaderboard(
        &self,
        period: &str,
        page: i64,
        limit: i64,
    ) -> anyhow::Result<(Vec<LeaderboardRecord>, i64)> {
        let records: Vec<LeaderboardRecord> = match TimePeriod::from_time_period_string(period) {
            Some(TimePeriod::AllTime) => {
                sqlx::query_as(
                    r#"
                    SELECT u.login, gl.total_aura, 0 AS contributions_count, u.current_streak, gl.rank
                    FROM global_leaderboard gl
                    JOIN users u ON u.id = gl.user_id
                    ORDER BY gl.rank ASC, gl.total_aura DESC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(limit)
                .bind(page * limit)
                .fetch_all(&self.0)
                .await?
            }
            Some(TimePeriod::Month) => {
                sqlx::query_as(
                    r#"
                    SELECT u.login, ml.total_aura, ml.contributions_count, u.current_streak, ml.rank
                    FROM monthly_leaderboard ml
                    JOIN users u ON u.id = ml.user_id
                    WHERE ml.month_year = $1
                    ORDER BY ml.rank ASC, ml.total_aura DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(period)
                .bind(limit)
                .bind(page * limit)
                .fetch_all(&self.0)
                .await?
            }
            _ => anyhow::bail!("unknown leaderboard period: {period}"),
        };

        let total: i64 = match TimePeriod::from_time_period_string(period) {
            Some(TimePeriod::AllTime) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM global_leaderboard")
                    .fetch_one(&self.0)
                    .await?
            }
            _ => sqlx::query_scalar(
                "SELECT COUNT(*) FROM monthly_leaderboard WHERE month_year = $1",
            )
            .bind(period)
            .fetch_one(&self.0)
            .await?,
        };

        Ok((records, total))
    }

    pub async fn get_leaderboard_place(
        &self,
        period: &str,
        login: &str,
    ) -> anyhow::Result<Option<i32>> {
        let place: Option<i32> = match TimePeriod::from_time_period_string(period) {
            Some(TimePeriod::AllTime) => {
                sqlx::query_scalar(
                    r#"
                    SELECT gl.rank
                    FROM global_leaderboard gl
                    JOIN users u ON u.id = gl.user_id
                    WHERE u.login = $1
                    "#,
                )
                .bind(login)
                .fetch_optional(&self.0)
                .await?
            }
            Some(TimePeriod::Month) => {
                sqlx::query_scalar(
                    r#"
                    SELECT ml.rank
                    FROM monthly_leaderboard ml
                    JOIN users u ON u.id = ml.user_id
                    WHERE u.login = $1 AND ml.month_year = $2
                    "#,
                )
                .bind(login)
                .bind(period)
                .fetch_optional(&self.0)
                .await?
            }
            _ => None,
        };

        // The sentinel means "not yet ranked", which reads as absent
        Ok(place.filter(|rank| *rank != UNRANKED))
    }

    pub async fn upsert_badge(
        tx: &mut Transaction<'static, Postgres>,
        name: &str,
        description: &str,
        rarity: &str,
        icon: &str,
        criteria: &serde_json::Value,
    ) -> anyhow::Result<i32> {
        // First try to update the badge definition
        let rec: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE badges
            SET description = $2, rarity = $3, icon = $4, criteria = $5
            WHERE name = $1
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(rarity)
        .bind(icon)
        .bind(criteria)
        .fetch_optional(tx.as_mut())
        .await?;

        if let Some(id) = rec {
            Ok(id)
        } else {
            let id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO badges (name, description, rarity, icon, criteria)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (name) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(name)
            .bind(description)
            .bind(rarity)
            .bind(icon)
            .bind(criteria)
            .fetch_one(tx.as_mut())
            .await?;

            Ok(id)
        }
    }

    pub async fn top_of_month(
        tx: &mut Transaction<'static, Postgres>,
        month: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<TopRecord>> {
        Ok(sqlx::query_as(
            r#"
            SELECT user_id, total_aura, contributions_count
            FROM monthly_leaderboard
            WHERE month_year = $1
            ORDER BY total_aura DESC, contributions_count DESC, user_id ASC
            LIMIT $2
            "#,
        )
        .bind(month)
        .bind(limit)
        .fetch_all(tx.as_mut())
        .await?)
    }

    pub async fn month_grants(
        tx: &mut Transaction<'static, Postgres>,
        month: &str,
    ) -> anyhow::Result<HashSet<(i32, i32)>> {
        let rows: Vec<(i32, i32)> = sqlx::query_as(
            r#"
            SELECT user_id, badge_id
            FROM user_badges
            WHERE month_year = $1
            "#,
        )
        .bind(month)
        .fetch_all(tx.as_mut())
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Grant-if-absent: a duplicate grant attempt is a no-op, so concurrent
    /// awarder runs are safe under the uniqueness constraint.
    pub async fn insert_user_badge(
        tx: &mut Transaction<'static, Postgres>,
        grant: &BadgeGrant,
        month: &str,
        metadata: &serde_json::Value,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_badges (user_id, badge_id, month_year, rank, metadata)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, badge_id, month_year) DO NOTHING
            "#,
        )
        .bind(grant.user_id)
        .bind(grant.badge_id)
        .bind(month)
        .bind(grant.rank)
        .bind(metadata)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The winners snapshot is immutable: once a (month, rank) cell is
    /// captured it never changes, even if the live leaderboard shifts later.
    pub async fn insert_monthly_winner(
        tx: &mut Transaction<'static, Postgres>,
        month: &str,
        rank: i32,
        user_id: i32,
        total_aura: i64,
        contributions_count: i32,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO monthly_winners (month_year, rank, user_id, total_aura, contributions_count)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (month_year, rank) DO NOTHING
            "#,
        )
        .bind(month)
        .bind(rank)
        .bind(user_id)
        .bind(total_aura)
        .bind(contributions_count)
        .execute(tx.as_mut())
        .await?;
        Ok(())
    }

    pub async fn get_monthly_winners(
        &self,
        month: &str,
    ) -> anyhow::Result<Vec<MonthlyWinnerRecord>> {
        Ok(sqlx::query_as(
            r#"
            SELECT mw.month_year, mw.rank, u.login, mw.total_aura, mw.contributions_count, mw.captured_at
            FROM monthly_winners mw
            JOIN users u ON u.id = mw.user_id
            WHERE mw.month_year = $1
            ORDER BY mw.rank ASC
            "#,
        )
        .bind(month)
        .fetch_all(&self.0)
        .await?)
    }

    pub async fn get_user(&self, login: &str) -> anyhow::Result<Option<UserRecord>> {
        Ok(sqlx::query_as(
            r#"
            SELECT id, login, total_aura, current_streak, longest_streak,
                   last_contribution_date, is_banned
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.0)
        .await?)
    }

    pub async fn get_user_badges(&self, user_id: i32) -> anyhow::Result<Vec<UserBadgeRecord>> {
        Ok(sqlx::query_as(
            r#"
            SELECT b.name, b.description, b.rarity, b.icon, ub.month_year, ub.rank, ub.awarded_at
            FROM user_badges ub
            JOIN badges b ON b.id = ub.badge_id
            WHERE ub.user_id = $1
            ORDER BY ub.awarded_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.0)
        .await?)
    }

    pub async fn get_recent_calculations(
        &self,
        user_id: i32,
        limit: i64,
    ) -> anyhow::Result<Vec<AuraCalculationRecord>> {
        Ok(sqlx::query_as(
            r#"
            SELECT date, contributions_count, base_aura, streak_bonus,
                   consistency_bonus, quality_bonus, total_aura
            FROM aura_calculations
            WHERE user_id = $1
            ORDER BY date DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.0)
        .await?)
    }

    pub async fn set_ban(
        tx: &mut Transaction<'static, Postgres>,
        login: &str,
        reason: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Option<i32>> {
        Ok(sqlx::query_scalar(
            r#"
            UPDATE users
            SET is_banned = TRUE, ban_reason = $2, banned_at = now(), ban_expires_at = $3
            WHERE login = $1
            RETURNING id
            "#,
        )
        .bind(login)
        .bind(reason)
        .bind(expires_at)
        .fetch_optional(tx.as_mut())
        .await?)
    }

    pub async fn clear_ban(
        tx: &mut Transaction<'static, Postgres>,
        login: &str,
    ) -> anyhow::Result<Option<i32>> {
        Ok(sqlx::query_scalar(
            r#"
            UPDATE users
            SET is_banned = FALSE, ban_reason = NULL, banned_at = NULL, ban_expires_at = NULL
            WHERE login = $1
            RETURNING id
            "#,
        )
        .bind(login)
        .fetch_optional(tx.as_mut())
        .await?)
    }

    pub async fn remove_from_leaderboards(
        tx: &mut Transaction<'static, Postgres>,
        user_id: i32,
    ) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM monthly_leaderboard WHERE user_id = $1")
            .bind(user_id)
            .execute(tx.as_mut())
            .await?;
        sqlx::query("DELETE FROM global_leaderboard WHERE user_id = $1")
            .bind(user_id)
            .execute(tx.as_mut())
            .await?;
        Ok(())
    }

    pub async fn month_partitions(&self) -> anyhow::Result<Vec<String>> {
        Ok(
            sqlx::query_scalar("SELECT DISTINCT month_year FROM monthly_leaderboard")
                .fetch_all(&self.0)
                .await?,
        )
    }
}

impl From<PartitionRow> for RankedEntry {
    fn from(row: PartitionRow) -> Self {
        Self {
            user_id: row.user_id,
            score: row.total_aura,
            contributions: row.contributions_count,
            streak: row.current_streak,
            rank: row.rank,
        }
    }
}

async fn run_migrations(rocket: Rocket<Build>) -> fairing::Result {
    match DB::fetch(&rocket) {
        Some(db) => match sqlx::migrate!("./migrations").run(&**db).await {
            Ok(_) => Ok(rocket),
            Err(e) => {
                rocket::error!("Failed to initialize SQLx database: {}", e);
                Err(rocket)
            }
        },
        None => Err(rocket),
    }
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("SQLx Stage", |rocket| async {
        rocket
            .attach(DB::init())
            .attach(AdHoc::try_on_ignite("SQLx Migrations", run_migrations))
    })
}
