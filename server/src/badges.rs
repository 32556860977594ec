use tracing::{info, instrument};

use shared::plan_badge_grants;

use crate::db::DB;

/// Podium badge blueprints; the stored badge name is month-qualified so each
/// month gets its own badge identity.
const PODIUM: [(&str, &str, &str); 3] = [
    ("Aura Champion", "legendary", "🥇"),
    ("Aura Runner-up", "epic", "🥈"),
    ("Aura Contender", "rare", "🥉"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct AwardOutcome {
    pub granted: usize,
    pub skipped: usize,
}

/// Awards the month's positional badges and captures the winners snapshot.
/// Every step is an idempotent upsert or insert-if-absent, so running this
/// any number of times for the same month produces the same grant set.
#[instrument(skip(db))]
pub async fn award_monthly(db: &DB, month: &str) -> anyhow::Result<AwardOutcome> {
    let mut tx = db.begin().await?;

    let mut badge_ids = Vec::with_capacity(PODIUM.len());
    for (position, (title, rarity, icon)) in PODIUM.iter().enumerate() {
        let rank = position as i32 + 1;
        let id = DB::upsert_badge(
            &mut tx,
            &format!("{title} {month}"),
            &format!("Finished #{rank} on the {month} aura leaderboard"),
            rarity,
            icon,
            &serde_json::json!({ "rank": rank, "monthYear": month }),
        )
        .await?;
        badge_ids.push(id);
    }

    let top = DB::top_of_month(&mut tx, month, PODIUM.len() as i64).await?;
    let standings: Vec<shared::TopEntry> = top
        .iter()
        .map(|record| shared::TopEntry {
            user_id: record.user_id,
            score: record.total_aura,
            contributions: record.contributions_count,
        })
        .collect();

    let existing = DB::month_grants(&mut tx, month).await?;
    let grants = plan_badge_grants(&standings, &badge_ids, &existing);

    let mut granted = 0;
    for grant in &grants {
        let metadata = serde_json::json!({
            "rank": grant.rank,
            "totalAura": grant.score,
            "contributionsCount": grant.contributions,
            "awardedAt": chrono::Utc::now(),
        });
        if DB::insert_user_badge(&mut tx, grant, month, &metadata).await? {
            granted += 1;
        }
    }

    for (position, entry) in standings.iter().enumerate() {
        DB::insert_monthly_winner(
            &mut tx,
            month,
            position as i32 + 1,
            entry.user_id,
            entry.score,
            entry.contributions,
        )
        .await?;
    }

    tx.commit().await?;

    let skipped = standings.len() - grants.len();
    if granted > 0 {
        info!("Awarded {granted} podium badges for {month} ({skipped} already granted)");
    }
    Ok(AwardOutcome { granted, skipped })
}
