use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::db::DB;

/// Bans a user and removes every leaderboard row they hold, atomically: if
/// the removal fails the ban rolls back with it, so a banned user can never
/// linger ranked. Callers treat a failure as a retriable ban action.
#[instrument(skip(db))]
pub async fn ban_user(
    db: &DB,
    login: &str,
    reason: &str,
    expires_at: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;

    let user_id = DB::set_ban(&mut tx, login, reason, expires_at)
        .await?
        .with_context(|| format!("cannot ban unknown user {login}"))?;
    DB::remove_from_leaderboards(&mut tx, user_id).await?;

    tx.commit().await?;
    info!("Banned {login} and removed their leaderboard rows");
    Ok(())
}

/// Lifts a ban. Deliberately asymmetric with [`ban_user`]: no leaderboard
/// rows are restored; the user re-enters the boards through their next
/// scoring run.
#[instrument(skip(db))]
pub async fn unban_user(db: &DB, login: &str) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;

    DB::clear_ban(&mut tx, login)
        .await?
        .with_context(|| format!("cannot unban unknown user {login}"))?;

    tx.commit().await?;
    info!("Unbanned {login}; they rejoin leaderboards on their next scoring run");
    Ok(())
}
