use std::{
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use chrono::Utc;
use rocket::fairing::AdHoc;
use rocket_db_pools::Database;
use shared::previous_month_string;

use crate::{badges, db::DB, ranking};

/// Periodic rank recalculation over every monthly partition and the global
/// one. A failed pass leaves stale ranks until the next tick; no cleanup is
/// needed because every pass recomputes from scratch.
pub fn ranking_stage(sleep_duration: Duration, atomic_bool: Arc<AtomicBool>) -> AdHoc {
    AdHoc::on_liftoff("Recalculate leaderboard ranks every X minutes", move |rocket| {
        Box::pin(async move {
            // Get an actual DB connection
            let db = DB::fetch(rocket)
                .expect("Failed to get DB connection")
                .clone();

            rocket::tokio::spawn(async move {
                let mut interval = rocket::tokio::time::interval(sleep_duration);
                while atomic_bool.load(std::sync::atomic::Ordering::Relaxed) {
                    interval.tick().await;

                    if let Err(e) = ranking::recalculate_all(&db).await {
                        tracing::error!("Failed to recalculate ranks: {:#?}", e);
                    }
                }
            });
        })
    })
}

/// Periodic badge awarding for the month that last closed. The awarder is
/// idempotent, so firing well past the month boundary (or on demand) is
/// harmless.
pub fn badges_stage(sleep_duration: Duration, atomic_bool: Arc<AtomicBool>) -> AdHoc {
    AdHoc::on_liftoff("Award podium badges every X minutes", move |rocket| {
        Box::pin(async move {
            let db = DB::fetch(rocket)
                .expect("Failed to get DB connection")
                .clone();

            rocket::tokio::spawn(async move {
                let mut interval = rocket::tokio::time::interval(sleep_duration);
                while atomic_bool.load(std::sync::atomic::Ordering::Relaxed) {
                    interval.tick().await;

                    let today = Utc::now().date_naive();
                    if let Some(previous) = previous_month_string(today) {
                        if let Err(e) = badges::award_monthly(&db, &previous).await {
                            tracing::error!("Failed to award badges for {previous}: {:#?}", e);
                        }
                    }
                }
            });
        })
    })
}
