use std::sync::Arc;

use aura_server::{
    aggregator::{self, AuraSummary, ScoreConfig},
    db::DB,
    github::GithubClient,
};
use chrono::Utc;
use rocket::{serde::json::Json, State};
use shared::{TimePeriod, WriteSource};

use super::types::UserProfileResponse;

/// Profile view. Doubles as the low-latency scoring trigger: the page view
/// refreshes the user's aura through the live write path before reading. A
/// failed refresh degrades to serving whatever is already stored.
#[utoipa::path(context_path = "/users", responses(
    (status = 200, description = "Get user profile with aura, streaks, ranks and badges", body = UserProfileResponse)
))]
#[get("/<login>")]
async fn get_user(
    login: &str,
    db: &DB,
    github: &State<Arc<GithubClient>>,
    config: &State<ScoreConfig>,
) -> Option<Json<UserProfileResponse>> {
    let live = aggregator::score_user(
        db,
        github.inner().as_ref(),
        config.inner(),
        login,
        WriteSource::Live,
    )
    .await;
    if let Err(e) = live {
        warn!("Live scoring pass failed for {login}: {e:#}");
    }

    let user = match db.get_user(login).await {
        Err(e) => {
            error!("Failed to get user {login}: {e}");
            return None;
        }
        Ok(value) => value?,
    };

    let month = TimePeriod::Month.time_string(Utc::now().date_naive());
    let monthly_rank = db.get_leaderboard_place(&month, login).await.ok().flatten();
    let global_rank = db
        .get_leaderboard_place("all-time", login)
        .await
        .ok()
        .flatten();
    let badges = match db.get_user_badges(user.id).await {
        Err(e) => {
            error!("Failed to get badges for {login}: {e}");
            return None;
        }
        Ok(value) => value,
    };
    let recent = match db.get_recent_calculations(user.id, 30).await {
        Err(e) => {
            error!("Failed to get aura breakdown for {login}: {e}");
            return None;
        }
        Ok(value) => value,
    };

    Some(Json(UserProfileResponse::new(
        user,
        monthly_rank,
        global_rank,
        badges,
        recent,
    )))
}

/// Explicit refresh: the authoritative write path. Unlike the live path it
/// is never suppressed by the grace window.
#[utoipa::path(context_path = "/users", responses(
    (status = 200, description = "Recompute the user's aura from GitHub", body = AuraSummary)
))]
#[post("/<login>/refresh")]
async fn refresh_user(
    login: &str,
    db: &DB,
    github: &State<Arc<GithubClient>>,
    config: &State<ScoreConfig>,
) -> Option<Json<AuraSummary>> {
    let refreshed = aggregator::score_user(
        db,
        github.inner().as_ref(),
        config.inner(),
        login,
        WriteSource::Authoritative,
    )
    .await;
    match refreshed {
        Err(e) => {
            error!("Failed to refresh {login}: {e:#}");
            None
        }
        Ok(summary) => Some(Json(summary)),
    }
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing user entrypoints", |rocket| async {
        rocket.mount("/users", rocket::routes![get_user, refresh_user])
    })
}
