use aura_server::db::DB;
use rocket::serde::json::Json;

use super::types::{LeaderboardResponse, PaginatedResponse, WinnerResponse};

#[utoipa::path(context_path = "/leaderboard", responses(
    (status = 200, description = "Get ranked leaderboard page", body = PaginatedLeaderboardResponse)
))]
#[get("/users/<period>?<page>&<limit>")]
async fn get_leaderboard(
    db: &DB,
    period: &str,
    page: Option<u64>,
    limit: Option<u64>,
) -> Option<Json<PaginatedResponse<LeaderboardResponse>>> {
    let page = page.unwrap_or(0);
    let limit = limit.unwrap_or(50).max(1);
    let (records, total) = match db.get_leaderboard(period, page as i64, limit as i64).await {
        Err(e) => {
            error!("Failed to get leaderboard: {period}: {e}");
            return None;
        }
        Ok(value) => value,
    };
    Some(Json(PaginatedResponse::new(
        records.into_iter().map(Into::into).collect(),
        page + 1,
        limit,
        total as u64,
    )))
}

#[utoipa::path(context_path = "/leaderboard", responses(
    (status = 200, description = "Get a user's rank in a partition; 0 if not yet ranked", body = i32)
))]
#[get("/users/<period>/<login>")]
async fn get_leaderboard_place(db: &DB, period: &str, login: &str) -> Option<Json<i32>> {
    match db.get_leaderboard_place(period, login).await {
        Err(e) => {
            error!("Failed to get leaderboard place: {period}/{login}: {e}");
            None
        }
        Ok(place) => Some(Json(place.unwrap_or(0))),
    }
}

#[utoipa::path(context_path = "/leaderboard", responses(
    (status = 200, description = "Get the immutable winners snapshot for a month", body = Vec<WinnerResponse>)
))]
#[get("/winners/<month>")]
async fn get_winners(db: &DB, month: &str) -> Option<Json<Vec<WinnerResponse>>> {
    match db.get_monthly_winners(month).await {
        Err(e) => {
            error!("Failed to get winners for {month}: {e}");
            None
        }
        Ok(records) => Some(Json(records.into_iter().map(Into::into).collect())),
    }
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing leaderboard entrypoints", |rocket| async {
        rocket.mount(
            "/leaderboard",
            rocket::routes![get_leaderboard, get_leaderboard_place, get_winners],
        )
    })
}
