use aura_server::{db::DB, moderation};
use rocket::{http::Status, serde::json::Json};

use super::types::BanRequest;

/// Synchronous ban trigger for the admin collaborator. A failure here means
/// the ban did not happen and the caller should retry.
#[utoipa::path(context_path = "/admin", responses(
    (status = 200, description = "Ban a user and remove their leaderboard rows"),
    (status = 500, description = "Ban failed; safe to retry")
))]
#[post("/users/<login>/ban", data = "<request>")]
async fn ban_user(login: &str, request: Json<BanRequest>, db: &DB) -> Status {
    match moderation::ban_user(db, login, &request.reason, request.expires_at).await {
        Ok(()) => Status::Ok,
        Err(e) => {
            error!("Failed to ban {login}: {e:#}");
            Status::InternalServerError
        }
    }
}

#[utoipa::path(context_path = "/admin", responses(
    (status = 200, description = "Lift a user's ban; leaderboard rows are not restored")
))]
#[post("/users/<login>/unban")]
async fn unban_user(login: &str, db: &DB) -> Status {
    match moderation::unban_user(db, login).await {
        Ok(()) => Status::Ok,
        Err(e) => {
            error!("Failed to unban {login}: {e:#}");
            Status::InternalServerError
        }
    }
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing moderation entrypoints", |rocket| async {
        rocket.mount("/admin", rocket::routes![ban_user, unban_user])
    })
}
