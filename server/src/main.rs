#[macro_use]
extern crate rocket;

mod entrypoints;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use aura_server::{aggregator::ScoreConfig, db, github::GithubClient, jobs};

#[derive(Debug, serde::Deserialize)]
pub struct Env {
    github_token: String,
    rank_interval_in_minutes: Option<u32>,
    badge_interval_in_minutes: Option<u32>,
    grace_window_in_seconds: Option<u32>,
}

#[launch]
async fn rocket() -> _ {
    dotenv::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().pretty());
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let env = envy::from_env::<Env>().expect("Failed to load environment variables");

    let github_client =
        GithubClient::new(env.github_token.clone()).expect("Failed to create GitHub client");

    let mut score_config = ScoreConfig::default();
    if let Some(seconds) = env.grace_window_in_seconds {
        score_config.grace_window = chrono::Duration::seconds(seconds as i64);
    }

    let rank_interval = Duration::from_secs(env.rank_interval_in_minutes.unwrap_or(5) as u64 * 60);
    let badge_interval =
        Duration::from_secs(env.badge_interval_in_minutes.unwrap_or(60) as u64 * 60);
    let atomic_bool = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let atomic_bool_clone = atomic_bool.clone();

    let cors = rocket_cors::CorsOptions::default()
        .to_cors()
        .expect("Failed to create CORS config");

    let span = tracing::info_span!("Starting Rocket");
    let _enter = span.enter();

    rocket::build()
        .manage(Arc::new(github_client))
        .manage(score_config)
        .attach(cors)
        .attach(db::stage())
        .attach(jobs::ranking_stage(rank_interval, atomic_bool.clone()))
        .attach(jobs::badges_stage(badge_interval, atomic_bool))
        .attach(rocket::fairing::AdHoc::on_shutdown(
            "Stop background jobs",
            move |_| {
                Box::pin(async move {
                    atomic_bool_clone.store(false, std::sync::atomic::Ordering::Relaxed);
                })
            },
        ))
        .attach(entrypoints::stage())
}
