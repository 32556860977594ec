pub mod aggregator;
pub mod badges;
pub mod db;
pub mod github;
pub mod jobs;
pub mod moderation;
pub mod ranking;
