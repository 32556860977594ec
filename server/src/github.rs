use anyhow::Context;
use chrono::NaiveDate;
use octocrab::Octocrab;
use serde::Deserialize;
use tracing::instrument;

use shared::{ContributionCalendar, ContributionDay, ProfileStats};

const CONTRIBUTIONS_QUERY: &str = r#"
query($login: String!) {
  user(login: $login) {
    contributionsCollection {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            date
            contributionCount
          }
        }
      }
    }
  }
}
"#;

// The GraphQL payload is untrusted: every field is optional or defaulted so
// partial responses degrade instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsResponse {
    #[serde(default)]
    data: ContributionsData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsData {
    #[serde(default)]
    user: Option<ContributionsUser>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsUser {
    #[serde(default)]
    contributions_collection: ContributionsCollection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    #[serde(default)]
    contribution_calendar: RawCalendar,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCalendar {
    #[serde(default)]
    total_contributions: u32,
    #[serde(default)]
    weeks: Vec<RawWeek>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWeek {
    #[serde(default)]
    contribution_days: Vec<RawDay>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDay {
    #[serde(default)]
    date: String,
    #[serde(default)]
    contribution_count: u32,
}

#[derive(Debug, Default, Deserialize)]
struct RawProfile {
    #[serde(default)]
    public_repos: u32,
    #[serde(default)]
    followers: u32,
    #[serde(default)]
    following: u32,
    #[serde(default)]
    bio: Option<String>,
}

#[derive(Clone, Debug)]
pub struct GithubClient {
    octocrab: Octocrab,
}

impl GithubClient {
    pub fn new(github_token: String) -> anyhow::Result<Self> {
        let octocrab = octocrab::Octocrab::builder()
            .personal_token(github_token)
            .build()?;
        Ok(Self { octocrab })
    }

    /// Trailing contribution window for a handle. A missing user or an
    /// unreachable API is an error here: with no contribution data there is
    /// nothing to score.
    #[instrument(skip(self))]
    pub async fn contribution_calendar(&self, login: &str) -> anyhow::Result<ContributionCalendar> {
        let response: ContributionsResponse = self
            .octocrab
            .graphql(&serde_json::json!({
                "query": CONTRIBUTIONS_QUERY,
                "variables": { "login": login },
            }))
            .await?;

        let user = response
            .data
            .user
            .with_context(|| format!("no contribution data for {login}"))?;
        let calendar = user.contributions_collection.contribution_calendar;

        let mut days = Vec::new();
        for week in calendar.weeks {
            for day in week.contribution_days {
                let date = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
                    .with_context(|| format!("malformed contribution date: {}", day.date))?;
                days.push(ContributionDay {
                    date,
                    contribution_count: day.contribution_count,
                });
            }
        }

        Ok(ContributionCalendar {
            total_contributions: calendar.total_contributions,
            days,
        })
    }

    /// Static profile attributes for the quality bonus. Callers degrade a
    /// failure here to `ProfileStats::default()` rather than aborting.
    #[instrument(skip(self))]
    pub async fn profile_stats(&self, login: &str) -> anyhow::Result<ProfileStats> {
        let profile: RawProfile = self
            .octocrab
            .get(format!("/users/{login}"), None::<&()>)
            .await?;

        Ok(ProfileStats {
            public_repos: profile.public_repos,
            followers: profile.followers,
            following: profile.following,
            has_bio: profile.bio.map(|b| !b.trim().is_empty()).unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_graphql_payload_deserializes_with_defaults() {
        let raw = r#"{"data":{"user":{"contributionsCollection":{"contributionCalendar":{
            "weeks":[{"contributionDays":[{"date":"2024-03-10","contributionCount":4},{}]}]}}}}}"#;
        let parsed: ContributionsResponse = serde_json::from_str(raw).unwrap();
        let user = parsed.data.user.unwrap();
        let calendar = user.contributions_collection.contribution_calendar;
        assert_eq!(calendar.total_contributions, 0);
        assert_eq!(calendar.weeks[0].contribution_days.len(), 2);
        assert_eq!(calendar.weeks[0].contribution_days[0].contribution_count, 4);
    }

    #[test]
    fn missing_user_payload_deserializes_to_none() {
        let raw = r#"{"data":{"user":null}}"#;
        let parsed: ContributionsResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.data.user.is_none());
    }

    #[test]
    fn profile_defaults_cover_absent_fields() {
        let profile: RawProfile = serde_json::from_str(r#"{"login":"octocat"}"#).unwrap();
        assert_eq!(profile.public_repos, 0);
        assert!(profile.bio.is_none());
    }
}
