use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Rank given to freshly upserted leaderboard rows. Only the rank
/// recalculation pass assigns real ranks.
pub const UNRANKED: i32 = 999_999;

/// Which write path is touching the monthly leaderboard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteSource {
    /// Low-latency path triggered by profile page views.
    Live,
    /// Precise path triggered by an explicit user refresh.
    Authoritative,
}

/// Merge policy for the contested monthly row: a live write within the grace
/// window of the row's last write is suppressed so it cannot clobber a very
/// recent authoritative write. Authoritative writes always proceed.
pub fn should_write_monthly(
    source: WriteSource,
    last_written_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    grace: Duration,
) -> bool {
    match source {
        WriteSource::Authoritative => true,
        WriteSource::Live => match last_written_at {
            None => true,
            Some(written) => now.signed_duration_since(written) > grace,
        },
    }
}

/// Which leaderboard rows the aggregator may write for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardWrites {
    pub global: bool,
    pub monthly: bool,
}

/// Write plan for one scoring pass. A banned user gets no leaderboard rows
/// at all; otherwise the global row is always written and the monthly row
/// follows the merge policy.
pub fn plan_leaderboard_writes(
    banned: bool,
    source: WriteSource,
    last_written_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    grace: Duration,
) -> LeaderboardWrites {
    if banned {
        return LeaderboardWrites {
            global: false,
            monthly: false,
        };
    }
    LeaderboardWrites {
        global: true,
        monthly: should_write_monthly(source, last_written_at, now, grace),
    }
}

/// One leaderboard row as fetched for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedEntry {
    pub user_id: i32,
    pub score: i64,
    pub contributions: i32,
    pub streak: i32,
    pub rank: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankUpdate {
    pub user_id: i32,
    pub rank: i32,
}

/// Computes the full contiguous ranking of a partition in memory and emits
/// updates only for rows whose rank actually changed. Sort order: score
/// descending, ties broken by contributions, then streak, then user id for
/// stability.
pub fn plan_ranks(mut entries: Vec<RankedEntry>) -> Vec<RankUpdate> {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.contributions.cmp(&a.contributions))
            .then(b.streak.cmp(&a.streak))
            .then(a.user_id.cmp(&b.user_id))
    });

    entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            let rank = position as i32 + 1;
            (entry.rank != rank).then_some(RankUpdate {
                user_id: entry.user_id,
                rank,
            })
        })
        .collect()
}

/// A top-of-month standing considered for a positional badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopEntry {
    pub user_id: i32,
    pub score: i64,
    pub contributions: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeGrant {
    pub user_id: i32,
    pub badge_id: i32,
    pub rank: i32,
    pub score: i64,
    pub contributions: i32,
}

/// Grant-if-absent planning for the podium: pairs each standing with the
/// badge for its position and drops grants that already exist. Applying the
/// returned grants and planning again yields an empty plan, which is what
/// makes the awarder idempotent.
pub fn plan_badge_grants(
    top: &[TopEntry],
    badge_ids: &[i32],
    existing: &HashSet<(i32, i32)>,
) -> Vec<BadgeGrant> {
    top.iter()
        .zip(badge_ids)
        .enumerate()
        .filter_map(|(position, (entry, badge_id))| {
            let grant = BadgeGrant {
                user_id: entry.user_id,
                badge_id: *badge_id,
                rank: position as i32 + 1,
                score: entry.score,
                contributions: entry.contributions,
            };
            (!existing.contains(&(entry.user_id, *badge_id))).then_some(grant)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: i32, score: i64, contributions: i32, streak: i32, rank: i32) -> RankedEntry {
        RankedEntry {
            user_id,
            score,
            contributions,
            streak,
            rank,
        }
    }

    #[test]
    fn ranks_are_contiguous_from_one() {
        let entries = vec![
            entry(1, 500, 10, 3, UNRANKED),
            entry(2, 900, 12, 1, UNRANKED),
            entry(3, 700, 8, 9, UNRANKED),
            entry(4, 100, 1, 0, UNRANKED),
        ];
        let n = entries.len();
        let updates = plan_ranks(entries);
        let mut ranks: Vec<i32> = updates.iter().map(|u| u.rank).collect();
        ranks.sort();
        assert_eq!(ranks, (1..=n as i32).collect::<Vec<_>>());
        assert_eq!(updates[0], RankUpdate { user_id: 2, rank: 1 });
    }

    #[test]
    fn unchanged_ranks_emit_no_writes() {
        let entries = vec![entry(1, 900, 5, 2, 1), entry(2, 500, 3, 1, 2)];
        assert!(plan_ranks(entries).is_empty());
    }

    #[test]
    fn replanning_after_apply_is_empty() {
        let mut entries = vec![
            entry(1, 500, 10, 3, UNRANKED),
            entry(2, 900, 12, 1, UNRANKED),
        ];
        let updates = plan_ranks(entries.clone());
        for update in updates {
            if let Some(e) = entries.iter_mut().find(|e| e.user_id == update.user_id) {
                e.rank = update.rank;
            }
        }
        assert!(plan_ranks(entries).is_empty());
    }

    #[test]
    fn score_ties_break_by_contributions_then_streak() {
        let entries = vec![
            entry(1, 500, 4, 9, UNRANKED),
            entry(2, 500, 7, 0, UNRANKED),
            entry(3, 500, 4, 2, UNRANKED),
        ];
        let updates = plan_ranks(entries);
        assert_eq!(updates[0].user_id, 2);
        assert_eq!(updates[1].user_id, 1);
        assert_eq!(updates[2].user_id, 3);
    }

    #[test]
    fn live_write_suppressed_inside_grace_window() {
        let grace = Duration::seconds(30);
        let written = Utc::now();
        assert!(!should_write_monthly(
            WriteSource::Live,
            Some(written),
            written + Duration::seconds(10),
            grace,
        ));
        assert!(should_write_monthly(
            WriteSource::Live,
            Some(written),
            written + Duration::seconds(40),
            grace,
        ));
    }

    #[test]
    fn authoritative_write_always_proceeds() {
        let written = Utc::now();
        assert!(should_write_monthly(
            WriteSource::Authoritative,
            Some(written),
            written,
            Duration::seconds(30),
        ));
    }

    #[test]
    fn first_live_write_proceeds() {
        assert!(should_write_monthly(
            WriteSource::Live,
            None,
            Utc::now(),
            Duration::seconds(30),
        ));
    }

    #[test]
    fn banned_user_gets_no_leaderboard_writes() {
        let now = Utc::now();
        let grace = Duration::seconds(30);
        for source in [WriteSource::Live, WriteSource::Authoritative] {
            let writes = plan_leaderboard_writes(true, source, None, now, grace);
            assert!(!writes.global);
            assert!(!writes.monthly);
        }
    }

    #[test]
    fn unbanned_user_writes_follow_merge_policy() {
        let now = Utc::now();
        let grace = Duration::seconds(30);
        let writes = plan_leaderboard_writes(
            false,
            WriteSource::Live,
            Some(now - Duration::seconds(10)),
            now,
            grace,
        );
        assert!(writes.global);
        assert!(!writes.monthly);

        let writes = plan_leaderboard_writes(
            false,
            WriteSource::Authoritative,
            Some(now - Duration::seconds(10)),
            now,
            grace,
        );
        assert!(writes.global);
        assert!(writes.monthly);
    }

    #[test]
    fn removed_row_recloses_rank_gap() {
        // A partition ranked 1..=3 whose middle row was deleted
        let entries = vec![entry(1, 900, 5, 2, 1), entry(3, 500, 3, 1, 3)];
        let updates = plan_ranks(entries);
        assert_eq!(updates, vec![RankUpdate { user_id: 3, rank: 2 }]);
    }

    #[test]
    fn badge_plan_is_idempotent() {
        let top = vec![
            TopEntry {
                user_id: 7,
                score: 900,
                contributions: 40,
            },
            TopEntry {
                user_id: 3,
                score: 700,
                contributions: 31,
            },
        ];
        let badge_ids = [101, 102, 103];
        let mut existing = HashSet::new();

        let first = plan_badge_grants(&top, &badge_ids, &existing);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].rank, 1);
        assert_eq!(first[0].badge_id, 101);

        for grant in &first {
            existing.insert((grant.user_id, grant.badge_id));
        }
        assert!(plan_badge_grants(&top, &badge_ids, &existing).is_empty());
    }

    #[test]
    fn short_podium_grants_only_present_positions() {
        let top = vec![TopEntry {
            user_id: 1,
            score: 10,
            contributions: 1,
        }];
        let grants = plan_badge_grants(&top, &[101, 102, 103], &HashSet::new());
        assert_eq!(grants.len(), 1);
    }
}
