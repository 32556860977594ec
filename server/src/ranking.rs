use std::fmt;

use tracing::{info, instrument};

use shared::plan_ranks;

use crate::db::DB;

/// Rank writes are flushed in bounded batches purely as a throughput
/// optimization; the whole pass commits as one transaction.
const RANK_WRITE_BATCH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partition {
    Month(String),
    Global,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Month(month) => write!(f, "month:{month}"),
            Partition::Global => write!(f, "global"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RankingOutcome {
    pub rows: usize,
    pub updated: usize,
}

/// Recomputes the full contiguous 1..=N ranking of one partition and writes
/// only the ranks that changed. Idempotent, and safe to run concurrently
/// with aggregator upserts: a row added mid-pass simply keeps its sentinel
/// rank until the next run.
#[instrument(skip(db))]
pub async fn recalculate(db: &DB, partition: &Partition) -> anyhow::Result<RankingOutcome> {
    let mut tx = db.begin().await?;

    let entries = match partition {
        Partition::Month(month) => DB::monthly_partition(&mut tx, month).await?,
        Partition::Global => DB::global_partition(&mut tx).await?,
    };
    let rows = entries.len();

    let updates = plan_ranks(entries);
    let updated = updates.len();
    for chunk in updates.chunks(RANK_WRITE_BATCH) {
        match partition {
            Partition::Month(month) => DB::update_monthly_ranks(&mut tx, month, chunk).await?,
            Partition::Global => DB::update_global_ranks(&mut tx, chunk).await?,
        }
    }

    tx.commit().await?;

    info!("Recalculated {partition}: {rows} rows, {updated} rank changes");
    Ok(RankingOutcome { rows, updated })
}

/// One scheduler tick: every known monthly partition plus the global one.
/// Closed months are included so row deletions (bans) re-close rank gaps
/// there too.
pub async fn recalculate_all(db: &DB) -> anyhow::Result<()> {
    for month in db.month_partitions().await? {
        recalculate(db, &Partition::Month(month)).await?;
    }
    recalculate(db, &Partition::Global).await?;
    Ok(())
}
