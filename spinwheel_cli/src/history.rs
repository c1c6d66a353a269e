use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use spinwheel_core::RiskTier;
use spinwheel_shared::{FairDraw, HistoryEntry};

/// Append-only spin history kept in SQLite.
#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

/// Narrows listings and summaries. Empty matches every spin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub risk: Option<RiskTier>,
    /// Keep spins whose profit (payout - bet) is at least this.
    pub min_profit: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySummary {
    pub total_bets: i64,
    pub total_volume: f64,
    /// Largest profit of a single spin; `None` when there are no spins.
    pub biggest_win: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct SpinRow {
    id: i64,
    ts: String,
    risk: String,
    segment_count: i64,
    bet: f64,
    multiplier: f64,
    payout: f64,
    target_angle: f64,
    nonce: Option<i64>,
    client_seed: Option<String>,
    server_seed_hash: Option<String>,
}

impl TryFrom<SpinRow> for HistoryEntry {
    type Error = anyhow::Error;

    fn try_from(r: SpinRow) -> anyhow::Result<Self> {
        let fair = match (r.nonce, r.client_seed, r.server_seed_hash) {
            (Some(nonce), Some(client_seed), Some(server_seed_hash)) => Some(FairDraw {
                client_seed,
                server_seed_hash,
                nonce: u64::try_from(nonce)?,
            }),
            _ => None,
        };
        Ok(HistoryEntry {
            id: r.id,
            ts: DateTime::parse_from_rfc3339(&r.ts)
                .with_context(|| format!("bad timestamp in spin {}", r.id))?
                .with_timezone(&Utc),
            risk: r.risk.parse()?,
            segment_count: u32::try_from(r.segment_count)?,
            bet: r.bet,
            multiplier: r.multiplier,
            payout: r.payout,
            target_angle: r.target_angle,
            fair,
        })
    }
}

const SELECT_SPINS: &str = "SELECT id, ts, risk, segment_count, bet, multiplier, payout, \
     target_angle, nonce, client_seed, server_seed_hash FROM spins";

// each placeholder pair is bound twice so NULL disables the clause
const FILTER: &str = "WHERE (? IS NULL OR risk = ?) AND (? IS NULL OR payout - bet >= ?)";

impl HistoryStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("opening history database {url}"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn record(&self, entry: &HistoryEntry) -> anyhow::Result<i64> {
        let fair = entry.fair.as_ref();
        let nonce = fair.map(|f| i64::try_from(f.nonce)).transpose()?;
        let id = sqlx::query(
            "INSERT INTO spins (ts, risk, segment_count, bet, multiplier, payout, target_angle, nonce, client_seed, server_seed_hash) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.ts.to_rfc3339())
        .bind(entry.risk.as_str())
        .bind(i64::from(entry.segment_count))
        .bind(entry.bet)
        .bind(entry.multiplier)
        .bind(entry.payout)
        .bind(entry.target_angle)
        .bind(nonce)
        .bind(fair.map(|f| f.client_seed.as_str()))
        .bind(fair.map(|f| f.server_seed_hash.as_str()))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    /// Newest first, at most `n` rows.
    pub async fn recent(
        &self,
        n: u32,
        filter: &HistoryFilter,
    ) -> anyhow::Result<Vec<HistoryEntry>> {
        let sql = format!("{SELECT_SPINS} {FILTER} ORDER BY id DESC LIMIT ?");
        let risk = filter.risk.map(RiskTier::as_str);
        let rows = sqlx::query_as::<_, SpinRow>(&sql)
            .bind(risk)
            .bind(risk)
            .bind(filter.min_profit)
            .bind(filter.min_profit)
            .bind(i64::from(n))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(HistoryEntry::try_from).collect()
    }

    /// Oldest first.
    pub async fn all(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        let sql = format!("{SELECT_SPINS} ORDER BY id ASC");
        let rows = sqlx::query_as::<_, SpinRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(HistoryEntry::try_from).collect()
    }

    pub async fn summary(&self, filter: &HistoryFilter) -> anyhow::Result<HistorySummary> {
        let sql = format!(
            "SELECT COUNT(*), COALESCE(SUM(bet), 0.0), MAX(payout - bet) FROM spins {FILTER}"
        );
        let risk = filter.risk.map(RiskTier::as_str);
        let (total_bets, total_volume, biggest_win): (i64, f64, Option<f64>) =
            sqlx::query_as(&sql)
                .bind(risk)
                .bind(risk)
                .bind(filter.min_profit)
                .bind(filter.min_profit)
                .fetch_one(&self.pool)
                .await?;
        Ok(HistorySummary {
            total_bets,
            total_volume,
            biggest_win,
        })
    }

    /// Nonce following the last spin drawn from this seed pair.
    pub async fn next_nonce(
        &self,
        server_seed_hash: &str,
        client_seed: &str,
    ) -> anyhow::Result<u64> {
        let last: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(nonce) FROM spins WHERE server_seed_hash = ? AND client_seed = ?",
        )
        .bind(server_seed_hash)
        .bind(client_seed)
        .fetch_one(&self.pool)
        .await?;
        Ok(last.map_or(0, |n| n as u64 + 1))
    }

    pub async fn export_csv(&self, path: &Path) -> anyhow::Result<usize> {
        let entries = self.all().await?;
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record([
            "id",
            "ts",
            "risk",
            "segments",
            "bet",
            "multiplier",
            "payout",
            "client_seed",
            "server_seed_hash",
            "nonce",
        ])?;
        for e in &entries {
            let fair = e.fair.as_ref();
            wtr.write_record(&[
                e.id.to_string(),
                e.ts.to_rfc3339(),
                e.risk.to_string(),
                e.segment_count.to_string(),
                e.bet.to_string(),
                e.multiplier_label(),
                e.payout.to_string(),
                fair.map(|f| f.client_seed.clone()).unwrap_or_default(),
                fair.map(|f| f.server_seed_hash.clone()).unwrap_or_default(),
                fair.map(|f| f.nonce.to_string()).unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;
        Ok(entries.len())
    }
}
