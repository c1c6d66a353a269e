mod history;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rand::rngs::ThreadRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spinwheel_core::{
    derive_hash_hex, manual_spin, resolve_table, verify_outcome, AutoBetConfig, AutoBetSession, DrawSource,
    EngineConfig, ProvablyFairRng, RiskTier, SegmentCount, ThreadDraws,
};
use spinwheel_shared::{FairDraw, HistoryEntry, WheelFrame};

use crate::history::{HistoryFilter, HistoryStore};

#[derive(Parser)]
#[command(name = "spinwheel", about = "Spin the wheel from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://spinwheel.db
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Secret seed for provably-fair draws; OS randomness when absent
    #[arg(long, global = true, env = "SPINWHEEL_SERVER_SEED")]
    server_seed: Option<String>,
    #[arg(long, global = true, default_value = "default-client-seed")]
    client_seed: String,
}

#[derive(Args, Clone)]
struct WheelArgs {
    #[arg(long, default_value = "medium")]
    risk: RiskTier,
    #[arg(long, default_value_t = 10)]
    segments: usize,
}

#[derive(Args, Clone)]
struct EngineArgs {
    #[arg(long, default_value_t = spinwheel_core::DEFAULT_FULL_ROTATIONS)]
    rotations: u32,
    #[arg(long, default_value_t = 3000)]
    spin_ms: u64,
    #[arg(long, default_value_t = 2000)]
    result_ms: u64,
}

impl From<&EngineArgs> for EngineConfig {
    fn from(a: &EngineArgs) -> Self {
        EngineConfig {
            full_rotations: a.rotations,
            spin_duration_ms: a.spin_ms,
            result_display_ms: a.result_ms,
        }
    }
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Only spins of this risk tier
    #[arg(long)]
    risk: Option<RiskTier>,
    /// Only spins that won at least this much (payout - bet)
    #[arg(long)]
    min_profit: Option<f64>,
}

impl From<&FilterArgs> for HistoryFilter {
    fn from(a: &FilterArgs) -> Self {
        HistoryFilter {
            risk: a.risk,
            min_profit: a.min_profit,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the wedge layout and odds for a wheel
    Table {
        #[command(flatten)]
        wheel: WheelArgs,
    },
    /// Place one bet
    Spin {
        #[command(flatten)]
        wheel: WheelArgs,
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long, default_value_t = 10.0)]
        bet: f64,
        #[arg(long, default_value_t = 1000.0)]
        balance: f64,
        /// Print the renderer frame as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run an automated betting session
    Auto {
        #[command(flatten)]
        wheel: WheelArgs,
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long, default_value_t = 10)]
        bets: u32,
        #[arg(long, default_value_t = 10.0)]
        bet: f64,
        #[arg(long, default_value_t = 1000.0)]
        balance: f64,
        /// Percent to raise the bet after a win
        #[arg(long, default_value_t = 0.0)]
        on_win: f64,
        /// Percent to raise the bet after a loss
        #[arg(long, default_value_t = 0.0)]
        on_loss: f64,
        #[arg(long, default_value_t = 0.0)]
        stop_profit: f64,
        #[arg(long, default_value_t = 0.0)]
        stop_loss: f64,
        /// Wait out the spin animation and result display between rounds
        #[arg(long)]
        animate: bool,
    },
    /// View the last N spins
    History {
        #[arg(default_value_t = 20)]
        n: u32,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Totals over recorded spins
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Export all spins to a CSV file
    ExportCsv { path: PathBuf },
    /// Check that a provably-fair spin landed where it should have
    Verify {
        #[command(flatten)]
        wheel: WheelArgs,
        #[arg(long)]
        nonce: u64,
        #[arg(long)]
        index: usize,
    },
}

enum Draws {
    Fair {
        rng: ProvablyFairRng,
        server_seed_hash: String,
    },
    Os(ThreadDraws<ThreadRng>),
}

impl Draws {
    /// Provably-fair draws resume after the last nonce stored for the seed pair.
    async fn open(
        store: &HistoryStore,
        server_seed: Option<&str>,
        client_seed: &str,
    ) -> anyhow::Result<Self> {
        let Some(seed) = server_seed else {
            return Ok(Draws::Os(ThreadDraws::os_seeded()));
        };
        let server_seed_hash = derive_hash_hex(seed.as_bytes());
        let nonce = store.next_nonce(&server_seed_hash, client_seed).await?;
        info!(%server_seed_hash, client_seed, nonce, "provably-fair draws");
        Ok(Draws::Fair {
            rng: ProvablyFairRng::new(seed, client_seed, nonce),
            server_seed_hash,
        })
    }

    /// Seeds and nonce the next draw will use.
    fn fair_draw(&self) -> Option<FairDraw> {
        match self {
            Draws::Fair {
                rng,
                server_seed_hash,
            } => Some(FairDraw {
                client_seed: rng.client_seed.clone(),
                server_seed_hash: server_seed_hash.clone(),
                nonce: rng.nonce,
            }),
            Draws::Os(_) => None,
        }
    }
}

impl DrawSource for Draws {
    fn next_draw(&mut self) -> f64 {
        match self {
            Draws::Fair { rng, .. } => rng.next_draw(),
            Draws::Os(rng) => rng.next_draw(),
        }
    }
}

fn print_table(wheel: &WheelArgs) -> anyhow::Result<()> {
    let table = resolve_table(wheel.risk, SegmentCount::new(wheel.segments)?);
    println!("risk={} segments={}", table.tier(), table.len());
    for (i, s) in table.segments().iter().enumerate() {
        println!("  #{:>3} {:>6.2}x {}", i, s.multiplier, s.color);
    }
    for share in table.multiplier_shares() {
        println!(
            "{:>6.2}x  {:>3} wedges  {:>5.1}%",
            share.multiplier,
            share.count,
            share.probability * 100.0
        );
    }
    println!("expected return {:.4}", table.expected_return());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();
    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| "sqlite://spinwheel.db".into());

    match cli.command {
        Commands::Table { wheel } => print_table(&wheel)?,
        Commands::Spin {
            wheel,
            engine,
            bet,
            mut balance,
            json,
        } => {
            let store = HistoryStore::connect(&url).await?;
            let table = resolve_table(wheel.risk, SegmentCount::new(wheel.segments)?);
            let mut draws =
                Draws::open(&store, cli.server_seed.as_deref(), &cli.client_seed).await?;
            let fair = draws.fair_draw();
            let config = EngineConfig::from(&engine);
            let (outcome, settlement) =
                manual_spin(&table, bet, &mut balance, &mut draws, &config)?;
            let entry = HistoryEntry::from_spin(&table, &outcome, &settlement, fair)?;
            let id = store.record(&entry).await?;
            if json {
                let frame = WheelFrame::new(&table, &outcome, config.spin_duration_ms);
                println!("{}", serde_json::to_string_pretty(&frame)?);
            } else {
                println!(
                    "#{} landed on wedge {} -> {} payout={:.2} balance={:.2}",
                    id,
                    outcome.selected_index,
                    entry.multiplier_label(),
                    settlement.payout,
                    balance
                );
            }
        }
        Commands::Auto {
            wheel,
            engine,
            bets,
            bet,
            balance,
            on_win,
            on_loss,
            stop_profit,
            stop_loss,
            animate,
        } => {
            let store = HistoryStore::connect(&url).await?;
            let config = EngineConfig::from(&engine);
            let mut session = AutoBetSession::new(
                AutoBetConfig {
                    number_of_bets: bets,
                    base_bet: bet,
                    win_increase: on_win / 100.0,
                    loss_increase: on_loss / 100.0,
                    stop_profit,
                    stop_loss,
                    risk: wheel.risk,
                    segment_count: wheel.segments,
                },
                balance,
            )?;
            let mut draws =
                Draws::open(&store, cli.server_seed.as_deref(), &cli.client_seed).await?;
            loop {
                let fair = draws.fair_draw();
                let Some(round) = session.play_round(&mut draws, &config) else {
                    break;
                };
                let entry = HistoryEntry::from_spin(
                    session.table(),
                    &round.outcome,
                    &round.settlement,
                    fair,
                )?;
                store.record(&entry).await?;
                println!(
                    "round {:>3}: bet={:.2} {} payout={:.2} balance={:.2}",
                    round.number,
                    round.settlement.bet,
                    entry.multiplier_label(),
                    round.settlement.payout,
                    round.balance_after
                );
                if animate {
                    tokio::time::sleep(Duration::from_millis(
                        config.spin_duration_ms + config.result_display_ms,
                    ))
                    .await;
                }
            }
            let state = session.state();
            println!(
                "stopped: {:?} profit={:.2} balance={:.2} next_bet={:.2}",
                session.stop_reason(),
                state.total_profit,
                state.balance,
                state.current_bet
            );
        }
        Commands::History { n, filter } => {
            let store = HistoryStore::connect(&url).await?;
            for e in store.recent(n, &HistoryFilter::from(&filter)).await? {
                let seeds = match &e.fair {
                    Some(f) => format!(
                        " client_seed={} hash={} nonce={}",
                        f.client_seed, f.server_seed_hash, f.nonce
                    ),
                    None => String::new(),
                };
                println!(
                    "#{:>6} {} {:<6} seg={:<3} bet={:.2} {} payout={:.2}{}",
                    e.id,
                    e.ts.format("%Y-%m-%d %H:%M:%S"),
                    e.risk,
                    e.segment_count,
                    e.bet,
                    e.multiplier_label(),
                    e.payout,
                    seeds
                );
            }
        }
        Commands::Summary { filter } => {
            let store = HistoryStore::connect(&url).await?;
            let summary = store.summary(&HistoryFilter::from(&filter)).await?;
            println!(
                "bets={} volume={:.2} biggest_win={}",
                summary.total_bets,
                summary.total_volume,
                summary
                    .biggest_win
                    .map_or_else(|| "-".to_string(), |w| format!("{w:.2}"))
            );
        }
        Commands::ExportCsv { path } => {
            let store = HistoryStore::connect(&url).await?;
            let total = store.export_csv(&path).await?;
            println!("Exported {} rows to {}", total, path.display());
        }
        Commands::Verify { wheel, nonce, index } => {
            let Some(seed) = cli.server_seed.as_deref() else {
                anyhow::bail!("verify needs --server-seed");
            };
            let count = SegmentCount::new(wheel.segments)?;
            if verify_outcome(seed, &cli.client_seed, nonce, wheel.risk, count, index) {
                println!("ok: nonce {} lands on wedge {}", nonce, index);
            } else {
                warn!(nonce, index, "verification failed");
                println!("mismatch: nonce {} does not land on wedge {}", nonce, index);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn history_rejects_negative_count() {
        assert!(Cli::try_parse_from(["spinwheel", "history", "--", "-1"]).is_err());
    }

    #[test]
    fn history_filters_parse() {
        let cli = Cli::try_parse_from([
            "spinwheel",
            "history",
            "5",
            "--risk",
            "high",
            "--min-profit",
            "500",
        ])
        .unwrap();
        let Commands::History { n, filter } = cli.command else {
            panic!("expected history command");
        };
        assert_eq!(n, 5);
        assert_eq!(
            HistoryFilter::from(&filter),
            HistoryFilter {
                risk: Some(RiskTier::High),
                min_profit: Some(500.0),
            }
        );
    }
}
