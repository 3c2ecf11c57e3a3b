mod chain;
mod config;
mod countdown;
mod error;
mod executor;
mod model;
mod oracle;
mod referral;
mod scheduler;
mod tokens;

use alloy_primitives::Address;
use chrono::Utc;
use clap::{Parser, Subcommand};
use console::style;
use eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chain::ChainReader;
use config::Config;
use countdown::{breakdown, format_parts, ClockMode};
use executor::{TransactionSubmitter, WalletSession};
use model::plan_label;
use oracle::PriceOracle;
use scheduler::{RefreshScheduler, SharedSnapshot, Snapshot};
use tokens::{pool_by_pid, token_by_symbol};

#[derive(Parser)]
#[command(name = "stakewatch", version, about = "LP staking console for the KIND/HUG pools on the BNB chain")]
struct Cli {
    /// TOML config file; environment variables (and .env) otherwise
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Live console: poll the chain and render positions with countdowns
    Watch {
        #[arg(long, default_value_t = 0)]
        pid: u64,
    },
    /// One-shot snapshot of the watched address
    Status {
        #[arg(long, default_value_t = 0)]
        pid: u64,
        /// Emit the snapshot as JSON instead of the console view
        #[arg(long)]
        json: bool,
    },
    /// Approve the pool's LP token and stake it
    Stake {
        /// LP amount in display units
        amount: String,
        #[arg(long, default_value_t = 0)]
        pid: u64,
        #[arg(long, default_value_t = 0)]
        plan: u64,
        /// Referrer address; malformed or zero values are dropped
        #[arg(long)]
        referrer: Option<String>,
    },
    /// Claim accrued rewards on a position
    Claim { id: u64 },
    /// Close a position and withdraw its LP
    Unstake { id: u64 },
    /// Router view quote for an exact-input swap
    Quote {
        from: String,
        to: String,
        amount: String,
    },
    /// Swap an exact input between BNB, KIND, and HUG
    Swap {
        from: String,
        to: String,
        amount: String,
    },
    /// Add token + BNB liquidity at the current pool ratio
    AddLiquidity { token: String, amount: String },
    /// Write the active settings to a TOML config file
    Init {
        #[arg(default_value = "stakewatch.toml")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "stakewatch=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    // Keep stdout machine-readable when JSON output was asked for.
    if !matches!(cli.command, Command::Status { json: true, .. }) {
        print_banner();
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;
    let staking = config.staking_address()?;

    match cli.command {
        Command::Watch { pid } => watch(config, staking, pid).await,
        Command::Status { pid, json } => {
            let wallet = WalletSession::from_env(config.chain_id);
            let user = watched_user(&config, wallet.as_ref());
            let snap = snapshot_once(&config, staking, user, pid).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&snap)?);
            } else {
                print_snapshot(&snap, pid);
            }
            Ok(())
        }
        Command::Stake {
            amount,
            pid,
            plan,
            referrer,
        } => {
            let submitter = submitter(&config, staking);
            let referrer = referrer.or_else(|| config.referrer.clone());
            let hash = submitter
                .stake_lp(pid, &amount, plan, referrer.as_deref())
                .await?;
            after_write(&config, staking, pid, hash).await;
            Ok(())
        }
        Command::Claim { id } => {
            let submitter = submitter(&config, staking);
            let pid = position_pool(&config, staking, id).await;
            let hash = submitter.claim(id).await?;
            after_write(&config, staking, pid, hash).await;
            Ok(())
        }
        Command::Unstake { id } => {
            let submitter = submitter(&config, staking);
            let pid = position_pool(&config, staking, id).await;
            let hash = submitter.unstake(id).await?;
            after_write(&config, staking, pid, hash).await;
            Ok(())
        }
        Command::Quote { from, to, amount } => {
            let from_token = token_by_symbol(&from)
                .ok_or_else(|| error::ClientError::UnsupportedAsset(from.clone()))?;
            let to_token = token_by_symbol(&to)
                .ok_or_else(|| error::ClientError::UnsupportedAsset(to.clone()))?;
            let reader = ChainReader::new(config.rpc_url.clone(), staking);
            let out = reader.quote(from_token, to_token, &amount).await;
            println!(
                "{} {} -> {} {}",
                amount,
                from_token.symbol,
                style(format!("{:.6}", out)).green(),
                to_token.symbol
            );
            Ok(())
        }
        Command::Swap { from, to, amount } => {
            let submitter = submitter(&config, staking);
            let hash = submitter.swap(&from, &to, &amount).await?;
            println!("swap confirmed: {}", style(format!("{:?}", hash)).green());
            Ok(())
        }
        Command::AddLiquidity { token, amount } => {
            let submitter = submitter(&config, staking);
            let hash = submitter.add_liquidity(&token, &amount).await?;
            println!(
                "liquidity added: {}",
                style(format!("{:?}", hash)).green()
            );
            Ok(())
        }
        Command::Init { path } => {
            config.save_to_file(&path)?;
            println!("wrote {}", style(&path).green());
            Ok(())
        }
    }
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("  ╔═╗╔╦╗╔═╗╦╔═╔═╗╦ ╦╔═╗╔╦╗╔═╗╦ ╦").cyan().bold()
    );
    println!(
        "{}",
        style("  ╚═╗ ║ ╠═╣╠╩╗║╣ ║║║╠═╣ ║ ║  ╠═╣").cyan().bold()
    );
    println!(
        "{}",
        style("  ╚═╝ ╩ ╩ ╩╩ ╩╚═╝╚╩╝╩ ╩ ╩ ╚═╝╩ ╩").cyan().bold()
    );
    println!("{}", style("  LP staking console · BNB chain").dim());
    println!();
}

fn submitter(config: &Config, staking: Address) -> TransactionSubmitter {
    let wallet = WalletSession::from_env(config.chain_id);
    TransactionSubmitter::new(config.clone(), staking, wallet)
}

/// Pool a position belongs to, so the post-write reload targets the right
/// pool. Falls back to pool 0 when the read fails.
async fn position_pool(config: &Config, staking: Address, id: u64) -> u64 {
    let reader = ChainReader::new(config.rpc_url.clone(), staking);
    reader.position_pid(id).await.unwrap_or(0)
}

/// The address being monitored: the connected wallet when a key is present,
/// the configured watch address otherwise.
fn watched_user(config: &Config, wallet: Option<&WalletSession>) -> Option<Address> {
    if let Some(wallet) = wallet {
        return Some(wallet.address());
    }
    config
        .watch_address
        .as_deref()
        .and_then(|s| Address::from_str(s).ok())
}

/// One full read batch into the shared snapshot. With no watched address this
/// is a pure no-op: nothing is fetched and the snapshot is left untouched.
async fn refresh_once(
    reader: &ChainReader,
    oracle: &PriceOracle,
    snapshot: &SharedSnapshot,
    user: Option<Address>,
    pid: u64,
) {
    let Some(user) = user else {
        debug!("no wallet or watch address; refresh skipped");
        return;
    };

    let (plans, pool_stats, positions, referral_earnings, lp_balance, position_counter, reference) =
        tokio::join!(
            reader.plans_or_default(),
            reader.pool_stats(pid),
            reader.positions(user),
            reader.referral_earnings(user),
            reader.lp_balance(pid, user),
            reader.position_counter(),
            oracle.reference_price_usd(),
        );

    let (token_price_usd, token_balance) = match pool_by_pid(pid) {
        Some(pool) => {
            let (reserves, balance) = tokio::join!(
                reader.pair_reserves(pool.lp_pair),
                reader.erc20_balance(pool.token, user),
            );
            (oracle.token_price_usd(pool.token, reserves).await, balance)
        }
        None => (0.0, 0.0),
    };

    let positions = positions.into_iter().filter(|p| p.pid == pid).collect();

    let mut snap = snapshot.write().await;
    snap.plans = plans;
    snap.pool_stats = pool_stats;
    snap.positions = positions;
    snap.referral_earnings = referral_earnings;
    snap.lp_balance = lp_balance;
    snap.position_counter = position_counter;
    snap.reference_price_usd = reference;
    snap.token_price_usd = token_price_usd;
    snap.token_balance = token_balance;
    snap.cycle += 1;
    snap.updated_at = Some(Utc::now());
}

/// Build the read stack, run one batch, and hand back the resulting snapshot.
async fn snapshot_once(
    config: &Config,
    staking: Address,
    user: Option<Address>,
    pid: u64,
) -> Snapshot {
    let reader = ChainReader::new(config.rpc_url.clone(), staking);
    let oracle = PriceOracle::new(config);
    let snapshot: SharedSnapshot = Arc::new(tokio::sync::RwLock::new(Snapshot::default()));
    refresh_once(&reader, &oracle, &snapshot, user, pid).await;
    let snap = snapshot.read().await.clone();
    snap
}

/// Print the hash of a confirmed write, then reload so the next render shows
/// post-write state instead of waiting out the poll interval.
async fn after_write(config: &Config, staking: Address, pid: u64, hash: alloy_primitives::B256) {
    println!("confirmed: {}", style(format!("{:?}", hash)).green());
    let wallet = WalletSession::from_env(config.chain_id);
    let user = watched_user(config, wallet.as_ref());
    let snap = snapshot_once(config, staking, user, pid).await;
    print_snapshot(&snap, pid);
}

async fn watch(config: Config, staking: Address, pid: u64) -> Result<()> {
    config.print_summary();

    let wallet = WalletSession::from_env(config.chain_id);
    let user = watched_user(&config, wallet.as_ref());
    if user.is_none() {
        println!(
            "{}",
            style("no WALLET_PRIVATE_KEY or WATCH_ADDRESS set; idling without reads").yellow()
        );
    }

    let reader = Arc::new(ChainReader::new(config.rpc_url.clone(), staking));
    let oracle = Arc::new(PriceOracle::new(&config));
    let snapshot: SharedSnapshot = Arc::new(tokio::sync::RwLock::new(Snapshot::default()));

    let batch = {
        let reader = Arc::clone(&reader);
        let oracle = Arc::clone(&oracle);
        let snapshot = Arc::clone(&snapshot);
        move || {
            let reader = Arc::clone(&reader);
            let oracle = Arc::clone(&oracle);
            let snapshot = Arc::clone(&snapshot);
            async move {
                refresh_once(&reader, &oracle, &snapshot, user, pid).await;
            }
        }
    };

    let scheduler = Arc::new(RefreshScheduler::new(
        batch,
        Duration::from_secs(config.poll_interval_secs),
        Duration::from_secs(config.refresh_cooldown_secs),
    ));
    tokio::spawn(Arc::clone(&scheduler).run());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    let mut ticker = time::interval(Duration::from_secs(1));
    let mut last_cycle = 0u64;
    loop {
        ticker.tick().await;
        let snap = snapshot.read().await.clone();

        if snap.cycle != last_cycle {
            last_cycle = snap.cycle;
            spinner.suspend(|| print_snapshot(&snap, pid));
        }

        spinner.set_message(watch_message(&snap));
    }
}

/// Spinner line: countdown to the nearest unlock among open positions.
fn watch_message(snap: &Snapshot) -> String {
    let now = Utc::now().timestamp() as u64;
    let next_unlock = snap
        .positions
        .iter()
        .filter(|p| !p.closed)
        .map(|p| p.end_time)
        .min();

    match next_unlock {
        Some(end) => {
            let parts = breakdown(now, end, ClockMode::CountDown);
            if parts.finished {
                "next unlock: ready".to_string()
            } else {
                format!("next unlock in {}", format_parts(&parts))
            }
        }
        None if snap.cycle == 0 => "waiting for first refresh...".to_string(),
        None => "no open positions".to_string(),
    }
}

fn print_snapshot(snap: &Snapshot, pid: u64) {
    let now = Utc::now().timestamp() as u64;
    let pool = pool_by_pid(pid);
    let pool_label = pool.map(|p| p.label).unwrap_or("Unknown Pool");
    let token_symbol = pool.map(|p| p.token_symbol).unwrap_or("TOKEN");
    let totals = snap.totals();
    let lp_price = snap.lp_price_usd();

    println!();
    println!(
        "{} {}  (cycle {})",
        style("■").cyan(),
        style(pool_label).bold(),
        snap.cycle
    );
    println!(
        "  BNB ${:.2} · token ${:.6} · LP ${:.6}",
        snap.reference_price_usd, snap.token_price_usd, lp_price
    );
    println!(
        "  pool: {:.4} LP staked (${:.2}) · {:.4} burned",
        snap.pool_stats.total_staked_lp,
        snap.pool_stats.total_staked_usd,
        snap.pool_stats.total_burned_token
    );
    println!(
        "  wallet: {:.4} {} (${:.2}) · {:.6} LP free · referral earnings ${:.2}",
        snap.token_balance,
        token_symbol,
        snap.token_balance * snap.token_price_usd,
        snap.lp_balance,
        snap.referral_earnings
    );
    println!(
        "  you: {:.6} LP staked (${:.2}) · claimable {:.4} HUG (${:.2})",
        totals.total_lp, totals.total_usd, totals.total_claimable_hug, totals.total_claimable_usd
    );

    if !snap.plans.is_empty() {
        let tiers: Vec<String> = snap
            .plans
            .iter()
            .map(|p| {
                format!(
                    "{} ${:.0}+ @{:.1}%/mo",
                    plan_label(p.id),
                    p.min_usd,
                    p.monthly_rate_bps as f64 / 100.0
                )
            })
            .collect();
        println!("  plans: {}", style(tiers.join(" · ")).dim());
    }

    for p in &snap.positions {
        let status = if p.closed {
            style("closed").red().to_string()
        } else {
            let parts = breakdown(now, p.end_time, ClockMode::CountDown);
            if parts.finished {
                style("unlocked").green().to_string()
            } else {
                format!("unlocks in {}", format_parts(&parts))
            }
        };
        println!(
            "  #{} [{}] {:.6} LP (${:.2}) · claimable {:.4} HUG · {}",
            p.id,
            plan_label(p.plan_id),
            p.lp_amount,
            model::stake_usd_for(p, lp_price),
            p.claimable_reward,
            status
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on this port; any attempted fetch errors out.
    const DEAD_RPC: &str = "http://127.0.0.1:9";

    #[tokio::test]
    async fn test_refresh_without_watched_address_is_a_noop() {
        let config = Config {
            rpc_url: DEAD_RPC.to_string(),
            price_feed_url: DEAD_RPC.to_string(),
            ..Config::default()
        };
        let reader = ChainReader::new(config.rpc_url.clone(), Address::ZERO);
        let oracle = PriceOracle::new(&config);
        let snapshot: SharedSnapshot = Arc::new(tokio::sync::RwLock::new(Snapshot::default()));

        refresh_once(&reader, &oracle, &snapshot, None, 0).await;

        let snap = snapshot.read().await;
        assert_eq!(snap.cycle, 0);
        assert!(snap.updated_at.is_none());
        assert!(snap.positions.is_empty());
    }

    #[test]
    fn test_watched_user_prefers_wallet_over_config() {
        let config = Config {
            watch_address: Some("0x41f52A42091A6B2146561bF05b722Ad1d0e46f8b".to_string()),
            ..Config::default()
        };
        let watched = watched_user(&config, None).unwrap();
        assert_eq!(
            format!("{:?}", watched).to_lowercase(),
            "0x41f52a42091a6b2146561bf05b722ad1d0e46f8b"
        );

        let bad = Config {
            watch_address: Some("garbage".to_string()),
            ..Config::default()
        };
        assert!(watched_user(&bad, None).is_none());
    }
}
