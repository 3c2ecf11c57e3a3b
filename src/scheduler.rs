//! Polling refresh loop with overlap deduplication.
//!
//! Consistency here is "poll and eventually converge": no log subscriptions,
//! just a fixed-interval timer plus explicit out-of-band refreshes after a
//! confirmed write. `refresh()` is idempotent under overlap - a call while a
//! cycle is in flight is a no-op rather than queued. The in-flight flag is
//! set before the read batch and cleared a configurable cooldown after the
//! batch completes, success or not, so a slow RPC can neither wedge the flag
//! nor allow two overlapping cycles.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time;
use tracing::{debug, trace};

use crate::model::{aggregate, lp_price, DerivedTotals, Plan, PoolStats, Position};

// ============================================
// PUBLISHED STATE
// ============================================

/// The derived state one refresh cycle republishes. The position list is
/// replaced wholesale, never patched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub plans: Vec<Plan>,
    pub pool_stats: PoolStats,
    pub positions: Vec<Position>,
    pub referral_earnings: f64,
    pub lp_balance: f64,
    pub position_counter: u64,
    pub reference_price_usd: f64,
    pub token_price_usd: f64,
    /// User's balance of the pool's token (KIND or HUG), display units.
    pub token_balance: f64,
    /// Completed refresh cycles since startup.
    pub cycle: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Live LP price derived from the pool aggregates.
    pub fn lp_price_usd(&self) -> f64 {
        lp_price(self.pool_stats.total_staked_usd, self.pool_stats.total_staked_lp)
    }

    /// Per-user totals, recomputed from the current position list on every
    /// render rather than persisted.
    pub fn totals(&self) -> DerivedTotals {
        aggregate(&self.positions, self.lp_price_usd())
    }
}

pub type SharedSnapshot = Arc<tokio::sync::RwLock<Snapshot>>;

// ============================================
// SCHEDULER
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    Idle,
    InFlight,
}

/// Deduplicating, time-boxed refresh driver.
///
/// Owns no ambient state: each instance carries its own flag, so independent
/// schedulers (one per pool context, or per test) never interfere.
pub struct RefreshScheduler<B> {
    state: Arc<Mutex<RefreshState>>,
    batch: B,
    interval: Duration,
    cooldown: Duration,
}

impl<B, Fut> RefreshScheduler<B>
where
    B: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    pub fn new(batch: B, interval: Duration, cooldown: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RefreshState::Idle)),
            batch,
            interval,
            cooldown,
        }
    }

    /// Run one refresh cycle unless one is already in flight.
    ///
    /// Returns whether a batch was actually issued. The flag stays set for
    /// `cooldown` after the batch resolves; the reset is spawned so a caller
    /// is never blocked waiting for it.
    pub async fn refresh(&self) -> bool {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == RefreshState::InFlight {
                trace!("refresh already in flight; skipping");
                return false;
            }
            *state = RefreshState::InFlight;
        }

        (self.batch)().await;

        let state = Arc::clone(&self.state);
        let cooldown = self.cooldown;
        tokio::spawn(async move {
            time::sleep(cooldown).await;
            *state.lock().unwrap_or_else(PoisonError::into_inner) = RefreshState::Idle;
            trace!("refresh flag cleared");
        });
        true
    }

    /// Fixed-interval polling loop. The first tick fires immediately; later
    /// ticks call `refresh()` unconditionally and rely on the flag for
    /// dedup against out-of-band refreshes.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = time::interval(self.interval);
        loop {
            ticker.tick().await;
            let issued = self.refresh().await;
            debug!(issued, "poll tick");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type BoxBatch = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

    fn counting_scheduler(
        batch_delay: Duration,
        interval: Duration,
        cooldown: Duration,
    ) -> (Arc<RefreshScheduler<BoxBatch>>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let batch_count = Arc::clone(&count);
        let batch: BoxBatch = Box::new(move || {
            let c = Arc::clone(&batch_count);
            async move {
                time::sleep(batch_delay).await;
                c.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
        let scheduler = RefreshScheduler::new(batch, interval, cooldown);
        (Arc::new(scheduler), count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refresh_issues_one_batch() {
        let (scheduler, count) = counting_scheduler(
            Duration::from_millis(50),
            Duration::from_secs(30),
            Duration::from_secs(5),
        );

        let (a, b) = tokio::join!(scheduler.refresh(), scheduler.refresh());
        assert!(a ^ b, "exactly one call must issue the batch");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_holds_the_flag() {
        let (scheduler, count) = counting_scheduler(
            Duration::ZERO,
            Duration::from_secs(30),
            Duration::from_secs(5),
        );

        assert!(scheduler.refresh().await);
        // Batch done, but the flag only clears after the cooldown.
        assert!(!scheduler.refresh().await);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_millis(5_100)).await;
        assert!(scheduler.refresh().await);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_timer_drives_refreshes() {
        let (scheduler, count) = counting_scheduler(
            Duration::ZERO,
            Duration::from_secs(30),
            Duration::from_secs(5),
        );

        tokio::spawn(Arc::clone(&scheduler).run());

        // First tick is immediate.
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Next tick lands one interval later.
        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_snapshot_derivations() {
        let snapshot = Snapshot {
            pool_stats: PoolStats {
                total_staked_lp: 1_000_000.0,
                total_staked_usd: 500_000.0,
                ..PoolStats::default()
            },
            ..Snapshot::default()
        };
        assert_eq!(snapshot.lp_price_usd(), 0.5);

        let empty = Snapshot::default();
        assert_eq!(empty.lp_price_usd(), 0.0);
        assert_eq!(empty.totals(), DerivedTotals::default());
    }
}
