//! Display-domain data model and position aggregation.
//!
//! Raw contract state is reduced here into the numbers the console renders:
//! the derived LP price and the per-user, per-pool totals. Reward math is
//! never recomputed client-side; claimable figures always pass through from
//! the contract.

use serde::Serialize;

// ============================================
// PLANS
// ============================================

/// A staking tier. Immutable once read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Plan {
    pub id: u64,
    pub min_usd: f64,
    pub monthly_rate_bps: u64,
}

/// Hardcoded fallback used until the contract read succeeds with at least
/// four entries.
pub fn default_plans() -> Vec<Plan> {
    vec![
        Plan { id: 0, min_usd: 50.0, monthly_rate_bps: 1000 },
        Plan { id: 1, min_usd: 300.0, monthly_rate_bps: 1500 },
        Plan { id: 2, min_usd: 1500.0, monthly_rate_bps: 2000 },
        Plan { id: 3, min_usd: 10_000.0, monthly_rate_bps: 2700 },
    ]
}

pub fn plan_label(id: u64) -> &'static str {
    match id {
        0 => "Bronze",
        1 => "Silver",
        2 => "Gold",
        3 => "Diamond",
        _ => "Custom",
    }
}

// ============================================
// POOL STATS
// ============================================

/// Per-pool aggregate, refreshed wholesale every poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub total_staked_lp: f64,
    pub total_staked_usd: f64,
    pub total_burned_token: f64,
    pub total_bnb_to_dev: f64,
}

/// Derived LP price for the active pool.
///
/// Zero when the pool is empty or the ratio is not a finite number; downstream
/// USD figures then fall back to contract-reported snapshots.
pub fn lp_price(total_staked_usd: f64, total_staked_lp: f64) -> f64 {
    if total_staked_lp <= 0.0 {
        return 0.0;
    }
    let price = total_staked_usd / total_staked_lp;
    if price.is_finite() {
        price
    } else {
        0.0
    }
}

// ============================================
// POSITIONS
// ============================================

/// One stake record. Never mutated locally; every field is re-derived from a
/// full reload after any write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub id: u64,
    pub pid: u64,
    pub lp_amount: f64,
    pub stake_usd: f64,
    pub plan_id: u64,
    pub monthly_rate_bps: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub closed: bool,
    pub last_claim_time: u64,
    pub end_time_at_close: u64,
    pub claimable_usd: f64,
    pub claimable_reward: f64,
}

/// Per-user, per-pool totals: a pure fold over the current position set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedTotals {
    pub total_lp: f64,
    pub total_usd: f64,
    pub total_claimable_hug: f64,
    pub total_claimable_usd: f64,
}

// ============================================
// TWO-SOURCE MERGE
// ============================================

/// Take `preferred` when the predicate accepts it, else `fallback`.
///
/// Keeps the precedence between a live-derived value and a contract-reported
/// snapshot in one auditable place instead of per-field conditionals.
pub fn merge_preferred<T: Copy>(preferred: T, fallback: T, accept: impl Fn(&T) -> bool) -> T {
    if accept(&preferred) {
        preferred
    } else {
        fallback
    }
}

/// USD value of a position's stake: live LP price when available and finite,
/// otherwise the contract's stored snapshot.
pub fn stake_usd_for(position: &Position, lp_price_usd: f64) -> f64 {
    if lp_price_usd > 0.0 && position.lp_amount > 0.0 {
        merge_preferred(
            position.lp_amount * lp_price_usd,
            position.stake_usd,
            |v| v.is_finite(),
        )
    } else {
        position.stake_usd
    }
}

/// Fold the position set into totals.
///
/// Closed positions stop accruing and are excluded from the staked totals,
/// but a closed-but-unclaimed position still owes the user funds, so its
/// claimable fields contribute.
pub fn aggregate(positions: &[Position], lp_price_usd: f64) -> DerivedTotals {
    let mut totals = DerivedTotals::default();
    for p in positions {
        if !p.closed {
            totals.total_lp += p.lp_amount;
            totals.total_usd += stake_usd_for(p, lp_price_usd);
        }
        totals.total_claimable_hug += p.claimable_reward;
        totals.total_claimable_usd += p.claimable_usd;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(id: u64, lp: f64, usd: f64, closed: bool, reward: f64) -> Position {
        Position {
            id,
            pid: 0,
            lp_amount: lp,
            stake_usd: usd,
            plan_id: 0,
            monthly_rate_bps: 1000,
            start_time: 0,
            end_time: 0,
            closed,
            last_claim_time: 0,
            end_time_at_close: 0,
            claimable_usd: 0.0,
            claimable_reward: reward,
        }
    }

    #[test]
    fn test_lp_price_basic() {
        assert_eq!(lp_price(500_000.0, 1_000_000.0), 0.5);
    }

    #[test]
    fn test_lp_price_empty_pool() {
        assert_eq!(lp_price(500_000.0, 0.0), 0.0);
        assert_eq!(lp_price(500_000.0, -1.0), 0.0);
        assert_eq!(lp_price(f64::INFINITY, 1.0), 0.0);
    }

    #[test]
    fn test_aggregate_prefers_live_price() {
        let positions = vec![
            position(1, 100.0, 40.0, false, 0.0),
            position(2, 50.0, 20.0, true, 5.0),
        ];
        let totals = aggregate(&positions, 0.5);
        assert_eq!(totals.total_lp, 100.0);
        // live price: 100 * 0.5, not the 40 snapshot
        assert_eq!(totals.total_usd, 50.0);
        assert_eq!(totals.total_claimable_hug, 5.0);
    }

    #[test]
    fn test_aggregate_falls_back_without_price() {
        let positions = vec![
            position(1, 100.0, 40.0, false, 0.0),
            position(2, 50.0, 20.0, true, 5.0),
        ];
        let totals = aggregate(&positions, 0.0);
        assert_eq!(totals.total_usd, 40.0);
    }

    #[test]
    fn test_closed_position_keeps_claimables() {
        let mut closed = position(1, 10.0, 4.0, true, 2.5);
        closed.claimable_usd = 1.25;
        let totals = aggregate(&[closed], 0.5);
        assert_eq!(totals.total_lp, 0.0);
        assert_eq!(totals.total_usd, 0.0);
        assert_eq!(totals.total_claimable_hug, 2.5);
        assert_eq!(totals.total_claimable_usd, 1.25);
    }

    #[test]
    fn test_merge_preferred_rejects_non_finite() {
        let v = merge_preferred(f64::NAN, 7.0, |x| x.is_finite());
        assert_eq!(v, 7.0);
    }

    #[test]
    fn test_default_plans_shape() {
        let plans = default_plans();
        assert_eq!(plans.len(), 4);
        assert_eq!(plans[0].min_usd, 50.0);
        assert_eq!(plans[3].monthly_rate_bps, 2700);
        assert_eq!(plan_label(3), "Diamond");
    }
}
