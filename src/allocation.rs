//! Matching strategies.
//!
//! A strategy is a pure allocation function: given an incoming stake and the
//! compatible opposite-side candidates in arrival order, it decides how much
//! of each candidate to fill. It never allocates more than the incoming stake
//! and never more than any candidate's unmatched stake.

use crate::order::ExchangeBet;
use crate::types::OrderId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// One candidate's share of an incoming stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub order_id: OrderId,
    pub amount: Decimal,
}

pub trait MatchingStrategy {
    /// `candidates` are pre-filtered to active, price-compatible orders on
    /// the opposite side, pre-sorted by arrival time.
    fn allocate(&self, incoming: Decimal, candidates: &[ExchangeBet]) -> Vec<Allocation>;
}

/// Strategy selection, used by the engine config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchingStrategyKind {
    Fifo,
    ProRata,
    Hybrid {
        top_order_count: usize,
        top_allocation_percent: Decimal,
    },
}

impl MatchingStrategyKind {
    pub fn build(&self) -> Box<dyn MatchingStrategy + Send + Sync> {
        match *self {
            MatchingStrategyKind::Fifo => Box::new(FifoStrategy),
            MatchingStrategyKind::ProRata => Box::new(ProRataStrategy),
            MatchingStrategyKind::Hybrid {
                top_order_count,
                top_allocation_percent,
            } => Box::new(HybridStrategy {
                top_order_count,
                top_allocation_percent,
            }),
        }
    }
}

fn floor_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Pro-rata split with 2-decimal flooring. The flooring residual goes to the
/// first-seen candidate with the largest capacity; if that would overfill it,
/// the excess walks the remaining candidates in order. Capacities are
/// `(order_id, available)` pairs in arrival order.
fn pro_rata_split(incoming: Decimal, capacities: &[(OrderId, Decimal)]) -> Vec<Allocation> {
    let total: Decimal = capacities.iter().map(|(_, c)| *c).sum();
    if incoming <= Decimal::ZERO || total.is_zero() {
        return Vec::new();
    }

    // overflow: incoming covers all liquidity, fill everyone completely
    if incoming >= total {
        return capacities
            .iter()
            .filter(|(_, c)| *c > Decimal::ZERO)
            .map(|(id, c)| Allocation {
                order_id: *id,
                amount: *c,
            })
            .collect();
    }

    // (order_id, allocated, capacity) rows in arrival order
    let mut rows: Vec<(OrderId, Decimal, Decimal)> = Vec::with_capacity(capacities.len());
    let mut allocated = Decimal::ZERO;
    for (id, capacity) in capacities {
        if *capacity <= Decimal::ZERO {
            continue;
        }
        let share = floor_cents(incoming * *capacity / total);
        allocated += share;
        rows.push((*id, share, *capacity));
    }

    // flooring loses a few cents; hand the residual to the first-seen
    // largest candidate, spilling forward if its headroom runs out
    let mut residual = incoming - allocated;
    if residual > Decimal::ZERO && !rows.is_empty() {
        let largest = rows
            .iter()
            .enumerate()
            .max_by(|(ai, a), (bi, b)| a.2.cmp(&b.2).then(bi.cmp(ai)))
            .map(|(i, _)| i)
            .expect("rows is non-empty");

        let order = std::iter::once(largest).chain((0..rows.len()).filter(|i| *i != largest));
        for i in order {
            if residual <= Decimal::ZERO {
                break;
            }
            let headroom = rows[i].2 - rows[i].1;
            let take = residual.min(headroom);
            if take > Decimal::ZERO {
                rows[i].1 += take;
                residual -= take;
            }
        }
    }

    rows.into_iter()
        .filter(|(_, amount, _)| *amount > Decimal::ZERO)
        .map(|(order_id, amount, _)| Allocation { order_id, amount })
        .collect()
}

/// First in, first out. Earlier orders always receive priority regardless of
/// size.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoStrategy;

impl MatchingStrategy for FifoStrategy {
    fn allocate(&self, incoming: Decimal, candidates: &[ExchangeBet]) -> Vec<Allocation> {
        let mut remaining = incoming;
        let mut allocations = Vec::new();

        for candidate in candidates {
            if remaining <= Decimal::ZERO {
                break;
            }
            let fill = remaining.min(candidate.available_stake());
            if fill > Decimal::ZERO {
                allocations.push(Allocation {
                    order_id: candidate.id,
                    amount: fill,
                });
                remaining -= fill;
            }
        }

        allocations
    }
}

/// Proportional to each candidate's unmatched stake.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProRataStrategy;

impl MatchingStrategy for ProRataStrategy {
    fn allocate(&self, incoming: Decimal, candidates: &[ExchangeBet]) -> Vec<Allocation> {
        let capacities: Vec<(OrderId, Decimal)> = candidates
            .iter()
            .map(|c| (c.id, c.available_stake()))
            .collect();
        pro_rata_split(incoming, &capacities)
    }
}

/// Pro-rata with a FIFO carve-out for the oldest orders: rewards early quotes
/// without starving the rest of the book.
#[derive(Debug, Clone, Copy)]
pub struct HybridStrategy {
    pub top_order_count: usize,
    /// Fraction of the incoming stake reserved for the top orders (0..=1)
    pub top_allocation_percent: Decimal,
}

impl Default for HybridStrategy {
    fn default() -> Self {
        Self {
            top_order_count: 1,
            top_allocation_percent: Decimal::new(40, 2),
        }
    }
}

impl MatchingStrategy for HybridStrategy {
    fn allocate(&self, incoming: Decimal, candidates: &[ExchangeBet]) -> Vec<Allocation> {
        if incoming <= Decimal::ZERO || candidates.is_empty() {
            return Vec::new();
        }

        let fifo_portion = floor_cents(incoming * self.top_allocation_percent);
        let top = &candidates[..self.top_order_count.min(candidates.len())];
        let fifo_allocations = FifoStrategy.allocate(fifo_portion, top);
        let fifo_total: Decimal = fifo_allocations.iter().map(|a| a.amount).sum();

        // whatever the top orders could not absorb folds into the pro-rata
        // portion, applied to everyone's remaining capacity
        let pro_rata_portion = incoming - fifo_total;
        let capacities: Vec<(OrderId, Decimal)> = candidates
            .iter()
            .map(|c| {
                let taken: Decimal = fifo_allocations
                    .iter()
                    .filter(|a| a.order_id == c.id)
                    .map(|a| a.amount)
                    .sum();
                (c.id, c.available_stake() - taken)
            })
            .collect();
        let pro_rata_allocations = pro_rata_split(pro_rata_portion, &capacities);

        // merge per candidate, preserving arrival order
        let mut merged: Vec<Allocation> = Vec::new();
        for candidate in candidates {
            let amount: Decimal = fifo_allocations
                .iter()
                .chain(pro_rata_allocations.iter())
                .filter(|a| a.order_id == candidate.id)
                .map(|a| a.amount)
                .sum();
            if amount > Decimal::ZERO {
                merged.push(Allocation {
                    order_id: candidate.id,
                    amount,
                });
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::odds::Odds;
    use crate::types::{CurrencyCode, MarketId, OutcomeId, Side, Timestamp, UserId};
    use rust_decimal_macros::dec;

    fn candidate(id: u64, stake: Decimal, ts: i64) -> ExchangeBet {
        ExchangeBet::new(
            OrderId(id),
            UserId(id),
            MarketId(1),
            OutcomeId(1),
            Side::Lay,
            Odds::new_unchecked(dec!(2.0)),
            Money::new(stake, CurrencyCode::Usd).unwrap(),
            Timestamp::from_millis(ts),
        )
        .unwrap()
    }

    fn seed_candidates() -> Vec<ExchangeBet> {
        vec![
            candidate(1, dec!(100), 0),
            candidate(2, dec!(50), 1),
            candidate(3, dec!(100), 2),
        ]
    }

    fn total(allocations: &[Allocation]) -> Decimal {
        allocations.iter().map(|a| a.amount).sum()
    }

    #[test]
    fn fifo_fills_in_time_order() {
        let candidates = seed_candidates();
        let allocations = FifoStrategy.allocate(dec!(150), &candidates);

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0], Allocation { order_id: OrderId(1), amount: dec!(100) });
        assert_eq!(allocations[1], Allocation { order_id: OrderId(2), amount: dec!(50) });
    }

    #[test]
    fn pro_rata_proportional_split() {
        let candidates = seed_candidates();
        let allocations = ProRataStrategy.allocate(dec!(150), &candidates);

        // 40/20/40 percent of the book
        assert_eq!(allocations[0].amount, dec!(60));
        assert_eq!(allocations[1].amount, dec!(30));
        assert_eq!(allocations[2].amount, dec!(60));
        assert_eq!(total(&allocations), dec!(150));
    }

    #[test]
    fn overflow_fills_everything() {
        let candidates = seed_candidates();
        for strategy in [
            MatchingStrategyKind::Fifo,
            MatchingStrategyKind::ProRata,
            MatchingStrategyKind::Hybrid {
                top_order_count: 1,
                top_allocation_percent: dec!(0.40),
            },
        ] {
            let allocations = strategy.build().allocate(dec!(300), &candidates);
            assert_eq!(total(&allocations), dec!(250), "{strategy:?}");
        }
    }

    #[test]
    fn empty_candidates_and_zero_stake() {
        let candidates = seed_candidates();
        for strategy in [
            MatchingStrategyKind::Fifo,
            MatchingStrategyKind::ProRata,
            MatchingStrategyKind::Hybrid {
                top_order_count: 1,
                top_allocation_percent: dec!(0.40),
            },
        ] {
            assert!(strategy.build().allocate(dec!(100), &[]).is_empty());
            assert!(strategy.build().allocate(Decimal::ZERO, &candidates).is_empty());
        }
    }

    #[test]
    fn pro_rata_residual_goes_to_largest() {
        // 3 equal candidates, $100 incoming: each floors to 33.33, the
        // leftover cent lands on the first of the largest
        let candidates = vec![
            candidate(1, dec!(50), 0),
            candidate(2, dec!(50), 1),
            candidate(3, dec!(50), 2),
        ];
        let allocations = ProRataStrategy.allocate(dec!(100), &candidates);

        assert_eq!(allocations[0].amount, dec!(33.34));
        assert_eq!(allocations[1].amount, dec!(33.33));
        assert_eq!(allocations[2].amount, dec!(33.33));
        assert_eq!(total(&allocations), dec!(100));
    }

    #[test]
    fn pro_rata_residual_never_overfills() {
        // near-total incoming: the largest candidate's headroom can be
        // smaller than the residual, which must spill instead of overfilling
        let candidates = vec![
            candidate(1, dec!(10), 0),
            candidate(2, dec!(10), 1),
            candidate(3, dec!(10), 2),
        ];
        let allocations = ProRataStrategy.allocate(dec!(29.99), &candidates);

        assert_eq!(total(&allocations), dec!(29.99));
        for a in &allocations {
            assert!(a.amount <= dec!(10), "overfilled {:?}", a);
        }
    }

    #[test]
    fn hybrid_splits_fifo_then_pro_rata() {
        // $150 in, top 1 order, 40%: $60 FIFO to the oldest, then $90
        // pro-rata across remaining capacity 40/50/100
        let candidates = seed_candidates();
        let allocations = HybridStrategy::default().allocate(dec!(150), &candidates);

        assert_eq!(allocations[0].amount, dec!(78.94)); // 60 + 18.94
        assert_eq!(allocations[1].amount, dec!(23.68));
        assert_eq!(allocations[2].amount, dec!(47.38)); // 47.36 + 0.02 residual
        assert_eq!(total(&allocations), dec!(150));
    }

    #[test]
    fn hybrid_folds_unused_fifo_portion() {
        // top order too small for the FIFO carve-out: the unused part folds
        // into the pro-rata stage
        let candidates = vec![candidate(1, dec!(10), 0), candidate(2, dec!(100), 1)];
        let allocations = HybridStrategy::default().allocate(dec!(100), &candidates);

        assert_eq!(allocations[0].amount, dec!(10));
        assert_eq!(allocations[1].amount, dec!(90));
    }

    #[test]
    fn allocations_never_exceed_capacity() {
        let candidates = seed_candidates();
        for strategy in [
            MatchingStrategyKind::Fifo,
            MatchingStrategyKind::ProRata,
            MatchingStrategyKind::Hybrid {
                top_order_count: 2,
                top_allocation_percent: dec!(0.50),
            },
        ] {
            for incoming in [dec!(1), dec!(99.99), dec!(150), dec!(250), dec!(1000)] {
                let allocations = strategy.build().allocate(incoming, &candidates);
                assert!(total(&allocations) <= incoming);
                for a in &allocations {
                    let capacity = candidates
                        .iter()
                        .find(|c| c.id == a.order_id)
                        .unwrap()
                        .available_stake();
                    assert!(a.amount <= capacity, "{strategy:?} overfilled {:?}", a);
                }
            }
        }
    }
}
