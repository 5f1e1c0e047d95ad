//! Property-based tests for the core math.
//!
//! These tests verify invariants hold under random inputs.

use betex_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Strategies for generating test data
fn stake_strategy() -> impl Strategy<Value = Decimal> {
    (100i64..10_000_00i64).prop_map(|cents| Decimal::new(cents, 2)) // $1.00 to $10,000.00
}

fn odds_strategy() -> impl Strategy<Value = Decimal> {
    (101i64..50_00i64).prop_map(|x| Decimal::new(x, 2)) // 1.01 to 50.00
}

fn candidate_stakes_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(stake_strategy(), 1..8)
}

fn candidates_from(stakes: &[Decimal]) -> Vec<ExchangeBet> {
    stakes
        .iter()
        .enumerate()
        .map(|(i, stake)| {
            ExchangeBet::new(
                OrderId(i as u64 + 1),
                UserId(i as u64 + 1),
                MarketId(1),
                OutcomeId(1),
                Side::Lay,
                Odds::new_unchecked(dec!(2.0)),
                Money::new(*stake, CurrencyCode::Usd).unwrap(),
                Timestamp::from_millis(i as i64 * 10),
            )
            .unwrap()
        })
        .collect()
}

fn all_strategies() -> Vec<MatchingStrategyKind> {
    vec![
        MatchingStrategyKind::Fifo,
        MatchingStrategyKind::ProRata,
        MatchingStrategyKind::Hybrid {
            top_order_count: 1,
            top_allocation_percent: dec!(0.40),
        },
        MatchingStrategyKind::Hybrid {
            top_order_count: 3,
            top_allocation_percent: dec!(0.25),
        },
    ]
}

proptest! {
    /// No strategy ever allocates more than the incoming stake, more than
    /// the total liquidity, or more than any single candidate's capacity.
    #[test]
    fn allocation_invariants(
        incoming in stake_strategy(),
        stakes in candidate_stakes_strategy(),
    ) {
        let candidates = candidates_from(&stakes);
        let liquidity: Decimal = stakes.iter().sum();

        for kind in all_strategies() {
            let allocations = kind.build().allocate(incoming, &candidates);
            let total: Decimal = allocations.iter().map(|a| a.amount).sum();

            prop_assert!(total <= incoming, "{kind:?} allocated {total} > incoming {incoming}");
            prop_assert!(total <= liquidity, "{kind:?} allocated {total} > liquidity {liquidity}");

            for allocation in &allocations {
                let capacity = candidates
                    .iter()
                    .find(|c| c.id == allocation.order_id)
                    .unwrap()
                    .available_stake();
                prop_assert!(
                    allocation.amount <= capacity,
                    "{kind:?} overfilled {:?} ({} > {capacity})",
                    allocation.order_id,
                    allocation.amount,
                );
                prop_assert!(allocation.amount > Decimal::ZERO);
            }
        }
    }

    /// Every strategy consumes exactly min(incoming, liquidity): no stake is
    /// stranded while capacity remains.
    #[test]
    fn allocation_is_exhaustive(
        incoming in stake_strategy(),
        stakes in candidate_stakes_strategy(),
    ) {
        let candidates = candidates_from(&stakes);
        let liquidity: Decimal = stakes.iter().sum();
        let expected = incoming.min(liquidity);

        for kind in all_strategies() {
            let allocations = kind.build().allocate(incoming, &candidates);
            let total: Decimal = allocations.iter().map(|a| a.amount).sum();
            prop_assert_eq!(total, expected, "{:?}", kind);
        }
    }

    /// Applying an allocation to the orders preserves the stake invariant:
    /// matched + unmatched == total on every touched order.
    #[test]
    fn applied_allocations_preserve_stake_invariant(
        incoming in stake_strategy(),
        stakes in candidate_stakes_strategy(),
    ) {
        let mut candidates = candidates_from(&stakes);
        let allocations = ProRataStrategy.allocate(incoming, &candidates);

        for allocation in &allocations {
            let order = candidates
                .iter_mut()
                .find(|c| c.id == allocation.order_id)
                .unwrap();
            let amount = Money::new(allocation.amount, CurrencyCode::Usd).unwrap();
            order.apply_match(amount).unwrap();
        }

        for order in &candidates {
            prop_assert_eq!(
                order.matched_stake.amount() + order.unmatched_stake.amount(),
                order.total_stake.amount()
            );
        }
    }

    /// American odds conversion round-trips exactly on integer American
    /// prices outside the (-100, 100) dead zone.
    #[test]
    fn american_odds_round_trip(american in prop_oneof![-2000i32..=-100, 100i32..=2000]) {
        let odds = Odds::from_american(american).unwrap();
        prop_assert_eq!(odds.to_american(), Some(american));
    }

    /// Payout minus profit is always exactly the stake.
    #[test]
    fn payout_profit_identity(stake in stake_strategy(), odds in odds_strategy()) {
        let odds = Odds::new(odds).unwrap();
        let stake = Money::new(stake, CurrencyCode::Usd).unwrap();

        let payout = odds.payout(stake).unwrap();
        let profit = odds.profit(stake).unwrap();
        prop_assert_eq!(payout.sub(profit).unwrap().amount(), stake.rounded().amount());
    }

    /// Parlay combination is order-independent.
    #[test]
    fn odds_combination_commutes(a in odds_strategy(), b in odds_strategy()) {
        let a = Odds::new(a).unwrap();
        let b = Odds::new(b).unwrap();
        prop_assert_eq!(a.combine(b), b.combine(a));
    }
}

/// Random operation sequences against a wallet: the balance never goes
/// negative and the currency never changes.
#[derive(Debug, Clone)]
enum WalletOp {
    Deposit(Decimal),
    Withdraw(Decimal),
    DebitStake(Decimal),
    CreditPayout(Decimal),
}

fn wallet_op_strategy() -> impl Strategy<Value = WalletOp> {
    prop_oneof![
        stake_strategy().prop_map(WalletOp::Deposit),
        stake_strategy().prop_map(WalletOp::Withdraw),
        stake_strategy().prop_map(WalletOp::DebitStake),
        stake_strategy().prop_map(WalletOp::CreditPayout),
    ]
}

proptest! {
    #[test]
    fn wallet_never_negative(ops in prop::collection::vec(wallet_op_strategy(), 1..40)) {
        let mut wallet = Wallet::new(UserId(1), CurrencyCode::Usd);

        for op in ops {
            let money = |d: Decimal| Money::new(d, CurrencyCode::Usd).unwrap();
            // failures are legal (insufficient funds), partial application is not
            let before = wallet.balance;
            let result = match op {
                WalletOp::Deposit(d) => wallet.deposit(money(d)),
                WalletOp::Withdraw(d) => wallet.withdraw(money(d)),
                WalletOp::DebitStake(d) => wallet.debit_stake(money(d)),
                WalletOp::CreditPayout(d) => wallet.credit_payout(money(d)),
            };
            if result.is_err() {
                prop_assert_eq!(wallet.balance, before, "failed op mutated balance");
            }

            prop_assert!(wallet.balance.amount() >= Decimal::ZERO);
            prop_assert_eq!(wallet.currency(), CurrencyCode::Usd);
        }
    }
}
