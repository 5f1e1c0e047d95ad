//! Betting Exchange Core Simulation.
//!
//! Demonstrates the full engine lifecycle: sportsbook bets with parlay
//! recalculation, exchange order matching under each strategy, match
//! settlement with tiered commission, and the optimistic wallet ledger.

use betex_core::*;
use rust_decimal_macros::dec;

fn main() {
    println!("Betting Exchange Core Engine Simulation");
    println!("Sportsbook + Exchange, Single Currency, Full Lifecycle\n");

    scenario_1_sportsbook_single();
    scenario_2_parlay_reduction();
    scenario_3_exchange_fifo_matching();
    scenario_4_pro_rata_matching();
    scenario_5_match_settlement_and_commission();
    scenario_6_optimistic_ledger();

    println!("\nAll simulations completed successfully.");
}

fn usd(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount, CurrencyCode::Usd).unwrap()
}

/// Build an event with a moneyline market and return the ids.
fn setup_moneyline(engine: &mut Engine) -> (EventId, MarketId, OutcomeId, OutcomeId) {
    let event_id = engine.add_event(SportEvent::new(
        EventId(1),
        "Lions vs Bears",
        "Lions",
        "Bears",
        engine.time(),
    ));
    let market = Market::new(
        MarketId(1),
        event_id,
        "Moneyline",
        MarketType::Moneyline,
        vec![
            Outcome::new(OutcomeId(1), "Lions", Odds::new_unchecked(dec!(1.9))),
            Outcome::new(OutcomeId(2), "Bears", Odds::new_unchecked(dec!(2.1))),
        ],
    );
    let market_id = engine.add_market(market).unwrap();
    (event_id, market_id, OutcomeId(1), OutcomeId(2))
}

/// Single sportsbook bet from placement to payout.
fn scenario_1_sportsbook_single() {
    println!("Scenario 1: Sportsbook Single Bet\n");

    let mut engine = Engine::new(EngineConfig::default());
    let (event_id, market_id, lions, _bears) = setup_moneyline(&mut engine);

    let alice = engine.register_user("alice", CurrencyCode::Usd);
    engine.deposit(alice, usd(dec!(1000))).unwrap();

    let bet_id = engine
        .place_single_bet(alice, market_id, lions, usd(dec!(100)))
        .unwrap();
    println!("  Alice bets $100 on Lions at 1.9");
    println!("  Balance after placement: {}", engine.balance(alice).unwrap());

    engine.start_event(event_id).unwrap();
    engine.suspend_event(event_id).unwrap(); // weather delay
    engine.resume_event(event_id).unwrap();
    engine.complete_event(event_id, Score::new(27, 20)).unwrap();
    engine.settle_event(event_id).unwrap();

    let settlement = engine.settle_bet(bet_id).unwrap();
    println!("  Lions win 27-20: bet {:?}, payout {}", settlement.status, settlement.payout);
    println!("  Final balance: {}\n", engine.balance(alice).unwrap());
}

/// Parlay with one voided leg pays at the reduced odds.
fn scenario_2_parlay_reduction() {
    println!("Scenario 2: Parlay Leg-Void Recalculation\n");

    let mut engine = Engine::new(EngineConfig::default());
    let (event_id, market_id, lions, _) = setup_moneyline(&mut engine);

    // second event that will be cancelled, voiding its leg
    let cancelled_event = engine.add_event(SportEvent::new(
        EventId(2),
        "Hawks vs Wolves",
        "Hawks",
        "Wolves",
        engine.time(),
    ));
    let second_market = Market::new(
        MarketId(2),
        cancelled_event,
        "Moneyline",
        MarketType::Moneyline,
        vec![
            Outcome::new(OutcomeId(3), "Hawks", Odds::new_unchecked(dec!(2.0))),
            Outcome::new(OutcomeId(4), "Wolves", Odds::new_unchecked(dec!(1.8))),
        ],
    );
    engine.add_market(second_market).unwrap();

    let bob = engine.register_user("bob", CurrencyCode::Usd);
    engine.deposit(bob, usd(dec!(500))).unwrap();

    let bet_id = engine
        .place_parlay_bet(
            bob,
            &[(market_id, lions), (MarketId(2), OutcomeId(3))],
            usd(dec!(100)),
        )
        .unwrap();
    let bet = engine.get_bet(bet_id).unwrap();
    println!("  Bob parlays $100: Lions 1.9 x Hawks 2.0 = {}", bet.combined_odds);
    println!("  Potential payout: {}", bet.potential_payout);

    engine.start_event(event_id).unwrap();
    engine.complete_event(event_id, Score::new(30, 10)).unwrap();
    engine.settle_event(event_id).unwrap();
    engine.cancel_event(cancelled_event).unwrap();

    let settlement = engine.settle_bet(bet_id).unwrap();
    println!(
        "  Lions win, Hawks leg voided: {:?} at reduced payout {}\n",
        settlement.status, settlement.payout
    );
}

/// FIFO matching: earlier resting orders fill first.
fn scenario_3_exchange_fifo_matching() {
    println!("Scenario 3: Exchange FIFO Matching\n");

    let mut engine = Engine::new(EngineConfig::default());
    let (_, market_id, lions, _) = setup_moneyline(&mut engine);

    let maker1 = engine.register_user("maker1", CurrencyCode::Usd);
    let maker2 = engine.register_user("maker2", CurrencyCode::Usd);
    let taker = engine.register_user("taker", CurrencyCode::Usd);
    for user in [maker1, maker2, taker] {
        engine.deposit(user, usd(dec!(1000))).unwrap();
    }

    let odds = Odds::new_unchecked(dec!(2.0));
    engine
        .match_order(maker1, market_id, lions, Side::Lay, odds, usd(dec!(100)))
        .unwrap();
    engine.advance_time(10);
    engine
        .match_order(maker2, market_id, lions, Side::Lay, odds, usd(dec!(50)))
        .unwrap();
    engine.advance_time(10);

    println!("  Two lay orders resting: $100 (t0), $50 (t1) at 2.0");

    let result = engine
        .match_order(taker, market_id, lions, Side::Back, odds, usd(dec!(120)))
        .unwrap();
    println!(
        "  Back $120 arrives: matched {}, unmatched {}, fills {}",
        result.matched_amount,
        result.unmatched_amount,
        result.matches.len()
    );
    let first_maker = engine.get_order(OrderId(1)).unwrap();
    println!(
        "  First maker fully matched: {:?}, second got the remainder\n",
        first_maker.state
    );
}

/// Pro-rata matching splits proportionally to size.
fn scenario_4_pro_rata_matching() {
    println!("Scenario 4: Pro-Rata Matching\n");

    let mut engine = Engine::new(EngineConfig::with_exchange(ExchangeConfig::pro_rata()));
    let (_, market_id, lions, _) = setup_moneyline(&mut engine);

    let makers: Vec<_> = ["m1", "m2", "m3"]
        .iter()
        .map(|name| {
            let id = engine.register_user(*name, CurrencyCode::Usd);
            engine.deposit(id, usd(dec!(1000))).unwrap();
            id
        })
        .collect();
    let taker = engine.register_user("taker", CurrencyCode::Usd);
    engine.deposit(taker, usd(dec!(1000))).unwrap();

    let odds = Odds::new_unchecked(dec!(2.0));
    for (maker, stake) in makers.iter().zip([dec!(100), dec!(50), dec!(100)]) {
        engine
            .match_order(*maker, market_id, lions, Side::Lay, odds, usd(stake))
            .unwrap();
        engine.advance_time(5);
    }

    println!("  Book: $100 / $50 / $100 lay liquidity at 2.0");
    engine
        .match_order(taker, market_id, lions, Side::Back, odds, usd(dec!(150)))
        .unwrap();

    for id in 1..=3u64 {
        let order = engine.get_order(OrderId(id)).unwrap();
        println!("  Maker order {} matched {}", id, order.matched_stake);
    }
    println!();
}

/// Exchange settlement: winner pays tiered commission, loser pays nothing.
fn scenario_5_match_settlement_and_commission() {
    println!("Scenario 5: Match Settlement and Commission\n");

    let mut engine = Engine::new(EngineConfig::default());
    let (event_id, market_id, lions, _) = setup_moneyline(&mut engine);

    let backer = engine.register_user("backer", CurrencyCode::Usd);
    let layer = engine.register_user("layer", CurrencyCode::Usd);
    engine.deposit(backer, usd(dec!(1000))).unwrap();
    engine.deposit(layer, usd(dec!(1000))).unwrap();

    let odds = Odds::new_unchecked(dec!(2.0));
    engine
        .match_order(layer, market_id, lions, Side::Lay, odds, usd(dec!(100)))
        .unwrap();
    engine.advance_time(10);
    let result = engine
        .match_order(backer, market_id, lions, Side::Back, odds, usd(dec!(100)))
        .unwrap();

    println!("  $100 matched at 2.0, layer is the maker");

    engine.start_event(event_id).unwrap();
    engine.complete_event(event_id, Score::new(21, 14)).unwrap();
    engine.settle_event(event_id).unwrap();

    let settlement = engine.settle_exchange_match(result.matches[0]).unwrap();
    println!(
        "  Lions win: taker backer wins gross {}, commission {}, payout {}",
        settlement.gross_winnings, settlement.commission, settlement.payout
    );
    println!("  Backer balance: {}", engine.balance(backer).unwrap());
    println!("  Layer balance: {}\n", engine.balance(layer).unwrap());
}

/// Optimistic concurrency: a stale commit is rejected and retried.
fn scenario_6_optimistic_ledger() {
    println!("Scenario 6: Optimistic Ledger\n");

    let store = WalletStore::new();
    store.create(UserId(1), CurrencyCode::Usd);
    store
        .update(UserId(1), RetryPolicy::default(), |w| w.deposit(usd(dec!(100))))
        .unwrap();

    // simulate a stale writer: load, let another commit win, then commit
    let stale = store.load(UserId(1)).unwrap();
    store
        .update(UserId(1), RetryPolicy::default(), |w| w.deposit(usd(dec!(10))))
        .unwrap();

    let mut mutated = stale;
    mutated.deposit(usd(dec!(50))).unwrap();
    match store.commit(mutated) {
        Err(LedgerError::Conflict { .. }) => println!("  Stale commit rejected, as designed"),
        other => println!("  Unexpected: {:?}", other),
    }

    // the retry wrapper reloads and succeeds
    store
        .update(UserId(1), RetryPolicy::default(), |w| w.deposit(usd(dec!(50))))
        .unwrap();
    println!(
        "  Final balance after retry: {}\n",
        store.balance_of(UserId(1)).unwrap()
    );
}
