// betex-core: betting exchange core engine.
// settlement-first architecture: order matching, bet settlement, and
// commission pricing take priority. all computation is deterministic with no
// external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: ids, Side, LiquidityRole, CurrencyCode, Timestamp
//   2.x  money.rs: Money value type with currency-checked arithmetic
//   3.x  odds.rs: decimal odds, parlay combination, american conversion
//   4.x  event.rs: sport event lifecycle and final scores
//   5.x  market.rs: markets, outcomes, outcome results
//   6.x  bet.rs: sportsbook bets, parlay recalculation, manual voids
//   7.x  order.rs: exchange orders, per-outcome book, BetMatch records
//   8.x  allocation.rs: FIFO / pro-rata / hybrid matching strategies
//   9.x  settlement.rs: per-market-type settlement rules
//   10.x commission.rs: tier schedule and maker/taker fee pricing
//   11.x user.rs: user profiles and rolling statistics
//   12.x wallet.rs: versioned wallets
//   13.x ledger.rs: optimistic-concurrency wallet store with bounded retry
//   14.x events.rs: audit event stream
//   15.x config.rs: exchange configuration and presets
//   16.x engine/: core engine: orders, matching, settlement

// core domain modules
pub mod bet;
pub mod event;
pub mod market;
pub mod money;
pub mod odds;
pub mod order;
pub mod types;

// matching and settlement
pub mod allocation;
pub mod settlement;

// pricing and accounts
pub mod commission;
pub mod ledger;
pub mod user;
pub mod wallet;

// integration modules
pub mod config;
pub mod engine;
pub mod events;

// re exports for convenience
pub use allocation::*;
pub use bet::*;
pub use commission::*;
pub use config::{ConfigError, ExchangeConfig};
pub use engine::*;
pub use event::*;
pub use ledger::*;
pub use market::*;
pub use money::*;
pub use odds::*;
pub use order::*;
pub use settlement::*;
pub use types::*;
pub use user::*;
pub use wallet::*;
