// 9.0 settlement.rs: market settlement rules, one pure function per market
// type. dispatch is a strategy table keyed on MarketType; types without an
// entry are skipped by settle_event, not errors.

use crate::event::{Score, SportEvent};
use crate::market::{Market, MarketType, OutcomeResult};
use crate::types::{EventId, MarketId, OutcomeId};
use rust_decimal::Decimal;

/// What settlement decided for each outcome of a market.
pub type OutcomeUpdates = Vec<(OutcomeId, OutcomeResult)>;

/// A market settlement rule: pure function from final score to outcome
/// results. No mutation; the engine applies the updates.
pub type MarketSettler = fn(&SportEvent, &Market, Score) -> Result<OutcomeUpdates, SettlementError>;

/// Strategy table. Returns None for market types without automatic
/// settlement (e.g. specials graded by an operator).
pub fn settler_for(market_type: MarketType) -> Option<MarketSettler> {
    match market_type {
        MarketType::Moneyline => Some(settle_moneyline),
        MarketType::Spread => Some(settle_spread),
        MarketType::Totals => Some(settle_totals),
        MarketType::Specials => None,
    }
}

/// Winner is the outcome named after the higher-scoring team. A tie settles
/// the Draw outcome if the market has one, otherwise voids both sides.
fn settle_moneyline(
    event: &SportEvent,
    market: &Market,
    score: Score,
) -> Result<OutcomeUpdates, SettlementError> {
    let home = market
        .outcomes
        .iter()
        .find(|o| o.name == event.home_team)
        .ok_or_else(|| SettlementError::MissingOutcome {
            market_id: market.id,
            name: event.home_team.clone(),
        })?;
    let away = market
        .outcomes
        .iter()
        .find(|o| o.name == event.away_team)
        .ok_or_else(|| SettlementError::MissingOutcome {
            market_id: market.id,
            name: event.away_team.clone(),
        })?;
    let draw = market.outcomes.iter().find(|o| o.name == "Draw");

    let mut updates = Vec::new();
    if score.home > score.away {
        updates.push((home.id, OutcomeResult::Winner));
        updates.push((away.id, OutcomeResult::Loser));
        if let Some(draw) = draw {
            updates.push((draw.id, OutcomeResult::Loser));
        }
    } else if score.away > score.home {
        updates.push((home.id, OutcomeResult::Loser));
        updates.push((away.id, OutcomeResult::Winner));
        if let Some(draw) = draw {
            updates.push((draw.id, OutcomeResult::Loser));
        }
    } else if let Some(draw) = draw {
        updates.push((home.id, OutcomeResult::Loser));
        updates.push((away.id, OutcomeResult::Loser));
        updates.push((draw.id, OutcomeResult::Winner));
    } else {
        // two-way market, scores level: push
        updates.push((home.id, OutcomeResult::Void));
        updates.push((away.id, OutcomeResult::Void));
    }
    Ok(updates)
}

/// Point spread: exactly two outcomes, each with a signed line. The home
/// side's line is applied to the home score; an exact tie after adjustment is
/// a market-level push.
fn settle_spread(
    event: &SportEvent,
    market: &Market,
    score: Score,
) -> Result<OutcomeUpdates, SettlementError> {
    if market.outcomes.len() != 2 {
        return Err(SettlementError::WrongOutcomeCount {
            market_id: market.id,
            expected: 2,
            got: market.outcomes.len(),
        });
    }

    let home = market
        .outcomes
        .iter()
        .find(|o| o.name == event.home_team)
        .ok_or_else(|| SettlementError::MissingOutcome {
            market_id: market.id,
            name: event.home_team.clone(),
        })?;
    let away = market
        .outcomes
        .iter()
        .find(|o| o.id != home.id)
        .expect("two outcomes were checked above");

    let home_line = home.line.ok_or(SettlementError::MissingLine {
        market_id: market.id,
        outcome_id: home.id,
    })?;

    let adjusted_home = Decimal::from(score.home) + home_line;
    let away_score = Decimal::from(score.away);

    let updates = if adjusted_home > away_score {
        vec![
            (home.id, OutcomeResult::Winner),
            (away.id, OutcomeResult::Loser),
        ]
    } else if adjusted_home < away_score {
        vec![
            (home.id, OutcomeResult::Loser),
            (away.id, OutcomeResult::Winner),
        ]
    } else {
        vec![(home.id, OutcomeResult::Push), (away.id, OutcomeResult::Push)]
    };
    Ok(updates)
}

/// Totals: Over/Under sharing one line, graded against the combined score.
/// Landing exactly on the line pushes both sides.
fn settle_totals(
    _event: &SportEvent,
    market: &Market,
    score: Score,
) -> Result<OutcomeUpdates, SettlementError> {
    let over = market
        .outcomes
        .iter()
        .find(|o| o.name == "Over")
        .ok_or_else(|| SettlementError::MissingOutcome {
            market_id: market.id,
            name: "Over".to_string(),
        })?;
    let under = market
        .outcomes
        .iter()
        .find(|o| o.name == "Under")
        .ok_or_else(|| SettlementError::MissingOutcome {
            market_id: market.id,
            name: "Under".to_string(),
        })?;

    let over_line = over.line.ok_or(SettlementError::MissingLine {
        market_id: market.id,
        outcome_id: over.id,
    })?;
    let under_line = under.line.ok_or(SettlementError::MissingLine {
        market_id: market.id,
        outcome_id: under.id,
    })?;
    if over_line != under_line {
        return Err(SettlementError::LineMismatch {
            market_id: market.id,
            over: over_line,
            under: under_line,
        });
    }

    let total = Decimal::from(score.total());
    let updates = if total > over_line {
        vec![
            (over.id, OutcomeResult::Winner),
            (under.id, OutcomeResult::Loser),
        ]
    } else if total < over_line {
        vec![
            (over.id, OutcomeResult::Loser),
            (under.id, OutcomeResult::Winner),
        ]
    } else {
        vec![
            (over.id, OutcomeResult::Push),
            (under.id, OutcomeResult::Push),
        ]
    };
    Ok(updates)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("Event {0:?} has no final score")]
    MissingScore(EventId),

    #[error("Market {market_id:?} has no outcome named {name:?}")]
    MissingOutcome { market_id: MarketId, name: String },

    #[error("Market {market_id:?}: expected {expected} outcomes, got {got}")]
    WrongOutcomeCount {
        market_id: MarketId,
        expected: usize,
        got: usize,
    },

    #[error("Market {market_id:?}: outcome {outcome_id:?} has no line")]
    MissingLine {
        market_id: MarketId,
        outcome_id: OutcomeId,
    },

    #[error("Market {market_id:?}: Over line {over} != Under line {under}")]
    LineMismatch {
        market_id: MarketId,
        over: Decimal,
        under: Decimal,
    },

    #[error("Outcome {0:?} is not resolved")]
    OutcomeUnresolved(OutcomeId),
}
