//! Sport event lifecycle.
//!
//! Events own markets (tracked by the engine) and gate settlement: completing
//! an event freezes its final score and force-closes every market, cancelling
//! force-closes without a score.

use crate::types::{EventId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Scheduled,
    InProgress,
    Suspended,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Cancelled)
    }
}

/// Final score, immutable once the event completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    pub fn total(&self) -> u32 {
        self.home + self.away
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportEvent {
    pub id: EventId,
    pub name: String,
    pub home_team: String,
    pub away_team: String,
    pub status: EventStatus,
    pub scheduled_at: Timestamp,
    pub final_score: Option<Score>,
}

impl SportEvent {
    pub fn new(
        id: EventId,
        name: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        scheduled_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            status: EventStatus::Scheduled,
            scheduled_at,
            final_score: None,
        }
    }

    fn transition(&mut self, from: &[EventStatus], to: EventStatus) -> Result<(), EventError> {
        if !from.contains(&self.status) {
            return Err(EventError::InvalidTransition {
                event_id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), EventError> {
        self.transition(&[EventStatus::Scheduled], EventStatus::InProgress)
    }

    pub fn suspend(&mut self) -> Result<(), EventError> {
        self.transition(&[EventStatus::InProgress], EventStatus::Suspended)
    }

    pub fn resume(&mut self) -> Result<(), EventError> {
        self.transition(&[EventStatus::Suspended], EventStatus::InProgress)
    }

    /// Complete with a final score. The score is immutable afterwards; the
    /// engine force-closes all of the event's markets.
    pub fn complete(&mut self, score: Score) -> Result<(), EventError> {
        self.transition(
            &[EventStatus::InProgress, EventStatus::Suspended],
            EventStatus::Completed,
        )?;
        self.final_score = Some(score);
        Ok(())
    }

    /// Cancel before completion. No score; downstream bets void.
    pub fn cancel(&mut self) -> Result<(), EventError> {
        self.transition(
            &[
                EventStatus::Scheduled,
                EventStatus::InProgress,
                EventStatus::Suspended,
            ],
            EventStatus::Cancelled,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("Event {event_id:?}: illegal transition {from:?} -> {to:?}")]
    InvalidTransition {
        event_id: EventId,
        from: EventStatus,
        to: EventStatus,
    },

    #[error("Event {0:?} not found")]
    EventNotFound(EventId),
}
