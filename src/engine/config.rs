//! Engine configuration options.

use crate::config::ExchangeConfig;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Exchange behaviour: matching strategy, commission schedule, retries.
    pub exchange: ExchangeConfig,
    /// Maximum number of audit events to retain in memory.
    pub max_audit_events: usize,
    /// Enable verbose logging.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig::default(),
            max_audit_events: 100_000,
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn with_exchange(exchange: ExchangeConfig) -> Self {
        Self {
            exchange,
            ..Self::default()
        }
    }
}
