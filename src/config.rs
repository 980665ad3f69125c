//! Configuration management

use anyhow::Result;

use crate::autonomy::AutonomyConfig;
use crate::store::StoreConfig;

/// Combined configuration for the adaptive core.
///
/// Defaults match the documented tuning; `from_env` lets a host override
/// the headline knobs without recompiling.
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    pub store: StoreConfig,
    pub autonomy: AutonomyConfig,
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Result<Self> {
        let mut store = StoreConfig::default();
        let mut autonomy = AutonomyConfig::default();

        store.max_patterns = env_parse("COMPANION_MAX_PATTERNS", store.max_patterns);
        store.min_match_score = env_parse("COMPANION_MIN_MATCH_SCORE", store.min_match_score);
        store.recent_capacity = env_parse("COMPANION_RECENT_RING", store.recent_capacity);
        store.extraction_floor = env_parse("COMPANION_EXTRACTION_FLOOR", store.extraction_floor);

        autonomy.audit_interval = env_parse("COMPANION_AUDIT_INTERVAL", autonomy.audit_interval);
        autonomy.quality_window = env_parse("COMPANION_QUALITY_WINDOW", autonomy.quality_window);

        Ok(Self { store, autonomy })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
