//! Persisted State
//!
//! The core persists as two independent JSON documents: one for the pattern
//! store, one for the autonomy controller. Round-trips are lossless for all
//! observable state. Loading is deliberately forgiving: a missing or
//! malformed document falls back to documented defaults, and partial
//! documents fill absent fields with defaults - the controller is itself a
//! recovery mechanism and must never become the cause of an outage.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{info, warn};

use crate::autonomy::{AuditRecord, AutonomyConfig, AutonomyController, AutonomyLevel};
use crate::store::{PatternId, PatternStore, ResponsePattern, StoreConfig};

/// Failures while writing a snapshot to disk. Reads never fail; they fall
/// back to defaults instead.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persisted form of the pattern store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub patterns: Vec<ResponsePattern>,
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub recently_used: Vec<PatternId>,
}

/// Persisted form of the autonomy controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    #[serde(default)]
    pub level: AutonomyLevel,
    #[serde(default)]
    pub level_entered_tick: u64,
    #[serde(default)]
    pub generator_calls: u64,
    #[serde(default)]
    pub pattern_calls: u64,
    #[serde(default)]
    pub bypass_count: u64,
    #[serde(default)]
    pub bypass_attempts: u64,
    #[serde(default)]
    pub bypass_successes: u64,
    #[serde(default)]
    pub quality_samples: Vec<f64>,
    #[serde(default)]
    pub last_audit_tick: u64,
    #[serde(default)]
    pub audit_history: Vec<AuditRecord>,
}

impl PatternStore {
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            patterns: self.patterns().to_vec(),
            next_id: self.next_id(),
            recently_used: self.recently_used().iter().copied().collect(),
        }
    }

    pub fn restore(snapshot: StoreSnapshot, config: StoreConfig) -> Self {
        Self::from_parts(
            config,
            snapshot.patterns,
            snapshot.next_id,
            snapshot.recently_used.into_iter().collect(),
        )
    }
}

impl AutonomyController {
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            level: self.level,
            level_entered_tick: self.level_entered_tick,
            generator_calls: self.generator_calls,
            pattern_calls: self.pattern_calls,
            bypass_count: self.bypass_count,
            bypass_attempts: self.bypass_attempts,
            bypass_successes: self.bypass_successes,
            quality_samples: self.quality_samples.iter().copied().collect(),
            last_audit_tick: self.last_audit_tick,
            audit_history: self.audit_records.iter().cloned().collect(),
        }
    }

    pub fn restore(snapshot: ControllerSnapshot, config: AutonomyConfig) -> Self {
        let mut controller = Self::new(config);
        controller.level = snapshot.level;
        controller.level_entered_tick = snapshot.level_entered_tick;
        controller.generator_calls = snapshot.generator_calls;
        controller.pattern_calls = snapshot.pattern_calls;
        controller.bypass_count = snapshot.bypass_count;
        controller.bypass_attempts = snapshot.bypass_attempts;
        controller.bypass_successes = snapshot.bypass_successes;
        controller.quality_samples = VecDeque::from(snapshot.quality_samples);
        controller.last_audit_tick = snapshot.last_audit_tick;
        controller.audit_records = snapshot.audit_history.into_iter().collect();
        controller
    }
}

/// Write the pattern store document.
pub fn save_store(store: &PatternStore, path: &Path) -> Result<(), SnapshotError> {
    let json = serde_json::to_string_pretty(&store.snapshot())?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), patterns = store.len(), "pattern store saved");
    Ok(())
}

/// Load the pattern store document; missing or malformed files yield a
/// fresh store with the seed catalog.
pub fn load_store(path: &Path, config: StoreConfig) -> PatternStore {
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str::<StoreSnapshot>(&json) {
            Ok(snapshot) => {
                let store = PatternStore::restore(snapshot, config);
                info!(path = %path.display(), patterns = store.len(), "pattern store loaded");
                store
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed store document, starting fresh");
                PatternStore::new(config)
            }
        },
        Err(_) => {
            info!(path = %path.display(), "no store document, starting fresh");
            PatternStore::new(config)
        }
    }
}

/// Write the controller document.
pub fn save_controller(controller: &AutonomyController, path: &Path) -> Result<(), SnapshotError> {
    let json = serde_json::to_string_pretty(&controller.snapshot())?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), level = controller.current_level().as_str(), "controller saved");
    Ok(())
}

/// Load the controller document; missing or malformed files yield a fresh
/// controller at the floor level.
pub fn load_controller(path: &Path, config: AutonomyConfig) -> AutonomyController {
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str::<ControllerSnapshot>(&json) {
            Ok(snapshot) => {
                let controller = AutonomyController::restore(snapshot, config);
                info!(
                    path = %path.display(),
                    level = controller.current_level().as_str(),
                    "controller loaded"
                );
                controller
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed controller document, starting fresh");
                AutonomyController::new(config)
            }
        },
        Err(_) => {
            info!(path = %path.display(), "no controller document, starting fresh");
            AutonomyController::new(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::situation::{Emotion, Intent, Situation};
    use crate::template::TemplateVars;

    fn populated_store() -> PatternStore {
        let mut store = PatternStore::with_rng_seed(StoreConfig::default(), 3);
        let situation = Situation {
            intents: [Intent::Sharing].into_iter().collect(),
            emotions: [Emotion::Excitement].into_iter().collect(),
            ..Default::default()
        };
        store
            .extract_and_store("wait, tell me everything", &situation, 0.8, &TemplateVars::default())
            .unwrap();
        store.find_best_match(&situation, &TemplateVars::default(), 12);
        store
    }

    #[test]
    fn test_store_snapshot_round_trip() {
        let store = populated_store();
        let snapshot = store.snapshot();

        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: StoreSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, decoded);

        let restored = PatternStore::restore(decoded, StoreConfig::default());
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_controller_snapshot_round_trip() {
        let mut store = populated_store();
        let mut controller = AutonomyController::new(AutonomyConfig::default());
        for i in 0..25 {
            controller.report(&mut store, 0.6 + (i as f64) * 0.01, false, None, None);
        }
        controller.evaluate(&mut store, 400);

        let snapshot = controller.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: ControllerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, decoded);

        let restored = AutonomyController::restore(decoded, AutonomyConfig::default());
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_partial_store_document_uses_defaults() {
        let snapshot: StoreSnapshot =
            serde_json::from_str(r#"{"patterns": []}"#).unwrap();
        assert_eq!(snapshot.next_id, 0);
        assert!(snapshot.recently_used.is_empty());

        // A pattern missing most fields decodes with defaults.
        let snapshot: StoreSnapshot = serde_json::from_str(
            r#"{"patterns": [{"id": 7, "template": "hello {name}"}], "next_id": 8}"#,
        )
        .unwrap();
        let p = &snapshot.patterns[0];
        assert_eq!(p.id, PatternId(7));
        assert_eq!(p.use_count, 0);
        assert!((p.avg_satisfaction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_stale_id_counter_is_repaired() {
        let snapshot: StoreSnapshot = serde_json::from_str(
            r#"{"patterns": [{"id": 7, "template": "hello"}], "next_id": 3}"#,
        )
        .unwrap();
        let mut store = PatternStore::restore(snapshot, StoreConfig::default());
        let id = store
            .extract_and_store(
                "a freshly learned line",
                &Situation::new(),
                0.9,
                &TemplateVars::default(),
            )
            .unwrap();
        assert!(id.0 > 7, "repaired counter must not reuse ids");
    }

    #[test]
    fn test_partial_controller_document_uses_defaults() {
        let snapshot: ControllerSnapshot = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(snapshot.level, AutonomyLevel::FullGenerator);
        assert_eq!(snapshot.generator_calls, 0);
        assert!(snapshot.quality_samples.is_empty());
    }

    #[test]
    fn test_unknown_level_name_falls_back_to_floor() {
        let snapshot: ControllerSnapshot =
            serde_json::from_str(r#"{"level": "overdrive", "generator_calls": 9}"#).unwrap();
        assert_eq!(snapshot.level, AutonomyLevel::FullGenerator);
        assert_eq!(snapshot.generator_calls, 9);
    }

    #[test]
    fn test_missing_files_yield_fresh_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = load_store(&dir.path().join("absent.json"), StoreConfig::default());
        assert!(store.len() > 0, "fresh store carries the seed catalog");

        let controller =
            load_controller(&dir.path().join("absent.json"), AutonomyConfig::default());
        assert_eq!(controller.current_level(), AutonomyLevel::FullGenerator);
    }

    #[test]
    fn test_malformed_file_yields_fresh_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("garbled.json");
        std::fs::write(&path, "{not json at all").unwrap();

        let store = load_store(&path, StoreConfig::default());
        assert!(store.len() > 0);
        let controller = load_controller(&path, AutonomyConfig::default());
        assert_eq!(controller.current_level(), AutonomyLevel::FullGenerator);
    }

    #[test]
    fn test_save_and_load_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let store_path = dir.path().join("patterns.json");
        let controller_path = dir.path().join("autonomy.json");

        let store = populated_store();
        let controller = AutonomyController::new(AutonomyConfig::default());

        save_store(&store, &store_path).unwrap();
        save_controller(&controller, &controller_path).unwrap();

        let loaded = load_store(&store_path, StoreConfig::default());
        assert_eq!(loaded.snapshot(), store.snapshot());

        let loaded = load_controller(&controller_path, AutonomyConfig::default());
        assert_eq!(loaded.snapshot(), controller.snapshot());
    }
}
