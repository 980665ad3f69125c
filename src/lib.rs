//! Companion Adaptive Core
//!
//! Response pattern store and autonomy controller for a simulated
//! companion whose replies normally come from an expensive external text
//! generator. The core learns reusable templates from good generator
//! output, matches incoming situations against them, and governs a
//! graduated policy for bypassing the generator.
//!
//! # Features
//!
//! - **Pattern Store**: learned (situation -> template) associations with
//!   deduplication, reinforcement, and value-scored eviction
//! - **Matcher**: deterministic weighted similarity over six situation
//!   dimensions
//! - **Template Expander**: placeholder substitution with soft defaults
//!   and clause-level degradation
//! - **Autonomy Controller**: five-level trust ladder with hysteresis,
//!   quality audits, and automatic rollback
//! - **Snapshots**: two forgiving JSON documents that round-trip all
//!   observable state
//!
//! # Architecture
//!
//! ```text
//! Host ──► AutonomyController::decide ──► Strategy
//!               │                            │
//!               ├── PatternStore (match,     └── host executes, invoking
//!               │     learn, cull, evict)        the generator as directed
//!               └── quality ring + audits ──► promote / demote / reset
//! ```
//!
//! The core is synchronous and single-threaded: it never calls
//! the generator itself and has no suspension points. A concurrent host
//! must serialize access.

pub mod autonomy;
pub mod config;
pub mod matcher;
mod seed;
pub mod situation;
pub mod snapshot;
pub mod store;
pub mod template;


pub use autonomy::{
    AuditRecord, AutonomyConfig, AutonomyController, AutonomyLevel, ControllerMetrics,
    DemotionReason, LevelChange, Strategy, TransitionCondition,
};
pub use config::CoreConfig;
pub use matcher::{situation_overlap, situation_score};
pub use situation::{
    ConversationDepth, Emotion, EmotionGroup, Intent, RelationshipPhase, Situation, TimeOfDay,
};
pub use snapshot::{
    load_controller, load_store, save_controller, save_store, ControllerSnapshot, SnapshotError,
    StoreSnapshot,
};
pub use store::{
    PatternId, PatternMatch, PatternOrigin, PatternStore, ResponsePattern, StoreConfig, StoreStats,
};
pub use template::{expand, parameterize, TemplateVars};
