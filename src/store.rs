//! Response Pattern Store
//!
//! Owns the collection of learned response patterns: matching against
//! incoming situations, extraction of new patterns from good generator
//! output, feedback reinforcement, and eviction of low-value entries.
//!
//! The store is the sole owner of its patterns; they are mutated only
//! through `find_best_match` (usage) and `feedback`/`extract_and_store`
//! (reinforcement), which keeps `success_count <= use_count` by
//! construction.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info, warn};

use crate::matcher::{situation_overlap, situation_score};
use crate::seed::seed_catalog;
use crate::situation::{ConversationDepth, Emotion, Intent, Situation};
use crate::template::{expand, masked_similarity, parameterize, TemplateVars};

/// Weight of the newest sample in the satisfaction moving average.
const SATISFACTION_EMA_WEIGHT: f64 = 0.2;

/// Stable per-store pattern identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PatternId(pub u64);

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Where a pattern came from. Seed patterns are exempt from eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternOrigin {
    Seed,
    Learned,
}

impl Default for PatternOrigin {
    fn default() -> Self {
        PatternOrigin::Learned
    }
}

/// A learned or seeded (situation -> template) association with usage
/// statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePattern {
    pub id: PatternId,
    #[serde(default)]
    pub situation: Situation,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub success_count: u32,
    #[serde(default)]
    pub use_count: u32,
    #[serde(default = "default_satisfaction")]
    pub avg_satisfaction: f64,
    #[serde(default)]
    pub last_used: u64,
    #[serde(default)]
    pub origin: PatternOrigin,
    #[serde(default)]
    pub emotion_tags: Vec<Emotion>,
}

fn default_satisfaction() -> f64 {
    0.5
}

impl ResponsePattern {
    /// Fraction of uses that were reported successful; 0.0 before any use.
    pub fn success_rate(&self) -> f64 {
        if self.use_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.use_count as f64
        }
    }

    /// How much this pattern can be trusted beyond its situational fit.
    fn reliability(&self) -> f64 {
        self.success_rate() * 0.4
            + self.avg_satisfaction * 0.4
            + (self.use_count as f64 * 0.02).min(0.2)
    }

    /// Ranking used by size-cap eviction; lower is evicted first.
    fn value_score(&self) -> f64 {
        let recency = 1.0 / (1.0 + self.last_used as f64);
        self.success_rate() * 0.3
            + self.avg_satisfaction * 0.4
            + recency * 0.1
            + (self.use_count as f64 * 0.01).min(0.2)
    }

    fn apply_satisfaction(&mut self, satisfaction: f64) {
        self.avg_satisfaction = (1.0 - SATISFACTION_EMA_WEIGHT) * self.avg_satisfaction
            + SATISFACTION_EMA_WEIGHT * satisfaction;
    }
}

/// A successful match, ready for the caller to use.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub pattern_id: PatternId,
    /// Raw situation-match score in [0, 1] (not the reliability-blended
    /// ranking value).
    pub score: f64,
    /// The fully expanded response text.
    pub text: String,
}

/// Tunables for the pattern store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Hard cap on stored patterns; eviction keeps the store at this size.
    pub max_patterns: usize,
    /// Matches scoring below this are discarded.
    pub min_match_score: f64,
    /// Recently-used ring size; patterns in the ring are skipped to avoid
    /// immediate repetition.
    pub recent_capacity: usize,
    /// Minimum satisfaction for extraction to consider a response.
    pub extraction_floor: f64,
    /// Maximum length of a learned template, in characters.
    pub max_template_len: usize,
    /// A template identical to its raw response and longer than this is
    /// rejected as overly specific.
    pub unparameterized_len_limit: usize,
    /// Masked template similarity above which a candidate may be a
    /// duplicate.
    pub dup_similarity: f64,
    /// Situation overlap above which a similar template is a duplicate.
    pub dup_overlap: f64,
    /// Patterns with fewer uses are never culled or evicted.
    pub min_uses_before_eviction: u32,
    /// Culling removes patterns below this satisfaction...
    pub cull_satisfaction_floor: f64,
    /// ...or below this success rate.
    pub cull_success_floor: f64,
    /// Satisfaction assigned to freshly installed seed patterns.
    pub seed_satisfaction: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_patterns: 500,
            min_match_score: 0.4,
            recent_capacity: 20,
            extraction_floor: 0.6,
            max_template_len: 100,
            unparameterized_len_limit: 50,
            dup_similarity: 0.7,
            dup_overlap: 0.5,
            min_uses_before_eviction: 5,
            cull_satisfaction_floor: 0.4,
            cull_success_floor: 0.2,
            seed_satisfaction: 0.7,
        }
    }
}

/// Store-level statistics for display and host reporting.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total: usize,
    pub seeds: usize,
    pub learned: usize,
    pub average_satisfaction: f64,
    pub total_uses: u64,
}

/// The pattern store. Single-threaded; a concurrent host must serialize
/// access.
pub struct PatternStore {
    config: StoreConfig,
    patterns: Vec<ResponsePattern>,
    next_id: u64,
    recently_used: VecDeque<PatternId>,
    rng: StdRng,
}

impl PatternStore {
    /// Create a store with the built-in seed catalog installed.
    pub fn new(config: StoreConfig) -> Self {
        Self::build(config, StdRng::from_entropy())
    }

    /// Create with a fixed RNG seed; the weighted candidate draw becomes
    /// reproducible. Intended for tests.
    pub fn with_rng_seed(config: StoreConfig, seed: u64) -> Self {
        Self::build(config, StdRng::seed_from_u64(seed))
    }

    fn build(config: StoreConfig, rng: StdRng) -> Self {
        let mut store = Self {
            config,
            patterns: Vec::new(),
            next_id: 1,
            recently_used: VecDeque::new(),
            rng,
        };

        for seed in seed_catalog() {
            let id = store.allocate_id();
            store.patterns.push(ResponsePattern {
                id,
                situation: seed.situation,
                template: seed.template.to_string(),
                success_count: 0,
                use_count: 0,
                avg_satisfaction: store.config.seed_satisfaction,
                last_used: 0,
                origin: PatternOrigin::Seed,
                emotion_tags: seed.emotion_tags,
            });
        }

        debug!(seeds = store.patterns.len(), "pattern store created");
        store
    }

    /// Rebuild a store from persisted parts. Used by snapshot restore.
    pub(crate) fn from_parts(
        config: StoreConfig,
        patterns: Vec<ResponsePattern>,
        next_id: u64,
        recently_used: VecDeque<PatternId>,
    ) -> Self {
        let highest = patterns.iter().map(|p| p.id.0).max().unwrap_or(0);
        let next_id = if next_id <= highest {
            warn!(next_id, highest, "persisted id counter behind stored patterns, repairing");
            highest + 1
        } else {
            next_id
        };

        Self {
            config,
            patterns,
            next_id,
            recently_used,
            rng: StdRng::from_entropy(),
        }
    }

    fn allocate_id(&mut self) -> PatternId {
        let id = PatternId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, id: PatternId) -> Option<&ResponsePattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub(crate) fn patterns(&self) -> &[ResponsePattern] {
        &self.patterns
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    pub(crate) fn recently_used(&self) -> &VecDeque<PatternId> {
        &self.recently_used
    }

    /// Find the best usable pattern for the current situation.
    ///
    /// Candidates outside the recently-used ring are scored, filtered by
    /// the minimum match score, blended with reliability, expanded, and the
    /// winner is drawn weighted-randomly from the top three. The winner's
    /// usage counters are updated and its id enters the recently-used ring.
    pub fn find_best_match(
        &mut self,
        situation: &Situation,
        vars: &TemplateVars,
        tick: u64,
    ) -> Option<PatternMatch> {
        struct Candidate {
            idx: usize,
            score: f64,
            rank: f64,
            text: String,
        }

        let mut candidates: Vec<Candidate> = Vec::new();
        for (idx, pattern) in self.patterns.iter().enumerate() {
            if self.recently_used.contains(&pattern.id) {
                continue;
            }

            let score = situation_score(&pattern.situation, situation);
            if score < self.config.min_match_score {
                continue;
            }

            let Some(text) = expand(&pattern.template, vars) else {
                continue;
            };

            let rank = score * 0.7 + pattern.reliability() * 0.3;
            candidates.push(Candidate { idx, score, rank, text });
        }

        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| b.rank.total_cmp(&a.rank));
        candidates.truncate(3);

        // Weighted draw so the system stays varied instead of locking onto
        // one deterministic winner.
        let total: f64 = candidates.iter().map(|c| c.rank).sum();
        let mut roll = self.rng.gen::<f64>() * total;
        let mut chosen = candidates.len() - 1;
        for (i, c) in candidates.iter().enumerate() {
            roll -= c.rank;
            if roll <= 0.0 {
                chosen = i;
                break;
            }
        }

        let picked = &candidates[chosen];
        let (id, score, text) = {
            let pattern = &mut self.patterns[picked.idx];
            pattern.use_count += 1;
            pattern.last_used = tick;
            (pattern.id, picked.score, picked.text.clone())
        };

        self.mark_recently_used(id);
        debug!(%id, score, tick, "pattern matched");

        Some(PatternMatch { pattern_id: id, score, text })
    }

    fn mark_recently_used(&mut self, id: PatternId) {
        if self.config.recent_capacity == 0 {
            return;
        }
        self.recently_used.push_back(id);
        while self.recently_used.len() > self.config.recent_capacity {
            self.recently_used.pop_front();
        }
    }

    /// Learn a template from a high-quality generator response.
    ///
    /// Returns the id of the stored pattern - a fresh one, or the existing
    /// duplicate that was reinforced instead. `None` when the response is
    /// below the satisfaction floor or yields a low-value template.
    pub fn extract_and_store(
        &mut self,
        response_text: &str,
        situation: &Situation,
        satisfaction: f64,
        vars: &TemplateVars,
    ) -> Option<PatternId> {
        if satisfaction < self.config.extraction_floor {
            return None;
        }

        let template = parameterize(response_text, vars);

        if template.chars().count() > self.config.max_template_len {
            debug!(len = template.chars().count(), "extraction rejected: template too long");
            return None;
        }
        if template == response_text
            && response_text.chars().count() > self.config.unparameterized_len_limit
        {
            // Nothing was parameterized: an overly specific, low-value
            // pattern.
            debug!("extraction rejected: nothing parameterized");
            return None;
        }

        if let Some(idx) = self.find_duplicate(&template, situation) {
            let pattern = &mut self.patterns[idx];
            pattern.use_count += 1;
            pattern.success_count += 1;
            pattern.apply_satisfaction(satisfaction);
            debug_assert!(pattern.success_count <= pattern.use_count);
            debug!(id = %pattern.id, "duplicate template reinforced");
            return Some(pattern.id);
        }

        let id = self.allocate_id();
        let emotion_tags: Vec<Emotion> = situation.emotions.iter().copied().take(3).collect();
        self.patterns.push(ResponsePattern {
            id,
            situation: situation.clone(),
            template,
            success_count: 1,
            use_count: 1,
            avg_satisfaction: satisfaction,
            last_used: 0,
            origin: PatternOrigin::Learned,
            emotion_tags,
        });
        info!(%id, total = self.patterns.len(), "learned new response pattern");

        self.enforce_capacity();
        Some(id)
    }

    /// The stored pattern most similar to the candidate template, if the
    /// pair crosses both duplicate thresholds.
    fn find_duplicate(&self, template: &str, situation: &Situation) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, pattern) in self.patterns.iter().enumerate() {
            let similarity = masked_similarity(template, &pattern.template);
            if similarity <= self.config.dup_similarity {
                continue;
            }
            if situation_overlap(situation, &pattern.situation) <= self.config.dup_overlap {
                continue;
            }
            if best.map_or(true, |(_, s)| similarity > s) {
                best = Some((idx, similarity));
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Apply observed quality back to a pattern.
    pub fn feedback(&mut self, id: PatternId, success: bool, satisfaction: f64) {
        let Some(pattern) = self.patterns.iter_mut().find(|p| p.id == id) else {
            warn!(%id, "feedback for unknown pattern");
            return;
        };

        if success {
            pattern.success_count += 1;
        }
        pattern.apply_satisfaction(satisfaction);
        debug_assert!(pattern.success_count <= pattern.use_count);
    }

    /// Remove low-value learned patterns that have had a fair trial.
    ///
    /// Patterns below the minimum use count are left alone; seeds are
    /// permanently exempt. Returns the number of evicted patterns.
    pub fn cull_low_quality(&mut self) -> usize {
        let config = &self.config;
        let before = self.patterns.len();

        self.patterns.retain(|p| {
            if p.origin == PatternOrigin::Seed {
                return true;
            }
            if p.use_count < config.min_uses_before_eviction {
                return true;
            }
            p.avg_satisfaction >= config.cull_satisfaction_floor
                && p.success_rate() >= config.cull_success_floor
        });

        let evicted = before - self.patterns.len();
        if evicted > 0 {
            let patterns = &self.patterns;
            self.recently_used.retain(|id| patterns.iter().any(|p| p.id == *id));
            info!(evicted, remaining = patterns.len(), "culled low-quality patterns");
        }
        evicted
    }

    /// Keep the store at its configured maximum by evicting the
    /// lowest-valued eligible patterns.
    fn enforce_capacity(&mut self) {
        while self.patterns.len() > self.config.max_patterns {
            let victim = self
                .patterns
                .iter()
                .filter(|p| {
                    p.origin != PatternOrigin::Seed
                        && p.use_count >= self.config.min_uses_before_eviction
                })
                .min_by(|a, b| a.value_score().total_cmp(&b.value_score()))
                .map(|p| p.id);

            match victim {
                Some(id) => {
                    self.patterns.retain(|p| p.id != id);
                    self.recently_used.retain(|r| *r != id);
                    debug!(%id, "evicted lowest-value pattern at capacity");
                }
                // Nothing has had a fair trial yet; tolerate the overshoot
                // until use counts accumulate.
                None => break,
            }
        }
    }

    /// Fraction of the known intent/emotion/depth vocabularies represented
    /// by at least one satisfying pattern.
    pub fn coverage(&self) -> f64 {
        let mut intents: BTreeSet<Intent> = BTreeSet::new();
        let mut emotions: BTreeSet<Emotion> = BTreeSet::new();
        let mut depths: BTreeSet<ConversationDepth> = BTreeSet::new();

        for pattern in self.patterns.iter().filter(|p| p.avg_satisfaction >= 0.5) {
            intents.extend(pattern.situation.intents.iter().copied());
            emotions.extend(pattern.situation.emotions.iter().copied());
            depths.extend(pattern.situation.depths.iter().copied());
        }

        let intent_rate = intents.len() as f64 / Intent::ALL.len() as f64;
        let emotion_rate = emotions.len() as f64 / Emotion::ALL.len() as f64;
        let depth_rate = depths.len() as f64 / ConversationDepth::ALL.len() as f64;

        0.4 * intent_rate + 0.3 * emotion_rate + 0.3 * depth_rate
    }

    /// Mean satisfaction across all patterns; 0.0 for an empty store.
    pub fn average_satisfaction(&self) -> f64 {
        if self.patterns.is_empty() {
            return 0.0;
        }
        self.patterns.iter().map(|p| p.avg_satisfaction).sum::<f64>() / self.patterns.len() as f64
    }

    pub fn stats(&self) -> StoreStats {
        let seeds = self
            .patterns
            .iter()
            .filter(|p| p.origin == PatternOrigin::Seed)
            .count();
        StoreStats {
            total: self.patterns.len(),
            seeds,
            learned: self.patterns.len() - seeds,
            average_satisfaction: self.average_satisfaction(),
            total_uses: self.patterns.iter().map(|p| p.use_count as u64).sum(),
        }
    }
}
