//! Situation Matcher
//!
//! Pure scoring between a stored pattern's situation and the current one.
//! Weighted sum over six dimensions; the weights sum to 1.0, so the result
//! is already normalized to [0, 1]. Deterministic and side-effect free.

use crate::situation::Situation;

/// Dimension weights. Must sum to 1.0.
pub const INTENT_WEIGHT: f64 = 0.30;
pub const EMOTION_WEIGHT: f64 = 0.20;
pub const DEPTH_WEIGHT: f64 = 0.15;
pub const TIME_WEIGHT: f64 = 0.10;
pub const PHASE_WEIGHT: f64 = 0.15;
pub const KEYWORD_WEIGHT: f64 = 0.10;

/// Score a stored pattern's situation against the current situation.
///
/// Per dimension: an unconstrained (empty) pattern set earns half the
/// dimension weight; a direct intersection earns the full weight. Emotions
/// fall back to the coarse group table at half weight when no direct emotion
/// intersects. Keywords earn weight proportional to the fraction of the
/// pattern's keywords found in the current keywords.
pub fn situation_score(pattern: &Situation, current: &Situation) -> f64 {
    let mut score = 0.0;

    score += set_score(&pattern.intents, &current.intents, INTENT_WEIGHT);
    score += emotion_score(pattern, current);
    score += set_score(&pattern.depths, &current.depths, DEPTH_WEIGHT);
    score += set_score(&pattern.times, &current.times, TIME_WEIGHT);
    score += set_score(&pattern.phases, &current.phases, PHASE_WEIGHT);
    score += keyword_score(pattern, current);

    score
}

fn set_score<T: Ord>(
    pattern: &std::collections::BTreeSet<T>,
    current: &std::collections::BTreeSet<T>,
    weight: f64,
) -> f64 {
    if pattern.is_empty() {
        return weight * 0.5;
    }
    if pattern.iter().any(|v| current.contains(v)) {
        return weight;
    }
    0.0
}

fn emotion_score(pattern: &Situation, current: &Situation) -> f64 {
    if pattern.emotions.is_empty() {
        return EMOTION_WEIGHT * 0.5;
    }
    if pattern.emotions.iter().any(|e| current.emotions.contains(e)) {
        return EMOTION_WEIGHT;
    }
    // Coarse group fallback: half weight when both sides share a group.
    let shared_group = pattern.emotions.iter().any(|p| {
        current.emotions.iter().any(|c| p.group() == c.group())
    });
    if shared_group {
        return EMOTION_WEIGHT * 0.5;
    }
    0.0
}

fn keyword_score(pattern: &Situation, current: &Situation) -> f64 {
    if pattern.keywords.is_empty() {
        return KEYWORD_WEIGHT * 0.5;
    }
    let hits = pattern
        .keywords
        .iter()
        .filter(|pk| {
            current
                .keywords
                .iter()
                .any(|ck| ck.contains(pk.as_str()) || pk.contains(ck.as_str()))
        })
        .count();
    KEYWORD_WEIGHT * hits as f64 / pattern.keywords.len() as f64
}

/// Symmetric overlap between two situations, used by duplicate detection.
///
/// Mean of per-dimension Jaccard overlap; a dimension where either side is
/// unconstrained contributes a flat 0.5 credit.
pub fn situation_overlap(a: &Situation, b: &Situation) -> f64 {
    let dims = [
        jaccard(&a.intents, &b.intents),
        jaccard(&a.emotions, &b.emotions),
        jaccard(&a.depths, &b.depths),
        jaccard(&a.times, &b.times),
        jaccard(&a.phases, &b.phases),
        jaccard(&a.keywords, &b.keywords),
    ];
    dims.iter().sum::<f64>() / dims.len() as f64
}

fn jaccard<T: Ord>(a: &std::collections::BTreeSet<T>, b: &std::collections::BTreeSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.5;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}
