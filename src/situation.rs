//! Situation Descriptors
//!
//! Normalized snapshots of "what is happening", produced by the external
//! emotion/time simulators and conversation analyzers. A situation carries
//! six set-valued dimensions; an empty set means "unconstrained" and matches
//! anything on that axis. Situations are value types and are never mutated
//! after creation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Conversational intents recognized by the upstream analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Farewell,
    Question,
    SmallTalk,
    Request,
    Gratitude,
    Apology,
    Sharing,
    SeekingComfort,
    Reminiscing,
}

impl Intent {
    /// Full vocabulary, used for coverage accounting.
    pub const ALL: &'static [Intent] = &[
        Intent::Greeting,
        Intent::Farewell,
        Intent::Question,
        Intent::SmallTalk,
        Intent::Request,
        Intent::Gratitude,
        Intent::Apology,
        Intent::Sharing,
        Intent::SeekingComfort,
        Intent::Reminiscing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Farewell => "farewell",
            Intent::Question => "question",
            Intent::SmallTalk => "small_talk",
            Intent::Request => "request",
            Intent::Gratitude => "gratitude",
            Intent::Apology => "apology",
            Intent::Sharing => "sharing",
            Intent::SeekingComfort => "seeking_comfort",
            Intent::Reminiscing => "reminiscing",
        }
    }
}

/// Emotions reported by the external emotion simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Joy,
    Warmth,
    Peace,
    Excitement,
    Curiosity,
    Sadness,
    Loneliness,
    Anxiety,
    Anger,
    Fatigue,
    Neutral,
}

/// Coarse emotion groups for fallback matching when no direct emotion
/// intersects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionGroup {
    Positive,
    Calm,
    Excited,
    Sad,
    Negative,
    Neutral,
}

impl Emotion {
    /// Full vocabulary, used for coverage accounting.
    pub const ALL: &'static [Emotion] = &[
        Emotion::Joy,
        Emotion::Warmth,
        Emotion::Peace,
        Emotion::Excitement,
        Emotion::Curiosity,
        Emotion::Sadness,
        Emotion::Loneliness,
        Emotion::Anxiety,
        Emotion::Anger,
        Emotion::Fatigue,
        Emotion::Neutral,
    ];

    /// Map into the coarse group table.
    pub fn group(&self) -> EmotionGroup {
        match self {
            Emotion::Joy | Emotion::Warmth => EmotionGroup::Positive,
            Emotion::Peace => EmotionGroup::Calm,
            Emotion::Excitement | Emotion::Curiosity => EmotionGroup::Excited,
            Emotion::Sadness | Emotion::Loneliness => EmotionGroup::Sad,
            Emotion::Anxiety | Emotion::Anger | Emotion::Fatigue => EmotionGroup::Negative,
            Emotion::Neutral => EmotionGroup::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Warmth => "warmth",
            Emotion::Peace => "peace",
            Emotion::Excitement => "excitement",
            Emotion::Curiosity => "curiosity",
            Emotion::Sadness => "sadness",
            Emotion::Loneliness => "loneliness",
            Emotion::Anxiety => "anxiety",
            Emotion::Anger => "anger",
            Emotion::Fatigue => "fatigue",
            Emotion::Neutral => "neutral",
        }
    }
}

/// How deep the conversation currently runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationDepth {
    Surface,
    Casual,
    Personal,
    Deep,
}

impl ConversationDepth {
    /// Full vocabulary, used for coverage accounting.
    pub const ALL: &'static [ConversationDepth] = &[
        ConversationDepth::Surface,
        ConversationDepth::Casual,
        ConversationDepth::Personal,
        ConversationDepth::Deep,
    ];
}

/// Time-of-day buckets supplied by the time simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Dawn,
    Morning,
    Afternoon,
    Evening,
    Night,
    LateNight,
}

/// How far the companion relationship has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipPhase {
    Acquaintance,
    Warming,
    Familiar,
    Close,
    Intimate,
}

/// A normalized situation descriptor.
///
/// Each dimension is a set; an empty set means the dimension is
/// unconstrained. Pattern authors use empty sets to ignore an axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Situation {
    #[serde(default)]
    pub intents: BTreeSet<Intent>,
    #[serde(default)]
    pub emotions: BTreeSet<Emotion>,
    #[serde(default)]
    pub depths: BTreeSet<ConversationDepth>,
    #[serde(default)]
    pub times: BTreeSet<TimeOfDay>,
    #[serde(default)]
    pub phases: BTreeSet<RelationshipPhase>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl Situation {
    /// A fully unconstrained situation.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every dimension is unconstrained.
    pub fn is_unconstrained(&self) -> bool {
        self.intents.is_empty()
            && self.emotions.is_empty()
            && self.depths.is_empty()
            && self.times.is_empty()
            && self.phases.is_empty()
            && self.keywords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_groups() {
        assert_eq!(Emotion::Joy.group(), EmotionGroup::Positive);
        assert_eq!(Emotion::Warmth.group(), EmotionGroup::Positive);
        assert_eq!(Emotion::Loneliness.group(), EmotionGroup::Sad);
        assert_eq!(Emotion::Anger.group(), EmotionGroup::Negative);
        assert_eq!(Emotion::Neutral.group(), EmotionGroup::Neutral);
    }

    #[test]
    fn test_vocabulary_sizes() {
        assert_eq!(Intent::ALL.len(), 10);
        assert_eq!(Emotion::ALL.len(), 11);
        assert_eq!(ConversationDepth::ALL.len(), 4);
    }

    #[test]
    fn test_unconstrained() {
        assert!(Situation::new().is_unconstrained());

        let s = Situation {
            intents: [Intent::Greeting].into_iter().collect(),
            ..Default::default()
        };
        assert!(!s.is_unconstrained());
    }

    #[test]
    fn test_situation_serde_round_trip() {
        let s = Situation {
            intents: [Intent::Greeting, Intent::SmallTalk].into_iter().collect(),
            emotions: [Emotion::Joy].into_iter().collect(),
            times: [TimeOfDay::Morning, TimeOfDay::Dawn].into_iter().collect(),
            keywords: ["coffee".to_string()].into_iter().collect(),
            ..Default::default()
        };

        let json = serde_json::to_string(&s).unwrap();
        let back: Situation = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
