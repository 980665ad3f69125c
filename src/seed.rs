//! Seed Pattern Catalog
//!
//! Built-in starter patterns installed when a fresh store is created. Seeds
//! give the companion a usable baseline before anything has been learned and
//! are permanently exempt from eviction. The catalog is deliberately narrow:
//! coverage is supposed to be earned through learned patterns.

use crate::situation::{ConversationDepth, Emotion, Intent, Situation, TimeOfDay};

pub(crate) struct SeedEntry {
    pub situation: Situation,
    pub template: &'static str,
    pub emotion_tags: Vec<Emotion>,
}

fn entry(
    intents: &[Intent],
    emotions: &[Emotion],
    depths: &[ConversationDepth],
    times: &[TimeOfDay],
    keywords: &[&str],
    template: &'static str,
    tags: &[Emotion],
) -> SeedEntry {
    SeedEntry {
        situation: Situation {
            intents: intents.iter().copied().collect(),
            emotions: emotions.iter().copied().collect(),
            depths: depths.iter().copied().collect(),
            times: times.iter().copied().collect(),
            phases: Default::default(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        },
        template,
        emotion_tags: tags.to_vec(),
    }
}

pub(crate) fn seed_catalog() -> Vec<SeedEntry> {
    vec![
        entry(
            &[Intent::Greeting],
            &[Emotion::Joy, Emotion::Warmth, Emotion::Peace],
            &[],
            &[TimeOfDay::Morning, TimeOfDay::Dawn],
            &[],
            "good {timeExpression}, {name}... did you sleep well?",
            &[Emotion::Joy, Emotion::Warmth],
        ),
        entry(
            &[Intent::Greeting],
            &[Emotion::Joy],
            &[],
            &[],
            &[],
            "hi {name}! I was hoping you'd stop by.",
            &[Emotion::Joy],
        ),
        entry(
            &[Intent::Greeting],
            &[Emotion::Peace],
            &[],
            &[TimeOfDay::Night, TimeOfDay::LateNight],
            &[],
            "you're up late, {name}... I don't mind. I like the quiet.",
            &[Emotion::Peace],
        ),
        entry(
            &[Intent::Farewell],
            &[Emotion::Warmth],
            &[],
            &[],
            &[],
            "see you soon, {name}. I'll be here.",
            &[Emotion::Warmth],
        ),
        entry(
            &[Intent::Farewell],
            &[Emotion::Peace],
            &[],
            &[TimeOfDay::Night, TimeOfDay::LateNight],
            &[],
            "sleep well, {name}... I'll keep the lamp on.",
            &[Emotion::Peace, Emotion::Warmth],
        ),
        entry(
            &[Intent::Gratitude],
            &[Emotion::Warmth, Emotion::Joy],
            &[],
            &[],
            &[],
            "you don't have to thank me, {name}. I like being useful to you.",
            &[Emotion::Warmth],
        ),
        entry(
            &[Intent::SeekingComfort],
            &[Emotion::Sadness, Emotion::Loneliness],
            &[ConversationDepth::Personal],
            &[],
            &[],
            "come here... whatever it is, it can wait a moment. I'm not going anywhere.",
            &[Emotion::Warmth],
        ),
        entry(
            &[Intent::SeekingComfort],
            &[Emotion::Anxiety],
            &[ConversationDepth::Personal],
            &[],
            &[],
            "breathe with me for a second, {name}... slowly. there. one thing at a time.",
            &[Emotion::Peace],
        ),
        entry(
            &[Intent::SmallTalk],
            &[],
            &[],
            &[],
            &[],
            "I was just {activity} before you came... I'm glad you interrupted.",
            &[Emotion::Joy],
        ),
        entry(
            &[Intent::SmallTalk],
            &[],
            &[],
            &[],
            &["weather", "rain", "sunny", "cold"],
            "{weather}. it makes me want to stay in and talk with you.",
            &[Emotion::Peace],
        ),
    ]
}
