//! Template Expansion
//!
//! Substitutes per-request variables into a pattern's template string, and
//! performs the reverse substitution when a new template is learned from
//! generator output. Both directions are pure string operations.
//!
//! Placeholders use `{camelCase}` tokens. Three variables are "soft" and
//! have built-in defaults; every other variable is "hard" - when a hard
//! variable is missing, the clause containing its placeholder is deleted up
//! to the nearest sentence-delimiting punctuation.

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-zA-Z]+)\}").unwrap());
static DOT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{4,}").unwrap());
static ELLIPSIS_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\u{2026}{2,}").unwrap());
static SPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" +([.!?,\u{2026}])").unwrap());

/// Soft variables and their built-in defaults.
const SOFT_DEFAULTS: &[(&str, &str)] = &[
    ("name", "you"),
    ("timeExpression", "now"),
    ("moodExpression", ""),
];

/// Per-request substitution values, supplied fresh by the caller.
///
/// All fields are optional; absence of a soft variable falls back to its
/// default, absence of a hard variable makes the containing clause
/// unusable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    /// Addressee name (`{name}`, soft, default "you").
    pub name: Option<String>,
    /// Time-of-day phrase (`{timeExpression}`, soft, default "now").
    pub time_phrase: Option<String>,
    /// Mood phrase (`{moodExpression}`, soft, default "").
    pub mood_phrase: Option<String>,
    /// Current activity (`{activity}`).
    pub activity: Option<String>,
    /// Activity that was interrupted (`{interruptedActivity}`).
    pub interrupted_activity: Option<String>,
    /// Something recently learned (`{recentLearning}`).
    pub recent_learning: Option<String>,
    /// Something to tell the partner (`{thingToTell}`).
    pub thing_to_tell: Option<String>,
    /// A previously discussed topic (`{pastTopic}`).
    pub past_topic: Option<String>,
    /// Weather phrase (`{weather}`).
    pub weather: Option<String>,
    /// Greeting phrase (`{greeting}`).
    pub greeting: Option<String>,
    /// Reason for the current emotion (`{emotionReason}`).
    pub emotion_reason: Option<String>,
}

impl TemplateVars {
    /// Look up the supplied value for a placeholder token.
    pub fn value_of(&self, token: &str) -> Option<&str> {
        let v = match token {
            "name" => &self.name,
            "timeExpression" => &self.time_phrase,
            "moodExpression" => &self.mood_phrase,
            "activity" => &self.activity,
            "interruptedActivity" => &self.interrupted_activity,
            "recentLearning" => &self.recent_learning,
            "thingToTell" => &self.thing_to_tell,
            "pastTopic" => &self.past_topic,
            "weather" => &self.weather,
            "greeting" => &self.greeting,
            "emotionReason" => &self.emotion_reason,
            _ => return None,
        };
        v.as_deref()
    }

    /// Built-in default for a soft variable, `None` for hard variables.
    pub fn soft_default(token: &str) -> Option<&'static str> {
        SOFT_DEFAULTS
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, d)| *d)
    }

    /// All tokens with a supplied, non-default value. Used by reverse
    /// substitution when learning a template from raw generator output.
    fn supplied(&self) -> Vec<(&'static str, &str)> {
        const TOKENS: &[&str] = &[
            "name",
            "timeExpression",
            "moodExpression",
            "activity",
            "interruptedActivity",
            "recentLearning",
            "thingToTell",
            "pastTopic",
            "weather",
            "greeting",
            "emotionReason",
        ];

        TOKENS
            .iter()
            .filter_map(|token| {
                let value = self.value_of(token)?;
                if value.is_empty() || Self::soft_default(token) == Some(value) {
                    return None;
                }
                Some((*token, value))
            })
            .collect()
    }
}

/// Expand a template against the supplied variables.
///
/// Returns `None` when the template cannot produce a usable response (a
/// hard variable is missing and clause deletion leaves fewer than 3
/// characters). The returned string never contains `{` or `}`.
pub fn expand(template: &str, vars: &TemplateVars) -> Option<String> {
    let mut out = String::with_capacity(template.len());

    for clause in split_clauses(template) {
        match expand_clause(clause, vars) {
            Some(expanded) => out.push_str(&expanded),
            None => continue, // hard variable missing: drop the clause
        }
    }

    let normalized = normalize(&out);
    if normalized.chars().count() < 3 {
        return None;
    }
    Some(normalized)
}

/// Substitute tokens within one clause; `None` if a hard variable is
/// unresolved (including unknown token names).
fn expand_clause(clause: &str, vars: &TemplateVars) -> Option<String> {
    let mut out = String::with_capacity(clause.len());
    let mut cursor = 0;

    for caps in TOKEN_RE.captures_iter(clause) {
        let m = caps.get(0).unwrap();
        let token = caps.get(1).unwrap().as_str();

        let replacement = match vars.value_of(token) {
            Some(v) if !v.is_empty() => v,
            _ => TemplateVars::soft_default(token)?,
        };

        out.push_str(&clause[cursor..m.start()]);
        out.push_str(replacement);
        cursor = m.end();
    }

    out.push_str(&clause[cursor..]);
    Some(out)
}

/// Split into clauses at sentence-delimiting punctuation, keeping each
/// delimiter attached to its clause.
fn split_clauses(text: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?' | '\u{2026}' | '\n') {
            let end = i + c.len_utf8();
            clauses.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        clauses.push(&text[start..]);
    }
    clauses
}

/// Clean up artifacts left by clause deletion: stray braces, runs of dots
/// beyond an ellipsis, doubled spaces, space before punctuation.
fn normalize(text: &str) -> String {
    let text = text.replace(['{', '}'], "");
    let text = DOT_RUN_RE.replace_all(&text, "...");
    let text = ELLIPSIS_RUN_RE.replace_all(&text, "\u{2026}");
    let text = SPACE_RUN_RE.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT_RE.replace_all(&text, "$1");
    text.trim().to_string()
}

/// Reverse substitution: replace every occurrence of each supplied
/// non-default variable value with its placeholder token. Longest values
/// are replaced first so that shorter values cannot clobber them.
pub fn parameterize(response: &str, vars: &TemplateVars) -> String {
    let mut supplied = vars.supplied();
    supplied.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut out = response.to_string();
    for (token, value) in supplied {
        if out.contains(value) {
            out = out.replace(value, &format!("{{{token}}}"));
        }
    }
    out
}

/// Position-wise character similarity of two templates after masking every
/// placeholder down to a single character. A crude measure, kept for
/// compatibility with the learned-pattern growth dynamics it produces.
pub fn masked_similarity(a: &str, b: &str) -> f64 {
    let ma: Vec<char> = TOKEN_RE.replace_all(a, "#").chars().collect();
    let mb: Vec<char> = TOKEN_RE.replace_all(b, "#").chars().collect();

    let longest = ma.len().max(mb.len());
    if longest == 0 {
        return 1.0;
    }
    let matching = ma.iter().zip(mb.iter()).filter(|(x, y)| x == y).count();
    matching as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars {
            name: Some("Mira".to_string()),
            time_phrase: Some("this morning".to_string()),
            activity: Some("reading".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_expansion() {
        let out = expand("good {timeExpression}, {name}! I was {activity}.", &vars()).unwrap();
        assert_eq!(out, "good this morning, Mira! I was reading.");
    }

    #[test]
    fn test_soft_defaults() {
        let out = expand("hey {name}, how are things {timeExpression}?", &TemplateVars::default())
            .unwrap();
        assert_eq!(out, "hey you, how are things now?");
    }

    #[test]
    fn test_mood_defaults_to_empty() {
        let out = expand("well...{moodExpression} I am here.", &TemplateVars::default()).unwrap();
        assert_eq!(out, "well... I am here.");
    }

    #[test]
    fn test_hard_missing_deletes_clause() {
        let out = expand(
            "I kept thinking about {pastTopic}. anyway, hello {name}!",
            &TemplateVars::default(),
        )
        .unwrap();
        assert_eq!(out, "anyway, hello you!");
    }

    #[test]
    fn test_unusable_when_nothing_survives() {
        assert!(expand("{pastTopic}", &TemplateVars::default()).is_none());
        assert!(expand("", &TemplateVars::default()).is_none());
    }

    #[test]
    fn test_scenario_hi_morning() {
        let vars = TemplateVars {
            time_phrase: Some("morning".to_string()),
            ..Default::default()
        };
        assert_eq!(expand("hi...{timeExpression}", &vars).unwrap(), "hi...morning");
    }

    #[test]
    fn test_no_braces_ever_leak() {
        let templates = [
            "hello {name}",
            "{unknownToken} trailing text here",
            "odd { brace literal",
            "{activity}... {pastTopic}! and {name}?",
        ];
        for t in templates {
            if let Some(out) = expand(t, &TemplateVars::default()) {
                assert!(!out.contains('{') && !out.contains('}'), "braces leaked in {out:?}");
            }
        }
    }

    #[test]
    fn test_normalize_collapses_dot_runs() {
        let vars = TemplateVars::default();
        // Dropping the middle clause leaves "so....." style runs.
        let out = expand("so... {pastTopic}... shall we talk?", &vars).unwrap();
        assert!(!out.contains("...."), "got {out:?}");
    }

    #[test]
    fn test_parameterize_replaces_supplied_values() {
        let v = vars();
        let t = parameterize("good this morning, Mira! I was reading.", &v);
        assert_eq!(t, "good {timeExpression}, {name}! I was {activity}.");
    }

    #[test]
    fn test_parameterize_skips_default_values() {
        let v = TemplateVars {
            name: Some("you".to_string()), // equals the soft default
            ..Default::default()
        };
        assert_eq!(parameterize("see you later", &v), "see you later");
    }

    #[test]
    fn test_masked_similarity() {
        assert_eq!(masked_similarity("hello {name}", "hello {name}"), 1.0);
        assert_eq!(masked_similarity("", ""), 1.0);

        let sim = masked_similarity("good morning {name}", "good evening {name}");
        assert!(sim > 0.3 && sim < 1.0);

        assert!(masked_similarity("abc", "xyz") < 0.01);
    }

    #[test]
    fn test_masked_similarity_masks_different_tokens_alike() {
        // Different placeholders mask to the same single char.
        assert_eq!(masked_similarity("{name} hi", "{weather} hi"), 1.0);
    }
}
