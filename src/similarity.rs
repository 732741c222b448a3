//! Similarity matcher - n-gram and word Jaccard scoring against profile keys
//!
//! For every profile key with a present value, the field's combined text is
//! scored against the key and its variations (case-split, separator-split,
//! dictionary expansions); the best variation counts. Linguistic categories
//! shared by the field and the key, and input-type compatibility, add fixed
//! boosts on top.
//!
//! N-gram and word sets are memoized per matcher instance. The caches are
//! unbounded; their key space is the set of distinct field and key texts
//! seen in one session.

use crate::pipeline::{FieldInput, MatchMethod, MatchResult, MatchStrategy, PassState};
use crate::profile::{ProfileKey, ProfileRecord};
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::sync::OnceLock;

/// Weight of trigram Jaccard in the pairwise similarity
pub const NGRAM_WEIGHT: f64 = 0.4;
/// Weight of word Jaccard in the pairwise similarity
pub const WORD_WEIGHT: f64 = 0.6;
/// Boost per linguistic category shared by field and key
pub const CATEGORY_BOOST: f64 = 0.1;
/// Boost when the input type is compatible with the key
pub const TYPE_BOOST: f64 = 0.2;

const NGRAM_SIZE: usize = 3;

/// Dictionary expansions of lowercase keys
const KEY_EXPANSIONS: &[(&str, &str)] = &[
    ("firstname", "first name"),
    ("lastname", "last name"),
    ("fullname", "full name"),
    ("phone", "phone number"),
    ("email", "email address"),
    ("dob", "date of birth"),
    ("birthday", "birth date"),
    ("address", "street address"),
    ("address1", "street address"),
    ("zip", "postal code"),
    ("postalcode", "zip code"),
    ("website", "web site"),
    ("gpa", "grade point average"),
    ("gradyear", "graduation year"),
    ("university", "college"),
    ("degree", "education level"),
    ("major", "field of study"),
];

/// Input types and the key fragments they are compatible with
const TYPE_COMPATIBILITY: &[(&str, &[&str])] = &[
    ("email", &["email"]),
    ("tel", &["phone", "mobile", "telephone"]),
    ("url", &["website", "linkedin", "github", "portfolio"]),
    ("date", &["birthday", "date", "deadline", "gradyear"]),
    ("number", &["age", "year", "gpa", "score", "salary", "gradyear"]),
];

/// Named linguistic category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinguisticCategory {
    PersonalIdentity,
    Contact,
    Location,
    Temporal,
    Identification,
    Academic,
    Professional,
    Financial,
    WebPresence,
    Descriptive,
}

impl LinguisticCategory {
    pub const ALL: [LinguisticCategory; 10] = [
        LinguisticCategory::PersonalIdentity,
        LinguisticCategory::Contact,
        LinguisticCategory::Location,
        LinguisticCategory::Temporal,
        LinguisticCategory::Identification,
        LinguisticCategory::Academic,
        LinguisticCategory::Professional,
        LinguisticCategory::Financial,
        LinguisticCategory::WebPresence,
        LinguisticCategory::Descriptive,
    ];

    fn pattern_source(&self) -> &'static str {
        match self {
            LinguisticCategory::PersonalIdentity => {
                r"(?i)\b(name|first|last|surname|given|middle|initial|title|mr|ms|mrs)\b"
            }
            LinguisticCategory::Contact => {
                r"(?i)\b(email|mail|phone|tel|mobile|cell|fax|contact|reach)\b"
            }
            LinguisticCategory::Location => {
                r"(?i)\b(address|street|city|state|country|zip|postal|region|province)\b"
            }
            LinguisticCategory::Temporal => {
                r"(?i)\b(date|year|month|day|time|when|deadline|start|end|from|to)\b"
            }
            LinguisticCategory::Identification => {
                r"(?i)\b(id|number|code|ssn|passport|license|registration)\b"
            }
            LinguisticCategory::Academic => {
                r"(?i)\b(school|university|college|degree|major|gpa|grade|education|study)\b"
            }
            LinguisticCategory::Professional => {
                r"(?i)\b(company|employer|job|position|title|work|experience|salary)\b"
            }
            LinguisticCategory::Financial => {
                r"(?i)\b(amount|price|cost|fee|payment|account|bank|card)\b"
            }
            LinguisticCategory::WebPresence => {
                r"(?i)\b(url|website|link|profile|portfolio|github|linkedin|twitter)\b"
            }
            LinguisticCategory::Descriptive => {
                r"(?i)\b(description|summary|bio|about|details|notes|comments|message)\b"
            }
        }
    }

    pub fn pattern(&self) -> &'static Regex {
        static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            LinguisticCategory::ALL
                .iter()
                .map(|c| Regex::new(c.pattern_source()).expect("category pattern is valid"))
                .collect()
        });
        &patterns[*self as usize]
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern().is_match(text)
    }
}

/// Jaccard index; two empty sets are identical, one empty set shares nothing
pub fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Character n-grams of the lowercase alphanumeric-only text
pub fn char_ngrams(text: &str, n: usize) -> HashSet<String> {
    let normalized: Vec<char> = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if n == 0 || normalized.len() < n {
        return HashSet::new();
    }
    normalized
        .windows(n)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Lowercase words longer than one character
pub fn word_features(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .filter(|w| w.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Alternate spellings of a profile key
pub fn key_variations(key: &str) -> Vec<String> {
    let mut variations = BTreeSet::new();

    let mut spaced = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }
    variations.insert(spaced.to_lowercase().trim().to_string());
    variations.insert(key.replace('_', " "));
    variations.insert(key.replace('-', " "));

    let lower = key.to_lowercase();
    if let Some((_, expansion)) = KEY_EXPANSIONS.iter().find(|(k, _)| *k == lower) {
        variations.insert(expansion.to_string());
    }

    variations.into_iter().collect()
}

/// +0.2 when the input type's compatible fragments occur in the key
pub fn type_compatibility(input_type: &str, key: &str) -> f64 {
    let key = key.to_lowercase();
    TYPE_COMPATIBILITY
        .iter()
        .find(|(t, _)| *t == input_type)
        .filter(|(_, fragments)| fragments.iter().any(|f| key.contains(f)))
        .map_or(0.0, |_| TYPE_BOOST)
}

/// Similarity matcher with per-instance memoization
#[derive(Debug, Default)]
pub struct SimilarityMatcher {
    threshold: f64,
    ngram_cache: HashMap<(String, usize), Rc<HashSet<String>>>,
    word_cache: HashMap<String, Rc<HashSet<String>>>,
}

impl SimilarityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Memoized n-gram set
    pub fn ngrams(&mut self, text: &str, n: usize) -> Rc<HashSet<String>> {
        Rc::clone(
            self.ngram_cache
                .entry((text.to_string(), n))
                .or_insert_with(|| Rc::new(char_ngrams(text, n))),
        )
    }

    /// Memoized word set
    pub fn words(&mut self, text: &str) -> Rc<HashSet<String>> {
        Rc::clone(
            self.word_cache
                .entry(text.to_string())
                .or_insert_with(|| Rc::new(word_features(text))),
        )
    }

    /// Number of memoized (n-gram, word) sets
    pub fn cache_sizes(&self) -> (usize, usize) {
        (self.ngram_cache.len(), self.word_cache.len())
    }

    /// 0.4 × trigram Jaccard + 0.6 × word Jaccard
    pub fn similarity(&mut self, a: &str, b: &str) -> f64 {
        let ngrams_a = self.ngrams(a, NGRAM_SIZE);
        let ngrams_b = self.ngrams(b, NGRAM_SIZE);
        let words_a = self.words(a);
        let words_b = self.words(b);
        NGRAM_WEIGHT * jaccard(&ngrams_a, &ngrams_b) + WORD_WEIGHT * jaccard(&words_a, &words_b)
    }

    /// Unclamped score of one key against a field
    pub fn score_key(&mut self, combined_text: &str, input_type: &str, key: ProfileKey) -> f64 {
        let key_text = key.as_str();

        let mut best = self.similarity(combined_text, key_text);
        for variation in key_variations(key_text) {
            best = best.max(self.similarity(combined_text, &variation));
        }

        let shared_categories = LinguisticCategory::ALL
            .iter()
            .filter(|c| c.matches(combined_text) && c.matches(key_text))
            .count();

        best + CATEGORY_BOOST * shared_categories as f64 + type_compatibility(input_type, key_text)
    }

    /// Best profile key for a field, if it clears the threshold
    pub fn match_field(
        &mut self,
        combined_text: &str,
        input_type: &str,
        autocomplete: Option<&str>,
        profile: &ProfileRecord,
    ) -> Option<MatchResult> {
        if combined_text.trim().is_empty() {
            return None;
        }

        if let Some(key) = autocomplete.and_then(|t| t.parse::<ProfileKey>().ok()) {
            if profile.has(key) {
                return Some(MatchResult::matched(key, 1.0, MatchMethod::Similarity));
            }
        }

        let mut best: Option<(ProfileKey, f64)> = None;
        for (key, _) in profile.iter() {
            let score = self.score_key(combined_text, input_type, key);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((key, score));
            }
        }

        best.filter(|(_, score)| *score >= self.threshold)
            .map(|(key, score)| MatchResult::matched(key, score, MatchMethod::Similarity))
    }
}

impl MatchStrategy for SimilarityMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Similarity
    }

    fn attempt(&mut self, input: &FieldInput<'_>, _pass: &mut PassState) -> Option<MatchResult> {
        let profile = input.profile?;
        let ctx = input.context;
        let autocomplete = ctx.autocomplete.trim();
        self.match_field(
            &ctx.combined_text,
            &ctx.input_type,
            (!autocomplete.is_empty()).then_some(autocomplete),
            profile,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ProfileRecord {
        ProfileRecord::new()
            .with(ProfileKey::Email, "ada@example.com")
            .with(ProfileKey::Phone, "+44 20 7946 0000")
            .with(ProfileKey::FirstName, "Ada")
            .with(ProfileKey::City, "London")
            .with(ProfileKey::Gpa, "3.9")
            .with(ProfileKey::GradYear, "2021")
    }

    #[test]
    fn test_jaccard_edge_cases() {
        let empty: HashSet<String> = HashSet::new();
        let one: HashSet<String> = ["a".to_string()].into_iter().collect();
        assert_eq!(jaccard(&empty, &empty), 1.0);
        assert_eq!(jaccard(&empty, &one), 0.0);
        assert_eq!(jaccard(&one, &one), 1.0);
    }

    #[test]
    fn test_trigrams_are_alphanumeric_only() {
        let grams = char_ngrams("E-mail!", 3);
        let expected: HashSet<String> =
            ["ema", "mai", "ail"].iter().map(|s| s.to_string()).collect();
        assert_eq!(grams, expected);
        assert!(char_ngrams("ab", 3).is_empty());
    }

    #[test]
    fn test_word_features_drop_single_chars() {
        let words = word_features("Address line 1 (street)");
        assert!(words.contains("address"));
        assert!(words.contains("street"));
        assert!(!words.contains("1"));
    }

    #[test]
    fn test_key_variations() {
        let variations = key_variations("postalCode");
        assert!(variations.contains(&"postal code".to_string()));
        assert!(variations.contains(&"zip code".to_string()));
        assert!(key_variations("gpa").contains(&"grade point average".to_string()));
    }

    #[test]
    fn test_type_compatibility() {
        assert_eq!(type_compatibility("tel", "phone"), TYPE_BOOST);
        assert_eq!(type_compatibility("number", "gradYear"), TYPE_BOOST);
        assert_eq!(type_compatibility("text", "phone"), 0.0);
        assert_eq!(type_compatibility("email", "phone"), 0.0);
    }

    #[test]
    fn test_similarity_identity_and_symmetry() {
        let mut matcher = SimilarityMatcher::new(0.5);
        assert!((matcher.similarity("first name", "first name") - 1.0).abs() < 1e-12);
        let ab = matcher.similarity("street address", "address line");
        let ba = matcher.similarity("address line", "street address");
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_email_label_matches_email() {
        let mut matcher = SimilarityMatcher::new(0.5);
        let result = matcher
            .match_field("email address", "email", None, &profile())
            .unwrap();
        assert_eq!(result.key, Some(ProfileKey::Email));
        assert!(result.confidence >= 0.7);
        assert!(result.confidence <= 1.0);
    }

    #[test]
    fn test_autocomplete_profile_key_short_circuits() {
        let mut matcher = SimilarityMatcher::new(0.5);
        let result = matcher
            .match_field("completely unrelated", "text", Some("city"), &profile())
            .unwrap();
        assert_eq!(result.key, Some(ProfileKey::City));
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_empty_text_never_matches() {
        let mut matcher = SimilarityMatcher::new(0.0);
        assert!(matcher.match_field("", "email", None, &profile()).is_none());
        assert!(matcher.match_field("   ", "tel", Some("email"), &profile()).is_none());
    }

    #[test]
    fn test_below_threshold_is_rejected() {
        let mut matcher = SimilarityMatcher::new(0.5);
        assert!(matcher
            .match_field("favourite colour", "text", None, &profile())
            .is_none());
    }

    #[test]
    fn test_cache_reuse() {
        let mut matcher = SimilarityMatcher::new(0.5);
        let first = matcher.ngrams("postal code", 3);
        let sizes = matcher.cache_sizes();
        let second = matcher.ngrams("postal code", 3);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(matcher.cache_sizes(), sizes);

        let other_n = matcher.ngrams("postal code", 2);
        assert_ne!(*first, *other_n);
        assert_eq!(matcher.cache_sizes().0, sizes.0 + 1);
    }
}
