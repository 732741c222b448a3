//! Exact signal matchers
//!
//! Two cheap, high-precision checks that run before any scoring:
//! the standard `autocomplete` token and first/last-name hints in the
//! `name`/`id` attributes.

use crate::context::normalize_label;
use crate::pipeline::{FieldInput, MatchMethod, MatchResult, MatchStrategy, PassState};
use crate::profile::ProfileKey;
use regex::Regex;
use std::sync::OnceLock;

/// Standard autocomplete tokens.
///
/// A `None` entry is a known token we deliberately have no opinion on:
/// it does not match here and later matchers still run.
pub const AUTOCOMPLETE_MAP: &[(&str, Option<ProfileKey>)] = &[
    ("email", Some(ProfileKey::Email)),
    ("tel", Some(ProfileKey::Phone)),
    ("tel-national", Some(ProfileKey::Phone)),
    ("url", Some(ProfileKey::Website)),
    ("given-name", Some(ProfileKey::FirstName)),
    ("additional-name", None),
    ("family-name", Some(ProfileKey::LastName)),
    ("name", Some(ProfileKey::FullName)),
    ("honorific-prefix", None),
    ("honorific-suffix", None),
    ("nickname", None),
    ("organization", Some(ProfileKey::University)),
    ("street-address", Some(ProfileKey::Address1)),
    ("address-line1", Some(ProfileKey::Address1)),
    ("address-line2", None),
    ("address-level2", Some(ProfileKey::City)),
    ("postal-code", Some(ProfileKey::PostalCode)),
    ("country", Some(ProfileKey::Country)),
    ("country-name", Some(ProfileKey::Country)),
    ("bday", Some(ProfileKey::Birthday)),
    ("bday-day", Some(ProfileKey::BirthDay)),
    ("bday-month", Some(ProfileKey::BirthMonth)),
    ("bday-year", Some(ProfileKey::BirthYear)),
];

/// Look up an autocomplete token.
///
/// `None` for unknown tokens, `Some(None)` for known tokens without a
/// mapping.
pub fn lookup_autocomplete(token: &str) -> Option<Option<ProfileKey>> {
    let token = token.trim().to_lowercase();
    AUTOCOMPLETE_MAP
        .iter()
        .find(|(t, _)| *t == token)
        .map(|(_, key)| *key)
}

/// Autocomplete-token lookup; confidence is always 1.0
#[derive(Debug, Default)]
pub struct AutocompleteMatcher;

impl AutocompleteMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn match_context(&self, input: &FieldInput<'_>) -> Option<MatchResult> {
        let token = input.context.autocomplete_token()?;
        let key = lookup_autocomplete(&token)??;
        Some(MatchResult::matched(key, 1.0, MatchMethod::Autocomplete))
    }
}

impl MatchStrategy for AutocompleteMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Autocomplete
    }

    fn attempt(&mut self, input: &FieldInput<'_>, _pass: &mut PassState) -> Option<MatchResult> {
        self.match_context(input)
    }
}

struct NamePatterns {
    first: Regex,
    last: Regex,
}

fn name_patterns() -> &'static NamePatterns {
    static PATTERNS: OnceLock<NamePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| NamePatterns {
        first: Regex::new(r"\b(given|first|fname|firstname|forename)\b")
            .expect("first-name pattern is valid"),
        last: Regex::new(r"\b(family|last|lname|lastname|surname)\b")
            .expect("last-name pattern is valid"),
    })
}

/// First/last name hint from `name` and `id` attributes only
pub fn name_hint(name: &str, id: &str) -> Option<ProfileKey> {
    let text = normalize_label(&format!("{} {}", name, id));
    let patterns = name_patterns();
    if patterns.first.is_match(&text) {
        Some(ProfileKey::FirstName)
    } else if patterns.last.is_match(&text) {
        Some(ProfileKey::LastName)
    } else {
        None
    }
}

/// Grouped first/last-name attribute detection
#[derive(Debug)]
pub struct GroupedNameMatcher {
    confidence: f64,
}

impl GroupedNameMatcher {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }
}

impl MatchStrategy for GroupedNameMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::GroupedName
    }

    fn attempt(&mut self, input: &FieldInput<'_>, _pass: &mut PassState) -> Option<MatchResult> {
        let key = name_hint(&input.context.name, &input.context.id)?;
        Some(MatchResult::matched(
            key,
            self.confidence,
            MatchMethod::GroupedName,
        ))
    }
}
