//! Type-hint fallback: the control's input type alone decides the key

use crate::pipeline::{FieldInput, MatchMethod, MatchResult, MatchStrategy, PassState};
use crate::profile::ProfileKey;

const TYPE_HINTS: &[(&str, ProfileKey)] = &[
    ("email", ProfileKey::Email),
    ("tel", ProfileKey::Phone),
    ("url", ProfileKey::Website),
];

pub fn type_hint(input_type: &str) -> Option<ProfileKey> {
    TYPE_HINTS
        .iter()
        .find(|(t, _)| t.eq_ignore_ascii_case(input_type))
        .map(|(_, key)| *key)
}

#[derive(Debug)]
pub struct TypeHintMatcher {
    confidence: f64,
}

impl TypeHintMatcher {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }
}

impl MatchStrategy for TypeHintMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::TypeHint
    }

    fn attempt(&mut self, input: &FieldInput<'_>, _pass: &mut PassState) -> Option<MatchResult> {
        let key = type_hint(&input.context.input_type)?;
        Some(MatchResult::matched(key, self.confidence, MatchMethod::TypeHint))
    }
}
