//! Classification pipeline - fixed-precedence chain of match strategies
//!
//! Each strategy either yields a result or passes. The first strategy that
//! yields a key wins; results are never merged across strategies.
//!
//! ```text
//! autocomplete → grouped name → date component → remote → similarity
//!              → rules → type hint → no match
//! ```

use crate::config::MatcherConfig;
use crate::context::FieldContext;
use crate::date::DateComponentDetector;
use crate::profile::{ProfileKey, ProfileRecord};
use crate::remote::{RemoteClassifier, RemoteStrategy};
use crate::rules::RuleMatcher;
use crate::signals::{AutocompleteMatcher, GroupedNameMatcher};
use crate::similarity::SimilarityMatcher;
use crate::type_hint::TypeHintMatcher;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Which matcher produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Autocomplete,
    GroupedName,
    DateComponent,
    Remote,
    Similarity,
    RuleBased,
    TypeHint,
    None,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchMethod::Autocomplete => "autocomplete",
            MatchMethod::GroupedName => "grouped-name",
            MatchMethod::DateComponent => "date-component",
            MatchMethod::Remote => "remote",
            MatchMethod::Similarity => "similarity",
            MatchMethod::RuleBased => "rule-based",
            MatchMethod::TypeHint => "type-hint",
            MatchMethod::None => "none",
        };
        f.write_str(s)
    }
}

/// Outcome of classifying one control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchResult {
    pub key: Option<ProfileKey>,
    /// Always within [0, 1]
    pub confidence: f64,
    pub method: MatchMethod,
}

impl MatchResult {
    /// Accepted match; confidence is clamped to [0, 1] (NaN becomes 0)
    pub fn matched(key: ProfileKey, confidence: f64, method: MatchMethod) -> Self {
        Self {
            key: Some(key),
            confidence: clamp_unit(confidence),
            method,
        }
    }

    pub fn none() -> Self {
        Self {
            key: None,
            confidence: 0.0,
            method: MatchMethod::None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.key.is_some()
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Everything a strategy may look at for one control
#[derive(Debug, Clone, Copy)]
pub struct FieldInput<'a> {
    pub context: &'a FieldContext,
    /// `None` when no profile is loaded (diagnostic listings)
    pub profile: Option<&'a ProfileRecord>,
    /// The control sits in a block with at least one other date-like sibling
    pub in_date_group: bool,
}

impl<'a> FieldInput<'a> {
    pub fn new(context: &'a FieldContext) -> Self {
        Self {
            context,
            profile: None,
            in_date_group: false,
        }
    }

    pub fn with_profile(mut self, profile: &'a ProfileRecord) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn in_date_group(mut self, in_group: bool) -> Self {
        self.in_date_group = in_group;
        self
    }
}

/// State shared by every control of one fill pass
#[derive(Debug, Clone, Default)]
pub struct PassState {
    consumed_date_roles: HashSet<ProfileKey>,
}

impl PassState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_consumed(&self, key: ProfileKey) -> bool {
        self.consumed_date_roles.contains(&key)
    }

    /// Claim a date role; false if another control already holds it
    pub fn consume(&mut self, key: ProfileKey) -> bool {
        self.consumed_date_roles.insert(key)
    }

    /// Admit a classification result into the pass.
    ///
    /// Birth date components are claimed here unless the date detector
    /// already claimed them. `gradYear` is only a role inside a date group;
    /// standalone graduation-year controls are never deduplicated. Returns
    /// false for a role taken by an earlier control.
    pub fn admit(&mut self, result: &MatchResult, in_date_group: bool) -> bool {
        match result.key {
            Some(_) if result.method == MatchMethod::DateComponent => true,
            Some(ProfileKey::GradYear) if !in_date_group => true,
            Some(key) if key.date_unit().is_some() => self.consume(key),
            _ => true,
        }
    }

    pub fn consumed_roles(&self) -> impl Iterator<Item = ProfileKey> + '_ {
        self.consumed_date_roles.iter().copied()
    }
}

/// One link of the classification chain
pub trait MatchStrategy {
    fn method(&self) -> MatchMethod;

    /// Try to classify; `None` passes to the next strategy
    fn attempt(&mut self, input: &FieldInput<'_>, pass: &mut PassState) -> Option<MatchResult>;
}

/// Ordered strategy chain
pub struct Pipeline {
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl Pipeline {
    /// Chain with explicit strategies, tried in the given order
    pub fn new(strategies: Vec<Box<dyn MatchStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard precedence, with the remote step only when a
    /// classifier is supplied
    pub fn standard(config: &MatcherConfig, remote: Option<Box<dyn RemoteClassifier>>) -> Self {
        let mut strategies: Vec<Box<dyn MatchStrategy>> = vec![
            Box::new(AutocompleteMatcher::new()),
            Box::new(GroupedNameMatcher::new(config.grouped_name_confidence)),
            Box::new(DateComponentDetector::new(config.date_component_confidence)),
        ];
        if let Some(classifier) = remote {
            strategies.push(Box::new(RemoteStrategy::new(
                classifier,
                config.remote_min_confidence,
                config.remote_timeout(),
            )));
        }
        strategies.push(Box::new(SimilarityMatcher::new(config.similarity_threshold)));
        strategies.push(Box::new(RuleMatcher::new(
            config.rule_min_score,
            config.rule_confidence_scale,
        )));
        strategies.push(Box::new(TypeHintMatcher::new(config.type_hint_confidence)));
        Self { strategies }
    }

    pub fn methods(&self) -> Vec<MatchMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    /// Run the chain; the first strategy yielding a key wins
    pub fn classify(&mut self, input: &FieldInput<'_>, pass: &mut PassState) -> MatchResult {
        for strategy in self.strategies.iter_mut() {
            if let Some(result) = strategy.attempt(input, pass) {
                if result.is_match() {
                    debug!(
                        method = %result.method,
                        key = ?result.key,
                        confidence = result.confidence,
                        text = %input.context.combined_text,
                        "field classified"
                    );
                    return result;
                }
            }
        }
        debug!(text = %input.context.combined_text, "no matcher accepted field");
        MatchResult::none()
    }
}
