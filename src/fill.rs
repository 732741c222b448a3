//! Fill orchestration
//!
//! One fill pass visits every control of a host document in document
//! order: extract its context, classify it through the pipeline, derive
//! the profile value for the chosen key and write it with the setter
//! appropriate to the control. Every field succeeds or fails on its own;
//! the pass only errors on a host that cannot resolve its own handles.

use crate::config::MatcherConfig;
use crate::context::{extract_context, FieldContext};
use crate::date::{dropdown_variants, in_date_group};
use crate::document::{Control, ControlHandle, ControlKind, FormHost};
use crate::dropdown::first_accepted;
use crate::error::{Error, Result};
use crate::pipeline::{FieldInput, MatchMethod, MatchResult, PassState, Pipeline};
use crate::profile::{parse_composite_date, ProfileKey, ProfileRecord, ProfileStore};
use crate::remote::RemoteClassifier;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// What happened to one control during a fill pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldOutcome {
    Filled,
    /// Hidden, password, file, disabled or read-only
    NotFillable,
    NoMatch,
    /// Matched a key the profile has no value for
    NoValue,
    /// A date role already taken earlier in the pass
    DuplicateDateRole,
    /// The composite date behind this component could not be parsed
    MalformedDate,
    /// The write left the control unchanged
    WriteRejected,
}

impl std::fmt::Display for FieldOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldOutcome::Filled => "filled",
            FieldOutcome::NotFillable => "not fillable",
            FieldOutcome::NoMatch => "no match",
            FieldOutcome::NoValue => "no value",
            FieldOutcome::DuplicateDateRole => "duplicate date role",
            FieldOutcome::MalformedDate => "malformed date",
            FieldOutcome::WriteRejected => "write rejected",
        };
        f.write_str(s)
    }
}

/// Per-control record of a fill pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldFill {
    pub handle: ControlHandle,
    pub tag: String,
    #[serde(rename = "type")]
    pub input_type: String,
    /// Combined lowercase text the matchers saw
    pub text: String,
    pub key: Option<ProfileKey>,
    pub method: MatchMethod,
    pub confidence: f64,
    /// Value actually written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub outcome: FieldOutcome,
}

/// Result of one fill pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FillReport {
    pub filled_count: usize,
    /// No profile was available; nothing was classified
    pub profile_missing: bool,
    pub fields: Vec<FieldFill>,
}

impl FillReport {
    fn missing_profile() -> Self {
        Self {
            profile_missing: true,
            ..Self::default()
        }
    }

    /// Number of controls per outcome
    pub fn outcome_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for field in &self.fields {
            *counts.entry(field.outcome.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn to_report(&self) -> String {
        let mut out = String::new();

        out.push_str("FILL REPORT\n");
        out.push_str("═══════════════════════════════════════════════════════════════\n\n");

        if self.profile_missing {
            out.push_str("No profile available; nothing was filled.\n");
            return out;
        }

        out.push_str(&format!(
            "Filled: {}/{} controls\n\n",
            self.filled_count,
            self.fields.len()
        ));

        for field in &self.fields {
            let marker = if field.outcome == FieldOutcome::Filled {
                "✓"
            } else {
                "✗"
            };
            out.push_str(&format!(
                "{} {} <{} type={}> {:?}\n",
                marker, field.handle, field.tag, field.input_type, field.text
            ));
            if let Some(key) = field.key {
                out.push_str(&format!(
                    "    key: {} via {} ({:.2})\n",
                    key, field.method, field.confidence
                ));
            }
            match &field.value {
                Some(value) => out.push_str(&format!("    wrote: {:?}\n", value)),
                None => out.push_str(&format!("    {}\n", field.outcome)),
            }
        }

        let counts = self.outcome_counts();
        if !counts.is_empty() {
            out.push_str("\nOutcomes:\n");
            for (outcome, count) in counts {
                out.push_str(&format!("  {}: {}\n", outcome, count));
            }
        }

        out
    }
}

/// Diagnostic view of one control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListedField {
    pub handle: ControlHandle,
    pub tag: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub fillable: bool,
    pub context: FieldContext,
    pub guessed_key: Option<ProfileKey>,
    pub method: MatchMethod,
    pub confidence: f64,
}

/// Lazy, restartable enumeration of a document's controls with their
/// guessed keys. Never writes to the host.
pub struct FieldListing<'a, H: FormHost + ?Sized> {
    pipeline: &'a mut Pipeline,
    host: &'a H,
    profile: Option<&'a ProfileRecord>,
    handles: Vec<ControlHandle>,
    position: usize,
    pass: PassState,
}

impl<'a, H: FormHost + ?Sized> FieldListing<'a, H> {
    /// Rewind to the first control with a fresh pass state
    pub fn restart(&mut self) {
        self.handles = self.host.controls();
        self.position = 0;
        self.pass = PassState::new();
    }
}

impl<H: FormHost + ?Sized> Iterator for FieldListing<'_, H> {
    type Item = ListedField;

    fn next(&mut self) -> Option<ListedField> {
        loop {
            let handle = *self.handles.get(self.position)?;
            self.position += 1;
            let Some(control) = self.host.control(handle) else {
                continue;
            };

            let context = extract_context(self.host, handle);
            let mut input =
                FieldInput::new(&context).in_date_group(in_date_group(self.host, handle));
            if let Some(profile) = self.profile {
                input = input.with_profile(profile);
            }
            let result = self.pipeline.classify(&input, &mut self.pass);

            return Some(ListedField {
                handle,
                tag: control.kind.tag().to_string(),
                input_type: control.effective_type(),
                fillable: control.is_fillable(),
                guessed_key: result.key,
                method: result.method,
                confidence: result.confidence,
                context,
            });
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.handles.len().saturating_sub(self.position)))
    }
}

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"))
}

/// Value for a native date input, if the key/value can be expressed as one
pub fn date_input_value(key: ProfileKey, value: &str) -> Option<String> {
    let value = value.trim();
    match key {
        ProfileKey::GradYear => {
            if let Ok(year) = value.parse::<u16>() {
                return Some(format!("{:04}-06-01", year));
            }
        }
        ProfileKey::Birthday => {
            if let Ok(date) = parse_composite_date(key, value) {
                return Some(date.format("%Y-%m-%d").to_string());
            }
        }
        _ => {}
    }
    iso_date_pattern()
        .is_match(value)
        .then(|| value.to_string())
}

/// Runs fill passes and field listings with one pipeline instance.
///
/// The pipeline (and the similarity caches inside it) lives as long as the
/// engine, so repeated passes reuse memoized text features.
pub struct FillEngine {
    config: MatcherConfig,
    pipeline: Pipeline,
}

impl FillEngine {
    pub fn new(config: MatcherConfig) -> Self {
        let pipeline = Pipeline::standard(&config, None);
        Self { config, pipeline }
    }

    /// Engine consulting a remote classifier after the date detector
    pub fn with_remote(config: MatcherConfig, classifier: Box<dyn RemoteClassifier>) -> Self {
        let pipeline = Pipeline::standard(&config, Some(classifier));
        Self { config, pipeline }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Fill with the profile held by a store. An unreadable store counts
    /// as a missing profile.
    pub fn fill_from_store<H: FormHost + ?Sized>(
        &mut self,
        host: &mut H,
        store: &dyn ProfileStore,
    ) -> Result<FillReport> {
        let profile = match store.load_profile() {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "profile store unreadable");
                None
            }
        };
        self.fill(host, profile.as_ref())
    }

    /// Run one full fill pass
    pub fn fill<H: FormHost + ?Sized>(
        &mut self,
        host: &mut H,
        profile: Option<&ProfileRecord>,
    ) -> Result<FillReport> {
        let Some(profile) = profile else {
            info!("no profile available; skipping fill");
            return Ok(FillReport::missing_profile());
        };

        let mut pass = PassState::new();
        let mut report = FillReport::default();

        for handle in host.controls() {
            let control = host.control(handle).cloned().ok_or_else(|| {
                Error::InvalidDocument(format!("host listed unknown control {}", handle))
            })?;

            let field = self.fill_control(host, handle, &control, profile, &mut pass);
            if field.outcome == FieldOutcome::Filled {
                report.filled_count += 1;
            }
            report.fields.push(field);
        }

        info!(filled = report.filled_count, total = report.fields.len(), "fields filled");
        Ok(report)
    }

    fn fill_control<H: FormHost + ?Sized>(
        &mut self,
        host: &mut H,
        handle: ControlHandle,
        control: &Control,
        profile: &ProfileRecord,
        pass: &mut PassState,
    ) -> FieldFill {
        let context = extract_context(&*host, handle);
        let mut field = FieldFill {
            handle,
            tag: control.kind.tag().to_string(),
            input_type: control.effective_type(),
            text: context.combined_text.clone(),
            key: None,
            method: MatchMethod::None,
            confidence: 0.0,
            value: None,
            outcome: FieldOutcome::NotFillable,
        };
        if !control.is_fillable() {
            return field;
        }

        let input = FieldInput::new(&context)
            .with_profile(profile)
            .in_date_group(in_date_group(&*host, handle));
        let result: MatchResult = self.pipeline.classify(&input, pass);
        field.method = result.method;
        field.confidence = result.confidence;

        let Some(key) = result.key else {
            field.outcome = FieldOutcome::NoMatch;
            host.mark_filled(handle, false);
            return field;
        };
        field.key = Some(key);

        if !pass.admit(&result, input.in_date_group) {
            debug!(key = %key, handle = %handle, "date role already filled this pass");
            field.outcome = FieldOutcome::DuplicateDateRole;
            return field;
        }

        let value = match profile.resolve_value(key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                field.outcome = FieldOutcome::NoValue;
                host.mark_filled(handle, false);
                return field;
            }
            Err(e) => {
                warn!(error = %e, key = %key, "skipping date-derived field");
                field.outcome = FieldOutcome::MalformedDate;
                host.mark_filled(handle, false);
                return field;
            }
        };

        let written = self.write(host, handle, control, key, &value);
        host.mark_filled(handle, written.is_some());
        field.outcome = if written.is_some() {
            FieldOutcome::Filled
        } else {
            FieldOutcome::WriteRejected
        };
        field.value = written;
        field
    }

    /// Write with the setter for the control's kind; `Some(written)` when
    /// the control changed
    fn write<H: FormHost + ?Sized>(
        &self,
        host: &mut H,
        handle: ControlHandle,
        control: &Control,
        key: ProfileKey,
        value: &str,
    ) -> Option<String> {
        let target = match control.kind {
            ControlKind::Select => {
                let candidates = match key.date_unit() {
                    Some(unit) => dropdown_variants(unit, value),
                    None => vec![value.to_string()],
                };
                first_accepted(
                    &control.options,
                    &candidates,
                    self.config.dropdown_min_score,
                )?
                .value
            }
            ControlKind::Input if control.effective_type() == "date" => {
                date_input_value(key, value)?
            }
            _ => value.to_string(),
        };

        host.write_value(handle, &target).then_some(target)
    }

    /// Lazily enumerate controls with their guessed keys
    pub fn list_fields<'a, H: FormHost + ?Sized>(
        &'a mut self,
        host: &'a H,
        profile: Option<&'a ProfileRecord>,
    ) -> FieldListing<'a, H> {
        FieldListing {
            pipeline: &mut self.pipeline,
            host,
            profile,
            handles: host.controls(),
            position: 0,
            pass: PassState::new(),
        }
    }
}
