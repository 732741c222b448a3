//! Context extraction - normalized description of one form control
//!
//! Built fresh per control per pass and discarded after matching. Also
//! home to the text normalizers the matchers share.

use crate::document::{ControlHandle, ControlKind, FormHost};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Textual and attribute signals of one control
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldContext {
    pub label: String,
    pub placeholder: String,
    pub name: String,
    pub id: String,
    pub aria_label: String,
    pub autocomplete: String,
    pub class_name: String,
    /// Input type, or `select` / `textarea`
    pub input_type: String,
    /// Lowercase join of label, placeholder, name, id and aria-label
    pub combined_text: String,
    pub features: FieldFeatures,
}

/// Derived features of a field context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldFeatures {
    pub has_label: bool,
    pub has_placeholder: bool,
    pub has_aria_label: bool,
    pub is_required: bool,
    pub word_count: usize,
}

impl FieldContext {
    /// Build a context from raw signals, deriving combined text and features
    pub fn from_signals(
        label: &str,
        placeholder: &str,
        name: &str,
        id: &str,
        aria_label: &str,
    ) -> Self {
        let mut ctx = FieldContext {
            label: label.to_string(),
            placeholder: placeholder.to_string(),
            name: name.to_string(),
            id: id.to_string(),
            aria_label: aria_label.to_string(),
            input_type: "text".to_string(),
            ..Default::default()
        };
        ctx.derive();
        ctx
    }

    /// Context carrying only a label
    pub fn labelled(label: &str) -> Self {
        Self::from_signals(label, "", "", "", "")
    }

    pub fn with_type(mut self, input_type: &str) -> Self {
        self.input_type = input_type.to_lowercase();
        self
    }

    pub fn with_autocomplete(mut self, autocomplete: &str) -> Self {
        self.autocomplete = autocomplete.to_string();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.features.is_required = required;
        self
    }

    /// Recompute combined text and features from the raw signals
    pub fn derive(&mut self) {
        self.combined_text = combine_signals(&[
            &self.label,
            &self.placeholder,
            &self.name,
            &self.id,
            &self.aria_label,
        ]);
        self.features.has_label = !self.label.trim().is_empty();
        self.features.has_placeholder = !self.placeholder.trim().is_empty();
        self.features.has_aria_label = !self.aria_label.trim().is_empty();
        self.features.word_count = self.combined_text.split_whitespace().count();
    }

    /// Normalized autocomplete token: the last whitespace token, lowercase
    pub fn autocomplete_token(&self) -> Option<String> {
        self.autocomplete
            .split_whitespace()
            .last()
            .map(|t| t.to_lowercase())
    }
}

/// Extract the context of one control. Never fails: anything the host
/// cannot resolve becomes an empty signal.
pub fn extract_context<H: FormHost + ?Sized>(host: &H, handle: ControlHandle) -> FieldContext {
    let Some(control) = host.control(handle) else {
        return FieldContext::default();
    };

    let mut ctx = FieldContext {
        label: resolve_label(host, handle),
        placeholder: control.placeholder.clone(),
        name: control.name.clone(),
        id: control.id.clone(),
        aria_label: control.aria_label.clone(),
        autocomplete: control.autocomplete.clone(),
        class_name: control.class_name.clone(),
        input_type: control.effective_type(),
        ..Default::default()
    };
    ctx.features.is_required = control.required;
    if control.kind == ControlKind::Select {
        ctx.placeholder.clear();
    }
    ctx.derive();
    ctx
}

/// Label text: explicit `for` association, else enclosing label, else
/// aria-label, else empty.
pub fn resolve_label<H: FormHost + ?Sized>(host: &H, handle: ControlHandle) -> String {
    let Some(control) = host.control(handle) else {
        return String::new();
    };

    let explicit = (!control.id.is_empty())
        .then(|| host.explicit_label(&control.id))
        .flatten();

    explicit
        .or_else(|| host.enclosing_label(handle))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| control.aria_label.trim().to_string())
}

/// Lowercase join of the non-empty signals, single-space separated
pub fn combine_signals(signals: &[&str]) -> String {
    signals
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Label normalization: lowercase, `_ - : / ( )` become spaces,
/// whitespace collapsed.
pub fn normalize_label(s: &str) -> String {
    let replaced: String = s
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '_' | '-' | ':' | '/' | '(' | ')' => ' ',
            other => other,
        })
        .collect();
    collapse_whitespace(&replaced)
}

/// Value normalization: lowercase, every non-alphanumeric character
/// becomes a space, whitespace collapsed.
pub fn normalize_value(s: &str) -> String {
    let replaced: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&replaced)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
