// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # fieldmatch — form-field to profile matching
//!
//! Decides which attribute of a stored personal-data profile a form control
//! represents, and writes the matching value into it.
//!
//! ## Core Concept
//!
//! Every control is described by a [`FieldContext`] (label, placeholder,
//! name, id, aria-label, autocomplete token, input type) and run through a
//! fixed-precedence [`Pipeline`] of match strategies:
//!
//! 1. **Autocomplete** - standard autocomplete tokens, confidence 1.0
//! 2. **Grouped name** - first/last-name hints in `name`/`id`
//! 3. **Date components** - split day/month/year controls, each role once per pass
//! 4. **Remote** - optional external classifier, bounded and fail-open
//! 5. **Similarity** - trigram and word Jaccard against profile keys
//! 6. **Rules** - weighted synonym table
//! 7. **Type hint** - `email`, `tel`, `url` input types
//!
//! The first strategy that yields a key wins.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fieldmatch::{FillEngine, FormDocument, MatcherConfig, ProfileRecord};
//!
//! let mut form = FormDocument::from_yaml(r#"
//! nodes:
//!   - node: label
//!     for: mail
//!     text: Email Address
//!   - node: control
//!     type: email
//!     id: mail
//! "#)?;
//! let profile = ProfileRecord::from_json(r#"{"email": "ada@example.com"}"#)?;
//!
//! let mut engine = FillEngine::new(MatcherConfig::default());
//! let report = engine.fill(&mut form, Some(&profile))?;
//! assert_eq!(report.filled_count, 1);
//! ```
//!
//! ## Host Documents
//!
//! The engine talks to documents only through the [`FormHost`] trait.
//! [`FormDocument`] is the in-memory implementation, loaded from YAML or
//! JSON trees of `element`, `label` and `control` nodes.

// Core types
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod profile;

// Matchers
pub mod date;
pub mod dropdown;
pub mod remote;
pub mod rules;
pub mod signals;
pub mod similarity;
pub mod type_hint;

// Orchestration
pub mod fill;
pub mod pipeline;

// Re-exports
pub use config::MatcherConfig;
pub use context::{extract_context, normalize_label, normalize_value, FieldContext, FieldFeatures};
pub use date::{classify_date_unit, dropdown_variants, in_date_group, DateComponentDetector, DateUnit};
pub use document::{
    Control, ControlHandle, ControlKind, FormDocument, FormHost, FormSource, Node, SelectOption,
};
pub use dropdown::{best_option, normalize_alias, DropdownMatch};
pub use error::{Error, RemoteError, Result};
pub use fill::{FieldFill, FieldListing, FieldOutcome, FillEngine, FillReport, ListedField};
pub use pipeline::{FieldInput, MatchMethod, MatchResult, MatchStrategy, PassState, Pipeline};
pub use profile::{JsonFileStore, ProfileKey, ProfileRecord, ProfileStore};
#[cfg(feature = "remote")]
pub use remote::HttpClassifier;
pub use remote::{RemoteClassification, RemoteClassifier, RemoteStrategy};
pub use rules::{RuleMatcher, FIELD_RULES};
pub use signals::{AutocompleteMatcher, GroupedNameMatcher};
pub use similarity::SimilarityMatcher;
pub use type_hint::TypeHintMatcher;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
