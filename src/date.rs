//! Date component detector
//!
//! Split date inputs (separate day, month and year controls) are detected
//! from the field text plus a density check over the enclosing block: a
//! control only counts as a date-group member when at least one other
//! control in the same block also carries a date token.
//!
//! Each role is assigned at most once per fill pass. A control whose role
//! is already taken falls through to the general pipeline.

use crate::context::{normalize_label, resolve_label};
use crate::document::{ControlHandle, FormHost};
use crate::pipeline::{FieldInput, MatchMethod, MatchResult, MatchStrategy, PassState};
use crate::profile::ProfileKey;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Calendar unit of a split date control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    Day,
    Month,
    Year,
}

impl std::fmt::Display for DateUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateUnit::Day => write!(f, "day"),
            DateUnit::Month => write!(f, "month"),
            DateUnit::Year => write!(f, "year"),
        }
    }
}

const MONTHS_FULL: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

struct DatePatterns {
    day: Regex,
    not_day: Regex,
    month: Regex,
    not_month: Regex,
    year: Regex,
    not_year: Regex,
    graduation: Regex,
    sibling: Regex,
}

fn patterns() -> &'static DatePatterns {
    static PATTERNS: OnceLock<DatePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| DatePatterns {
        day: Regex::new(r"\b(day|dd|date)\b").expect("day pattern is valid"),
        not_day: Regex::new(r"\b(month|mm|year|yyyy|yy)\b").expect("day exclusion is valid"),
        month: Regex::new(r"\b(month|mm)\b").expect("month pattern is valid"),
        not_month: Regex::new(r"\b(day|dd|year|yyyy|yy)\b").expect("month exclusion is valid"),
        year: Regex::new(r"\b(year|yyyy|yy)\b").expect("year pattern is valid"),
        not_year: Regex::new(r"\b(day|dd|month|mm)\b").expect("year exclusion is valid"),
        graduation: Regex::new(r"\b(grad|graduation|complete|completion)\b")
            .expect("graduation pattern is valid"),
        sibling: Regex::new(r"\b(day|month|year|dd|mm|yyyy)\b").expect("sibling pattern is valid"),
    })
}

/// The single calendar unit the text names, if exactly one
pub fn classify_date_unit(text: &str) -> Option<DateUnit> {
    let text = normalize_label(text);
    let p = patterns();
    if p.day.is_match(&text) && !p.not_day.is_match(&text) {
        Some(DateUnit::Day)
    } else if p.month.is_match(&text) && !p.not_month.is_match(&text) {
        Some(DateUnit::Month)
    } else if p.year.is_match(&text) && !p.not_year.is_match(&text) {
        Some(DateUnit::Year)
    } else {
        None
    }
}

/// Profile key for a unit; years mentioning graduation are `gradYear`
pub fn date_key_for(unit: DateUnit, text: &str) -> ProfileKey {
    match unit {
        DateUnit::Day => ProfileKey::BirthDay,
        DateUnit::Month => ProfileKey::BirthMonth,
        DateUnit::Year => {
            if patterns().graduation.is_match(&normalize_label(text)) {
                ProfileKey::GradYear
            } else {
                ProfileKey::BirthYear
            }
        }
    }
}

/// Density check: another control in the nearest block carries a date token
pub fn in_date_group<H: FormHost + ?Sized>(host: &H, handle: ControlHandle) -> bool {
    host.block_members(handle)
        .into_iter()
        .filter(|member| *member != handle)
        .filter_map(|member| {
            let control = host.control(member)?;
            let label = resolve_label(host, member);
            Some(normalize_label(&format!(
                "{} {} {} {}",
                control.name, control.id, control.class_name, label
            )))
        })
        .any(|text| patterns().sibling.is_match(&text))
}

fn ordinal_suffix(day: u32) -> &'static str {
    if (4..=20).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Literal option candidates for a date component, in trial order.
///
/// The first candidate any option accepts wins, even when a later candidate
/// would score higher: month `1` against zero-padded options `01..12`
/// prefix-matches `10` before `01` is tried.
pub fn dropdown_variants(unit: DateUnit, value: &str) -> Vec<String> {
    let value = value.trim();
    match unit {
        DateUnit::Day => match value.parse::<u32>() {
            Ok(day) => vec![
                day.to_string(),
                format!("{:02}", day),
                format!("{}{}", day, ordinal_suffix(day)),
            ],
            Err(_) => Vec::new(),
        },
        DateUnit::Month => match value.parse::<usize>() {
            Ok(month @ 1..=12) => {
                let full = MONTHS_FULL[month - 1];
                vec![
                    month.to_string(),
                    format!("{:02}", month),
                    full.to_string(),
                    MONTHS_SHORT[month - 1].to_string(),
                    format!("{} - {}", month, full),
                    format!("{:02} - {}", month, full),
                ]
            }
            _ => Vec::new(),
        },
        DateUnit::Year => {
            let mut variants = vec![value.to_string()];
            if value.len() > 2 && value.is_char_boundary(value.len() - 2) {
                variants.push(value[value.len() - 2..].to_string());
            }
            variants
        }
    }
}

/// Assigns day/month/year roles to split date controls
#[derive(Debug)]
pub struct DateComponentDetector {
    confidence: f64,
}

impl DateComponentDetector {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    /// Role for a context, ignoring whether it is taken
    pub fn detect(&self, input: &FieldInput<'_>) -> Option<ProfileKey> {
        if !input.in_date_group {
            return None;
        }
        let ctx = input.context;
        let text = format!("{} {}", ctx.combined_text, ctx.class_name);
        let unit = classify_date_unit(&text)?;
        Some(date_key_for(unit, &text))
    }
}

impl MatchStrategy for DateComponentDetector {
    fn method(&self) -> MatchMethod {
        MatchMethod::DateComponent
    }

    fn attempt(&mut self, input: &FieldInput<'_>, pass: &mut PassState) -> Option<MatchResult> {
        let key = self.detect(input)?;
        if !pass.consume(key) {
            return None;
        }
        Some(MatchResult::matched(
            key,
            self.confidence,
            MatchMethod::DateComponent,
        ))
    }
}
