//! Dropdown value matcher
//!
//! Picks the option of a select control that best represents a desired
//! raw value. Both the option value and its visible text are compared
//! against the normalized desired value and its alias-canonical form.
//!
//! | comparison                          | score |
//! |-------------------------------------|-------|
//! | equal to desired or its alias form  | 5     |
//! | starts with desired                 | 4     |
//! | canonical alias forms equal         | 4     |
//! | contains desired                    | 3     |
//! | contains desired's first token      | 2     |
//! | anything else, or empty             | -1    |

use crate::context::normalize_value;
use crate::document::SelectOption;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Canonical forms and their aliases, all in normalized form
const ALIASES: &[(&str, &[&str])] = &[
    (
        "united states",
        &[
            "us",
            "usa",
            "u s",
            "u s a",
            "united states",
            "united states of america",
            "america",
        ],
    ),
    (
        "united kingdom",
        &[
            "uk",
            "u k",
            "united kingdom",
            "great britain",
            "britain",
            "england",
        ],
    ),
    (
        "singapore",
        &["sg", "s pore", "spore", "singapura", "republic of singapore"],
    ),
    ("canada", &["ca", "can", "canada"]),
    ("australia", &["au", "aus", "australia"]),
];

/// Normalize, then map known aliases onto their canonical form
pub fn normalize_alias(s: &str) -> String {
    let normalized = normalize_value(s);
    ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or(normalized)
}

/// Selected option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DropdownMatch {
    /// Position in the option list
    pub index: usize,
    /// Underlying option value to write
    pub value: String,
    pub score: i32,
}

fn score_candidate(candidate: &str, desired: &str, desired_alias: &str) -> i32 {
    let h = normalize_value(candidate);
    if h.is_empty() {
        return -1;
    }

    let mut score = -1;
    if h == desired || h == desired_alias {
        score = score.max(5);
    }
    if h.starts_with(desired) {
        score = score.max(4);
    }
    if normalize_alias(&h) == desired_alias {
        score = score.max(4);
    }
    if h.contains(desired) {
        score = score.max(3);
    }
    if let Some(first) = desired.split(' ').next() {
        if h.contains(first) {
            score = score.max(2);
        }
    }
    score
}

/// Score of one option: the best of its value and its text
pub fn score_option(option: &SelectOption, desired: &str) -> i32 {
    let normalized = normalize_value(desired);
    if normalized.is_empty() {
        return -1;
    }
    let alias = normalize_alias(desired);
    score_candidate(&option.value, &normalized, &alias)
        .max(score_candidate(&option.text, &normalized, &alias))
}

/// Best option for `desired`, accepted at `min_score` or above.
/// Ties keep the earliest option.
pub fn best_option(options: &[SelectOption], desired: &str, min_score: u8) -> Option<DropdownMatch> {
    if normalize_value(desired).is_empty() {
        return None;
    }

    let mut best: Option<DropdownMatch> = None;
    for (index, option) in options.iter().enumerate() {
        let score = score_option(option, desired);
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(DropdownMatch {
                index,
                value: option.value.clone(),
                score,
            });
        }
    }
    best.filter(|b| b.score >= i32::from(min_score))
}

/// First candidate the matcher accepts, in the given order
pub fn first_accepted<S: AsRef<str>>(
    options: &[SelectOption],
    candidates: &[S],
    min_score: u8,
) -> Option<DropdownMatch> {
    candidates
        .iter()
        .find_map(|c| best_option(options, c.as_ref(), min_score))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countries() -> Vec<SelectOption> {
        vec![
            SelectOption::new("", "Select a country"),
            SelectOption::new("US", "United States"),
            SelectOption::new("CA", "Canada"),
        ]
    }

    #[test]
    fn test_alias_normalization() {
        assert_eq!(normalize_alias("U.S.A."), "united states");
        assert_eq!(normalize_alias("S'pore"), "singapore");
        assert_eq!(normalize_alias("Great Britain"), "united kingdom");
        assert_eq!(normalize_alias("France"), "france");
    }

    #[test]
    fn test_usa_selects_united_states() {
        let selected = best_option(&countries(), "usa", 3).unwrap();
        assert_eq!(selected.value, "US");
        assert!(selected.score >= 4);
    }

    #[test]
    fn test_exact_value_wins() {
        let selected = best_option(&countries(), "CA", 3).unwrap();
        assert_eq!(selected.value, "CA");
        assert_eq!(selected.score, 5);
    }

    #[test]
    fn test_no_acceptable_option() {
        assert!(best_option(&countries(), "Germany", 3).is_none());
        assert!(best_option(&countries(), "  ", 3).is_none());
        assert!(best_option(&[], "usa", 3).is_none());
    }

    #[test]
    fn test_prefix_and_substring_scores() {
        let option = SelectOption::new("bsc-cs", "Bachelor of Science (Computer Science)");
        assert_eq!(score_option(&option, "Bachelor"), 4);
        assert_eq!(score_option(&option, "Science"), 3);
        assert_eq!(score_option(&option, "Science Honours"), 2);
    }

    #[test]
    fn test_first_accepted_candidate() {
        let years = vec![SelectOption::new("19", "19"), SelectOption::new("21", "21")];
        let selected = first_accepted(&years, &["2021", "21"], 3).unwrap();
        assert_eq!(selected.value, "21");
        assert_eq!(selected.index, 1);
    }
}
