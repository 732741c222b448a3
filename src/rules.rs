//! Rule-based fallback matcher
//!
//! A fixed, ordered table of profile keys and their synonym phrases. Each
//! rule is scored against the normalized field text; the highest total
//! wins and must reach the configured minimum score.

use crate::context::normalize_label;
use crate::pipeline::{FieldInput, MatchMethod, MatchResult, MatchStrategy, PassState};
use crate::profile::ProfileKey;
use regex::Regex;
use std::sync::OnceLock;

/// A profile key and the phrases that denote it
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub key: ProfileKey,
    pub synonyms: &'static [&'static str],
}

/// Rule table in precedence order; earlier rules win ties
pub const FIELD_RULES: &[Rule] = &[
    Rule {
        key: ProfileKey::Email,
        synonyms: &["email", "e-mail", "mail"],
    },
    Rule {
        key: ProfileKey::Phone,
        synonyms: &["phone", "mobile", "contact number", "telephone", "tel"],
    },
    Rule {
        key: ProfileKey::Birthday,
        synonyms: &["birthday", "birth date", "date of birth", "dob", "birthdate"],
    },
    Rule {
        key: ProfileKey::FirstName,
        synonyms: &["first name", "given name", "forename", "given"],
    },
    Rule {
        key: ProfileKey::LastName,
        synonyms: &["last name", "surname", "family name", "family"],
    },
    Rule {
        key: ProfileKey::FullName,
        synonyms: &["full name", "name of applicant", "your name", "name"],
    },
    Rule {
        key: ProfileKey::Address1,
        synonyms: &["address", "street address", "address line", "unit no"],
    },
    Rule {
        key: ProfileKey::City,
        synonyms: &["city", "town"],
    },
    Rule {
        key: ProfileKey::PostalCode,
        synonyms: &["postal code", "zip", "zip code", "postcode"],
    },
    Rule {
        key: ProfileKey::Country,
        synonyms: &["country", "nation", "country/region"],
    },
    Rule {
        key: ProfileKey::University,
        synonyms: &["university", "college", "institution", "school"],
    },
    Rule {
        key: ProfileKey::Degree,
        synonyms: &["degree", "qualification", "level of study", "education level"],
    },
    Rule {
        key: ProfileKey::Major,
        synonyms: &["major", "field of study", "specialization", "programme"],
    },
    Rule {
        key: ProfileKey::Gpa,
        synonyms: &["gpa", "cgpa", "cap", "grade point"],
    },
    Rule {
        key: ProfileKey::GradYear,
        synonyms: &[
            "graduation year",
            "year of graduation",
            "grad year",
            "completion year",
        ],
    },
    Rule {
        key: ProfileKey::Linkedin,
        synonyms: &["linkedin", "linkedin profile"],
    },
    Rule {
        key: ProfileKey::Github,
        synonyms: &["github", "git hub"],
    },
    Rule {
        key: ProfileKey::Website,
        synonyms: &["website", "portfolio", "personal site", "url"],
    },
    Rule {
        key: ProfileKey::Summary,
        synonyms: &["summary", "bio", "about you", "profile summary", "about me"],
    },
];

struct RulePatterns {
    email: Regex,
    phone: Regex,
    postal: Regex,
    year: Regex,
    month: Regex,
    day: Regex,
}

fn patterns() -> &'static RulePatterns {
    static PATTERNS: OnceLock<RulePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| RulePatterns {
        email: Regex::new(r"email").expect("email pattern is valid"),
        phone: Regex::new(r"\b(tel|phone|mobile)\b").expect("phone pattern is valid"),
        postal: Regex::new(r"zip|postal").expect("postal pattern is valid"),
        year: Regex::new(r"\b(year|yyyy|yy)\b").expect("year pattern is valid"),
        month: Regex::new(r"\b(month|mm)\b").expect("month pattern is valid"),
        day: Regex::new(r"\b(day|dd)\b").expect("day pattern is valid"),
    })
}

/// Score of one synonym against already-normalized text
fn score_synonym(text: &str, synonym: &str) -> f64 {
    let synonym = normalize_label(synonym);
    if synonym.is_empty() {
        return 0.0;
    }

    let mut score = if text == synonym {
        4.0
    } else if text.starts_with(&synonym) {
        3.0
    } else if text.contains(&synonym) {
        2.0
    } else {
        0.0
    };

    let tokens: Vec<&str> = synonym.split(' ').collect();
    let hits = tokens.iter().filter(|t| text.contains(*t)).count();
    score += 2.0 * hits as f64 / tokens.len() as f64;
    score
}

/// Total score of one rule against raw field text
pub fn score_rule(text: &str, rule: &Rule) -> f64 {
    let text = normalize_label(text);
    let patterns = patterns();

    let mut score: f64 = rule.synonyms.iter().map(|s| score_synonym(&text, s)).sum();
    if patterns.email.is_match(&text) {
        score += 1.0;
    }
    if patterns.phone.is_match(&text) {
        score += 1.0;
    }
    if patterns.postal.is_match(&text) {
        score += 1.0;
    }
    score
}

/// Highest-scoring rule; ties keep the earlier rule
pub fn best_rule(text: &str) -> Option<(ProfileKey, f64)> {
    let mut best: Option<(ProfileKey, f64)> = None;
    for rule in FIELD_RULES {
        let score = score_rule(text, rule);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((rule.key, score));
        }
    }
    best
}

/// Narrow the generic birthday key to a component by token presence.
/// Year is checked first, then month, then day.
pub fn refine_birthday(text: &str) -> ProfileKey {
    let text = normalize_label(text);
    let patterns = patterns();
    if patterns.year.is_match(&text) {
        ProfileKey::BirthYear
    } else if patterns.month.is_match(&text) {
        ProfileKey::BirthMonth
    } else if patterns.day.is_match(&text) {
        ProfileKey::BirthDay
    } else {
        ProfileKey::Birthday
    }
}

#[derive(Debug)]
pub struct RuleMatcher {
    min_score: f64,
    confidence_scale: f64,
}

impl RuleMatcher {
    pub fn new(min_score: f64, confidence_scale: f64) -> Self {
        Self {
            min_score,
            confidence_scale,
        }
    }

    pub fn match_text(&self, text: &str) -> Option<MatchResult> {
        let (key, score) = best_rule(text)?;
        if score < self.min_score {
            return None;
        }
        let key = if key == ProfileKey::Birthday {
            refine_birthday(text)
        } else {
            key
        };
        Some(MatchResult::matched(
            key,
            score / self.confidence_scale,
            MatchMethod::RuleBased,
        ))
    }
}

impl MatchStrategy for RuleMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::RuleBased
    }

    fn attempt(&mut self, input: &FieldInput<'_>, _pass: &mut PassState) -> Option<MatchResult> {
        self.match_text(&input.context.combined_text)
    }
}
