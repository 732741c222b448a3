//! End-to-end fill passes over in-memory form documents

use fieldmatch::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn value_of<'a>(doc: &'a FormDocument, id_or_name: &str) -> &'a str {
    let handle = doc
        .find(id_or_name)
        .unwrap_or_else(|| panic!("no control named {}", id_or_name));
    doc.value(handle).unwrap()
}

fn outcome_of(report: &FillReport, doc: &FormDocument, id_or_name: &str) -> FieldOutcome {
    let handle = doc.find(id_or_name).unwrap();
    report
        .fields
        .iter()
        .find(|f| f.handle == handle)
        .map(|f| f.outcome)
        .unwrap()
}

fn block(tag: &str, children: Vec<Node>) -> Node {
    Node::Element {
        tag: tag.into(),
        children,
    }
}

fn text_input(name: &str) -> Node {
    Node::Control(Control::input("text").with_name(name))
}

// ============================================================================
// Fixture pass
// ============================================================================

#[test]
fn test_fill_application_fixture() {
    let mut doc = FormDocument::load(&fixture("application.yaml")).unwrap();
    let store = JsonFileStore::new(fixture("profile.json"));

    let mut engine = FillEngine::new(MatcherConfig::default());
    let report = engine.fill_from_store(&mut doc, &store).unwrap();

    let filled: Vec<(&str, &str)> = [
        "first_name",
        "last_name",
        "email",
        "mobile",
        "dob_day",
        "dob_month",
        "dob_year",
        "addr1",
        "country",
        "grad_year",
    ]
    .into_iter()
    .map(|name| (name, value_of(&doc, name)))
    .collect();

    assert_eq!(
        filled,
        vec![
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("email", "ada@example.com"),
            ("mobile", "+44 20 7946 0000"),
            ("dob_day", "5"),
            ("dob_month", "03"),
            ("dob_year", "1990"),
            ("addr1", "12 St James's Square"),
            ("country", "US"),
            ("grad_year", "21"),
        ]
    );
    assert_eq!(report.filled_count, 10);
    assert!(!report.profile_missing);

    assert_eq!(value_of(&doc, "csrf_token"), "abc123");
    assert_eq!(
        outcome_of(&report, &doc, "csrf_token"),
        FieldOutcome::NotFillable
    );
    assert_eq!(outcome_of(&report, &doc, "password"), FieldOutcome::NotFillable);
}

#[test]
fn test_fill_report_renders() {
    let mut doc = FormDocument::load(&fixture("application.yaml")).unwrap();
    let store = JsonFileStore::new(fixture("profile.json"));
    let report = FillEngine::new(MatcherConfig::default())
        .fill_from_store(&mut doc, &store)
        .unwrap();

    let text = report.to_report();
    assert!(text.contains("Filled: 10/12 controls"));
    assert!(text.contains("not fillable: 2"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["filled_count"], 10);
    assert_eq!(json["fields"][0]["outcome"], "filled");
}

// ============================================================================
// Date groups
// ============================================================================

#[test]
fn test_split_birthday_roles_assigned_once_each() {
    let mut doc = FormDocument::new(vec![block(
        "div",
        vec![
            text_input("dob_day"),
            text_input("dob_month"),
            text_input("dob_year"),
        ],
    )]);
    let profile = ProfileRecord::new().with(ProfileKey::Birthday, "1987-11-09");

    let report = FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    let keys: Vec<_> = report.fields.iter().map(|f| (f.key, f.method)).collect();
    assert_eq!(
        keys,
        vec![
            (Some(ProfileKey::BirthDay), MatchMethod::DateComponent),
            (Some(ProfileKey::BirthMonth), MatchMethod::DateComponent),
            (Some(ProfileKey::BirthYear), MatchMethod::DateComponent),
        ]
    );
    assert_eq!(value_of(&doc, "dob_day"), "9");
    assert_eq!(value_of(&doc, "dob_month"), "11");
    assert_eq!(value_of(&doc, "dob_year"), "1987");
}

#[test]
fn test_repeated_date_group_is_not_refilled() {
    let group = || {
        block(
            "tr",
            vec![
                text_input("dob_day"),
                text_input("dob_month"),
                text_input("dob_year"),
            ],
        )
    };
    let mut doc = FormDocument::new(vec![group(), group()]);
    let profile = ProfileRecord::new().with(ProfileKey::Birthday, "1987-11-09");

    let report = FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    let outcomes: Vec<_> = report.fields.iter().map(|f| f.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            FieldOutcome::Filled,
            FieldOutcome::Filled,
            FieldOutcome::Filled,
            FieldOutcome::DuplicateDateRole,
            FieldOutcome::DuplicateDateRole,
            FieldOutcome::DuplicateDateRole,
        ]
    );
    assert_eq!(report.filled_count, 3);
    assert_eq!(doc.value(ControlHandle(3)), Some(""));
}

#[test]
fn test_graduation_year_dropdown_uses_short_form() {
    let mut doc = FormDocument::new(vec![Node::Control(
        Control::select(vec![
            SelectOption::new("", "Select"),
            SelectOption::new("21", "21"),
            SelectOption::new("22", "22"),
        ])
        .with_name("grad_year")
        .with_aria_label("Graduation year"),
    )]);
    let profile = ProfileRecord::new().with(ProfileKey::GradYear, "2021");

    let report = FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    assert_eq!(report.fields[0].key, Some(ProfileKey::GradYear));
    assert_eq!(value_of(&doc, "grad_year"), "21");
}

#[test]
fn test_malformed_birthday_only_skips_date_fields() {
    let mut doc = FormDocument::new(vec![
        block(
            "div",
            vec![
                text_input("dob_day"),
                text_input("dob_month"),
                text_input("dob_year"),
            ],
        ),
        Node::Control(Control::input("email").with_name("email")),
    ]);
    let profile = ProfileRecord::new()
        .with(ProfileKey::Birthday, "09/11/1987")
        .with(ProfileKey::Email, "ada@example.com");

    let report = FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    let outcomes: Vec<_> = report.fields.iter().map(|f| f.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            FieldOutcome::MalformedDate,
            FieldOutcome::MalformedDate,
            FieldOutcome::MalformedDate,
            FieldOutcome::Filled,
        ]
    );
    assert_eq!(value_of(&doc, "email"), "ada@example.com");
}

#[test]
fn test_native_date_input_gets_iso_birthday() {
    let mut doc = FormDocument::new(vec![
        Node::Label {
            for_id: Some("dob".into()),
            text: "Date of birth".into(),
            children: vec![],
        },
        Node::Control(Control::input("date").with_id("dob")),
    ]);
    let profile = ProfileRecord::new().with(ProfileKey::Birthday, "1987-11-09");

    FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    assert_eq!(value_of(&doc, "dob"), "1987-11-09");
}

#[test]
fn test_standalone_graduation_years_are_all_filled() {
    let graduation_year = || Node::Label {
        for_id: None,
        text: "Graduation year".into(),
        children: vec![Node::Control(Control::input("text"))],
    };
    let mut doc = FormDocument::new(vec![graduation_year(), graduation_year()]);
    let profile = ProfileRecord::new().with(ProfileKey::GradYear, "2021");

    let report = FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    let outcomes: Vec<_> = report
        .fields
        .iter()
        .map(|f| (f.key, f.outcome, f.value.as_deref()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (Some(ProfileKey::GradYear), FieldOutcome::Filled, Some("2021")),
            (Some(ProfileKey::GradYear), FieldOutcome::Filled, Some("2021")),
        ]
    );
    assert_eq!(report.filled_count, 2);
}

#[test]
fn test_month_variants_stop_at_first_accepted_option() {
    let months: Vec<SelectOption> = (1..=12)
        .map(|m| SelectOption::new(format!("{:02}", m), format!("{:02}", m)))
        .collect();
    let candidates = dropdown_variants(DateUnit::Month, "1");

    let selected = fieldmatch::dropdown::first_accepted(
        &months,
        &candidates,
        MatcherConfig::default().dropdown_min_score,
    )
    .unwrap();

    // "1" prefix-matches "10" before the exact "01" candidate is tried
    assert_eq!(selected.value, "10");
}

// ============================================================================
// Derived values and write outcomes
// ============================================================================

#[test]
fn test_names_split_from_full_name() {
    let mut doc = FormDocument::new(vec![
        text_input("first_name"),
        text_input("last_name"),
    ]);
    let profile = ProfileRecord::new().with(ProfileKey::FullName, "Mary Jane van Dyke");

    FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    assert_eq!(value_of(&doc, "first_name"), "Mary Jane van");
    assert_eq!(value_of(&doc, "last_name"), "Dyke");
}

#[test]
fn test_single_token_full_name_is_not_split() {
    let mut doc = FormDocument::new(vec![text_input("first_name")]);
    let profile = ProfileRecord::new().with(ProfileKey::FullName, "Cher");

    let report = FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    assert_eq!(report.fields[0].outcome, FieldOutcome::NoValue);
    assert_eq!(report.filled_count, 0);
}

#[test]
fn test_unmatched_dropdown_value_is_write_rejected() {
    let mut doc = FormDocument::new(vec![Node::Control(
        Control::select(vec![
            SelectOption::new("DE", "Germany"),
            SelectOption::new("FR", "France"),
        ])
        .with_name("country"),
    )]);
    let profile = ProfileRecord::new().with(ProfileKey::Country, "usa");

    let report = FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    assert_eq!(report.fields[0].key, Some(ProfileKey::Country));
    assert_eq!(report.fields[0].outcome, FieldOutcome::WriteRejected);
    assert_eq!(
        doc.control(ControlHandle(0)).and_then(|c| c.filled),
        Some(false)
    );
}

#[test]
fn test_unchanged_value_counts_as_rejected() {
    let mut doc = FormDocument::new(vec![Node::Control(Control {
        value: "ada@example.com".into(),
        ..Control::input("email").with_name("email")
    })]);
    let profile = ProfileRecord::new().with(ProfileKey::Email, "ada@example.com");

    let report = FillEngine::new(MatcherConfig::default())
        .fill(&mut doc, Some(&profile))
        .unwrap();

    assert_eq!(report.fields[0].outcome, FieldOutcome::WriteRejected);
    assert_eq!(report.filled_count, 0);
}

#[test]
fn test_missing_profile_store_reports_zero_fills() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = FormDocument::load(&fixture("application.yaml")).unwrap();
    let store = JsonFileStore::new(dir.path().join("absent.json"));

    let report = FillEngine::new(MatcherConfig::default())
        .fill_from_store(&mut doc, &store)
        .unwrap();

    assert!(report.profile_missing);
    assert_eq!(report.filled_count, 0);
    assert_eq!(value_of(&doc, "email"), "");
}

// ============================================================================
// Single-field classification
// ============================================================================

fn classification_profile() -> ProfileRecord {
    ProfileRecord::new()
        .with(ProfileKey::Email, "ada@example.com")
        .with(ProfileKey::Phone, "+44 20 7946 0000")
        .with(ProfileKey::FirstName, "Ada")
        .with(ProfileKey::LastName, "Lovelace")
        .with(ProfileKey::Website, "https://ada.example.com")
        .with(ProfileKey::City, "London")
}

#[rstest]
#[case("Email Address", "email", "", Some(ProfileKey::Email), MatchMethod::Similarity)]
#[case("", "text", "given-name", Some(ProfileKey::FirstName), MatchMethod::Autocomplete)]
#[case("Company website", "url", "family-name", Some(ProfileKey::LastName), MatchMethod::Autocomplete)]
#[case("Surname", "text", "", Some(ProfileKey::LastName), MatchMethod::RuleBased)]
#[case("Website", "url", "", Some(ProfileKey::Website), MatchMethod::Similarity)]
#[case("Contact", "tel", "", Some(ProfileKey::Phone), MatchMethod::TypeHint)]
#[case("Middle name", "text", "additional-name", Some(ProfileKey::FullName), MatchMethod::RuleBased)]
#[case("Favourite colour", "text", "", None, MatchMethod::None)]
fn test_single_field_classification(
    #[case] label: &str,
    #[case] input_type: &str,
    #[case] autocomplete: &str,
    #[case] expected_key: Option<ProfileKey>,
    #[case] expected_method: MatchMethod,
) {
    let doc = FormDocument::new(vec![Node::Label {
        for_id: None,
        text: label.into(),
        children: vec![Node::Control(
            Control::input(input_type).with_autocomplete(autocomplete),
        )],
    }]);
    let profile = classification_profile();
    let mut engine = FillEngine::new(MatcherConfig::default());

    let listed: Vec<ListedField> = engine.list_fields(&doc, Some(&profile)).collect();

    assert_eq!(listed.len(), 1);
    assert_eq!(
        (listed[0].guessed_key, listed[0].method),
        (expected_key, expected_method),
        "{:?}",
        label
    );
    assert!((0.0..=1.0).contains(&listed[0].confidence));
}

#[test]
fn test_email_label_confidence() {
    let doc = FormDocument::new(vec![Node::Label {
        for_id: None,
        text: "Email Address".into(),
        children: vec![Node::Control(Control::input("email"))],
    }]);
    let profile = classification_profile();
    let mut engine = FillEngine::new(MatcherConfig::default());

    let field = engine.list_fields(&doc, Some(&profile)).next().unwrap();
    assert_eq!(field.guessed_key, Some(ProfileKey::Email));
    assert!(field.confidence >= 0.7);
}

#[test]
fn test_raised_threshold_defers_to_rules() {
    let doc = FormDocument::new(vec![Node::Label {
        for_id: None,
        text: "E-mail".into(),
        children: vec![Node::Control(Control::input("text"))],
    }]);
    let profile = classification_profile();
    let config = MatcherConfig::from_yaml("similarity_threshold: 0.9\n").unwrap();
    let mut engine = FillEngine::new(config);

    let field = engine.list_fields(&doc, Some(&profile)).next().unwrap();
    assert_eq!(field.guessed_key, Some(ProfileKey::Email));
    assert_eq!(field.method, MatchMethod::RuleBased);
}

// ============================================================================
// Remote classifier inside a fill pass
// ============================================================================

enum Remote {
    Refused,
    Slow(std::time::Duration),
    Confident(&'static str, f64),
}

impl RemoteClassifier for Remote {
    fn classify(
        &self,
        _context: &FieldContext,
        _timeout: std::time::Duration,
    ) -> std::result::Result<RemoteClassification, RemoteError> {
        let answer = |key: &str, confidence: f64| RemoteClassification {
            key: Some(key.to_string()),
            confidence,
            alternatives: vec![],
        };
        match self {
            Remote::Refused => Err(RemoteError::Transport("connection refused".into())),
            Remote::Slow(delay) => {
                std::thread::sleep(*delay);
                Ok(answer("email", 0.99))
            }
            Remote::Confident(key, confidence) => Ok(answer(key, *confidence)),
        }
    }
}

fn email_form() -> FormDocument {
    FormDocument::new(vec![Node::Label {
        for_id: None,
        text: "Email Address".into(),
        children: vec![Node::Control(Control::input("email"))],
    }])
}

#[test]
fn test_remote_step_sits_between_dates_and_similarity() {
    let methods =
        Pipeline::standard(&MatcherConfig::default(), Some(Box::new(Remote::Refused))).methods();
    assert_eq!(
        methods,
        vec![
            MatchMethod::Autocomplete,
            MatchMethod::GroupedName,
            MatchMethod::DateComponent,
            MatchMethod::Remote,
            MatchMethod::Similarity,
            MatchMethod::RuleBased,
            MatchMethod::TypeHint,
        ]
    );
}

#[rstest]
#[case(Remote::Refused, MatcherConfig::default())]
#[case(
    Remote::Slow(std::time::Duration::from_millis(80)),
    MatcherConfig::from_yaml("remote_timeout_ms: 20\n").unwrap()
)]
fn test_failed_remote_falls_through_to_similarity(
    #[case] remote: Remote,
    #[case] config: MatcherConfig,
) {
    let mut doc = email_form();
    let profile = classification_profile();

    let report = FillEngine::with_remote(config, Box::new(remote))
        .fill(&mut doc, Some(&profile))
        .unwrap();

    assert_eq!(report.filled_count, 1);
    assert_eq!(report.fields[0].key, Some(ProfileKey::Email));
    assert_eq!(report.fields[0].method, MatchMethod::Similarity);
    assert_eq!(doc.value(ControlHandle(0)), Some("ada@example.com"));
}

#[test]
fn test_confident_remote_answer_wins_over_similarity() {
    let mut doc = email_form();
    let profile = classification_profile();

    let report = FillEngine::with_remote(
        MatcherConfig::default(),
        Box::new(Remote::Confident("email", 0.95)),
    )
    .fill(&mut doc, Some(&profile))
    .unwrap();

    assert_eq!(report.fields[0].key, Some(ProfileKey::Email));
    assert_eq!(report.fields[0].method, MatchMethod::Remote);
    assert_eq!(report.fields[0].confidence, 0.95);
    assert_eq!(report.fields[0].outcome, FieldOutcome::Filled);
}

#[test]
fn test_unsure_remote_answer_is_ignored() {
    let mut doc = email_form();
    let profile = classification_profile();

    let report = FillEngine::with_remote(
        MatcherConfig::default(),
        Box::new(Remote::Confident("phone", 0.4)),
    )
    .fill(&mut doc, Some(&profile))
    .unwrap();

    assert_eq!(report.fields[0].key, Some(ProfileKey::Email));
    assert_eq!(report.fields[0].method, MatchMethod::Similarity);
}
