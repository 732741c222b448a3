//! Profile keys, the personal-data record, and derived values
//!
//! The record itself is owned by an external store; the matching core only
//! reads it. Values are opaque strings except where a write needs a
//! component of a composite value (split dates, split full names).

use crate::date::DateUnit;
use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The fixed set of profile attributes a control can be matched to.
///
/// Declaration order is the iteration order of [`ProfileRecord`] and
/// therefore the tie-break order of the similarity matcher.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum ProfileKey {
    Email,
    Phone,
    FirstName,
    LastName,
    FullName,
    Birthday,
    BirthDay,
    BirthMonth,
    BirthYear,
    Address1,
    City,
    PostalCode,
    Country,
    University,
    Degree,
    Major,
    Gpa,
    GradYear,
    Linkedin,
    Github,
    Website,
    Summary,
}

impl ProfileKey {
    pub const ALL: [ProfileKey; 22] = [
        ProfileKey::Email,
        ProfileKey::Phone,
        ProfileKey::FirstName,
        ProfileKey::LastName,
        ProfileKey::FullName,
        ProfileKey::Birthday,
        ProfileKey::BirthDay,
        ProfileKey::BirthMonth,
        ProfileKey::BirthYear,
        ProfileKey::Address1,
        ProfileKey::City,
        ProfileKey::PostalCode,
        ProfileKey::Country,
        ProfileKey::University,
        ProfileKey::Degree,
        ProfileKey::Major,
        ProfileKey::Gpa,
        ProfileKey::GradYear,
        ProfileKey::Linkedin,
        ProfileKey::Github,
        ProfileKey::Website,
        ProfileKey::Summary,
    ];

    /// Wire name, as stored in the profile JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKey::Email => "email",
            ProfileKey::Phone => "phone",
            ProfileKey::FirstName => "firstName",
            ProfileKey::LastName => "lastName",
            ProfileKey::FullName => "fullName",
            ProfileKey::Birthday => "birthday",
            ProfileKey::BirthDay => "birthDay",
            ProfileKey::BirthMonth => "birthMonth",
            ProfileKey::BirthYear => "birthYear",
            ProfileKey::Address1 => "address1",
            ProfileKey::City => "city",
            ProfileKey::PostalCode => "postalCode",
            ProfileKey::Country => "country",
            ProfileKey::University => "university",
            ProfileKey::Degree => "degree",
            ProfileKey::Major => "major",
            ProfileKey::Gpa => "gpa",
            ProfileKey::GradYear => "gradYear",
            ProfileKey::Linkedin => "linkedin",
            ProfileKey::Github => "github",
            ProfileKey::Website => "website",
            ProfileKey::Summary => "summary",
        }
    }

    /// Calendar unit this key denotes, if it is a date component
    pub fn date_unit(&self) -> Option<DateUnit> {
        match self {
            ProfileKey::BirthDay => Some(DateUnit::Day),
            ProfileKey::BirthMonth => Some(DateUnit::Month),
            ProfileKey::BirthYear | ProfileKey::GradYear => Some(DateUnit::Year),
            _ => None,
        }
    }

    /// The composite date key this component is derived from
    pub fn composite_source(&self) -> Option<ProfileKey> {
        match self {
            ProfileKey::BirthDay | ProfileKey::BirthMonth | ProfileKey::BirthYear => {
                Some(ProfileKey::Birthday)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ProfileKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::ProfileParse(format!("unknown profile key: {}", s)))
    }
}

/// The user's stored key/value personal data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "serde_json::Map<String, serde_json::Value>",
    into = "BTreeMap<ProfileKey, String>"
)]
pub struct ProfileRecord {
    values: BTreeMap<ProfileKey, String>,
}

impl From<serde_json::Map<String, serde_json::Value>> for ProfileRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        use serde_json::Value;

        let mut record = ProfileRecord::new();
        for (name, value) in map {
            let Ok(key) = name.parse::<ProfileKey>() else {
                continue;
            };
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => continue,
            };
            record.set(key, text);
        }
        record
    }
}

impl From<ProfileRecord> for BTreeMap<ProfileKey, String> {
    fn from(record: ProfileRecord) -> Self {
        record.values
    }
}

impl ProfileRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a profile from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::ProfileParse(e.to_string()))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builder-style setter
    pub fn with(mut self, key: ProfileKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: ProfileKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    /// Value for `key`; empty or whitespace-only values count as absent
    pub fn get(&self, key: ProfileKey) -> Option<&str> {
        self.values
            .get(&key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn has(&self, key: ProfileKey) -> bool {
        self.get(key).is_some()
    }

    /// Present (non-empty) entries in key declaration order
    pub fn iter(&self) -> impl Iterator<Item = (ProfileKey, &str)> + '_ {
        self.values
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .filter(|(_, v)| !v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the value to write for `key`.
    ///
    /// Date components come from the composite date when one is stored,
    /// otherwise from their own discrete entry. First/last names fall back
    /// to splitting the full name. `Err` only for an unparseable composite
    /// date.
    pub fn resolve_value(&self, key: ProfileKey) -> Result<Option<String>> {
        if let (Some(unit), Some(source)) = (key.date_unit(), key.composite_source()) {
            if let Some(raw) = self.get(source) {
                let date = parse_composite_date(source, raw)?;
                return Ok(Some(date_component(&date, unit)));
            }
            return Ok(self.get(key).map(str::to_string));
        }

        if let Some(value) = self.get(key) {
            return Ok(Some(value.to_string()));
        }

        match key {
            ProfileKey::FirstName | ProfileKey::LastName => Ok(self
                .get(ProfileKey::FullName)
                .and_then(split_full_name)
                .map(|(given, family)| {
                    if key == ProfileKey::FirstName {
                        given
                    } else {
                        family
                    }
                })),
            _ => Ok(None),
        }
    }
}

/// Parse a stored `YYYY-MM-DD` date
pub fn parse_composite_date(key: ProfileKey, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| Error::MalformedStoredDate {
        key,
        value: raw.to_string(),
    })
}

/// Day and month are unpadded; the year keeps its four digits.
fn date_component(date: &NaiveDate, unit: DateUnit) -> String {
    match unit {
        DateUnit::Day => date.day().to_string(),
        DateUnit::Month => date.month().to_string(),
        DateUnit::Year => format!("{:04}", date.year()),
    }
}

/// Split a full name into (given names, surname).
///
/// The last whitespace token is the surname; everything before it is the
/// given name. Single-token names are not split.
pub fn split_full_name(full: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = full.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    let (family, given) = parts.split_last()?;
    Some((given.join(" "), family.to_string()))
}

/// Personal-data store consumed by the fill pass
pub trait ProfileStore {
    /// Load the record; `Ok(None)` when no record is available
    fn load_profile(&self) -> Result<Option<ProfileRecord>>;

    fn save_profile(&self, profile: &ProfileRecord) -> Result<()>;
}

/// Profile store backed by a plain JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for JsonFileStore {
    fn load_profile(&self) -> Result<Option<ProfileRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path).map_err(Error::Io)?;
        ProfileRecord::from_json(&content).map(Some)
    }

    fn save_profile(&self, profile: &ProfileRecord) -> Result<()> {
        std::fs::write(&self.path, profile.to_json()?).map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip_names() {
        for key in ProfileKey::ALL {
            assert_eq!(key.as_str().parse::<ProfileKey>().unwrap(), key);
        }
        assert!("nickname".parse::<ProfileKey>().is_err());
    }

    #[test]
    fn test_record_coerces_scalars_and_skips_others() {
        let record = ProfileRecord::from_json(
            r#"{"email":"a@b.co","gradYear":2021,"gpa":3.8,"github":null,
                "linkedin":{"url":"x"},"favouriteColour":"teal","summary":"  "}"#,
        )
        .unwrap();

        assert_eq!(record.get(ProfileKey::Email), Some("a@b.co"));
        assert_eq!(record.get(ProfileKey::GradYear), Some("2021"));
        assert_eq!(record.get(ProfileKey::Gpa), Some("3.8"));
        assert_eq!(record.get(ProfileKey::Github), None);
        assert_eq!(record.get(ProfileKey::Linkedin), None);
        assert_eq!(record.get(ProfileKey::Summary), None);
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_iteration_follows_key_order() {
        let record = ProfileRecord::new()
            .with(ProfileKey::Summary, "hi")
            .with(ProfileKey::Email, "a@b.co")
            .with(ProfileKey::City, "Oslo");
        let keys: Vec<ProfileKey> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![ProfileKey::Email, ProfileKey::City, ProfileKey::Summary]
        );
    }

    #[test]
    fn test_resolve_date_components_from_composite() {
        let record = ProfileRecord::new()
            .with(ProfileKey::Birthday, "1995-03-05")
            .with(ProfileKey::BirthDay, "17");

        assert_eq!(
            record.resolve_value(ProfileKey::BirthDay).unwrap().as_deref(),
            Some("5")
        );
        assert_eq!(
            record.resolve_value(ProfileKey::BirthMonth).unwrap().as_deref(),
            Some("3")
        );
        assert_eq!(
            record.resolve_value(ProfileKey::BirthYear).unwrap().as_deref(),
            Some("1995")
        );
    }

    #[test]
    fn test_resolve_discrete_component_without_composite() {
        let record = ProfileRecord::new().with(ProfileKey::BirthMonth, "11");
        assert_eq!(
            record.resolve_value(ProfileKey::BirthMonth).unwrap().as_deref(),
            Some("11")
        );
        assert_eq!(record.resolve_value(ProfileKey::BirthDay).unwrap(), None);
    }

    #[test]
    fn test_malformed_composite_date_is_an_error() {
        let record = ProfileRecord::new().with(ProfileKey::Birthday, "March 5th");
        let err = record.resolve_value(ProfileKey::BirthYear).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedStoredDate {
                key: ProfileKey::Birthday,
                ..
            }
        ));
        // Non-date keys are unaffected
        assert_eq!(record.resolve_value(ProfileKey::Email).unwrap(), None);
    }

    #[test]
    fn test_full_name_split() {
        let record = ProfileRecord::new().with(ProfileKey::FullName, "Ada  Maria Lovelace");
        assert_eq!(
            record.resolve_value(ProfileKey::FirstName).unwrap().as_deref(),
            Some("Ada Maria")
        );
        assert_eq!(
            record.resolve_value(ProfileKey::LastName).unwrap().as_deref(),
            Some("Lovelace")
        );

        let explicit = record.clone().with(ProfileKey::FirstName, "Augusta");
        assert_eq!(
            explicit.resolve_value(ProfileKey::FirstName).unwrap().as_deref(),
            Some("Augusta")
        );

        assert_eq!(split_full_name("Cher"), None);
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("profile.json"));
        assert_eq!(store.load_profile().unwrap(), None);

        let record = ProfileRecord::new()
            .with(ProfileKey::Email, "a@b.co")
            .with(ProfileKey::FirstName, "Ada");
        store.save_profile(&record).unwrap();

        assert_eq!(store.load_profile().unwrap(), Some(record));
    }
}
