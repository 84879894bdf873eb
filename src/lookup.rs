//! Persona lookup for user-supplied profiles.
//!
//! Raw field values are validated against the values observed in the batch,
//! the age is bucketed with the table's own bucketizer, and the resulting key
//! is queried in the persona table.

use crate::config::LookupConfig;
use crate::error::PersonaError;
use crate::models::{AgeBucket, PersonaEntry, Record};
use crate::persona::key::normalize;
use crate::persona::PersonaKey;
use crate::table::PersonaTable;
use anyhow::Result;
use std::collections::BTreeSet;
use std::fmt;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

/// A profile field the lookup asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Country,
    Platform,
    Sex,
    Age,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Country => "country",
            Field::Platform => "platform",
            Field::Sex => "sex",
            Field::Age => "age",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Categorical values observed in a batch, uppercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoricalDomain {
    countries: BTreeSet<String>,
    platforms: BTreeSet<String>,
    sexes: BTreeSet<String>,
}

impl CategoricalDomain {
    pub fn from_records(records: &[Record]) -> Self {
        let mut domain = Self::default();
        for record in records {
            domain.countries.insert(record.country.trim().to_uppercase());
            domain.platforms.insert(record.platform.trim().to_uppercase());
            domain.sexes.insert(record.sex.trim().to_uppercase());
        }
        domain
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.countries.iter().map(String::as_str)
    }

    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.platforms.iter().map(String::as_str)
    }

    pub fn sexes(&self) -> impl Iterator<Item = &str> {
        self.sexes.iter().map(String::as_str)
    }

    fn values(&self, field: Field) -> Option<&BTreeSet<String>> {
        match field {
            Field::Country => Some(&self.countries),
            Field::Platform => Some(&self.platforms),
            Field::Sex => Some(&self.sexes),
            Field::Age => None,
        }
    }
}

/// Raw profile as typed by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileQuery {
    pub country: String,
    pub platform: String,
    pub sex: String,
    pub age: i64,
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'t> {
    pub key: PersonaKey,
    pub entry: &'t PersonaEntry,
}

/// How an interactive session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome<'t> {
    Found(Resolved<'t>),
    NotFound { key: PersonaKey },
    /// Input ended or the attempts for `field` ran out.
    Abandoned { field: Field },
}

/// Resolves profiles against a persona table.
pub struct LookupService<'t> {
    table: &'t PersonaTable,
    domain: CategoricalDomain,
    config: LookupConfig,
}

impl<'t> LookupService<'t> {
    pub fn new(table: &'t PersonaTable, domain: CategoricalDomain, config: LookupConfig) -> Self {
        Self {
            table,
            domain,
            config,
        }
    }

    /// Validate a categorical value, returning its uppercase code.
    ///
    /// Country input that is not a known code is retried truncated to
    /// `country_code_len` characters, so `turkey` resolves to `TUR`.
    pub fn validate(&self, field: Field, raw: &str) -> Result<String, PersonaError> {
        let invalid = || PersonaError::InvalidCategoricalValue {
            field: field.name(),
            value: raw.to_string(),
        };
        let known = self.domain.values(field).ok_or_else(invalid)?;

        let code = normalize(field.name(), raw).map_err(|_| invalid())?;
        if known.contains(&code) {
            return Ok(code);
        }

        if field == Field::Country {
            let prefix: String = code.chars().take(self.config.country_code_len).collect();
            if known.contains(&prefix) {
                debug!("Resolved country '{}' to '{}'", raw, prefix);
                return Ok(prefix);
            }
        }

        Err(invalid())
    }

    /// Parse and bucket a typed age.
    pub fn parse_age(&self, raw: &str) -> Result<AgeBucket, PersonaError> {
        let age: i64 = raw
            .trim()
            .parse()
            .map_err(|_| PersonaError::InvalidCategoricalValue {
                field: Field::Age.name(),
                value: raw.to_string(),
            })?;
        self.table.buckets().bucket(age)
    }

    /// Resolve a full profile in one call.
    pub fn resolve(&self, query: &ProfileQuery) -> Result<Resolved<'t>, PersonaError> {
        let country = self.validate(Field::Country, &query.country)?;
        let platform = self.validate(Field::Platform, &query.platform)?;
        let sex = self.validate(Field::Sex, &query.sex)?;
        let bucket = self.table.buckets().bucket(query.age)?;

        let key = PersonaKey::new(&country, &platform, &sex, bucket)?;
        let entry = self.table.lookup(&key)?;
        Ok(Resolved { key, entry })
    }

    /// Prompt for each field in turn and look up the resulting persona.
    ///
    /// A rejected value re-prompts the same field, up to `max_attempts` times.
    pub fn run_session<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<SessionOutcome<'t>> {
        let Some(country) = self.prompt(input, output, Field::Country, |raw| {
            self.validate(Field::Country, raw)
        })?
        else {
            return Ok(SessionOutcome::Abandoned {
                field: Field::Country,
            });
        };

        let Some(platform) = self.prompt(input, output, Field::Platform, |raw| {
            self.validate(Field::Platform, raw)
        })?
        else {
            return Ok(SessionOutcome::Abandoned {
                field: Field::Platform,
            });
        };

        let Some(sex) =
            self.prompt(input, output, Field::Sex, |raw| self.validate(Field::Sex, raw))?
        else {
            return Ok(SessionOutcome::Abandoned { field: Field::Sex });
        };

        let Some(bucket) = self.prompt(input, output, Field::Age, |raw| self.parse_age(raw))?
        else {
            return Ok(SessionOutcome::Abandoned { field: Field::Age });
        };

        let key = PersonaKey::new(&country, &platform, &sex, bucket)?;
        match self.table.lookup(&key) {
            Ok(entry) => {
                writeln!(
                    output,
                    "{}: expected revenue {:.2}, segment {} ({} customers)",
                    key, entry.mean_price, entry.segment, entry.count
                )?;
                Ok(SessionOutcome::Found(Resolved { key, entry }))
            }
            Err(_) => {
                writeln!(output, "No such persona exists: {}", key)?;
                Ok(SessionOutcome::NotFound { key })
            }
        }
    }

    /// Read one field until it validates, input ends, or attempts run out.
    ///
    /// Only bad field values re-prompt; any other error ends the session.
    fn prompt<T, R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
        field: Field,
        parse: impl Fn(&str) -> Result<T, PersonaError>,
    ) -> Result<Option<T>> {
        let max = self.config.max_attempts;
        let mut attempt = 0;

        while attempt < max {
            attempt += 1;
            write!(output, "Enter {}: ", field)?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                debug!("Input closed while reading {}", field);
                return Ok(None);
            }

            match parse(line.trim()) {
                Ok(value) => return Ok(Some(value)),
                Err(e) if !e.is_input_error() => return Err(e.into()),
                Err(e) => {
                    warn!("Rejected {} input (attempt {}/{}): {}", field, attempt, max, e);
                    writeln!(output, "Enter a valid {}: {}", field, e)?;
                }
            }
        }

        writeln!(output, "Too many invalid {} entries, giving up.", field)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Segmenter;
    use crate::persona::AgeBuckets;
    use std::io::Cursor;

    fn records() -> Vec<Record> {
        vec![
            Record::new("tur", "android", "female", 35, 39.0),
            Record::new("tur", "android", "female", 33, 49.0),
            Record::new("fra", "ios", "female", 35, 29.0),
            Record::new("usa", "ios", "male", 20, 19.0),
        ]
    }

    fn table(records: &[Record]) -> PersonaTable {
        PersonaTable::build(records, &AgeBuckets::default(), &Segmenter::default()).unwrap()
    }

    fn config(max_attempts: usize) -> LookupConfig {
        LookupConfig {
            max_attempts,
            country_code_len: 3,
        }
    }

    fn query(country: &str, platform: &str, sex: &str, age: i64) -> ProfileQuery {
        ProfileQuery {
            country: country.to_string(),
            platform: platform.to_string(),
            sex: sex.to_string(),
            age,
        }
    }

    #[test]
    fn test_resolve_found() {
        let records = records();
        let table = table(&records);
        let service = LookupService::new(&table, CategoricalDomain::from_records(&records), config(3));

        let resolved = service.resolve(&query("Turkey", "ANDROID", "female", 34)).unwrap();

        assert_eq!(resolved.key.to_string(), "TUR_ANDROID_FEMALE_31_40");
        assert_eq!(resolved.entry.mean_price, 44.0);
    }

    #[test]
    fn test_resolve_distinguishes_errors() {
        let records = records();
        let table = table(&records);
        let service = LookupService::new(&table, CategoricalDomain::from_records(&records), config(3));

        assert!(matches!(
            service.resolve(&query("deu", "ios", "male", 30)),
            Err(PersonaError::InvalidCategoricalValue {
                field: "country",
                ..
            })
        ));
        assert!(matches!(
            service.resolve(&query("tur", "web", "male", 30)),
            Err(PersonaError::InvalidCategoricalValue {
                field: "platform",
                ..
            })
        ));
        assert!(matches!(
            service.resolve(&query("tur", "ios", "male", 80)),
            Err(PersonaError::UnbucketableAge { age: 80, .. })
        ));
        // Every field is valid on its own, but the combination was never observed.
        assert!(matches!(
            service.resolve(&query("usa", "android", "female", 35)),
            Err(PersonaError::PersonaNotFound { .. })
        ));
    }

    #[test]
    fn test_session_retries_invalid_fields() {
        let records = records();
        let table = table(&records);
        let service = LookupService::new(&table, CategoricalDomain::from_records(&records), config(3));

        let mut input = Cursor::new("narnia\ntur\nandroid\nfemale\nthirty\n31\n");
        let mut output = Vec::new();

        let outcome = service.run_session(&mut input, &mut output).unwrap();

        match outcome {
            SessionOutcome::Found(resolved) => {
                assert_eq!(resolved.key.to_string(), "TUR_ANDROID_FEMALE_31_40")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Enter a valid country"));
        assert!(text.contains("Enter a valid age"));
        assert!(text.contains("segment"));
    }

    #[test]
    fn test_session_reports_missing_persona() {
        let records = records();
        let table = table(&records);
        let service = LookupService::new(&table, CategoricalDomain::from_records(&records), config(3));

        let mut input = Cursor::new("fra\nios\nmale\n35\n");
        let mut output = Vec::new();

        let outcome = service.run_session(&mut input, &mut output).unwrap();

        assert!(matches!(outcome, SessionOutcome::NotFound { .. }));
        assert!(String::from_utf8(output)
            .unwrap()
            .contains("No such persona exists: FRA_IOS_MALE_31_40"));
    }

    #[test]
    fn test_session_gives_up_after_max_attempts() {
        let records = records();
        let table = table(&records);
        let service = LookupService::new(&table, CategoricalDomain::from_records(&records), config(2));

        let mut input = Cursor::new("tur\nweb\ndesktop\nios\n");
        let mut output = Vec::new();

        let outcome = service.run_session(&mut input, &mut output).unwrap();

        assert_eq!(
            outcome,
            SessionOutcome::Abandoned {
                field: Field::Platform
            }
        );
    }

    #[test]
    fn test_session_ends_on_eof() {
        let records = records();
        let table = table(&records);
        let service = LookupService::new(&table, CategoricalDomain::from_records(&records), config(5));

        let mut input = Cursor::new("tur\n");
        let mut output = Vec::new();

        let outcome = service.run_session(&mut input, &mut output).unwrap();

        assert_eq!(
            outcome,
            SessionOutcome::Abandoned {
                field: Field::Platform
            }
        );
    }

    #[test]
    fn test_prompt_does_not_retry_non_input_errors() {
        let records = records();
        let table = table(&records);
        let service = LookupService::new(&table, CategoricalDomain::from_records(&records), config(3));

        let mut input = Cursor::new("tur\ntur\n");
        let mut output = Vec::new();

        let result = service.prompt(&mut input, &mut output, Field::Country, |_| {
            Err::<String, _>(PersonaError::EmptyBatch)
        });

        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<PersonaError>(),
            Some(&PersonaError::EmptyBatch)
        );
        // One prompt, no retry.
        assert_eq!(String::from_utf8(output).unwrap(), "Enter country: ");
    }

    #[test]
    fn test_country_matches_code_then_prefix() {
        let records = vec![
            Record::new("usa", "ios", "male", 20, 19.0),
            Record::new("ukgb", "ios", "male", 20, 29.0),
        ];
        let table = table(&records);
        let service = LookupService::new(&table, CategoricalDomain::from_records(&records), config(3));

        assert_eq!(service.validate(Field::Country, "ukgb").unwrap(), "UKGB");
        assert_eq!(service.validate(Field::Country, "usa of america").unwrap(), "USA");
        assert!(service.validate(Field::Country, "ukraine").is_err());
    }

    #[test]
    fn test_domain_collects_uppercase_codes() {
        let domain = CategoricalDomain::from_records(&records());
        assert_eq!(domain.countries().collect::<Vec<_>>(), vec!["FRA", "TUR", "USA"]);
        assert_eq!(domain.platforms().collect::<Vec<_>>(), vec!["ANDROID", "IOS"]);
        assert_eq!(domain.sexes().count(), 2);
    }
}
