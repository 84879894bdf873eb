//! Canonical persona keys.
//!
//! A key is written `COUNTRY_PLATFORM_SEX_LOW_LAST`, where `LAST` is the
//! inclusive upper age of the bucket (`high - 1`).

use crate::error::PersonaError;
use crate::models::AgeBucket;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const KEY_DELIMITER: char = '_';

/// Identity of a persona: (country, platform, sex, age bucket).
///
/// Categorical fields are stored uppercased, so `usa` and `USA` name the same persona.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonaKey {
    country: String,
    platform: String,
    sex: String,
    bucket: AgeBucket,
}

impl PersonaKey {
    /// Build a key from raw categorical codes and a bucket.
    ///
    /// Fails if a code is empty or contains the delimiter.
    pub fn new(
        country: &str,
        platform: &str,
        sex: &str,
        bucket: AgeBucket,
    ) -> Result<Self, PersonaError> {
        Ok(Self {
            country: normalize("country", country)?,
            platform: normalize("platform", platform)?,
            sex: normalize("sex", sex)?,
            bucket,
        })
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn sex(&self) -> &str {
        &self.sex
    }

    pub fn bucket(&self) -> AgeBucket {
        self.bucket
    }
}

/// Uppercase a categorical code, rejecting values that would break key injectivity.
pub fn normalize(field: &'static str, value: &str) -> Result<String, PersonaError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains(KEY_DELIMITER) {
        return Err(PersonaError::InvalidCategoricalValue {
            field,
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_uppercase())
}

impl fmt::Display for PersonaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = KEY_DELIMITER;
        write!(
            f,
            "{}{d}{}{d}{}{d}{}{d}{}",
            self.country,
            self.platform,
            self.sex,
            self.bucket.low,
            self.bucket.last_age()
        )
    }
}

impl FromStr for PersonaKey {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PersonaError::InvalidKey {
            key: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.trim().split(KEY_DELIMITER).collect();
        if parts.len() != 5 {
            return Err(invalid("expected COUNTRY_PLATFORM_SEX_LOW_HIGH"));
        }

        let low: i64 = parts[3]
            .parse()
            .map_err(|_| invalid("lower age is not an integer"))?;
        let last: i64 = parts[4]
            .parse()
            .map_err(|_| invalid("upper age is not an integer"))?;
        if last < low {
            return Err(invalid("upper age is below lower age"));
        }

        let high = last
            .checked_add(1)
            .ok_or_else(|| invalid("upper age out of range"))?;
        let bucket = AgeBucket { low, high };
        PersonaKey::new(parts[0], parts[1], parts[2], bucket)
            .map_err(|_| invalid("empty categorical field"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(low: i64, high: i64) -> AgeBucket {
        AgeBucket { low, high }
    }

    #[test]
    fn test_key_format() {
        let key = PersonaKey::new("us", "android", "female", bucket(24, 31)).unwrap();
        assert_eq!(key.to_string(), "US_ANDROID_FEMALE_24_30");
        assert_eq!(key.country(), "US");
    }

    #[test]
    fn test_key_normalizes_case_and_whitespace() {
        let a = PersonaKey::new(" tur", "IOS", "Male ", bucket(0, 19)).unwrap();
        let b = PersonaKey::new("TUR", "ios", "male", bucket(0, 19)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "TUR_IOS_MALE_0_18");
    }

    #[test]
    fn test_delimiter_in_code_is_rejected() {
        let result = PersonaKey::new("us_a", "ios", "male", bucket(0, 19));
        assert!(matches!(
            result,
            Err(PersonaError::InvalidCategoricalValue {
                field: "country",
                ..
            })
        ));
        assert!(PersonaKey::new("us", "", "male", bucket(0, 19)).is_err());
    }

    #[test]
    fn test_parse_round_trips_display() {
        let key: PersonaKey = "fra_ios_female_31_40".parse().unwrap();
        assert_eq!(key.bucket(), bucket(31, 41));
        assert_eq!(key.to_string(), "FRA_IOS_FEMALE_31_40");
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        for bad in [
            "",
            "FRA_IOS_FEMALE_31",
            "FRA_IOS_FEMALE_31_40_X",
            "FRA_IOS_FEMALE_a_40",
            "FRA_IOS_FEMALE_31_b",
            "FRA_IOS_FEMALE_41_31",
            "FRA__FEMALE_31_40",
        ] {
            assert!(
                matches!(bad.parse::<PersonaKey>(), Err(PersonaError::InvalidKey { .. })),
                "expected InvalidKey for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_rejects_upper_age_overflow() {
        let key = format!("US_IOS_F_0_{}", i64::MAX);
        assert_eq!(
            key.parse::<PersonaKey>(),
            Err(PersonaError::InvalidKey {
                key: key.clone(),
                reason: "upper age out of range".to_string(),
            })
        );

        let key: PersonaKey = format!("US_IOS_F_0_{}", i64::MAX - 1).parse().unwrap();
        assert_eq!(key.bucket().high, i64::MAX);
    }
}
