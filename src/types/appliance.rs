// ABOUTME: Validated appliance name newtype.
// ABOUTME: Names feed into image names and filesystem paths, so the charset is restricted.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplianceNameError {
    #[error("appliance name cannot be empty")]
    Empty,

    #[error("appliance name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("appliance name cannot start or end with a separator")]
    EdgeSeparator,

    #[error("invalid character in appliance name: '{0}'")]
    InvalidChar(char),
}

/// Name of an appliance product, e.g. `wordpress` or `core`.
///
/// Used verbatim in image names (`<appliance>_<stamp>`), git workspace
/// paths, and cloud tags, so only lowercase alphanumerics, `-` and `_`
/// are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApplianceName(String);

impl ApplianceName {
    pub fn new(value: &str) -> Result<Self, ApplianceNameError> {
        if value.is_empty() {
            return Err(ApplianceNameError::Empty);
        }

        if value.len() > 63 {
            return Err(ApplianceNameError::TooLong);
        }

        let first = value.chars().next().unwrap_or('-');
        let last = value.chars().next_back().unwrap_or('-');
        if first == '-' || first == '_' || last == '-' || last == '_' {
            return Err(ApplianceNameError::EdgeSeparator);
        }

        for c in value.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '_' {
                return Err(ApplianceNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplianceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for ApplianceName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for ApplianceName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        ApplianceName::new(&value).map_err(serde::de::Error::custom)
    }
}
