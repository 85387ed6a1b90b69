//! Calendar month identifiers for the monthly Kd climatology.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A climatological month, always rendered as two digits ("01".."12").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(u8);

impl Month {
    /// Create a month from its number (1-12).
    pub fn new(number: u8) -> Result<Self, MonthParseError> {
        if (1..=12).contains(&number) {
            Ok(Self(number))
        } else {
            Err(MonthParseError::OutOfRange(number.to_string()))
        }
    }

    /// Month number 1-12.
    pub fn number(&self) -> u8 {
        self.0
    }

    /// All twelve months in calendar order.
    pub fn all() -> Vec<Month> {
        (1..=12).map(Month).collect()
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    /// Only the zero-padded two-digit form is accepted, matching the
    /// `{month}` placeholder in Kd file patterns.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MonthParseError::InvalidFormat(s.to_string()));
        }
        let number: u8 = s
            .parse()
            .map_err(|_| MonthParseError::InvalidFormat(s.to_string()))?;
        Month::new(number).map_err(|_| MonthParseError::OutOfRange(s.to_string()))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonthParseError {
    #[error("Invalid month '{0}'. Expected two digits 01-12")]
    InvalidFormat(String),

    #[error("Month out of range: {0}")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!("03".parse::<Month>().unwrap().number(), 3);
        assert_eq!("12".parse::<Month>().unwrap().number(), 12);
    }

    #[test]
    fn test_parse_month_rejects_bad_input() {
        assert!(matches!("3".parse::<Month>(), Err(MonthParseError::InvalidFormat(_))));
        assert!(matches!("13".parse::<Month>(), Err(MonthParseError::OutOfRange(_))));
        assert!(matches!("00".parse::<Month>(), Err(MonthParseError::OutOfRange(_))));
        assert!("ab".parse::<Month>().is_err());
    }

    #[test]
    fn test_display_zero_padded() {
        assert_eq!(Month::new(1).unwrap().to_string(), "01");
        assert_eq!(Month::all().len(), 12);
        assert_eq!(Month::all()[11].to_string(), "12");
    }
}
