//! Phone number type
//!
//! Destination addressing for Bizum-style transfers. Input is normalized to
//! bare digits and must match the Spanish mobile pattern: 9 digits starting
//! with 6 or 7.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Phone(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("Phone number is required")]
    Missing,

    #[error("Invalid mobile number: {0}")]
    InvalidFormat(String),
}

impl Phone {
    /// Normalize and validate a phone number. Anything that is not a digit is
    /// stripped first, so "+34 611 11 11 11" and "611-111-111" both work.
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        // Tolerate the national prefix
        if digits.len() == 11 && digits.starts_with("34") {
            digits = digits.split_off(2);
        }

        if digits.is_empty() {
            return Err(PhoneError::Missing);
        }

        let leading_ok = digits.starts_with('6') || digits.starts_with('7');
        if digits.len() != 9 || !leading_ok {
            return Err(PhoneError::InvalidFormat(digits));
        }

        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        assert_eq!(Phone::parse("611111111").unwrap().as_str(), "611111111");
    }

    #[test]
    fn test_parse_strips_formatting() {
        assert_eq!(Phone::parse("611-11 11.11").unwrap().as_str(), "611111111");
    }

    #[test]
    fn test_parse_national_prefix() {
        assert_eq!(
            Phone::parse("+34 622 222 222").unwrap().as_str(),
            "622222222"
        );
    }

    #[test]
    fn test_parse_seven_prefix() {
        assert!(Phone::parse("722333444").is_ok());
    }

    #[test]
    fn test_parse_landline_rejected() {
        // 9xx numbers are landlines, not mobiles
        assert!(matches!(
            Phone::parse("911111111"),
            Err(PhoneError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_wrong_length_rejected() {
        assert!(matches!(
            Phone::parse("61111111"),
            Err(PhoneError::InvalidFormat(_))
        ));
        assert!(matches!(
            Phone::parse("6111111111"),
            Err(PhoneError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_empty_rejected() {
        assert_eq!(Phone::parse(" - "), Err(PhoneError::Missing));
    }
}
