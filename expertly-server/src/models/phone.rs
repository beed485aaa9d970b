//! Phone number and OTP code validation
//!
//! Indian mobile numbers only: optional `+91`/`91` prefix followed by ten
//! digits starting with 6-9.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Length of generated and accepted OTP codes
pub const OTP_LENGTH: usize = 6;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((\+)?91)?([6789]\d{9})$").expect("invalid phone regex"));

/// Validated phone number, normalized to `+91XXXXXXXXXX`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse and normalize a phone number.
    ///
    /// # Example
    /// ```
    /// use expertly_server::models::PhoneNumber;
    ///
    /// let a = PhoneNumber::new("9876543210").unwrap();
    /// let b = PhoneNumber::new("+919876543210").unwrap();
    /// assert_eq!(a, b);
    /// assert!(PhoneNumber::new("1234567890").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "phone_number" });
        }

        let digits = PHONE_RE
            .captures(s)
            .and_then(|c| c.get(3))
            .ok_or(ValidationError::InvalidFormat {
                field: "phone_number",
                reason: "Please enter a valid phone number",
            })?;

        Ok(Self(format!("+91{}", digits.as_str())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated numeric OTP code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidFormat {
                field: "code",
                reason: "OTP must contain only numbers",
            });
        }
        if s.len() != OTP_LENGTH {
            return Err(ValidationError::InvalidFormat {
                field: "code",
                reason: "OTP must be 6 digits",
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
