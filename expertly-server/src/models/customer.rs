//! Customer profile input

use serde::Deserialize;

use super::validation::{max_len, optional_max_len};
use super::{Gender, ValidationError};

const MAX_ADDRESS_LEN: usize = 500;
const MAX_EXAM_LEN: usize = 100;

text_enum! {
    pub enum Interest {
        field = "interest_preferences";
        Music => "music",
        Art => "art",
        Sports => "sports",
        Technology => "technology",
        Other => "other",
    }
}

/// Create-or-update body for the caller's own customer profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerProfile {
    pub gender: Option<Gender>,
    pub address: Option<String>,
    #[serde(default)]
    pub exam_preferences: Vec<String>,
    #[serde(default)]
    pub interest_preferences: Vec<Interest>,
}

impl CustomerProfile {
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        optional_max_len("address", self.address.as_deref(), MAX_ADDRESS_LEN)?;
        self.exam_preferences.retain(|e| !e.trim().is_empty());
        for exam in &self.exam_preferences {
            max_len("exam_preferences", exam, MAX_EXAM_LEN)?;
        }
        self.interest_preferences.sort_by_key(|i| i.as_str());
        self.interest_preferences.dedup();
        Ok(())
    }

    pub fn interest_labels(&self) -> Vec<String> {
        self.interest_preferences
            .iter()
            .map(|i| i.as_str().to_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_cleans_preferences() {
        let mut profile: CustomerProfile = serde_json::from_value(serde_json::json!({
            "gender": "female",
            "exam_preferences": ["NEET", " "],
            "interest_preferences": ["music", "art", "music"]
        }))
        .unwrap();
        profile.validate().unwrap();

        assert_eq!(profile.gender, Some(Gender::Female));
        assert_eq!(profile.exam_preferences, vec!["NEET"]);
        assert_eq!(profile.interest_labels(), vec!["art", "music"]);
    }

    #[test]
    fn rejects_unknown_interest() {
        let result: Result<CustomerProfile, _> = serde_json::from_value(serde_json::json!({
            "interest_preferences": ["gaming"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn address_length() {
        let mut profile = CustomerProfile {
            address: Some("x".repeat(501)),
            ..Default::default()
        };
        assert!(profile.validate().is_err());
    }
}
