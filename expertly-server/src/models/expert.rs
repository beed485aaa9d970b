//! Expert profile types and validation

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{in_range, max_len, optional_max_len, required_text, url};
use super::{ExpertSortField, SortOrder, ValidationError};

const MAX_NAME_LEN: usize = 100;
const MAX_PLACE_LEN: usize = 100;
const MAX_PIN_CODE_LEN: usize = 10;
const MAX_BIO_LEN: usize = 1000;
const MAX_RATING: f64 = 5.0;
/// Largest value a NUMERIC(10,2) rate column holds
pub const MAX_HOURLY_RATE: f64 = 99_999_999.99;

text_enum! {
    pub enum Gender {
        field = "gender";
        Male => "male",
        Female => "female",
        Other => "other",
    }
}

text_enum! {
    /// Languages an expert can hold sessions in
    pub enum Language {
        field = "language";
        Hindi => "hindi",
        English => "english",
    }
}

text_enum! {
    pub enum AccountStatus {
        field = "account_status";
        Active => "active",
        Inactive => "inactive",
        Suspended => "suspended",
    }
}

text_enum! {
    pub enum VerificationStatus {
        field = "verification_status";
        Pending => "pending",
        Verified => "verified",
        Rejected => "rejected",
    }
}

text_enum! {
    pub enum EmploymentType {
        field = "employment_type";
        FullTime => "full-time",
        PartTime => "part-time",
        Contract => "contract",
        Freelance => "freelance",
    }
}

text_enum! {
    pub enum PaymentAccountType {
        field = "account_type";
        Bank => "bank",
        Upi => "upi",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMediaLink {
    pub platform: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub employment_type: EmploymentType,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAccount {
    pub account_type: PaymentAccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifsc_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    pub account_holder_name: String,
    #[serde(default)]
    pub is_verified: bool,
}

impl PaymentAccount {
    fn validate(&self) -> Result<(), ValidationError> {
        required_text("account_holder_name", &self.account_holder_name, MAX_NAME_LEN)?;
        match self.account_type {
            PaymentAccountType::Bank if is_blank(&self.account_number) => {
                Err(ValidationError::Empty { field: "account_number" })
            }
            PaymentAccountType::Upi if is_blank(&self.upi_id) => {
                Err(ValidationError::Empty { field: "upi_id" })
            }
            _ => Ok(()),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

/// Profile fields shared by create and update requests.
///
/// Every field is optional here; [`NewExpert`] adds the create-time
/// requirements on top.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpertProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<Gender>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub pin_code: Option<String>,
    pub bio: Option<String>,
    pub demo_video_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub languages: Option<Vec<Language>>,
    pub social_media_links: Option<Vec<SocialMediaLink>>,
    pub experiences: Option<Vec<Experience>>,
    pub payment_account: Option<PaymentAccount>,
    pub per_hour_rate: Option<f64>,
    pub years_of_experience: Option<i32>,
}

impl ExpertProfileInput {
    /// Field-level checks. Names, when present, must be non-empty.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.first_name = self
            .first_name
            .as_deref()
            .map(|name| required_text("first_name", name, MAX_NAME_LEN))
            .transpose()?;
        self.last_name = self
            .last_name
            .as_deref()
            .map(|name| required_text("last_name", name, MAX_NAME_LEN))
            .transpose()?;
        optional_max_len("state", self.state.as_deref(), MAX_PLACE_LEN)?;
        optional_max_len("city", self.city.as_deref(), MAX_PLACE_LEN)?;
        optional_max_len("pin_code", self.pin_code.as_deref(), MAX_PIN_CODE_LEN)?;
        optional_max_len("bio", self.bio.as_deref(), MAX_BIO_LEN)?;

        if let Some(ref demo) = self.demo_video_url {
            url("demo_video_url", demo)?;
        }
        for link in self.social_media_links.iter().flatten() {
            required_text("platform", &link.platform, MAX_NAME_LEN)?;
            url("social_media_links.url", &link.url)?;
        }
        for experience in self.experiences.iter().flatten() {
            required_text("company", &experience.company, 255)?;
            required_text("position", &experience.position, 255)?;
        }
        if let Some(ref account) = self.payment_account {
            account.validate()?;
        }
        if let Some(rate) = self.per_hour_rate {
            in_range("per_hour_rate", rate, 0.0, Some(MAX_HOURLY_RATE))?;
        }
        if let Some(years) = self.years_of_experience {
            in_range("years_of_experience", years as f64, 0.0, None)?;
        }
        if let Some(ref mut skills) = self.skills {
            skills.retain(|s| !s.trim().is_empty());
            for skill in skills.iter() {
                max_len("skills", skill, MAX_NAME_LEN)?;
            }
        }
        Ok(())
    }

    pub fn language_labels(&self) -> Option<Vec<String>> {
        self.languages
            .as_ref()
            .map(|langs| langs.iter().map(|l| l.as_str().to_owned()).collect())
    }
}

/// Validated expert profile creation
#[derive(Debug, Clone)]
pub struct NewExpert {
    pub user_id: Uuid,
    pub profile: ExpertProfileInput,
}

impl NewExpert {
    pub fn new(user_id: Uuid, mut profile: ExpertProfileInput) -> Result<Self, ValidationError> {
        if profile.first_name.is_none() {
            return Err(ValidationError::rule("First name is required"));
        }
        if profile.last_name.is_none() {
            return Err(ValidationError::rule("Last name is required"));
        }
        profile.validate()?;
        Ok(Self { user_id, profile })
    }
}

/// Validated expert update.
///
/// Status fields are admin-only; [`ExpertChanges::strip_admin_fields`]
/// drops them for everyone else.
#[derive(Debug, Clone, Default)]
pub struct ExpertChanges {
    pub profile: ExpertProfileInput,
    pub account_status: Option<AccountStatus>,
    pub verification_status: Option<VerificationStatus>,
}

impl ExpertChanges {
    pub fn new(
        mut profile: ExpertProfileInput,
        account_status: Option<AccountStatus>,
        verification_status: Option<VerificationStatus>,
    ) -> Result<Self, ValidationError> {
        profile.validate()?;
        Ok(Self {
            profile,
            account_status,
            verification_status,
        })
    }

    pub fn strip_admin_fields(&mut self) {
        self.account_status = None;
        self.verification_status = None;
    }
}

/// Validated list filter for expert search
#[derive(Debug, Clone, Default)]
pub struct ExpertFilter {
    pub category_id: Option<Uuid>,
    pub search_keyword: Option<String>,
    pub account_status: Option<AccountStatus>,
    pub verification_status: Option<VerificationStatus>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    pub skills: Vec<String>,
    pub languages: Vec<Language>,
    pub min_years_of_experience: Option<i32>,
    pub sort_by: ExpertSortField,
    pub sort_order: Option<SortOrder>,
}

impl ExpertFilter {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("min_rating", self.min_rating), ("max_rating", self.max_rating)] {
            if let Some(v) = value {
                in_range(field, v, 0.0, Some(MAX_RATING))?;
            }
        }
        for (field, value) in [("min_rate", self.min_rate), ("max_rate", self.max_rate)] {
            if let Some(v) = value {
                in_range(field, v, 0.0, None)?;
            }
        }
        if let Some(years) = self.min_years_of_experience {
            in_range("min_years_of_experience", years as f64, 0.0, None)?;
        }
        Ok(())
    }

    /// Restrict to verified experts regardless of the requested status.
    pub fn verified_only(mut self) -> Self {
        self.verification_status = Some(VerificationStatus::Verified);
        self
    }

    /// Experts sort newest first unless asked otherwise.
    pub fn order(&self) -> SortOrder {
        self.sort_order.unwrap_or(SortOrder::Desc)
    }
}

/// Split a comma separated query value, dropping blanks.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_owned())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ExpertProfileInput {
        ExpertProfileInput {
            first_name: Some("Asha".into()),
            last_name: Some("Rao".into()),
            ..Default::default()
        }
    }

    #[test]
    fn new_expert_requires_names() {
        let mut input = profile();
        input.first_name = None;
        let err = NewExpert::new(Uuid::new_v4(), input).unwrap_err();
        assert_eq!(err.to_string(), "First name is required");

        assert!(NewExpert::new(Uuid::new_v4(), profile()).is_ok());
    }

    #[test]
    fn rejects_blank_name_and_long_bio() {
        let mut input = profile();
        input.first_name = Some("  ".into());
        assert!(matches!(input.validate(), Err(ValidationError::Empty { .. })));

        let mut input = profile();
        input.bio = Some("x".repeat(1001));
        assert!(matches!(input.validate(), Err(ValidationError::TooLong { max: 1000, .. })));
    }

    #[test]
    fn rate_must_fit_the_column() {
        let mut input = profile();
        input.per_hour_rate = Some(1.0e9);
        assert!(matches!(
            input.validate(),
            Err(ValidationError::OutOfRange { field: "per_hour_rate", .. })
        ));

        let mut input = profile();
        input.per_hour_rate = Some(MAX_HOURLY_RATE);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn rejects_negative_rate_and_bad_urls() {
        let mut input = profile();
        input.per_hour_rate = Some(-1.0);
        assert!(input.validate().is_err());

        let mut input = profile();
        input.demo_video_url = Some("youtube".into());
        assert!(input.validate().is_err());

        let mut input = profile();
        input.social_media_links = Some(vec![SocialMediaLink {
            platform: "linkedin".into(),
            url: "https://linkedin.com/in/asha".into(),
        }]);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn payment_account_rules() {
        let mut input = profile();
        input.payment_account = Some(PaymentAccount {
            account_type: PaymentAccountType::Upi,
            account_number: None,
            ifsc_code: None,
            bank_name: None,
            branch_name: None,
            upi_id: None,
            account_holder_name: "Asha Rao".into(),
            is_verified: false,
        });
        assert!(matches!(
            input.validate(),
            Err(ValidationError::Empty { field: "upi_id" })
        ));
    }

    #[test]
    fn experience_json_shape() {
        let exp: Experience = serde_json::from_value(serde_json::json!({
            "company": "AIIMS",
            "position": "Resident",
            "start_date": "2019-07-01",
            "end_date": null,
            "description": "Cardiology residency",
            "skills": ["echo"],
            "employment_type": "full-time",
            "is_current": true
        }))
        .unwrap();
        assert_eq!(exp.employment_type, EmploymentType::FullTime);
        assert!(exp.end_date.is_none());
    }

    #[test]
    fn admin_fields_are_stripped() {
        let mut changes = ExpertChanges::new(
            ExpertProfileInput::default(),
            Some(AccountStatus::Suspended),
            Some(VerificationStatus::Verified),
        )
        .unwrap();
        changes.strip_admin_fields();
        assert!(changes.account_status.is_none());
        assert!(changes.verification_status.is_none());
    }

    #[test]
    fn filter_ranges() {
        let filter = ExpertFilter {
            min_rating: Some(5.5),
            ..Default::default()
        };
        assert!(filter.validate().is_err());

        let filter = ExpertFilter {
            min_rate: Some(-0.5),
            ..Default::default()
        };
        assert!(filter.validate().is_err());

        let filter = ExpertFilter {
            min_rating: Some(4.0),
            max_rate: Some(2500.0),
            ..Default::default()
        };
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn verified_only_overrides_status() {
        let filter = ExpertFilter {
            verification_status: Some(VerificationStatus::Pending),
            ..Default::default()
        }
        .verified_only();
        assert_eq!(filter.verification_status, Some(VerificationStatus::Verified));
        assert_eq!(filter.order(), SortOrder::Desc);
    }

    #[test]
    fn list_splitting() {
        assert_eq!(split_list(Some("rust, go,,")), vec!["rust", "go"]);
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn enum_labels() {
        assert_eq!(EmploymentType::PartTime.as_str(), "part-time");
        assert_eq!("suspended".parse::<AccountStatus>().unwrap(), AccountStatus::Suspended);
        assert!("english".parse::<Language>().is_ok());
        assert!("french".parse::<Language>().is_err());
    }
}
