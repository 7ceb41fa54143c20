//! Client-side form validation.
//!
//! Drafts hold raw form input. `validate` either produces the typed insert
//! payload or a [`ValidationError`] listing every offending field; nothing
//! here touches the network, so invalid input never costs a gateway call.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::models::{ApplicationStatus, JobStatus, JobType, NewApplication, NewJob, NewPortfolioItem, Profile, Role};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_COVER_LETTER_LEN: usize = 2000;
pub const MAX_MESSAGE_LEN: usize = 2000;
pub const MAX_EXPERIENCE_YEARS: u32 = 80;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field_errors: HashMap<String, String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), field_errors: HashMap::new() }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.clone());
        Self { message, field_errors }
    }
}

/// Accumulates per-field errors; the first one recorded becomes the headline message.
#[derive(Default)]
struct Checker {
    first: Option<String>,
    fields: HashMap<String, String>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: &str) {
        if self.first.is_none() {
            self.first = Some(message.to_string());
        }
        self.fields.entry(field.to_string()).or_insert_with(|| message.to_string());
    }

    fn finish(self) -> Result<(), ValidationError> {
        match self.first {
            None => Ok(()),
            Some(message) => Err(ValidationError { message, field_errors: self.fields }),
        }
    }
}

fn trimmed(value: &str) -> Option<String> {
    let t = value.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

fn trimmed_opt(value: Option<&str>) -> Option<String> {
    value.and_then(trimmed)
}

fn parse_money(checker: &mut Checker, field: &str, raw: &str) -> Option<Decimal> {
    match Decimal::from_str(raw.trim()) {
        Ok(v) if v.is_sign_negative() => {
            checker.fail(field, "Amounts cannot be negative");
            None
        }
        Ok(v) => Some(v),
        Err(_) => {
            checker.fail(field, "Please enter a valid amount");
            None
        }
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

// --- Jobs ---

#[derive(Debug, Clone, Default)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub budget_min: String,
    pub budget_max: String,
    pub location: String,
    pub deadline: String,
    pub requirements: String,
    pub job_type: JobType,
}

impl JobDraft {
    /// Validate against `now` and produce an open job owned by `posted_by`.
    pub fn validate(&self, posted_by: Uuid, now: DateTime<Utc>) -> Result<NewJob, ValidationError> {
        let mut checker = Checker::default();

        let title = trimmed(&self.title);
        if title.is_none() {
            checker.fail("title", "Job title is required");
        }
        let description = trimmed(&self.description);
        if description.is_none() {
            checker.fail("description", "Job description is required");
        }

        let (mut budget_min, mut budget_max) = (None, None);
        if self.budget_min.trim().is_empty() || self.budget_max.trim().is_empty() {
            let field = if self.budget_min.trim().is_empty() { "budget_min" } else { "budget_max" };
            checker.fail(field, "Budget range is required");
        } else {
            budget_min = parse_money(&mut checker, "budget_min", &self.budget_min);
            budget_max = parse_money(&mut checker, "budget_max", &self.budget_max);
            if let (Some(min), Some(max)) = (budget_min, budget_max) {
                if min > max {
                    checker.fail("budget_min", "Minimum budget cannot be greater than maximum budget");
                }
            }
        }

        let location = trimmed(&self.location);
        if location.is_none() {
            checker.fail("location", "Location is required");
        }

        let deadline = if self.deadline.trim().is_empty() {
            checker.fail("deadline", "Application deadline is required");
            None
        } else {
            match parse_deadline(&self.deadline) {
                Some(d) if d <= now => {
                    checker.fail("deadline", "Application deadline must be in the future");
                    None
                }
                Some(d) => Some(d),
                None => {
                    checker.fail("deadline", "Please enter the deadline as YYYY-MM-DD");
                    None
                }
            }
        };

        checker.finish()?;

        match (title, description, budget_min, budget_max, location, deadline) {
            (Some(title), Some(description), Some(budget_min), Some(budget_max), Some(location), Some(deadline)) => {
                Ok(NewJob {
                    title,
                    description,
                    budget_min,
                    budget_max,
                    location,
                    deadline,
                    requirements: trimmed(&self.requirements),
                    job_type: self.job_type,
                    status: JobStatus::Open,
                    posted_by,
                })
            }
            _ => Err(ValidationError::new("Please complete the job form")),
        }
    }
}

// --- Applications ---

#[derive(Debug, Clone, Default)]
pub struct ApplicationDraft {
    pub job_id: Uuid,
    pub cover_letter: Option<String>,
    pub proposed_budget: Option<String>,
}

impl ApplicationDraft {
    pub fn new(job_id: Uuid) -> Self {
        Self { job_id, ..Default::default() }
    }

    pub fn validate(&self, applicant_id: Uuid) -> Result<NewApplication, ValidationError> {
        let mut checker = Checker::default();

        let cover_letter = trimmed_opt(self.cover_letter.as_deref());
        if cover_letter.as_ref().map(|c| c.chars().count() > MAX_COVER_LETTER_LEN).unwrap_or(false) {
            checker.fail(
                "cover_letter",
                &format!("Cover letter must be at most {} characters", MAX_COVER_LETTER_LEN),
            );
        }

        let proposed_budget = match trimmed_opt(self.proposed_budget.as_deref()) {
            Some(raw) => parse_money(&mut checker, "proposed_budget", &raw),
            None => None,
        };

        checker.finish()?;
        Ok(NewApplication {
            job_id: self.job_id,
            applicant_id,
            cover_letter,
            proposed_budget,
            status: ApplicationStatus::Pending,
        })
    }
}

// --- Profiles and portfolio ---

#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub experience_years: Option<String>,
    pub specializations: Vec<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub hourly_rate: Option<String>,
}

impl ProfileDraft {
    pub fn validate(&self, user_id: Uuid) -> Result<Profile, ValidationError> {
        let mut checker = Checker::default();

        let phone = trimmed_opt(self.phone.as_deref());
        if let Some(phone) = &phone {
            let valid = phone.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
                && phone.chars().filter(char::is_ascii_digit).count() >= 7;
            if !valid {
                checker.fail("phone", "Please enter a valid phone number");
            }
        }

        let experience_years = match trimmed_opt(self.experience_years.as_deref()) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(years) if years <= MAX_EXPERIENCE_YEARS => Some(years),
                _ => {
                    checker.fail("experience_years", "Experience must be a whole number of years");
                    None
                }
            },
            None => None,
        };

        let hourly_rate = match trimmed_opt(self.hourly_rate.as_deref()) {
            Some(raw) => parse_money(&mut checker, "hourly_rate", &raw),
            None => None,
        };

        let specializations: Vec<String> = self.specializations.iter().filter_map(|s| trimmed(s)).collect();

        checker.finish()?;
        Ok(Profile {
            user_id,
            full_name: trimmed_opt(self.full_name.as_deref()),
            phone,
            experience_years,
            specializations: if specializations.is_empty() { None } else { Some(specializations) },
            bio: trimmed_opt(self.bio.as_deref()),
            location: trimmed_opt(self.location.as_deref()),
            hourly_rate,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioDraft {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
}

impl PortfolioDraft {
    pub fn validate(&self, tailor_id: Uuid) -> Result<NewPortfolioItem, ValidationError> {
        let mut checker = Checker::default();

        let title = trimmed(&self.title);
        if title.is_none() {
            checker.fail("title", "Title is required");
        }
        let category = trimmed(&self.category);
        if category.is_none() {
            checker.fail("category", "Category is required");
        }
        let image_url = trimmed_opt(self.image_url.as_deref());
        if let Some(raw) = &image_url {
            match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => checker.fail("image_url", "Image URL must be an http(s) link"),
            }
        }

        checker.finish()?;
        Ok(NewPortfolioItem {
            tailor_id,
            title: title.unwrap_or_default(),
            description: self.description.trim().to_string(),
            image_url,
            category: category.unwrap_or_default(),
        })
    }
}

// --- Messages ---

pub fn validate_message(content: &str) -> Result<String, ValidationError> {
    match trimmed(content) {
        None => Err(ValidationError::field("content", "Message cannot be empty")),
        Some(c) if c.chars().count() > MAX_MESSAGE_LEN => Err(ValidationError::field(
            "content",
            format!("Message must be at most {} characters", MAX_MESSAGE_LEN),
        )),
        Some(c) => Ok(c),
    }
}

// --- Auth forms ---

#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() || self.password.is_empty() || self.confirm_password.is_empty() {
            return Err(ValidationError::new("Please fill in all fields"));
        }
        if !self.email.contains('@') {
            return Err(ValidationError::field("email", "Please enter a valid email address"));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::field("confirm_password", "Passwords do not match"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::field(
                "password",
                format!("Password must be at least {} characters long", MIN_PASSWORD_LEN),
            ));
        }
        if self.role == Role::Admin {
            return Err(ValidationError::field("role", "Please choose boutique or tailor"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::new("Please fill in all fields"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job_draft() -> JobDraft {
        JobDraft {
            title: "  Bridal lehenga ".to_string(),
            description: "Hand embroidery".to_string(),
            budget_min: "15000".to_string(),
            budget_max: "25000".to_string(),
            location: "Mumbai".to_string(),
            deadline: "2031-01-15".to_string(),
            requirements: String::new(),
            job_type: JobType::Contract,
        }
    }

    #[test]
    fn test_valid_job_draft() {
        let owner = Uuid::new_v4();
        let job = job_draft().validate(owner, Utc::now()).unwrap();
        assert_eq!(job.title, "Bridal lehenga");
        assert_eq!(job.budget_min, Decimal::from(15000));
        assert_eq!(job.status, JobStatus::Open);
        assert_eq!(job.posted_by, owner);
        assert!(job.requirements.is_none());
    }

    #[test]
    fn test_budget_min_above_max() {
        let mut draft = job_draft();
        draft.budget_min = "30000".to_string();
        let err = draft.validate(Uuid::new_v4(), Utc::now()).unwrap_err();
        assert_eq!(err.message, "Minimum budget cannot be greater than maximum budget");
        assert!(err.field_errors.contains_key("budget_min"));
    }

    #[test]
    fn test_missing_fields_all_reported() {
        let draft = JobDraft::default();
        let err = draft.validate(Uuid::new_v4(), Utc::now()).unwrap_err();
        assert_eq!(err.message, "Job title is required");
        for field in ["title", "description", "budget_min", "location", "deadline"] {
            assert!(err.field_errors.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn test_past_deadline_rejected() {
        let mut draft = job_draft();
        draft.deadline = (Utc::now() - Duration::days(1)).to_rfc3339();
        let err = draft.validate(Uuid::new_v4(), Utc::now()).unwrap_err();
        assert!(err.field_errors.contains_key("deadline"));
    }

    #[test]
    fn test_application_draft() {
        let mut draft = ApplicationDraft::new(Uuid::new_v4());
        draft.proposed_budget = Some("abc".to_string());
        assert!(draft.validate(Uuid::new_v4()).is_err());

        draft.proposed_budget = Some(" 18000 ".to_string());
        draft.cover_letter = Some("   ".to_string());
        let app = draft.validate(Uuid::new_v4()).unwrap();
        assert_eq!(app.proposed_budget, Some(Decimal::from(18000)));
        assert!(app.cover_letter.is_none());
        assert_eq!(app.status, ApplicationStatus::Pending);
    }

    #[test]
    fn test_profile_draft() {
        let draft = ProfileDraft {
            full_name: Some("Asha Rao".to_string()),
            phone: Some("+91 98200 12345".to_string()),
            experience_years: Some("12".to_string()),
            specializations: vec!["bridal".to_string(), " ".to_string()],
            hourly_rate: Some("450".to_string()),
            ..Default::default()
        };
        let profile = draft.validate(Uuid::new_v4()).unwrap();
        assert_eq!(profile.experience_years, Some(12));
        assert_eq!(profile.specializations, Some(vec!["bridal".to_string()]));

        let bad = ProfileDraft { phone: Some("call me".to_string()), ..Default::default() };
        assert!(bad.validate(Uuid::new_v4()).unwrap_err().field_errors.contains_key("phone"));
    }

    #[test]
    fn test_portfolio_image_url() {
        let mut draft = PortfolioDraft {
            title: "Anarkali".to_string(),
            category: "ethnic".to_string(),
            image_url: Some("ftp://files/x.png".to_string()),
            ..Default::default()
        };
        assert!(draft.validate(Uuid::new_v4()).is_err());
        draft.image_url = Some("https://cdn.example.com/x.png".to_string());
        assert!(draft.validate(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_sign_up_form() {
        let mut form = SignUpForm {
            email: "tailor@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            role: Role::Provider,
        };
        assert!(form.validate().is_ok());

        form.confirm_password = "secret2".to_string();
        assert_eq!(form.validate().unwrap_err().message, "Passwords do not match");

        form.password = "123".to_string();
        form.confirm_password = "123".to_string();
        assert_eq!(form.validate().unwrap_err().message, "Password must be at least 6 characters long");

        form.email = String::new();
        assert_eq!(form.validate().unwrap_err().message, "Please fill in all fields");
    }

    #[test]
    fn test_message_content() {
        assert!(validate_message("   ").is_err());
        assert_eq!(validate_message(" hello ").unwrap(), "hello");
    }
}
