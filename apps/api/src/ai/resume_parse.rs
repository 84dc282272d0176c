//! Structured resume parsing: model extraction with a regex fallback, then cleaning.
//!
//! The model reply is read loosely (`serde_json::Value` leaves) because extracted
//! fields arrive as strings, numbers or `null` interchangeably. Cleaning turns that
//! into the typed [`ParsedResume`] stored on the resume row and copied onto the profile.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::fallback::{call_with_fallback, AiCall, AiOutcome};
use crate::ai::prompts::{RESUME_PERSONA, RESUME_PROMPT_TEMPLATE};
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::ChatCompletion;
use crate::models::user::{Certification, Education, WorkExperience};

/// Resume text sent to the model is capped to keep prompts bounded.
const MAX_PROMPT_CHARS: usize = 12_000;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").expect("valid regex")
});
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\+?1[-.\s]?)?(\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})").expect("valid regex")
});
static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?linkedin\.com/in/[A-Za-z0-9_.\-]+").expect("valid regex")
});
static SKILLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Python|JavaScript|Java|C\+\+|React|Node\.js|SQL|HTML|CSS|AWS|Docker|Git)\b")
        .expect("valid regex")
});

// ── Cleaned output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalSummary {
    pub current_job_title: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    pub personal_info: PersonalInfo,
    pub professional_summary: ProfessionalSummary,
    pub skills: Vec<String>,
    pub work_experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
    pub certifications: Vec<Certification>,
}

// ── Loose model reply ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawResume {
    personal_info: RawPersonal,
    professional_summary: RawSummary,
    skills: Vec<Value>,
    work_experience: Vec<RawWork>,
    education: Vec<RawEducation>,
    certifications: Vec<RawCertification>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPersonal {
    first_name: Value,
    last_name: Value,
    email: Value,
    phone: Value,
    location: Value,
    linkedin_url: Value,
    portfolio_url: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSummary {
    current_job_title: Value,
    bio: Value,
    experience_years: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWork {
    title: Value,
    company: Value,
    duration: Value,
    description: Value,
    start_date: Value,
    end_date: Value,
    current: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEducation {
    degree: Value,
    institution: Value,
    year: Value,
    field: Value,
    grade: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCertification {
    name: Value,
    issuer: Value,
    year: Value,
}

// ── Cleaning ─────────────────────────────────────────────────────────────────

/// Trims text; `null`, `none`, `n/a` and blanks become `None`. Numbers are stringified.
fn clean_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    match text.to_lowercase().as_str() {
        "" | "null" | "none" | "n/a" => None,
        _ => Some(text),
    }
}

fn clean_email(value: &Value) -> Option<String> {
    let text = clean_text(value)?;
    EMAIL
        .find(&text)
        .filter(|m| m.start() == 0)
        .map(|_| text.to_lowercase())
}

/// 10 digits → `+1XXXXXXXXXX`; 11 digits starting with 1 → `+1XXXXXXXXXX`; else unchanged.
pub fn clean_phone(value: &Value) -> Option<String> {
    let text = clean_text(value)?;
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    Some(match digits.len() {
        10 => format!("+1{digits}"),
        11 if digits.starts_with('1') => format!("+{digits}"),
        _ => text,
    })
}

fn clean_url(value: &Value) -> Option<String> {
    let text = clean_text(value)?;
    if text.starts_with("http://") || text.starts_with("https://") {
        Some(text)
    } else {
        Some(format!("https://{text}"))
    }
}

fn clean_integer(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => s.parse().ok(),
        _ => None,
    }
}

impl RawResume {
    pub fn clean(self) -> ParsedResume {
        let p = &self.personal_info;
        let s = &self.professional_summary;
        ParsedResume {
            personal_info: PersonalInfo {
                first_name: clean_text(&p.first_name),
                last_name: clean_text(&p.last_name),
                email: clean_email(&p.email),
                phone: clean_phone(&p.phone),
                location: clean_text(&p.location),
                linkedin_url: clean_url(&p.linkedin_url),
                portfolio_url: clean_url(&p.portfolio_url),
            },
            professional_summary: ProfessionalSummary {
                current_job_title: clean_text(&s.current_job_title),
                bio: clean_text(&s.bio),
                experience_years: clean_integer(&s.experience_years),
            },
            skills: self.skills.iter().filter_map(clean_text).collect(),
            work_experience: self
                .work_experience
                .iter()
                .filter_map(|w| {
                    Some(WorkExperience {
                        title: clean_text(&w.title)?,
                        company: clean_text(&w.company)?,
                        duration: clean_text(&w.duration),
                        description: clean_text(&w.description),
                        start_date: clean_text(&w.start_date),
                        end_date: clean_text(&w.end_date),
                        current: w.current.as_bool().unwrap_or(false),
                    })
                })
                .collect(),
            education: self
                .education
                .iter()
                .filter_map(|e| {
                    Some(Education {
                        degree: clean_text(&e.degree)?,
                        institution: clean_text(&e.institution)?,
                        year: clean_text(&e.year),
                        field: clean_text(&e.field),
                        grade: clean_text(&e.grade),
                    })
                })
                .collect(),
            certifications: self
                .certifications
                .iter()
                .filter_map(|c| {
                    Some(Certification {
                        name: clean_text(&c.name)?,
                        issuer: clean_text(&c.issuer),
                        year: clean_text(&c.year),
                    })
                })
                .collect(),
        }
    }
}

/// Pattern-based extraction of contact details and well-known skills.
pub fn regex_extraction(raw_text: &str) -> RawResume {
    let mut raw = RawResume::default();

    if let Some(m) = EMAIL.find(raw_text) {
        raw.personal_info.email = Value::String(m.as_str().to_string());
    }
    if let Some(m) = PHONE.find(raw_text) {
        raw.personal_info.phone = Value::String(m.as_str().to_string());
    }
    if let Some(m) = LINKEDIN.find(raw_text) {
        raw.personal_info.linkedin_url = Value::String(m.as_str().to_string());
    }

    let mut seen = HashSet::new();
    raw.skills = SKILLS
        .find_iter(raw_text)
        .map(|m| m.as_str().to_string())
        .filter(|skill| seen.insert(skill.to_lowercase()))
        .map(Value::String)
        .collect();

    raw
}

pub async fn parse_resume_structured(
    client: &dyn ChatCompletion,
    raw_text: &str,
) -> AiOutcome<ParsedResume> {
    let system = system_prompt(RESUME_PERSONA);
    let call = AiCall {
        feature: "resume_parse",
        system: &system,
        temperature: 0.1,
    };

    call_with_fallback(
        client,
        call,
        || {
            let excerpt: String = raw_text.chars().take(MAX_PROMPT_CHARS).collect();
            RESUME_PROMPT_TEMPLATE.replace("{resume_text}", &excerpt)
        },
        |reply: RawResume| Ok(reply.clean()),
        |_| regex_extraction(raw_text).clean(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ai::fallback::FailureKind;
    use crate::llm_client::mock::ScriptedClient;
    use crate::llm_client::LlmError;

    const RESUME: &str = "Jane Doe\nJane.Doe@Example.com | (555) 123-4567\n\
        linkedin.com/in/jane-doe\nSkills: Python, react, SQL, python, Docker\n";

    #[test]
    fn test_clean_text_drops_null_like_values() {
        assert_eq!(clean_text(&json!("N/A")), None);
        assert_eq!(clean_text(&json!("null")), None);
        assert_eq!(clean_text(&json!("  ")), None);
        assert_eq!(clean_text(&json!(null)), None);
        assert_eq!(clean_text(&json!(" Berlin ")), Some("Berlin".into()));
        assert_eq!(clean_text(&json!(2019)), Some("2019".into()));
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(clean_phone(&json!("(555) 123-4567")), Some("+15551234567".into()));
        assert_eq!(clean_phone(&json!("1-555-123-4567")), Some("+15551234567".into()));
        assert_eq!(clean_phone(&json!("+44 20 7946 0958")), Some("+44 20 7946 0958".into()));
    }

    #[test]
    fn test_url_and_integer_cleaning() {
        assert_eq!(
            clean_url(&json!("linkedin.com/in/x")),
            Some("https://linkedin.com/in/x".into())
        );
        assert_eq!(clean_url(&json!("http://a.dev")), Some("http://a.dev".into()));
        assert_eq!(clean_integer(&json!(7)), Some(7));
        assert_eq!(clean_integer(&json!("12")), Some(12));
        assert_eq!(clean_integer(&json!("about 5")), None);
    }

    #[test]
    fn test_invalid_email_is_dropped() {
        assert_eq!(clean_email(&json!("not an email")), None);
        assert_eq!(clean_email(&json!("A@B.io")), Some("a@b.io".into()));
    }

    #[test]
    fn test_regex_extraction() {
        let parsed = regex_extraction(RESUME).clean();
        assert_eq!(parsed.personal_info.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(parsed.personal_info.phone.as_deref(), Some("+15551234567"));
        assert_eq!(
            parsed.personal_info.linkedin_url.as_deref(),
            Some("https://linkedin.com/in/jane-doe")
        );
        assert_eq!(parsed.skills, vec!["Python", "react", "SQL", "Docker"]);
    }

    #[tokio::test]
    async fn test_ai_reply_is_cleaned_and_incomplete_items_dropped() {
        let client = ScriptedClient::replying(
            r#"{
              "personal_info": {"first_name": "Jane", "last_name": "null", "email": "JANE@X.COM"},
              "professional_summary": {"current_job_title": "Engineer", "experience_years": "6"},
              "skills": ["Rust", "N/A", ""],
              "work_experience": [
                {"title": "Engineer", "company": "Acme", "current": true},
                {"title": "Intern"}
              ],
              "education": [{"degree": "BSc", "institution": "MIT", "year": 2015}, {"degree": "MSc"}],
              "certifications": [{"name": "CKA"}, {"issuer": "AWS"}]
            }"#,
        );
        let outcome = parse_resume_structured(&client, RESUME).await;
        assert!(outcome.generated_by_ai);
        let parsed = outcome.value;
        assert_eq!(parsed.personal_info.last_name, None);
        assert_eq!(parsed.personal_info.email.as_deref(), Some("jane@x.com"));
        assert_eq!(parsed.professional_summary.experience_years, Some(6));
        assert_eq!(parsed.skills, vec!["Rust"]);
        assert_eq!(parsed.work_experience.len(), 1);
        assert!(parsed.work_experience[0].current);
        assert_eq!(parsed.education.len(), 1);
        assert_eq!(parsed.education[0].year.as_deref(), Some("2015"));
        assert_eq!(parsed.certifications.len(), 1);
    }

    #[tokio::test]
    async fn test_connection_failure_uses_regex_fallback() {
        let client = ScriptedClient::failing(|| LlmError::Connection("refused".into()));
        let outcome = parse_resume_structured(&client, RESUME).await;
        assert!(!outcome.generated_by_ai);
        assert_eq!(outcome.fallback_reason, Some(FailureKind::Connection));
        assert_eq!(
            outcome.value.personal_info.email.as_deref(),
            Some("jane.doe@example.com")
        );
        assert!(outcome.value.work_experience.is_empty());
    }
}
