//! Cover letter generation and review, with company- and role-specific templates.

use serde::{Deserialize, Serialize};

use crate::ai::fallback::{call_with_fallback, AiCall, AiOutcome};
use crate::ai::prompts::{
    COVER_LETTER_PERSONA, COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_REVIEW_PERSONA,
    COVER_LETTER_REVIEW_TEMPLATE,
};
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::{ChatCompletion, MODEL};
use crate::models::user::{Education, WorkExperience};

pub struct CompanyTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub culture: &'static str,
    pub values: &'static str,
    pub focus_areas: &'static [&'static str],
    pub keywords: &'static [&'static str],
}

pub struct RoleTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub key_skills: &'static [&'static str],
    pub focus_areas: &'static [&'static str],
    pub responsibilities: &'static [&'static str],
}

pub const COMPANY_TEMPLATES: &[CompanyTemplate] = &[
    CompanyTemplate {
        key: "google",
        name: "Google",
        culture: "Innovation, data-driven decisions, technical excellence",
        values: "Don't be evil, user focus, think big",
        focus_areas: &["technical innovation", "scale impact", "data-driven approach", "user experience"],
        keywords: &["innovation", "scale", "impact", "technology", "users", "data", "collaboration"],
    },
    CompanyTemplate {
        key: "amazon",
        name: "Amazon",
        culture: "Customer obsession, ownership, high standards",
        values: "Customer obsession, ownership, invent and simplify, bias for action",
        focus_areas: &["customer obsession", "ownership", "results delivery", "innovation"],
        keywords: &["customer obsession", "ownership", "deliver results", "think big", "dive deep"],
    },
    CompanyTemplate {
        key: "tesla",
        name: "Tesla",
        culture: "Sustainable energy, innovation, fast-paced environment",
        values: "Sustainable future, innovation, excellence, speed",
        focus_areas: &["sustainable energy", "innovation", "manufacturing excellence", "mission-driven"],
        keywords: &["sustainable", "innovation", "excellence", "mission", "future", "technology"],
    },
    CompanyTemplate {
        key: "meta",
        name: "Meta",
        culture: "Connect people, move fast, build social technology",
        values: "Move fast, be bold, focus on impact, be open",
        focus_areas: &["social connection", "global impact", "technology innovation", "community building"],
        keywords: &["connect", "community", "impact", "innovation", "global", "social", "technology"],
    },
    CompanyTemplate {
        key: "microsoft",
        name: "Microsoft",
        culture: "Empower every person and organization, inclusive, growth mindset",
        values: "Respect, integrity, accountability, inclusive",
        focus_areas: &["empowerment", "productivity", "cloud technology", "accessibility"],
        keywords: &["empower", "productivity", "cloud", "collaboration", "accessibility", "innovation"],
    },
];

pub const ROLE_TEMPLATES: &[RoleTemplate] = &[
    RoleTemplate {
        key: "frontend_developer",
        name: "Frontend Developer",
        key_skills: &["React", "JavaScript", "CSS", "HTML", "Vue.js", "Angular"],
        focus_areas: &["user experience", "responsive design", "performance optimization", "accessibility"],
        responsibilities: &["UI development", "cross-browser compatibility", "performance optimization"],
    },
    RoleTemplate {
        key: "backend_developer",
        name: "Backend Developer",
        key_skills: &["Python", "Java", "Node.js", "databases", "APIs", "cloud platforms"],
        focus_areas: &["system architecture", "scalability", "data management", "API design"],
        responsibilities: &["server-side development", "database design", "API development"],
    },
    RoleTemplate {
        key: "product_manager",
        name: "Product Manager",
        key_skills: &["product strategy", "user research", "data analysis", "project management"],
        focus_areas: &["product vision", "user needs", "market analysis", "stakeholder management"],
        responsibilities: &["product roadmap", "requirements gathering", "cross-functional collaboration"],
    },
    RoleTemplate {
        key: "data_scientist",
        name: "Data Scientist",
        key_skills: &["Python", "R", "machine learning", "statistics", "SQL", "data visualization"],
        focus_areas: &["data analysis", "machine learning", "statistical modeling", "insights generation"],
        responsibilities: &["data analysis", "model building", "business insights"],
    },
    RoleTemplate {
        key: "devops_engineer",
        name: "DevOps Engineer",
        key_skills: &["CI/CD", "Docker", "Kubernetes", "AWS", "automation", "monitoring"],
        focus_areas: &["infrastructure automation", "deployment pipelines", "system reliability"],
        responsibilities: &["infrastructure management", "deployment automation", "monitoring"],
    },
];

fn company_template(key: &str) -> Option<&'static CompanyTemplate> {
    COMPANY_TEMPLATES.iter().find(|t| t.key == key)
}

fn role_template(key: &str) -> Option<&'static RoleTemplate> {
    ROLE_TEMPLATES.iter().find(|t| t.key == key)
}

pub fn is_known_template(key: &str) -> bool {
    key == "custom" || company_template(key).is_some() || role_template(key).is_some()
}

/// Guidance block injected into the generation prompt.
fn template_guidance(template_type: &str) -> String {
    if let Some(t) = company_template(template_type) {
        format!(
            "Company-Specific Guidelines for {}:\n- Culture: {}\n- Values: {}\n- Focus on: {}\n- Key words to incorporate: {}",
            t.name,
            t.culture,
            t.values,
            t.focus_areas.join(", "),
            t.keywords.join(", ")
        )
    } else if let Some(t) = role_template(template_type) {
        format!(
            "Role-Specific Guidelines for {}:\n- Key skills to highlight: {}\n- Focus areas: {}\n- Typical responsibilities: {}",
            t.name,
            t.key_skills.join(", "),
            t.focus_areas.join(", "),
            t.responsibilities.join(", ")
        )
    } else {
        "General Guidelines:\n- Focus on: relevant experience, skills alignment, company interest\n\
         - Key words to incorporate: experience, skills, contribution, growth, opportunity"
            .to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidateInfo {
    pub name: String,
    pub skills: Vec<String>,
    pub experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobDetails {
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverLetterDraft {
    pub content: String,
    pub title: String,
    pub key_points: Vec<String>,
    pub suggestions: Vec<String>,
    pub template_type: String,
    pub generation_model: String,
}

#[derive(Debug, Deserialize)]
struct GenerationReply {
    cover_letter: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

fn default_title(job: &JobDetails) -> String {
    format!("Cover Letter - {}", job.company)
}

/// Template letter used whenever the model is unavailable.
fn template_letter(candidate: &CandidateInfo, job: &JobDetails, template_type: &str) -> CoverLetterDraft {
    let name = &candidate.name;
    let position = &job.position;
    let content = match company_template(template_type) {
        Some(t) => format!(
            "Dear Hiring Manager,\n\n\
             I am writing to express my strong interest in the {position} position at {company}. \
             Your company's commitment to {culture} aligns perfectly with my professional values and career aspirations.\n\n\
             In my previous experience, I have developed skills that directly relate to {company}'s focus on {focus}. \
             I am particularly drawn to your company's mission and would welcome the opportunity to contribute to your team's continued success.\n\n\
             I am excited about the possibility of bringing my experience to {company} and would appreciate the opportunity \
             to discuss how my background can contribute to your team's goals.\n\n\
             Thank you for considering my application. I look forward to hearing from you.\n\n\
             Sincerely,\n{name}",
            company = t.name,
            culture = t.culture,
            focus = t.focus_areas[..2].join(", "),
        ),
        None => format!(
            "Dear Hiring Manager,\n\n\
             I am writing to express my interest in the {position} position at {company}. \
             Your company's reputation and the opportunity to contribute to your team's success strongly appeal to me.\n\n\
             My background and experience have prepared me well for this role, and I am confident that my skills \
             would be valuable to your organization. I am particularly excited about the opportunity to grow and contribute in this position.\n\n\
             I would welcome the opportunity to discuss how my experience and enthusiasm can benefit your team. \
             Thank you for considering my application.\n\n\
             Sincerely,\n{name}",
            company = job.company,
        ),
    };

    CoverLetterDraft {
        content,
        title: default_title(job),
        key_points: vec![
            "Relevant experience".into(),
            "Company alignment".into(),
            "Growth opportunity".into(),
        ],
        suggestions: vec![
            "Customize with specific examples".into(),
            "Research company values".into(),
            "Add quantifiable achievements".into(),
        ],
        template_type: template_type.to_string(),
        generation_model: "template".to_string(),
    }
}

pub async fn generate_cover_letter(
    client: &dyn ChatCompletion,
    candidate: &CandidateInfo,
    job: &JobDetails,
    template_type: &str,
    tone: &str,
) -> AiOutcome<CoverLetterDraft> {
    let system = system_prompt(COVER_LETTER_PERSONA);
    let call = AiCall {
        feature: "cover_letter",
        system: &system,
        temperature: 0.7,
    };

    call_with_fallback(
        client,
        call,
        || {
            let or_missing = |json: String, empty: bool| {
                if empty {
                    "Not provided".to_string()
                } else {
                    json
                }
            };
            COVER_LETTER_PROMPT_TEMPLATE
                .replace("{name}", &candidate.name)
                .replace("{skills}", &candidate.skills.join(", "))
                .replace(
                    "{experience}",
                    &or_missing(
                        serde_json::to_string(&candidate.experience).unwrap_or_default(),
                        candidate.experience.is_empty(),
                    ),
                )
                .replace(
                    "{education}",
                    &or_missing(
                        serde_json::to_string(&candidate.education).unwrap_or_default(),
                        candidate.education.is_empty(),
                    ),
                )
                .replace("{company}", &job.company)
                .replace("{position}", &job.position)
                .replace("{requirements}", &job.requirements)
                .replace("{description}", &job.description)
                .replace("{guidance}", &template_guidance(template_type))
                .replace("{tone}", tone)
        },
        |reply: GenerationReply| {
            if reply.cover_letter.trim().is_empty() {
                return Err("cover_letter is empty".to_string());
            }
            Ok(CoverLetterDraft {
                content: reply.cover_letter,
                title: reply.title.unwrap_or_else(|| default_title(job)),
                key_points: reply.key_points,
                suggestions: reply.suggestions,
                template_type: template_type.to_string(),
                generation_model: MODEL.to_string(),
            })
        },
        |_| template_letter(candidate, job, template_type),
    )
    .await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverLetterAnalysis {
    pub overall_score: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub alignment_score: u8,
    #[serde(default)]
    pub missing_elements: Vec<String>,
    #[serde(default)]
    pub tone_assessment: String,
    #[serde(default)]
    pub structure_feedback: String,
}

/// Greeting, closing and length checks used without the model. Score capped at 95.
pub fn basic_cover_letter_analysis(text: &str) -> CoverLetterAnalysis {
    let words = text.split_whitespace().count();
    let lower = text.to_lowercase();
    let has_greeting = ["dear", "hello", "hi"].iter().any(|g| lower.contains(g));
    let has_closing = ["sincerely", "regards", "thank you"]
        .iter()
        .any(|c| lower.contains(c));
    let good_length = (200..=400).contains(&words);

    let mut score: u8 = 60;
    if has_greeting {
        score += 10;
    }
    if has_closing {
        score += 10;
    }
    if good_length {
        score += 15;
    }
    if words > 100 {
        score += 5;
    }

    CoverLetterAnalysis {
        overall_score: score.min(95),
        strengths: vec![if good_length {
            "Appropriate length".into()
        } else {
            "Content provided".into()
        }],
        weaknesses: vec!["Consider AI analysis for detailed feedback".into()],
        suggestions: vec!["Use AI-powered analysis for comprehensive feedback".into()],
        alignment_score: 70,
        missing_elements: vec!["Requires detailed analysis".into()],
        tone_assessment: "Unable to assess without AI".into(),
        structure_feedback: format!("Word count: {words} words"),
    }
}

pub async fn analyze_cover_letter(
    client: &dyn ChatCompletion,
    text: &str,
    requirements: &str,
) -> AiOutcome<CoverLetterAnalysis> {
    let system = system_prompt(COVER_LETTER_REVIEW_PERSONA);
    let call = AiCall {
        feature: "cover_letter_review",
        system: &system,
        temperature: 0.3,
    };

    call_with_fallback(
        client,
        call,
        || {
            COVER_LETTER_REVIEW_TEMPLATE
                .replace("{cover_letter}", text)
                .replace("{requirements}", requirements)
        },
        |mut reply: CoverLetterAnalysis| {
            reply.overall_score = reply.overall_score.min(100);
            reply.alignment_score = reply.alignment_score.min(100);
            Ok(reply)
        },
        |_| basic_cover_letter_analysis(text),
    )
    .await
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub key: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: String,
    pub focus: Vec<&'static str>,
    pub category: &'static str,
}

pub fn available_templates() -> Vec<TemplateSummary> {
    let companies = COMPANY_TEMPLATES.iter().map(|t| TemplateSummary {
        key: t.key,
        name: t.name,
        kind: "company",
        description: format!("Optimized for {} culture and values", t.name),
        focus: t.focus_areas.iter().take(3).copied().collect(),
        category: "Company-Specific",
    });
    let roles = ROLE_TEMPLATES.iter().map(|t| TemplateSummary {
        key: t.key,
        name: t.name,
        kind: "role",
        description: format!("Tailored for {} positions", t.name),
        focus: t.focus_areas.iter().take(3).copied().collect(),
        category: "Role-Specific",
    });
    companies.chain(roles).collect()
}
