//! CV scoring across five weighted dimensions, with a keyword heuristic fallback.

use serde::{Deserialize, Serialize};

use crate::ai::fallback::{call_with_fallback, AiCall, AiOutcome, FailureKind};
use crate::ai::prompts::{CV_PERSONA, CV_PROMPT_TEMPLATE};
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::ChatCompletion;

const MIN_TEXT_CHARS: usize = 20;
/// Below this length the heuristic has too little to work with.
const MIN_HEURISTIC_CHARS: usize = 50;
const MAX_RECOMMENDATIONS: usize = 5;

const WEIGHT_FORMAT: f64 = 0.15;
const WEIGHT_CONTENT: f64 = 0.35;
const WEIGHT_SECTIONS: f64 = 0.20;
const WEIGHT_STYLE: f64 = 0.15;
const WEIGHT_KEYWORDS: f64 = 0.15;

const SECTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("Work Experience", &["experience", "work", "employment", "career", "professional", "job", "position"]),
    ("Education", &["education", "degree", "university", "college", "school", "certification", "qualification"]),
    ("Skills", &["skills", "competencies", "technical", "abilities", "proficient", "expertise"]),
    ("Contact Information", &["contact", "email", "phone", "@", "linkedin", "address", "mobile"]),
    ("Summary/Objective", &["summary", "objective", "profile", "about", "overview"]),
    ("Projects", &["projects", "portfolio", "development", "built", "created"]),
    ("Achievements", &["achievements", "awards", "recognition", "accomplishments"]),
    ("Certifications", &["certifications", "certified", "license", "credentials"]),
];

const QUANTIFIED: &[&str] = &["%", "$", "€", "£", "¥", "increased", "improved", "reduced", "achieved"];
const ACTION_VERBS: &[&str] = &["managed", "led", "developed", "implemented", "created", "designed", "coordinated"];
const TECHNICAL_SKILLS: &[&str] = &["python", "java", "javascript", "sql", "html", "css", "react", "angular", "node"];
const SOFT_SKILLS: &[&str] = &["leadership", "teamwork", "communication", "problem-solving", "analytical"];
const INDUSTRY_KEYWORDS: &[&str] = &[
    "management", "analysis", "development", "strategy", "operations", "marketing", "sales", "finance",
];
const BULLETS: &[char] = &['•', '-', '·', '→'];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedFeedback {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sections: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub keywords: String,
}

impl DetailedFeedback {
    fn uniform(text: &str) -> Self {
        Self {
            format: text.to_string(),
            content: text.to_string(),
            sections: text.to_string(),
            style: text.to_string(),
            keywords: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CvAnalysis {
    pub overall_score: u32,
    pub score_label: &'static str,
    pub format_score: u32,
    pub content_score: u32,
    pub sections_score: u32,
    pub style_score: u32,
    pub keywords_score: u32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub missing_sections: Vec<String>,
    pub format_issues: Vec<String>,
    pub content_suggestions: Vec<String>,
    pub keyword_gaps: Vec<String>,
    pub recommendations: Vec<String>,
    pub detailed_feedback: DetailedFeedback,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CvReply {
    #[serde(default)]
    format_score: f64,
    #[serde(default)]
    content_score: f64,
    #[serde(default)]
    sections_score: f64,
    #[serde(default)]
    style_score: f64,
    #[serde(default)]
    keywords_score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    missing_sections: Vec<String>,
    #[serde(default)]
    format_issues: Vec<String>,
    #[serde(default)]
    content_suggestions: Vec<String>,
    #[serde(default)]
    keyword_gaps: Vec<String>,
    #[serde(default)]
    detailed_feedback: DetailedFeedback,
}

pub fn score_label(score: u32) -> &'static str {
    match score {
        s if s >= 90 => "Excellent",
        s if s >= 80 => "Good",
        s if s >= 70 => "Fair",
        s if s >= 60 => "Needs Improvement",
        _ => "Poor",
    }
}

struct Scores {
    format: u32,
    content: u32,
    sections: u32,
    style: u32,
    keywords: u32,
}

impl Scores {
    fn uniform(value: u32) -> Self {
        Self {
            format: value,
            content: value,
            sections: value,
            style: value,
            keywords: value,
        }
    }

    fn weighted_overall(&self) -> u32 {
        let total = self.format as f64 * WEIGHT_FORMAT
            + self.content as f64 * WEIGHT_CONTENT
            + self.sections as f64 * WEIGHT_SECTIONS
            + self.style as f64 * WEIGHT_STYLE
            + self.keywords as f64 * WEIGHT_KEYWORDS;
        total.round() as u32
    }

    fn recommendations(&self, missing_sections: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        if self.format < 70 {
            out.push("Improve CV formatting with consistent fonts, spacing, and layout".to_string());
        }
        if self.content < 75 {
            out.push("Add more quantified achievements and specific impact statements".to_string());
        }
        if self.sections < 80 {
            out.push("Include missing essential sections and improve organization".to_string());
        }
        if self.style < 75 {
            out.push("Enhance professional language and fix grammar/spelling issues".to_string());
        }
        if self.keywords < 70 {
            out.push("Add more industry-relevant keywords and technical skills".to_string());
        }
        if !missing_sections.is_empty() {
            out.push(format!("Add these missing sections: {}", missing_sections.join(", ")));
        }
        out.truncate(MAX_RECOMMENDATIONS);
        out
    }
}

fn to_score(value: f64) -> u32 {
    if value.is_finite() {
        value.clamp(0.0, 100.0).round() as u32
    } else {
        0
    }
}

fn from_reply(reply: CvReply) -> CvAnalysis {
    let scores = Scores {
        format: to_score(reply.format_score),
        content: to_score(reply.content_score),
        sections: to_score(reply.sections_score),
        style: to_score(reply.style_score),
        keywords: to_score(reply.keywords_score),
    };
    let overall = scores.weighted_overall();
    CvAnalysis {
        overall_score: overall,
        score_label: score_label(overall),
        format_score: scores.format,
        content_score: scores.content,
        sections_score: scores.sections,
        style_score: scores.style,
        keywords_score: scores.keywords,
        recommendations: scores.recommendations(&reply.missing_sections),
        strengths: reply.strengths,
        weaknesses: reply.weaknesses,
        missing_sections: reply.missing_sections,
        format_issues: reply.format_issues,
        content_suggestions: reply.content_suggestions,
        keyword_gaps: reply.keyword_gaps,
        detailed_feedback: reply.detailed_feedback,
        error_message: None,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Section and keyword heuristic. Overall lands in [60, 85], dimensions in [50, 85].
pub fn basic_cv_analysis(cv_text: &str) -> CvAnalysis {
    let lower = cv_text.to_lowercase();
    let length = cv_text.chars().count();
    let mut scores = Scores::uniform(65);

    let sections_found: Vec<&str> = SECTION_KEYWORDS
        .iter()
        .filter(|(_, keywords)| contains_any(&lower, keywords))
        .map(|(section, _)| *section)
        .collect();
    scores.sections += 5 * sections_found.len() as u32;

    let has_quantified = contains_any(&lower, QUANTIFIED);
    let has_action_verbs = contains_any(&lower, ACTION_VERBS);
    for found in [
        has_quantified,
        has_action_verbs,
        contains_any(&lower, TECHNICAL_SKILLS),
        contains_any(&lower, SOFT_SKILLS),
    ] {
        if found {
            scores.content += 3;
        }
    }

    if length > 800 {
        scores.style += 5;
    }
    if length > 1500 {
        scores.style += 5;
    }
    if cv_text.contains(BULLETS) {
        scores.format += 5;
    }
    if cv_text.matches('\n').count() > 10 {
        scores.format += 5;
    }

    let keyword_count = INDUSTRY_KEYWORDS.iter().filter(|k| lower.contains(*k)).count() as u32;
    scores.keywords += (keyword_count * 2).min(15);

    let overall = (scores.format + scores.content + scores.sections + scores.style + scores.keywords) / 5;

    let mut strengths = vec!["CV successfully processed and analyzed".to_string()];
    let mut weaknesses = Vec::new();
    let mut recommendations = Vec::new();

    match sections_found.len() {
        n if n >= 4 => strengths.push(format!("Well-structured with {n} key sections")),
        n if n >= 2 => strengths.push(format!("Contains {n} essential sections")),
        _ => {
            weaknesses.push("Missing some standard CV sections".to_string());
            recommendations
                .push("Add missing sections like Work Experience, Education, or Skills".to_string());
        }
    }
    if length > 1000 {
        strengths.push("Comprehensive content length".to_string());
    } else if length < 500 {
        weaknesses.push("Content may be too brief".to_string());
        recommendations.push("Consider adding more detail to your experiences".to_string());
    }
    if has_quantified {
        strengths.push("Contains quantified achievements".to_string());
    } else {
        recommendations.push("Add specific metrics and achievements with numbers".to_string());
    }
    if has_action_verbs {
        strengths.push("Uses strong action verbs".to_string());
    } else {
        recommendations
            .push("Use more action verbs like \"managed\", \"developed\", \"implemented\"".to_string());
    }
    if recommendations.is_empty() {
        recommendations = vec![
            "Consider adding more specific achievements".to_string(),
            "Include relevant keywords for your industry".to_string(),
            "Ensure all sections are well-organized".to_string(),
        ];
    }
    recommendations.truncate(MAX_RECOMMENDATIONS);
    if weaknesses.is_empty() {
        weaknesses.push("No major issues detected".to_string());
    }

    let well_organized = sections_found.len() >= 4;
    let detailed_feedback = DetailedFeedback {
        format: format!(
            "Format analysis: {} sections detected. CV structure appears {}.",
            sections_found.len(),
            if well_organized { "well-organized" } else { "basic" }
        ),
        content: format!(
            "Content analysis: {length} characters. {}.",
            if length > 1000 {
                "Comprehensive content"
            } else {
                "Consider adding more detail"
            }
        ),
        sections: if sections_found.is_empty() {
            "Sections found: Limited sections detected".to_string()
        } else {
            format!("Sections found: {}", sections_found.join(", "))
        },
        style: format!(
            "Style analysis: {}",
            if length > 800 {
                "Professional presentation"
            } else {
                "Could benefit from more detail"
            }
        ),
        keywords: format!("Keywords analysis: {keyword_count} industry keywords detected"),
    };

    let overall = overall.clamp(60, 85);
    CvAnalysis {
        overall_score: overall,
        score_label: score_label(overall),
        format_score: scores.format.clamp(50, 85),
        content_score: scores.content.clamp(50, 85),
        sections_score: scores.sections.clamp(50, 85),
        style_score: scores.style.clamp(50, 85),
        keywords_score: scores.keywords.clamp(50, 85),
        strengths,
        weaknesses,
        missing_sections: Vec::new(),
        format_issues: Vec::new(),
        content_suggestions: Vec::new(),
        keyword_gaps: Vec::new(),
        recommendations,
        detailed_feedback,
        error_message: None,
    }
}

/// Canned analysis for unreadable input.
pub fn unavailable_analysis() -> CvAnalysis {
    CvAnalysis {
        overall_score: 65,
        score_label: score_label(65),
        format_score: 65,
        content_score: 65,
        sections_score: 65,
        style_score: 65,
        keywords_score: 65,
        strengths: vec![
            "CV successfully uploaded and processed".into(),
            "Document format is readable".into(),
            "Ready for professional review".into(),
        ],
        weaknesses: vec![
            "AI analysis currently unavailable".into(),
            "Unable to provide detailed scoring".into(),
        ],
        missing_sections: Vec::new(),
        format_issues: Vec::new(),
        content_suggestions: vec![
            "Try uploading again for detailed AI analysis".into(),
            "Consider manual review of CV content".into(),
        ],
        keyword_gaps: Vec::new(),
        recommendations: vec![
            "Upload your CV again for complete AI analysis".into(),
            "Review CV manually for completeness".into(),
            "Ensure all contact information is included".into(),
            "Add quantified achievements where possible".into(),
        ],
        detailed_feedback: DetailedFeedback {
            format: "CV format appears acceptable. For detailed analysis, please try again when AI services are available.".into(),
            content: "Content analysis unavailable. Ensure your CV includes work experience, education, and skills sections.".into(),
            sections: "Basic sections analysis unavailable. Check that your CV has standard sections like Experience, Education, Skills.".into(),
            style: "Style analysis unavailable. Ensure consistent formatting and professional language throughout.".into(),
            keywords: "Keyword analysis unavailable. Include relevant industry keywords and technical skills.".into(),
        },
        error_message: Some(
            "AI analysis temporarily unavailable. Your CV was processed successfully, but detailed analysis requires AI services. Please try again shortly.".into(),
        ),
    }
}

/// Fixed-score payload for transient failures.
fn transient_analysis(
    score: u32,
    strength: &str,
    weakness: &str,
    recommendation: &str,
    feedback: &str,
    message: &str,
) -> CvAnalysis {
    let scores = Scores::uniform(score);
    CvAnalysis {
        overall_score: score,
        score_label: score_label(score),
        format_score: scores.format,
        content_score: scores.content,
        sections_score: scores.sections,
        style_score: scores.style,
        keywords_score: scores.keywords,
        strengths: vec![strength.to_string()],
        weaknesses: vec![weakness.to_string()],
        missing_sections: Vec::new(),
        format_issues: Vec::new(),
        content_suggestions: Vec::new(),
        keyword_gaps: Vec::new(),
        recommendations: vec![recommendation.to_string()],
        detailed_feedback: DetailedFeedback::uniform(feedback),
        error_message: Some(message.to_string()),
    }
}

/// Maps a failure to its fallback analysis.
fn fallback_for(kind: FailureKind, cv_text: &str) -> CvAnalysis {
    match kind {
        FailureKind::RateLimited => transient_analysis(
            75,
            "CV submitted for analysis",
            "Analysis temporarily unavailable due to high demand",
            "Please try again in a few minutes for detailed AI analysis",
            "Analysis temporarily unavailable",
            "AI analysis temporarily unavailable due to high demand. Please try again in a few minutes.",
        ),
        FailureKind::Timeout => transient_analysis(
            70,
            "CV uploaded successfully",
            "AI analysis timed out - please try again",
            "Please try uploading again for detailed AI analysis",
            "Analysis timed out",
            "AI analysis timed out. Please try again.",
        ),
        FailureKind::Connection => transient_analysis(
            72,
            "CV uploaded and processed successfully",
            "Network connectivity issue prevented full AI analysis",
            "Please try again in a few moments for complete AI analysis",
            "Network issue prevented detailed analysis",
            "Network connection issue. Please try again for complete AI analysis.",
        ),
        FailureKind::NotConfigured => basic_cv_analysis(cv_text),
        FailureKind::Api | FailureKind::MalformedJson | FailureKind::EmptyResponse => {
            if cv_text.chars().count() > MIN_HEURISTIC_CHARS {
                let mut analysis = basic_cv_analysis(cv_text);
                analysis.error_message = Some(
                    "AI analysis encountered an error. Basic analysis provided instead.".to_string(),
                );
                analysis
            } else {
                unavailable_analysis()
            }
        }
    }
}

pub async fn analyze_cv(
    client: &dyn ChatCompletion,
    cv_text: &str,
    candidate_name: &str,
) -> AiOutcome<CvAnalysis> {
    if cv_text.trim().chars().count() < MIN_TEXT_CHARS {
        return AiOutcome {
            value: unavailable_analysis(),
            generated_by_ai: false,
            fallback_reason: None,
        };
    }

    let system = system_prompt(CV_PERSONA);
    let call = AiCall {
        feature: "cv_analysis",
        system: &system,
        temperature: 0.3,
    };

    call_with_fallback(
        client,
        call,
        || {
            CV_PROMPT_TEMPLATE
                .replace("{candidate_name}", candidate_name)
                .replace("{cv_text}", cv_text)
        },
        |reply: CvReply| Ok(from_reply(reply)),
        |kind| fallback_for(kind, cv_text),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::ScriptedClient;
    use crate::llm_client::LlmError;

    const CV: &str = "Jane Doe\nSummary: backend engineer\nEmail: jane@example.com\n\
        Experience\n• Led development of payments platform, increased throughput by 40%\n\
        Education\nBSc Computer Science, State University\n\
        Skills: Python, SQL, leadership, strategy, operations\n";

    #[test]
    fn test_score_labels() {
        assert_eq!(score_label(95), "Excellent");
        assert_eq!(score_label(80), "Good");
        assert_eq!(score_label(72), "Fair");
        assert_eq!(score_label(60), "Needs Improvement");
        assert_eq!(score_label(10), "Poor");
    }

    #[tokio::test]
    async fn test_ai_scores_are_weighted() {
        let client = ScriptedClient::replying(
            r#"{"format_score": 80, "content_score": 60, "sections_score": 90,
                "style_score": 80, "keywords_score": 100, "missing_sections": ["Projects"]}"#,
        );
        let outcome = analyze_cv(&client, CV, "Jane").await;
        assert!(outcome.generated_by_ai);
        // 12 + 21 + 18 + 12 + 15
        assert_eq!(outcome.value.overall_score, 78);
        assert_eq!(outcome.value.score_label, "Fair");
        let recs = &outcome.value.recommendations;
        assert!(recs.iter().any(|r| r.starts_with("Add more quantified")));
        assert!(!recs.iter().any(|r| r.starts_with("Enhance professional")));
        assert!(recs.contains(&"Add these missing sections: Projects".to_string()));
        assert!(!recs.iter().any(|r| r.starts_with("Improve CV formatting")));
    }

    #[tokio::test]
    async fn test_short_text_skips_the_model() {
        let client = ScriptedClient::replying("{}");
        let outcome = analyze_cv(&client, "too short", "Jane").await;
        assert!(!outcome.generated_by_ai);
        assert_eq!(outcome.value.overall_score, 65);
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failures_use_fixed_scores() {
        let cases: [(fn() -> LlmError, u32); 3] = [
            (|| LlmError::RateLimited { retries: 3 }, 75),
            (|| LlmError::Timeout, 70),
            (|| LlmError::Connection("reset".into()), 72),
        ];
        for (make, expected) in cases {
            let outcome = analyze_cv(&ScriptedClient::failing(make), CV, "Jane").await;
            assert_eq!(outcome.value.overall_score, expected);
            assert_eq!(outcome.value.keywords_score, expected);
            assert!(outcome.value.error_message.is_some());
        }
    }

    #[tokio::test]
    async fn test_malformed_reply_uses_heuristic_with_message() {
        let outcome = analyze_cv(&ScriptedClient::replying("[[["), CV, "Jane").await;
        assert_eq!(
            outcome.value.error_message.as_deref(),
            Some("AI analysis encountered an error. Basic analysis provided instead.")
        );
        assert!(outcome.value.strengths.contains(&"Contains quantified achievements".to_string()));
    }

    #[test]
    fn test_basic_analysis_bounds() {
        let analysis = basic_cv_analysis(CV);
        assert!((60..=85).contains(&analysis.overall_score));
        for s in [
            analysis.format_score,
            analysis.content_score,
            analysis.sections_score,
            analysis.style_score,
            analysis.keywords_score,
        ] {
            assert!((50..=85).contains(&s));
        }
        assert!(analysis.detailed_feedback.sections.contains("Education"));
        assert!(analysis.weaknesses.contains(&"Content may be too brief".to_string()));

        let sparse = basic_cv_analysis(&"x".repeat(100));
        assert_eq!(sparse.weaknesses[0], "Missing some standard CV sections");
        assert_eq!(sparse.overall_score, 65);
    }
}
