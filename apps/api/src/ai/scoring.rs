//! Scoring of completed interview answers.

use serde::{Deserialize, Serialize};

use crate::ai::fallback::{call_with_fallback, AiCall, AiOutcome, FailureKind};
use crate::ai::prompts::{SCORING_PERSONA, SCORING_PROMPT_TEMPLATE};
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::ChatCompletion;
use crate::models::interview::AnswerRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryScores {
    #[serde(default)]
    pub experience: f64,
    #[serde(default)]
    pub communication: f64,
    #[serde(default)]
    pub problem_solving: f64,
    #[serde(default)]
    pub technical_skills: f64,
    #[serde(default)]
    pub cultural_fit: f64,
}

#[derive(Debug, Deserialize)]
struct ScoringReply {
    overall_score: f64,
    #[serde(default)]
    category_scores: Option<CategoryScores>,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    recommendation: Option<String>,
}

/// Score in [0, 100] plus the human-readable feedback stored on the response row.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub score: f64,
    pub feedback: String,
    pub recommendation: Option<String>,
    pub category_scores: Option<CategoryScores>,
}

/// "no_hire" -> "No Hire".
fn title_case(value: &str) -> String {
    value
        .replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_feedback(score: f64, reply: &ScoringReply) -> String {
    let recommendation = reply
        .recommendation
        .as_deref()
        .map(title_case)
        .unwrap_or_else(|| "N/A".to_string());

    let mut parts = vec![
        format!("Overall Score: {score}/100"),
        format!("Recommendation: {recommendation}"),
        "\nDetailed Feedback:".to_string(),
        reply
            .feedback
            .clone()
            .unwrap_or_else(|| "No detailed feedback available.".to_string()),
    ];
    if !reply.strengths.is_empty() {
        parts.push("\nStrengths:".to_string());
        parts.extend(reply.strengths.iter().map(|s| format!("• {s}")));
    }
    if !reply.improvements.is_empty() {
        parts.push("\nAreas for Improvement:".to_string());
        parts.extend(reply.improvements.iter().map(|s| format!("• {s}")));
    }
    parts.join("\n")
}

/// Length heuristic used when the model is unavailable. Always within [20, 90].
pub fn basic_evaluation(answers: &[AnswerRecord], reason: FailureKind) -> ScoreResult {
    let total: usize = answers.iter().map(|a| a.answer.chars().count()).sum();
    let avg_len = if answers.is_empty() {
        0.0
    } else {
        total as f64 / answers.len() as f64
    };

    let mut base = (avg_len / 10.0).clamp(20.0, 80.0);
    if avg_len > 100.0 {
        base += 10.0;
    }

    let complete = answers.iter().all(|a| !a.answer.trim().is_empty());
    let note = match reason {
        FailureKind::NotConfigured => {
            "This is a basic evaluation because AI scoring is not configured on this server."
        }
        _ => "This is a basic evaluation as our AI scoring system is currently unavailable.",
    };

    let feedback = format!(
        "Basic Evaluation Score: {base:.1}/100\n\n\
         {note}\n\n\
         Response Analysis:\n\
         - Average response length: {avg_len:.0} characters\n\
         - Total responses: {count}\n\
         - Completion rate: {completion}",
        count = answers.len(),
        completion = if complete { "Complete" } else { "Incomplete" },
    );

    ScoreResult {
        score: base,
        feedback,
        recommendation: None,
        category_scores: None,
    }
}

pub async fn score_interview_responses(
    client: &dyn ChatCompletion,
    answers: &[AnswerRecord],
    job_description: &str,
) -> AiOutcome<ScoreResult> {
    let system = system_prompt(SCORING_PERSONA);
    let call = AiCall {
        feature: "interview_scoring",
        system: &system,
        temperature: 0.3,
    };

    call_with_fallback(
        client,
        call,
        || {
            let transcript: String = answers
                .iter()
                .map(|a| format!("Q: {}\nA: {}\n\n", a.question, a.answer))
                .collect();
            SCORING_PROMPT_TEMPLATE
                .replace("{job_description}", job_description)
                .replace("{answers}", &transcript)
        },
        |reply: ScoringReply| {
            if !reply.overall_score.is_finite() {
                return Err("overall_score is not a number".to_string());
            }
            let score = reply.overall_score.clamp(0.0, 100.0);
            Ok(ScoreResult {
                score,
                feedback: format_feedback(score, &reply),
                recommendation: reply.recommendation.clone(),
                category_scores: reply.category_scores.clone(),
            })
        },
        |kind| basic_evaluation(answers, kind),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::ScriptedClient;
    use crate::llm_client::LlmError;

    fn answers(lengths: &[usize]) -> Vec<AnswerRecord> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, len)| AnswerRecord {
                question: format!("Question {i}"),
                answer: "a".repeat(*len),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_timeout_yields_basic_evaluation_in_range() {
        let client = ScriptedClient::failing(|| LlmError::Timeout);
        for lengths in [vec![], vec![0, 0], vec![50, 150], vec![2000, 3000]] {
            let outcome = score_interview_responses(&client, &answers(&lengths), "Backend").await;
            assert!(!outcome.generated_by_ai);
            assert!(outcome.value.feedback.contains("Basic Evaluation Score"));
            assert!((20.0..=90.0).contains(&outcome.value.score));
        }
    }

    #[test]
    fn test_basic_evaluation_bonus_for_long_answers() {
        let result = basic_evaluation(&answers(&[300, 300]), FailureKind::Connection);
        // 300 / 10 = 30, plus the detail bonus
        assert_eq!(result.score, 40.0);
        assert!(result.feedback.contains("Average response length: 300 characters"));
        assert!(result.feedback.contains("Completion rate: Complete"));
    }

    #[test]
    fn test_basic_evaluation_flags_blank_answers() {
        let result = basic_evaluation(&answers(&[120, 0]), FailureKind::Timeout);
        assert!(result.feedback.contains("Completion rate: Incomplete"));
        assert_eq!(result.score, 20.0);
    }

    #[tokio::test]
    async fn test_ai_reply_is_clamped_and_formatted() {
        let client = ScriptedClient::replying(
            r#"{"overall_score": 140, "feedback": "Solid answers.", "strengths": ["clear"],
                "improvements": ["depth"], "recommendation": "no_hire"}"#,
        );
        let outcome = score_interview_responses(&client, &answers(&[40]), "Backend").await;
        assert!(outcome.generated_by_ai);
        assert_eq!(outcome.value.score, 100.0);
        let feedback = &outcome.value.feedback;
        assert!(feedback.starts_with("Overall Score: 100/100"));
        assert!(feedback.contains("Recommendation: No Hire"));
        assert!(feedback.contains("• clear"));
        assert!(feedback.contains("\nAreas for Improvement:\n• depth"));
    }

    fn keys(result: &ScoreResult) -> Vec<String> {
        let value = serde_json::to_value(result).unwrap();
        let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_fallback_serializes_the_same_fields_as_ai_scoring() {
        let ai = ScriptedClient::replying(
            r#"{"overall_score": 72, "recommendation": "hire",
                "category_scores": {"experience": 70, "communication": 80}}"#,
        );
        let scored = score_interview_responses(&ai, &answers(&[80]), "Backend").await;
        assert!(scored.generated_by_ai);

        let fallback = score_interview_responses(
            &ScriptedClient::failing(|| LlmError::Timeout),
            &answers(&[80]),
            "Backend",
        )
        .await;
        assert!(!fallback.generated_by_ai);

        let expected = ["category_scores", "feedback", "recommendation", "score"];
        assert_eq!(keys(&scored.value), expected);
        assert_eq!(keys(&fallback.value), expected);

        let json = serde_json::to_value(&fallback.value).unwrap();
        assert!(json["recommendation"].is_null());
        assert!(json["category_scores"].is_null());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hire"), "Hire");
        assert_eq!(title_case("no_hire"), "No Hire");
    }
}
