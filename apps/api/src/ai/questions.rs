//! Interview question generation.

use serde::{Deserialize, Serialize};

use crate::ai::fallback::{call_with_fallback, AiCall, AiOutcome};
use crate::ai::prompts::{QUESTIONS_PERSONA, QUESTIONS_PROMPT_TEMPLATE};
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::ChatCompletion;
use crate::models::interview::InterviewQuestion;

pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 10;
pub const DEFAULT_QUESTIONS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<InterviewQuestion>,
}

fn question(text: &str, category: &str, keywords: &[&str]) -> InterviewQuestion {
    InterviewQuestion {
        text: text.to_string(),
        question_type: "text".to_string(),
        category: category.to_string(),
        expected_keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

/// The static question bank used for padding and as the fallback.
pub fn fallback_questions() -> Vec<InterviewQuestion> {
    vec![
        question(
            "Tell me about your relevant experience for this role.",
            "experience",
            &["experience", "skills", "background"],
        ),
        question(
            "Describe a challenging problem you solved and how you approached it.",
            "problem-solving",
            &["problem", "solution", "approach", "challenge"],
        ),
        question(
            "What interests you most about this position and our company?",
            "motivation",
            &["interest", "motivation", "company", "role"],
        ),
        question(
            "How do you handle working under pressure or tight deadlines?",
            "behavioral",
            &["pressure", "deadlines", "stress", "management"],
        ),
        question(
            "Where do you see yourself in your career in the next 3-5 years?",
            "goals",
            &["career", "goals", "future", "growth"],
        ),
    ]
}

/// Pads a short AI list from the bank (by position) and trims a long one to `n`.
fn fit_to_count(mut questions: Vec<InterviewQuestion>, n: usize) -> Vec<InterviewQuestion> {
    if questions.len() < n {
        let bank = fallback_questions();
        let missing = bank.into_iter().skip(questions.len()).take(n - questions.len());
        questions.extend(missing);
    }
    questions.truncate(n);
    questions
}

pub async fn generate_interview_questions(
    client: &dyn ChatCompletion,
    job_title: &str,
    job_description: &str,
    n: usize,
) -> AiOutcome<QuestionSet> {
    let n = n.clamp(MIN_QUESTIONS, MAX_QUESTIONS);
    let system = system_prompt(QUESTIONS_PERSONA);
    let call = AiCall {
        feature: "interview_questions",
        system: &system,
        temperature: 0.7,
    };

    call_with_fallback(
        client,
        call,
        || {
            QUESTIONS_PROMPT_TEMPLATE
                .replace("{num_questions}", &n.to_string())
                .replace("{job_title}", job_title)
                .replace("{job_description}", job_description)
        },
        |reply: QuestionSet| {
            let questions: Vec<InterviewQuestion> = reply
                .questions
                .into_iter()
                .filter(|q| !q.text.trim().is_empty())
                .collect();
            if questions.is_empty() {
                return Err("no questions in reply".to_string());
            }
            Ok(QuestionSet {
                questions: fit_to_count(questions, n),
            })
        },
        |_| {
            let mut questions = fallback_questions();
            questions.truncate(n);
            QuestionSet { questions }
        },
    )
    .await
}
