//! Behavioural insights for a recorded video answer.
//!
//! The recording itself is not inspected; the model works from the interview context
//! and the result is stored alongside the upload.

use serde::{Deserialize, Serialize};

use crate::ai::fallback::{call_with_fallback, AiCall, AiOutcome, FailureKind};
use crate::ai::prompts::{VIDEO_PERSONA, VIDEO_PROMPT_TEMPLATE};
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::ChatCompletion;

const DEFAULT_SCORE: f64 = 75.0;

#[derive(Debug, Clone, Serialize)]
pub struct VideoInsights {
    pub confidence: f64,
    pub communication_style: String,
    pub insights: String,
    pub engagement_score: Option<f64>,
    pub professionalism_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VideoReply {
    confidence: Option<f64>,
    communication_style: Option<String>,
    insights: Option<String>,
    engagement_score: Option<f64>,
    professionalism_score: Option<f64>,
}

fn score(value: Option<f64>) -> f64 {
    value
        .filter(|v| v.is_finite())
        .unwrap_or(DEFAULT_SCORE)
        .clamp(0.0, 100.0)
}

fn unavailable(kind: FailureKind) -> VideoInsights {
    let insights = match kind {
        FailureKind::Timeout | FailureKind::Connection => {
            "Video analysis temporarily unavailable due to timeout. Please try again later."
        }
        _ => "Basic video analysis completed. For detailed insights, ensure proper API configuration.",
    };
    VideoInsights {
        confidence: 50.0,
        communication_style: "Standard".to_string(),
        insights: insights.to_string(),
        engagement_score: None,
        professionalism_score: None,
    }
}

pub async fn analyze_video_interview(
    client: &dyn ChatCompletion,
    interview_context: Option<&str>,
) -> AiOutcome<VideoInsights> {
    let system = system_prompt(VIDEO_PERSONA);
    let call = AiCall {
        feature: "video_analysis",
        system: &system,
        temperature: 0.3,
    };

    call_with_fallback(
        client,
        call,
        || {
            VIDEO_PROMPT_TEMPLATE.replace(
                "{context}",
                interview_context.unwrap_or("General interview assessment"),
            )
        },
        |reply: VideoReply| {
            Ok(VideoInsights {
                confidence: score(reply.confidence),
                communication_style: reply
                    .communication_style
                    .unwrap_or_else(|| "Professional".to_string()),
                insights: reply
                    .insights
                    .unwrap_or_else(|| "Video analysis completed successfully".to_string()),
                engagement_score: Some(score(reply.engagement_score)),
                professionalism_score: Some(score(reply.professionalism_score)),
            })
        },
        unavailable,
    )
    .await
}
