//! Star-rating sentiment for free text (interview answers, feedback notes).

use serde::{Deserialize, Serialize};

use crate::ai::fallback::{call_with_fallback, AiCall, AiOutcome, FailureKind};
use crate::ai::prompts::SENTIMENT_PERSONA;
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::ChatCompletion;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sentiment {
    /// 1 to 5 stars.
    pub rating: u8,
    /// 0.0 to 1.0.
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
struct SentimentReply {
    rating: f64,
    confidence: f64,
}

fn neutral(kind: FailureKind) -> Sentiment {
    let confidence = match kind {
        FailureKind::Timeout | FailureKind::Connection => 0.3,
        _ => 0.5,
    };
    Sentiment {
        rating: 3,
        confidence,
    }
}

pub async fn analyze_sentiment(client: &dyn ChatCompletion, text: &str) -> AiOutcome<Sentiment> {
    let system = system_prompt(SENTIMENT_PERSONA);
    let call = AiCall {
        feature: "sentiment",
        system: &system,
        temperature: 0.0,
    };

    call_with_fallback(
        client,
        call,
        || text.to_string(),
        |reply: SentimentReply| {
            if !reply.rating.is_finite() || !reply.confidence.is_finite() {
                return Err("non-numeric sentiment".to_string());
            }
            Ok(Sentiment {
                rating: reply.rating.round().clamp(1.0, 5.0) as u8,
                confidence: reply.confidence.clamp(0.0, 1.0),
            })
        },
        neutral,
    )
    .await
}
