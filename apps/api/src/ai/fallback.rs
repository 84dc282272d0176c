//! The one place where AI failures become fallback values.
//!
//! Every AI feature calls [`call_with_fallback`] with a prompt builder, a parser for the
//! model's JSON and a fallback producer. The caller always gets a value of the same shape;
//! the outcome records whether it came from the model and, if not, why.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::llm_client::{call_json, ChatCompletion, ChatRequest, LlmError};

/// Why an AI call fell back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotConfigured,
    Connection,
    Timeout,
    RateLimited,
    MalformedJson,
    EmptyResponse,
    Api,
}

impl FailureKind {
    pub fn classify(err: &LlmError) -> Self {
        match err {
            LlmError::NotConfigured => FailureKind::NotConfigured,
            LlmError::Connection(_) | LlmError::Http(_) => FailureKind::Connection,
            LlmError::Timeout => FailureKind::Timeout,
            LlmError::RateLimited { .. } => FailureKind::RateLimited,
            LlmError::Api { status: 429, .. } => FailureKind::RateLimited,
            LlmError::Api { .. } => FailureKind::Api,
            LlmError::Parse(_) => FailureKind::MalformedJson,
            LlmError::EmptyContent => FailureKind::EmptyResponse,
        }
    }

    /// User-facing explanation attached to fallback payloads.
    pub fn message(&self) -> &'static str {
        match self {
            FailureKind::NotConfigured => "AI analysis is not configured on this server",
            FailureKind::Connection => "AI service could not be reached",
            FailureKind::Timeout => "AI service timed out",
            FailureKind::RateLimited => "AI service rate limit reached",
            FailureKind::MalformedJson => "AI service returned an unreadable response",
            FailureKind::EmptyResponse => "AI service returned an empty response",
            FailureKind::Api => "AI service returned an error",
        }
    }
}

/// Result of an AI feature call: always a value, plus its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct AiOutcome<T> {
    #[serde(flatten)]
    pub value: T,
    pub generated_by_ai: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FailureKind>,
}

impl<T> AiOutcome<T> {
    pub fn from_ai(value: T) -> Self {
        Self {
            value,
            generated_by_ai: true,
            fallback_reason: None,
        }
    }

    pub fn from_fallback(value: T, reason: FailureKind) -> Self {
        Self {
            value,
            generated_by_ai: false,
            fallback_reason: Some(reason),
        }
    }
}

/// Static parameters of one AI feature.
#[derive(Debug, Clone, Copy)]
pub struct AiCall<'a> {
    pub feature: &'static str,
    pub system: &'a str,
    pub temperature: f32,
}

/// Calls the model with the built prompt, parses the reply into `R`, converts it with
/// `parse`, and substitutes `fallback` on any failure. Never returns an error.
pub async fn call_with_fallback<R, T>(
    client: &dyn ChatCompletion,
    call: AiCall<'_>,
    build_prompt: impl FnOnce() -> String,
    parse: impl FnOnce(R) -> Result<T, String>,
    fallback: impl FnOnce(FailureKind) -> T,
) -> AiOutcome<T>
where
    R: DeserializeOwned,
{
    let prompt = build_prompt();
    let request = ChatRequest {
        system: call.system,
        prompt: &prompt,
        temperature: call.temperature,
    };

    let kind = match call_json::<R>(client, request).await {
        Ok(reply) => match parse(reply) {
            Ok(value) => {
                debug!(feature = call.feature, "AI call succeeded");
                return AiOutcome::from_ai(value);
            }
            Err(reason) => {
                warn!(
                    feature = call.feature,
                    "AI reply failed validation, using fallback: {reason}"
                );
                FailureKind::MalformedJson
            }
        },
        Err(err) => {
            let kind = FailureKind::classify(&err);
            match kind {
                FailureKind::NotConfigured => {
                    debug!(feature = call.feature, "AI disabled, using fallback")
                }
                _ => warn!(feature = call.feature, "AI call failed, using fallback: {err}"),
            }
            kind
        }
    };

    AiOutcome::from_fallback(fallback(kind), kind)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::llm_client::mock::ScriptedClient;

    #[derive(Debug, Deserialize)]
    struct Reply {
        value: i64,
    }

    const CALL: AiCall<'static> = AiCall {
        feature: "test",
        system: "system",
        temperature: 0.0,
    };

    async fn run(client: &ScriptedClient) -> AiOutcome<i64> {
        call_with_fallback::<Reply, i64>(
            client,
            CALL,
            || "prompt".to_string(),
            |r| {
                if r.value >= 0 {
                    Ok(r.value)
                } else {
                    Err("negative".into())
                }
            },
            |_| -1,
        )
        .await
    }

    #[tokio::test]
    async fn test_success_path_is_marked_ai() {
        let outcome = run(&ScriptedClient::replying(r#"{"value": 7}"#)).await;
        assert_eq!(outcome.value, 7);
        assert!(outcome.generated_by_ai);
        assert!(outcome.fallback_reason.is_none());
    }

    #[tokio::test]
    async fn test_each_failure_kind_falls_back() {
        let cases: [(fn() -> LlmError, FailureKind); 6] = [
            (|| LlmError::Timeout, FailureKind::Timeout),
            (
                || LlmError::Connection("refused".into()),
                FailureKind::Connection,
            ),
            (
                || LlmError::RateLimited { retries: 3 },
                FailureKind::RateLimited,
            ),
            (|| LlmError::EmptyContent, FailureKind::EmptyResponse),
            (|| LlmError::NotConfigured, FailureKind::NotConfigured),
            (
                || LlmError::Api {
                    status: 400,
                    message: "bad".into(),
                },
                FailureKind::Api,
            ),
        ];
        for (make, expected) in cases {
            let outcome = run(&ScriptedClient::failing(make)).await;
            assert_eq!(outcome.value, -1);
            assert!(!outcome.generated_by_ai);
            assert_eq!(outcome.fallback_reason, Some(expected));
        }
    }

    #[tokio::test]
    async fn test_malformed_and_invalid_replies_fall_back() {
        let outcome = run(&ScriptedClient::replying("{oops")).await;
        assert_eq!(outcome.fallback_reason, Some(FailureKind::MalformedJson));

        let outcome = run(&ScriptedClient::replying(r#"{"value": -5}"#)).await;
        assert_eq!(outcome.value, -1);
        assert_eq!(outcome.fallback_reason, Some(FailureKind::MalformedJson));
    }

    #[test]
    fn test_outcome_serializes_flat() {
        #[derive(Serialize)]
        struct Payload {
            score: u8,
        }
        let json =
            serde_json::to_value(AiOutcome::from_fallback(Payload { score: 3 }, FailureKind::Timeout))
                .unwrap();
        assert_eq!(json["score"], 3);
        assert_eq!(json["generated_by_ai"], false);
        assert_eq!(json["fallback_reason"], "timeout");
    }
}
