//! Success envelope shared by all JSON handlers: `{ "success": true, ...payload }`.
//!
//! Errors use the matching `{ "success": false, "error", "code" }` shape from
//! [`crate::errors::AppError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Flattens `data` next to `"success": true`. `T` must serialize as a map.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }

    /// 201 with the same envelope.
    pub fn created(data: T) -> Response {
        (StatusCode::CREATED, Self::ok(data)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payload_is_flattened() {
        #[derive(Serialize)]
        struct Payload {
            count: u32,
        }
        let Json(body) = ApiResponse::ok(Payload { count: 2 });
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"success": true, "count": 2})
        );
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created(json!({"id": 1}));
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
