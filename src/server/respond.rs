use crate::error::RelayError;
use crate::upstream::UpstreamOutcome;
use axum::{
    Json,
    response::{IntoResponse, Response},
};

/// Turns the final upstream outcome into the proxy's answer. A JSON reply is
/// passed through with its status and body untouched, error or not.
pub fn relay_outcome(outcome: UpstreamOutcome) -> Response {
    match outcome {
        UpstreamOutcome::Reply { status, body } => (status, Json(body)).into_response(),
        UpstreamOutcome::Undecodable { status, reason } => {
            RelayError::UpstreamUndecodable { status, reason }.into_response()
        }
        UpstreamOutcome::Unreachable { reason } => {
            RelayError::UpstreamUnreachable(reason).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn json_replies_keep_status_and_body() {
        let body = json!({"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}, "extra": [1, 2]});
        let resp = relay_outcome(UpstreamOutcome::Reply {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: body.clone(),
        });

        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(resp).await, body);
    }

    #[tokio::test]
    async fn undecodable_body_becomes_bad_gateway() {
        let resp = relay_outcome(UpstreamOutcome::Undecodable {
            status: StatusCode::OK,
            reason: "expected value at line 1 column 1".to_string(),
        });

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], 502);
        assert_eq!(body["error"]["status"], "UNAVAILABLE");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .starts_with("Failed to decode upstream response")
        );
    }

    #[tokio::test]
    async fn unreachable_upstream_becomes_bad_gateway() {
        let resp = relay_outcome(UpstreamOutcome::Unreachable {
            reason: "connection refused".to_string(),
        });

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(resp).await["error"]["message"],
            "Upstream service unreachable: connection refused"
        );
    }
}
