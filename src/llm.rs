use crate::error::LlmError;
use async_trait::async_trait;
use serde_json::Value;

/// A single LLM call (§9 design note: every call carries a declared response
/// schema; schema failures are non-retry, keeping the generator's contract
/// deterministic even though the provider is not).
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub response_schema: Value,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<Value, LlmError>;
}

/// Validates a raw LLM response against the request's declared schema.
/// Schema failures map to `LlmError::SchemaValidation`, which is a
/// `FailureClass::Permanent` error — never retried with the same input.
pub fn validate_response(response: &Value, schema: &Value) -> Result<(), LlmError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| LlmError::SchemaValidation(format!("invalid schema: {e}")))?;
    let errors: Vec<String> = validator
        .iter_errors(response)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(LlmError::SchemaValidation(errors.join("; ")))
    }
}

/// Runs a request against a client, retrying transient failures up to
/// `max_retries` times. Schema-validation failures are never retried here;
/// callers that want regeneration-on-invalid-diff (§4.7) do that themselves
/// with a revised prompt, not via this retry loop.
pub async fn complete_with_retry(
    client: &dyn LlmClient,
    request: &LlmRequest,
    max_retries: u32,
) -> Result<Value, LlmError> {
    let mut attempt = 0;
    loop {
        match client.complete(request).await {
            Ok(response) => {
                validate_response(&response, &request.response_schema)?;
                return Ok(response);
            }
            Err(LlmError::SchemaValidation(msg)) => {
                return Err(LlmError::SchemaValidation(msg));
            }
            Err(transient) => {
                if attempt >= max_retries {
                    return Err(transient);
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyClient {
        fails_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn complete(&self, _request: &LlmRequest) -> Result<Value, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fails_before_success {
                Err(LlmError::Transient("connection reset".to_string()))
            } else {
                Ok(serde_json::json!({"diff": "ok"}))
            }
        }
    }

    fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "required": ["diff"],
            "properties": { "diff": { "type": "string" } }
        })
    }

    fn request() -> LlmRequest {
        LlmRequest {
            system_prompt: "you patch docs".to_string(),
            user_prompt: "patch this".to_string(),
            temperature: 0.0,
            max_tokens: 512,
            response_schema: schema(),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let client = FlakyClient {
            fails_before_success: 2,
            calls: AtomicU32::new(0),
        };
        let result = complete_with_retry(&client, &request(), 3).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn exhausts_retries_and_surfaces_the_last_transient_error() {
        let client = FlakyClient {
            fails_before_success: 10,
            calls: AtomicU32::new(0),
        };
        let result = complete_with_retry(&client, &request(), 2).await;
        assert!(matches!(result, Err(LlmError::Transient(_))));
    }

    #[test]
    fn schema_violations_are_reported_with_details() {
        let response = serde_json::json!({"wrong_field": 1});
        let err = validate_response(&response, &schema()).unwrap_err();
        assert!(matches!(err, LlmError::SchemaValidation(_)));
    }

    #[test]
    fn matching_responses_pass_validation() {
        let response = serde_json::json!({"diff": "some unified diff"});
        assert!(validate_response(&response, &schema()).is_ok());
    }
}
