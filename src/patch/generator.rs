use super::validation::{allowed_ranges, validate_patch};
use crate::claims::DocContext;
use crate::domain::patch_proposal::PatchStyle;
use crate::error::LlmError;
use crate::llm::{LlmClient, LlmRequest};
use serde_json::Value;

/// Validation failures regenerate at most this many times before the stage
/// gives up and the state machine dead-letters to `FAILED_PATCH_GENERATION`
/// (§4.7).
pub const MAX_REGENERATE_ATTEMPTS: u32 = 3;

fn response_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["content"],
        "properties": {
            "content": { "type": "string" },
            "rationale": { "type": "string" },
        }
    })
}

fn build_prompt(context: &DocContext, style: PatchStyle, instructions: &str) -> LlmRequest {
    let sections = context
        .sections
        .iter()
        .map(|s| format!("## {}\n{}", s.heading, s.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    LlmRequest {
        system_prompt:
            "You patch operational documentation. Return the full replacement document body, \
             editing only within the sections you were shown. Preserve any \
             <!-- DRIFT_AGENT_MANAGED_START/END --> markers verbatim."
                .to_string(),
        user_prompt: format!(
            "Patch style: {style:?}\nInstructions: {instructions}\n\nOutline: {:?}\n\nSections:\n{sections}",
            context.outline
        ),
        temperature: 0.2,
        max_tokens: 2048,
        response_schema: response_schema(),
    }
}

/// Generates a validated replacement document body (§4.7): calls the LLM
/// with a bounded `DocContext`, validates the result against the allowed
/// edit ranges, and regenerates with the validation failure folded into the
/// next prompt up to `MAX_REGENERATE_ATTEMPTS` times.
pub async fn generate(
    client: &dyn LlmClient,
    original_content: &str,
    context: &DocContext,
    style: PatchStyle,
    instructions: &str,
) -> Result<String, LlmError> {
    let doc = crate::claims::extract_claims(original_content);
    let ranges = allowed_ranges(&doc, original_content);

    let mut last_error = String::new();
    for attempt in 0..=MAX_REGENERATE_ATTEMPTS {
        let mut prompt_instructions = instructions.to_string();
        if attempt > 0 {
            prompt_instructions.push_str(&format!(
                "\nPrevious attempt was rejected: {last_error}. Fix this and try again."
            ));
        }

        let request = build_prompt(context, style, &prompt_instructions);
        let response = client.complete(&request).await?;
        let proposed = response
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                LlmError::SchemaValidation("response missing 'content' field".to_string())
            })?;

        match validate_patch(original_content, proposed, &ranges) {
            Ok(()) => return Ok(proposed.to_string()),
            Err(reason) => last_error = reason,
        }
    }

    Err(LlmError::SchemaValidation(format!(
        "patch failed validation after {} attempts: {last_error}",
        MAX_REGENERATE_ATTEMPTS + 1
    )))
}
