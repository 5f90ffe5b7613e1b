//! Common types for LLM interactions

use serde_json::Value;

/// Structured-output completion request.
///
/// Every tutoring call is a single user prompt whose answer must be JSON
/// matching `response_schema`.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    /// OpenAPI-subset schema the response must validate against
    pub response_schema: Option<Value>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn json(prompt: impl Into<String>, response_schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: Some(response_schema),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Usage,
}

impl LlmResponse {
    /// Response text with surrounding whitespace and any Markdown code fence removed
    pub fn json_body(&self) -> &str {
        let trimmed = self.text.trim();
        let Some(rest) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        rest.strip_suffix("```").unwrap_or(rest).trim()
    }
}

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
