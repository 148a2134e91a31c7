//! LLM-backed fix suggestions via a hosted chat-completion endpoint.
//!
//! A missing API key degrades to a descriptive no-op payload; API failures
//! become `Failed to generate AI fix: …` payloads. Nothing here returns an
//! error to the caller.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lines of context captured on each side of the flagged line.
pub const DEFAULT_CONTEXT_LINES: usize = 10;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// A generated suggestion with the first fenced code block split out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixSuggestion {
    pub suggestion: String,
    pub code_example: String,
}

pub struct AiCodeFixer {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl AiCodeFixer {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, AI fix generation is disabled");
        }
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        }
    }

    /// Whether fix generation can actually reach the API.
    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Extract the lines around `line_number` (1-based), clamped to file
    /// bounds. Best-effort: any I/O failure yields an empty string. The
    /// result never exceeds `2 * window + 1` lines.
    pub fn extract_code_context(path: &Path, line_number: i64, window: usize) -> String {
        let Ok(content) = std::fs::read_to_string(path) else {
            return String::new();
        };
        let lines: Vec<&str> = content.lines().collect();

        let start = (line_number - window as i64 - 1).max(0) as usize;
        let end = ((line_number + window as i64).max(0) as usize).min(lines.len());
        if start >= end {
            return String::new();
        }
        lines[start..end].join("\n")
    }

    /// Generate a fix suggestion for a flagged snippet.
    pub async fn generate_fix(
        &self,
        code_snippet: &str,
        error_message: &str,
        language: &str,
        line_number: i64,
    ) -> FixSuggestion {
        let Some(api_key) = &self.api_key else {
            return FixSuggestion {
                suggestion: "AI code fixing is not available. Set the OPENAI_API_KEY \
                             environment variable."
                    .to_string(),
                code_example: String::new(),
            };
        };

        let prompt = format!(
            "You are an expert software engineer. Analyze this code snippet and provide a \
             minimal, focused fix for the specific bug.\n\n\
             Your response should be concise and include:\n\
             1. A brief explanation of the issue (1-2 sentences)\n\
             2. The corrected code (only the relevant lines that need to be changed)\n\n\
             Language: {language}\n\
             Error/Bug: {error_message}\n\
             Line Number: {line_number}\n\n\
             Code:\n```{language}\n{code_snippet}\n```\n\n\
             Provide only the necessary fix without additional explanations or best practices."
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert software engineer specializing in debugging \
                                and fixing code issues."
                },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.2,
            "max_tokens": 500
        });

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await;

        let reply = match response {
            Ok(response) => match response.error_for_status() {
                Ok(response) => response.json::<ChatCompletionResponse>().await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match reply {
            Ok(completion) => {
                let content = completion
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .unwrap_or_default();
                let (suggestion, code_example) = parse_ai_response(&content);
                FixSuggestion {
                    suggestion,
                    code_example,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error generating AI fix");
                FixSuggestion {
                    suggestion: format!("Failed to generate AI fix: {e}"),
                    code_example: String::new(),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Split a model reply into prose and the first fenced code block.
fn parse_ai_response(response: &str) -> (String, String) {
    let re = Regex::new(r"(?s)```(?:\w+)?\n(.*?)\n```").expect("valid regex");
    let code_example = re
        .captures(response)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();
    let suggestion = re.replace_all(response, "").trim().to_string();
    (suggestion, code_example)
}
