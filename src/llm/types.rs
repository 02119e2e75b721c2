//! Common types for content-backend interactions

use serde_json::Value;

/// Request for the generate-with-optional-tools contract
#[derive(Debug, Clone, Default)]
pub struct ContentRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub tools: Vec<ToolDeclaration>,
    pub max_tokens: Option<u32>,
}

impl ContentRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(text.into());
        self
    }

    pub fn with_tool(mut self, tool: ToolDeclaration) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A callable the backend may invoke while answering
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDeclaration {
    /// The search capability used for grounded verification
    pub fn google_search() -> Self {
        Self {
            name: "google_search".to_string(),
            description: "Search the web for up-to-date information about a topic.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"]
            }),
        }
    }
}

/// Function invocation reported by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Value,
}

/// Normalized backend response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResponse {
    /// Consolidated answer text, present only when the first candidate
    /// answered in text alone
    pub text: Option<String>,
    pub function_calls: Vec<FunctionCall>,
    pub candidates: Vec<Candidate>,
}

impl ContentResponse {
    /// Plain text answer with a single candidate
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            text: Some(text.clone()),
            function_calls: vec![],
            candidates: vec![Candidate {
                parts: vec![Part { text: Some(text) }],
            }],
        }
    }

    pub fn has_function_calls(&self) -> bool {
        !self.function_calls.is_empty()
    }

    /// Every non-empty inline text fragment across all candidates
    pub fn text_fragments(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Part {
    pub text: Option<String>,
}
