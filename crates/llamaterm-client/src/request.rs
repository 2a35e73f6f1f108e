//! Request shaping for the Chat Completions API.
//!
//! Model generations disagree about which generation-control fields they
//! accept.  Sending a field a model rejects gets the whole request refused,
//! so the body is derived per call from the model's [`ModelFamily`].

use serde::Serialize;

use crate::types::Message;

// ---------------------------------------------------------------------------
// Model family
// ---------------------------------------------------------------------------

/// Groups model identifiers by the request fields they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Everything not matched below, including local models.
    Classic,
    /// `gpt-4o` and its variants.
    Gpt4o,
    /// The `o1` reasoning models.
    ReasoningLegacy,
    /// `gpt-5` and later.
    NextGen,
}

impl ModelFamily {
    /// Classify a model identifier.  Matching is case-insensitive and the
    /// first rule that applies wins.
    pub fn classify(model: &str) -> Self {
        let model = model.to_ascii_lowercase();

        if model.starts_with("o1") {
            Self::ReasoningLegacy
        } else if model.contains("gpt-4o") {
            Self::Gpt4o
        } else if ('5'..='9').any(|d| model.starts_with(&format!("gpt-{d}"))) {
            Self::NextGen
        } else {
            Self::Classic
        }
    }

    /// Whether the family uses `max_completion_tokens` instead of `max_tokens`.
    pub fn uses_max_completion_tokens(self) -> bool {
        matches!(self, Self::Gpt4o | Self::ReasoningLegacy)
    }

    /// Whether the family accepts any token-limit field at all.
    pub fn accepts_token_limit(self) -> bool {
        !matches!(self, Self::NextGen)
    }

    /// Whether the family accepts `temperature`.
    pub fn accepts_temperature(self) -> bool {
        matches!(self, Self::Classic | Self::Gpt4o)
    }
}

// ---------------------------------------------------------------------------
// Generation parameters
// ---------------------------------------------------------------------------

/// Caller-supplied generation settings.  How they reach the wire depends on
/// the model family.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Model identifier, passed through verbatim.
    pub model: String,
    /// Output token budget.  `0` means unset.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl GenerationParams {
    pub fn new(model: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    /// Family of the configured model.
    pub fn family(&self) -> ModelFamily {
        ModelFamily::classify(&self.model)
    }
}

// ---------------------------------------------------------------------------
// Request body
// ---------------------------------------------------------------------------

/// JSON body of a `POST /chat/completions` request.
///
/// Optional fields that are `None` are left out of the serialized JSON
/// entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub stream: bool,
}

/// Build the request body for `params` and `messages`.
pub fn build_request<'a>(
    params: &'a GenerationParams,
    messages: &'a [Message],
    stream: bool,
) -> ChatCompletionRequest<'a> {
    let family = params.family();
    let budget = (family.accepts_token_limit() && params.max_tokens > 0).then_some(params.max_tokens);

    let (max_tokens, max_completion_tokens) = if family.uses_max_completion_tokens() {
        (None, budget)
    } else {
        (budget, None)
    };

    ChatCompletionRequest {
        model: &params.model,
        messages,
        max_tokens,
        max_completion_tokens,
        temperature: family
            .accepts_temperature()
            .then_some(params.temperature),
        stream,
    }
}
