//! Chat-completion client for OpenAI-compatible HTTP endpoints.
//!
//! Works against OpenAI itself and anything that speaks the same protocol
//! (Ollama, LM Studio, vLLM, Groq, Together, ...), in both buffered and
//! streaming SSE modes.
//!
//! ## Architecture
//!
//! ```text
//! caller ──> Request Builder ──> Transport ──┬──> ChatCompletionResponse
//!            (request.rs)        (client.rs) │
//!                                            └──> Stream Decoder ──> on_fragment(&str)
//!                                                 (streaming.rs)
//! ```
//!
//! ## Modules
//!
//! - [`request`] -- Model family classification and request body shaping.
//! - [`client`] -- HTTP transport and the [`LlmClient`] facade.
//! - [`streaming`] -- SSE line decoder for incremental responses.
//! - [`types`] -- Wire types (messages, envelopes, model listings).
//! - [`error`] -- Client error types.

pub mod client;
pub mod error;
pub mod request;
pub mod streaming;
pub mod types;

pub use client::{ClientConfig, LlmClient};
pub use error::{ClientError, Result};
pub use request::{ChatCompletionRequest, GenerationParams, ModelFamily, build_request};
pub use streaming::{LineOutcome, SseDecoder, decode_reader};
pub use types::{ChatCompletionResponse, Choice, Message, ModelInfo, Role, Usage};
