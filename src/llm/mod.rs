//! OpenAI-compatible chat-completions plumbing: request/response types,
//! incremental SSE framing, and tool declarations.

pub mod client;
pub mod sse;
pub mod tools;

pub use client::{ChatRequest, ChatResponse, ChatTransport, Message, OpenAiClient, StreamUpdate};
