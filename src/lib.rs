//! Core engine for an interactive code coach: builds Japanese explanation
//! prompts, streams chat completions over SSE, extracts structured
//! explanations from the streamed Markdown, and tracks saved code versions
//! for diff explanations.
//!
//! The embedding application wires the pieces together: a
//! [`session::SessionController`] for streaming explanations, a
//! [`generate::CodeGenerator`] for structured code generation, and a
//! [`history::VersionHistory`] over a [`store::KeyValueStore`].

pub mod config;
pub mod error;
pub mod explain;
pub mod generate;
pub mod history;
pub mod language;
pub mod llm;
pub mod mask;
pub mod prompt;
pub mod session;
pub mod store;
