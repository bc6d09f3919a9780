//! AI-assisted commit message generation.
//!
//! Reads the staged changes of a git repository, renders a bounded prompt,
//! asks a configured LLM provider (Anthropic, OpenAI or a local
//! OpenAI-compatible server) for a message, and lets the user accept,
//! regenerate, edit or refine it before committing.
pub mod api;
pub mod config;
pub mod console;
pub mod error;
pub mod git;
pub mod logging;
pub mod prompt;
pub mod prompts;
pub mod session;
pub mod style;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigStore, Settings};
pub use error::{CommitGenError, Result};
pub use prompt::{Prompt, build_prompt};
pub use session::{Outcome, Session};
