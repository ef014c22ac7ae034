//! Channel layer: turning a byte stream into shell text.
//!
//! This module handles output cleanup (ANSI escapes, line endings),
//! telnet option filtering and prompt detection.

mod buffer;
mod patterns;
pub mod telnet;

pub use buffer::OutputBuffer;
pub use patterns::{CompiledPrompt, PromptMatcher, trailing_prompt};
