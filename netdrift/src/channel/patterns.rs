//! Prompt matching utilities.

use std::sync::LazyLock;

use regex::bytes::Regex;

/// Any IOS-style prompt: hostname, optional `(mode)`, then `>` or `#`.
static PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.\-@/:]{1,63}(?:\([\w.\-@/:+]{0,63}\))?[>#]\s*$")
        .expect("prompt regex is valid")
});

/// Trait for prompt matching - regex by default.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where match ends, or None if no match.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find(data).map(|m| m.end())
    }
}

/// A compiled prompt pattern with optional negative matches.
#[derive(Debug, Clone)]
pub struct CompiledPrompt {
    pattern: Regex,

    /// Substrings that must NOT be present for a match.
    not_contains: Vec<&'static str>,
}

impl CompiledPrompt {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Self::with_not_contains(pattern, Vec::new())
    }

    pub fn with_not_contains(
        pattern: &str,
        not_contains: Vec<&'static str>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            not_contains,
        })
    }
}

impl PromptMatcher for CompiledPrompt {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        let text = String::from_utf8_lossy(data);
        if self.not_contains.iter().any(|nc| text.contains(nc)) {
            return None;
        }
        self.pattern.find(data).map(|m| m.end())
    }
}

/// The last non-blank line of `text` if it looks like a prompt.
///
/// # Example
///
/// ```rust
/// use netdrift::channel::trailing_prompt;
///
/// assert_eq!(trailing_prompt("show clock\n10:00\nR1#"), Some("R1#"));
/// assert_eq!(trailing_prompt("R1(config-if)# \n"), Some("R1(config-if)#"));
/// assert_eq!(trailing_prompt("Building configuration..."), None);
/// ```
pub fn trailing_prompt(text: &str) -> Option<&str> {
    let line = text.lines().rev().find(|l| !l.trim().is_empty())?.trim();
    PROMPT.is_match(line.as_bytes()).then_some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiled_prompt_not_contains() {
        let prompt = CompiledPrompt::with_not_contains(r"#\s*$", vec!["(config"]).unwrap();
        assert!(prompt.is_match(b"R1#"));
        assert!(!prompt.is_match(b"R1(config)#"));
        assert!(!prompt.is_match(b"R1(config-router)#"));
    }

    #[test]
    fn test_trailing_prompt() {
        assert_eq!(trailing_prompt("R1>"), Some("R1>"));
        assert_eq!(trailing_prompt("output\nR-4.lab#  \n\n"), Some("R-4.lab#"));
        assert_eq!(trailing_prompt("R1(config-router)#"), Some("R1(config-router)#"));
        assert_eq!(trailing_prompt("Password: "), None);
        assert_eq!(trailing_prompt(""), None);
        // A '#' inside text is not a prompt
        assert_eq!(trailing_prompt("interface Ethernet0/0 # comment"), None);
    }
}
