//! Output of one command.

use std::time::Duration;

use crate::channel::trailing_prompt;

/// Text a command produced, drained after its settle time.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// The command that was executed.
    pub command: String,

    /// The command output (normalized - echo line and trailing prompt removed).
    pub text: String,

    /// The drained output before normalization.
    pub raw: String,

    /// The prompt seen at the end, if any.
    pub prompt: Option<String>,

    /// Time from write to drain.
    pub elapsed: Duration,
}

impl CommandOutput {
    /// Build from drained text, stripping the echo and trailing prompt.
    pub fn from_raw(command: impl Into<String>, raw: String, elapsed: Duration) -> Self {
        let command = command.into();
        let prompt = trailing_prompt(&raw).map(str::to_string);
        let text = normalize(&raw, &command, prompt.as_deref());
        Self {
            command,
            text,
            raw,
            prompt,
            elapsed,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.text.contains(pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl std::fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Drop everything up to and including the echoed command line, and the
/// trailing prompt line.
fn normalize(raw: &str, command: &str, prompt: Option<&str>) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();

    if let Some(prompt) = prompt {
        if let Some(last) = lines.iter().rposition(|l| !l.trim().is_empty()) {
            if lines[last].trim() == prompt {
                lines.truncate(last);
            }
        }
    }

    let command = command.trim();
    if !command.is_empty() {
        if let Some(echo) = lines.iter().position(|l| l.trim_end().ends_with(command)) {
            lines.drain(..=echo);
        }
    }

    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_and_prompt_removed() {
        let raw = "R1#show ip eigrp neighbors\nEIGRP-IPv4 Neighbors for AS(1)\nH   Address\nR1#".to_string();
        let output = CommandOutput::from_raw("show ip eigrp neighbors", raw, Duration::ZERO);
        assert_eq!(output.text, "EIGRP-IPv4 Neighbors for AS(1)\nH   Address");
        assert_eq!(output.prompt.as_deref(), Some("R1#"));
    }

    #[test]
    fn test_stale_lines_before_echo_dropped() {
        let raw = "\nR1#\nR1#show clock\n*10:00:00 UTC\nR1#\n".to_string();
        let output = CommandOutput::from_raw("show clock", raw, Duration::ZERO);
        assert_eq!(output.text, "*10:00:00 UTC");
    }

    #[test]
    fn test_missing_echo_keeps_text() {
        let raw = "Interface   IP-Address\nR1#".to_string();
        let output = CommandOutput::from_raw("show ip interface brief", raw, Duration::ZERO);
        assert_eq!(output.text, "Interface   IP-Address");
    }

    #[test]
    fn test_no_prompt() {
        let raw = "R1#show logging\nline one\nline two".to_string();
        let output = CommandOutput::from_raw("show logging", raw, Duration::ZERO);
        assert_eq!(output.text, "line one\nline two");
        assert!(output.prompt.is_none());
        assert!(!output.is_empty());
    }
}
