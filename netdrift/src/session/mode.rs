//! Shell modes recognised from the trailing prompt.

use std::fmt;
use std::sync::LazyLock;

use crate::channel::{CompiledPrompt, PromptMatcher};

/// Mode the device shell is in, as far as the last prompt tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// `R1>`
    User,
    /// `R1#`
    Privileged,
    /// `R1(config)#`
    GlobalConfig,
    /// `R1(config-if)#`
    InterfaceConfig,
    /// `R1(config-router)#`
    RouterConfig,
    /// No prompt seen yet, or a submode we do not track.
    #[default]
    Unknown,
}

/// Checked in order; the first match wins.
static MODE_PROMPTS: LazyLock<Vec<(Mode, CompiledPrompt)>> = LazyLock::new(|| {
    let table = [
        (Mode::RouterConfig, r"^[\w.\-@/:]{1,63}\(config-router\)#\s*$", vec![]),
        (Mode::InterfaceConfig, r"^[\w.\-@/:]{1,63}\(config-(?:sub)?if\)#\s*$", vec![]),
        (Mode::GlobalConfig, r"^[\w.\-@/:]{1,63}\(config\)#\s*$", vec![]),
        (Mode::Privileged, r"^[\w.\-@/:]{1,63}#\s*$", vec!["(config"]),
        (Mode::User, r"^[\w.\-@/:]{1,63}>\s*$", vec![]),
    ];
    table
        .into_iter()
        .map(|(mode, pattern, not_contains)| {
            let prompt = CompiledPrompt::with_not_contains(pattern, not_contains)
                .expect("mode prompt regex is valid");
            (mode, prompt)
        })
        .collect()
});

impl Mode {
    /// Classify a prompt line.
    ///
    /// # Example
    ///
    /// ```rust
    /// use netdrift::Mode;
    ///
    /// assert_eq!(Mode::from_prompt("R1#"), Mode::Privileged);
    /// assert_eq!(Mode::from_prompt("R1(config-if)#"), Mode::InterfaceConfig);
    /// assert_eq!(Mode::from_prompt("R1(config-line)#"), Mode::Unknown);
    /// ```
    pub fn from_prompt(prompt: &str) -> Self {
        let bytes = prompt.trim().as_bytes();
        MODE_PROMPTS
            .iter()
            .find(|(_, matcher)| matcher.is_match(bytes))
            .map(|(mode, _)| *mode)
            .unwrap_or(Mode::Unknown)
    }

    /// Whether configuration commands are accepted in this mode.
    pub fn is_config(self) -> bool {
        matches!(
            self,
            Mode::GlobalConfig | Mode::InterfaceConfig | Mode::RouterConfig
        )
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::User => "user",
            Mode::Privileged => "privileged",
            Mode::GlobalConfig => "global-config",
            Mode::InterfaceConfig => "interface-config",
            Mode::RouterConfig => "router-config",
            Mode::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
