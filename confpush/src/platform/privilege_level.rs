//! CLI modes and how to move between them.

use regex::bytes::Regex;

/// One CLI mode of a device, recognised by its prompt.
///
/// Modes form a tree. A child names its parent and the commands that enter
/// it from the parent and leave it back to the parent.
#[derive(Debug, Clone)]
pub struct PrivilegeLevel {
    /// e.g. "exec", "privilege_exec", "configuration"
    pub name: String,

    /// Matches the prompt shown in this mode.
    pub pattern: Regex,

    /// None for the root mode.
    pub parent: Option<String>,

    pub enter_command: Option<String>,

    pub exit_command: Option<String>,

    /// Password prompt that may follow `enter_command`.
    pub auth_prompt: Option<Regex>,

    /// Substrings that rule this mode out even when `pattern` matches
    /// (`router#` and `router(config)#` both end in `#`).
    pub not_contains: Vec<String>,
}

impl PrivilegeLevel {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            parent: None,
            enter_command: None,
            exit_command: None,
            auth_prompt: None,
            not_contains: vec![],
        })
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Command sent in the parent mode to reach this one.
    pub fn entered_with(mut self, command: impl Into<String>) -> Self {
        self.enter_command = Some(command.into());
        self
    }

    /// Command sent in this mode to return to the parent.
    pub fn exited_with(mut self, command: impl Into<String>) -> Self {
        self.exit_command = Some(command.into());
        self
    }

    /// Entering this mode may ask for a password at a prompt matching
    /// `prompt_pattern`.
    pub fn with_auth_prompt(mut self, prompt_pattern: &str) -> Result<Self, regex::Error> {
        self.auth_prompt = Some(Regex::new(prompt_pattern)?);
        Ok(self)
    }

    pub fn with_not_contains(mut self, pattern: impl Into<String>) -> Self {
        self.not_contains.push(pattern.into());
        self
    }

    pub fn requires_auth(&self) -> bool {
        self.auth_prompt.is_some()
    }

    /// Whether `prompt` belongs to this mode.
    pub fn matches(&self, prompt: &str) -> bool {
        if self.not_contains.iter().any(|nc| prompt.contains(nc.as_str())) {
            return false;
        }
        self.pattern.is_match(prompt.as_bytes())
    }
}
