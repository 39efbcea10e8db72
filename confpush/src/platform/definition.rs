//! What the driver needs to know about one CLI family.

use indexmap::IndexMap;
use regex::Regex;

use super::privilege_level::PrivilegeLevel;

/// Prompts, modes and configuration commands of one device family.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Registry key, e.g. "cisco_ios".
    pub name: String,

    /// CLI modes in matching order: when two prompts overlap, the first
    /// mode wins.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Mode commands and the running-config fetch run in.
    pub default_privilege: String,

    /// Mode configuration lines are sent in.
    pub config_privilege: String,

    /// Output substrings that mean the command was rejected.
    pub failed_when_contains: Vec<String>,

    /// Sent once after login, e.g. to disable paging.
    pub on_open_commands: Vec<String>,

    pub running_config_command: String,

    /// Set on platforms with a candidate configuration.
    pub commit_command: Option<String>,

    /// Lines of fetched configuration that change on every read
    /// (timestamps, byte counts) and must not count as drift.
    pub config_ignore_patterns: Vec<Regex>,

    pub terminal_width: u32,
    pub terminal_height: u32,
}

impl PlatformDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            config_privilege: String::new(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            running_config_command: "show running-config".to_string(),
            commit_command: None,
            config_ignore_patterns: vec![],
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    pub fn with_config_privilege(mut self, name: impl Into<String>) -> Self {
        self.config_privilege = name.into();
        self
    }

    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    pub fn with_running_config_command(mut self, command: impl Into<String>) -> Self {
        self.running_config_command = command.into();
        self
    }

    pub fn with_commit_command(mut self, command: impl Into<String>) -> Self {
        self.commit_command = Some(command.into());
        self
    }

    /// Ignore fetched configuration lines matching `pattern`.
    pub fn with_ignored_config_line(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.config_ignore_patterns.push(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    pub fn get_privilege(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(name)
    }

    /// Drop lines that match any ignore pattern.
    pub fn strip_volatile_lines(&self, config: &str) -> String {
        config
            .lines()
            .filter(|line| !self.config_ignore_patterns.iter().any(|p| p.is_match(line)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
