//! Juniper JUNOS platform definition.
//!
//! Configuration is a candidate datastore: lines are sent as `set`
//! statements and only take effect on `commit`.
//!
//! ```text
//! netops@mx1>                # exec (operational)
//! netops@mx1#                # configuration
//! {master:0}[edit]           # routing-engine banner on its own line
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

pub const PLATFORM_NAME: &str = "juniper_junos";

pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    let exec = PrivilegeLevel::new(
        "exec",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\n)?[\w\-@()/:\.]{1,63}>\s?$",
    )?;

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\[edit\]\n)?[\w\-@()/:\.]{1,63}#\s?$",
    )?
    .with_parent("exec")
    .entered_with("configure")
    .exited_with("exit configuration-mode");

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(configuration)
        .with_default_privilege("exec")
        .with_config_privilege("configuration")
        .with_failure_pattern("is ambiguous")
        .with_failure_pattern("No valid completions")
        .with_failure_pattern("unknown command")
        .with_failure_pattern("syntax error")
        .with_failure_pattern("error: commit failed")
        .with_failure_pattern("error: configuration check-out failed")
        .with_on_open_command("set cli screen-length 0")
        .with_on_open_command("set cli screen-width 511")
        .with_running_config_command("show configuration | display set")
        .with_commit_command("commit")
        .with_ignored_config_line(r"^## Last commit:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_patterns() {
        let platform = platform().unwrap();
        let exec = platform.get_privilege("exec").unwrap();
        let config = platform.get_privilege("configuration").unwrap();

        assert!(exec.matches("netops@mx1>"));
        assert!(exec.matches("{master:0}\nnetops@mx1>"));
        assert!(!exec.matches("netops@mx1#"));

        assert!(config.matches("netops@mx1#"));
        assert!(config.matches("{master:0}[edit]\nnetops@mx1#"));
        assert!(!config.matches("netops@mx1>"));
    }

    #[test]
    fn test_commit_required() {
        let platform = platform().unwrap();
        assert_eq!(platform.commit_command.as_deref(), Some("commit"));
        assert_eq!(platform.default_privilege, "exec");
    }
}
