//! Arista EOS platform definition.
//!
//! ```text
//! spine1>                            # exec
//! spine1#                            # privilege_exec
//! spine1(config)#                    # configuration
//! spine1(config-if-Et1)#             # configuration sub-mode
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

pub const PLATFORM_NAME: &str = "arista_eos";

pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@()/: ]{1,63}>\s?$")?;

    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@()/: ]{1,63}#\s?$")?
        .with_parent("exec")
        .entered_with("enable")
        .exited_with("disable")
        .with_auth_prompt(r"(?mi)^password:\s?$")?
        .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@()/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s?$",
    )?
    .with_parent("privilege_exec")
    .entered_with("configure terminal")
    .exited_with("end");

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_config_privilege("configuration")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Error")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Cannot commit")
        .with_failure_pattern("% Unavailable command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 32767")
        .with_running_config_command("show running-config")
        .with_terminal_size(32767, 24)
        .with_ignored_config_line(r"^! Command: show running-config")?
        .with_ignored_config_line(r"^! (device|Startup-config last modified at):")
}
