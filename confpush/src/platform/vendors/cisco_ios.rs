//! Cisco IOS / IOS-XE platform definition.
//!
//! ```text
//! edge-rtr1>                 # exec
//! edge-rtr1#                 # privilege_exec
//! edge-rtr1(config)#         # configuration
//! edge-rtr1(config-if)#      # configuration sub-mode
//! ```
//!
//! ```text
//! exec ──enable──► privilege_exec ──configure terminal──► configuration
//!      ◄─disable──                ◄─────────end──────────
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

pub const PLATFORM_NAME: &str = "cisco_ios";

/// IOS-XE shares the IOS CLI.
pub const XE_PLATFORM_NAME: &str = "cisco_xe";

pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    build(PLATFORM_NAME)
}

pub fn platform_xe() -> Result<PlatformDefinition, regex::Error> {
    build(XE_PLATFORM_NAME)
}

fn build(name: &str) -> Result<PlatformDefinition, regex::Error> {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@/:]{1,63}>\s?$")?;

    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@/:]{1,63}#\s?$")?
        .with_parent("exec")
        .entered_with("enable")
        .exited_with("disable")
        .with_auth_prompt(r"(?mi)^(?:enable\s)?password:\s?$")?
        .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@/:]{1,63}\(conf[\w.\-@/:+]{0,32}\)#\s?$",
    )?
    .with_parent("privilege_exec")
    .entered_with("configure terminal")
    .exited_with("end");

    PlatformDefinition::new(name)
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_config_privilege("configuration")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Unknown command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 512")
        .with_running_config_command("show running-config")
        .with_terminal_size(512, 24)
        .with_ignored_config_line(r"^Building configuration")?
        .with_ignored_config_line(r"^Current configuration\s*:")?
        .with_ignored_config_line(r"^! Last configuration change")?
        .with_ignored_config_line(r"^! NVRAM config last updated")
}
