//! Cisco NX-OS platform definition.
//!
//! NX-OS logs straight into privilege exec; there is no `>` level.
//!
//! ```text
//! leaf-01#                   # privilege_exec
//! leaf-01(config)#           # configuration
//! leaf-01(config-if)#        # configuration sub-mode
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

pub const PLATFORM_NAME: &str = "cisco_nxos";

pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-]{1,63}#\s?$")?
        .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-]{1,63}\(config[\w.\-@/:\+]{0,32}\)#\s?$",
    )?
    .with_parent("privilege_exec")
    .entered_with("configure terminal")
    .exited_with("end");

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_config_privilege("configuration")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid command")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Invalid parameter detected")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_running_config_command("show running-config")
        .with_ignored_config_line(r"^!Command: show running-config")?
        .with_ignored_config_line(r"^!Running configuration last done at")?
        .with_ignored_config_line(r"^!Time:")
}
