//! Tracking the current CLI mode and planning moves between modes.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::{DriverError, Result};
use crate::platform::PrivilegeLevel;

/// Current mode of a session plus the mode tree of its platform.
///
/// Parent links are walked in both directions, so getting from `exec` to
/// `configuration` and back are both shortest-path searches.
#[derive(Debug)]
pub struct PrivilegeManager {
    levels: IndexMap<String, PrivilegeLevel>,
    neighbours: HashMap<String, Vec<String>>,
    current: Option<String>,
}

impl PrivilegeManager {
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        let mut neighbours: HashMap<String, Vec<String>> = HashMap::new();
        for (name, level) in &levels {
            neighbours.entry(name.clone()).or_default();
            if let Some(parent) = &level.parent {
                neighbours.entry(name.clone()).or_default().push(parent.clone());
                neighbours.entry(parent.clone()).or_default().push(name.clone());
            }
        }

        // Until a prompt is seen, assume the root mode.
        let current = levels
            .values()
            .find(|l| l.parent.is_none())
            .map(|l| l.name.clone());

        Self {
            levels,
            neighbours,
            current,
        }
    }

    /// First mode, in definition order, whose pattern accepts `prompt`.
    pub fn determine_from_prompt(&self, prompt: &str) -> Result<&PrivilegeLevel> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .ok_or_else(|| {
                DriverError::UnknownPrivilege {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    pub fn current(&self) -> Option<&PrivilegeLevel> {
        self.current.as_deref().and_then(|name| self.levels.get(name))
    }

    pub fn set_current(&mut self, name: &str) -> Result<()> {
        if !self.levels.contains_key(name) {
            return Err(DriverError::UnknownPrivilege {
                prompt: name.to_string(),
            }
            .into());
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.levels.get(name)
    }

    /// Modes visited going from `from` to `to`, both ends included.
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let mut came_from: HashMap<&str, &str> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        came_from.insert(from, from);

        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = vec![to.to_string()];
                let mut step = to;
                while step != from {
                    step = came_from[step];
                    path.push(step.to_string());
                }
                path.reverse();
                return Ok(path);
            }

            for next in self.neighbours.get(node).into_iter().flatten() {
                if !came_from.contains_key(next.as_str()) {
                    came_from.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        Err(DriverError::NoPrivilegePath {
            from: from.to_string(),
            to: to.to_string(),
        }
        .into())
    }

    /// Command that moves between two adjacent modes.
    pub fn get_transition(&self, from: &str, to: &str) -> Option<TransitionInfo> {
        let from_level = self.levels.get(from)?;
        let to_level = self.levels.get(to)?;

        if to_level.parent.as_deref() == Some(from) {
            Some(TransitionInfo {
                command: to_level.enter_command.clone()?,
                auth_prompt: to_level.auth_prompt.clone(),
            })
        } else if from_level.parent.as_deref() == Some(to) {
            Some(TransitionInfo {
                command: from_level.exit_command.clone()?,
                auth_prompt: None,
            })
        } else {
            None
        }
    }
}

/// One step between adjacent modes.
#[derive(Debug, Clone)]
pub struct TransitionInfo {
    pub command: String,

    /// Set when the device may ask for a password after `command`.
    pub auth_prompt: Option<Regex>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_levels() -> IndexMap<String, PrivilegeLevel> {
        let exec = PrivilegeLevel::new("exec", r">\s*$").unwrap();

        let enable = PrivilegeLevel::new("privilege_exec", r"#\s*$")
            .unwrap()
            .with_parent("exec")
            .entered_with("enable")
            .exited_with("disable")
            .with_auth_prompt(r"[Pp]assword:\s*$")
            .unwrap()
            .with_not_contains("(config)");

        let configuration = PrivilegeLevel::new("configuration", r"\(config[^)]*\)#\s*$")
            .unwrap()
            .with_parent("privilege_exec")
            .entered_with("configure terminal")
            .exited_with("end");

        let mut levels = IndexMap::new();
        levels.insert("exec".to_string(), exec);
        levels.insert("privilege_exec".to_string(), enable);
        levels.insert("configuration".to_string(), configuration);
        levels
    }

    #[test]
    fn test_determine_privilege() {
        let manager = PrivilegeManager::new(make_test_levels());

        let level = manager.determine_from_prompt("dist-sw2>").unwrap();
        assert_eq!(level.name, "exec");

        let level = manager.determine_from_prompt("dist-sw2#").unwrap();
        assert_eq!(level.name, "privilege_exec");

        let level = manager.determine_from_prompt("dist-sw2(config)#").unwrap();
        assert_eq!(level.name, "configuration");
    }

    #[test]
    fn test_find_path() {
        let manager = PrivilegeManager::new(make_test_levels());

        let path = manager.find_path("exec", "configuration").unwrap();
        assert_eq!(path, vec!["exec", "privilege_exec", "configuration"]);

        let path = manager.find_path("configuration", "exec").unwrap();
        assert_eq!(path, vec!["configuration", "privilege_exec", "exec"]);

        let path = manager.find_path("exec", "exec").unwrap();
        assert_eq!(path, vec!["exec"]);
    }

    #[test]
    fn test_unknown_prompt() {
        let manager = PrivilegeManager::new(make_test_levels());
        assert!(manager.determine_from_prompt("Password:").is_err());
        assert!(manager.find_path("exec", "shell").is_err());
    }

    #[test]
    fn test_set_current() {
        let mut manager = PrivilegeManager::new(make_test_levels());
        assert_eq!(manager.current().unwrap().name, "exec");
        manager.set_current("configuration").unwrap();
        assert_eq!(manager.current().unwrap().name, "configuration");
        assert!(manager.set_current("shell").is_err());
    }

    #[test]
    fn test_get_transition() {
        let manager = PrivilegeManager::new(make_test_levels());

        let trans = manager.get_transition("exec", "privilege_exec").unwrap();
        assert_eq!(trans.command, "enable");
        assert!(trans.auth_prompt.is_some());

        let trans = manager.get_transition("privilege_exec", "exec").unwrap();
        assert_eq!(trans.command, "disable");
        assert!(trans.auth_prompt.is_none());

        // not adjacent
        assert!(manager.get_transition("exec", "configuration").is_none());
    }
}
