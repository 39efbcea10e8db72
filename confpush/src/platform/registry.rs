//! Process-wide registry mapping device types to platform definitions.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::error;

use super::definition::PlatformDefinition;
use super::vendors;
use crate::error::{PlatformError, Result};

static REGISTRY: LazyLock<PlatformRegistry> = LazyLock::new(PlatformRegistry::with_builtins);

/// Registry for platform definitions.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    platforms: HashMap<String, PlatformDefinition>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self {
            platforms: HashMap::new(),
        }
    }

    /// The built-in platforms, shared by every driver.
    pub fn global() -> &'static PlatformRegistry {
        &REGISTRY
    }

    /// A registry holding the built-in platforms only.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_platforms();
        registry
    }

    fn register_builtin_platforms(&mut self) {
        let builtins = [
            vendors::cisco_ios::platform(),
            vendors::cisco_ios::platform_xe(),
            vendors::cisco_nxos::platform(),
            vendors::arista_eos::platform(),
            vendors::juniper_junos::platform(),
        ];

        for builtin in builtins {
            match builtin {
                Ok(platform) => {
                    self.platforms.insert(platform.name.clone(), platform);
                }
                Err(e) => error!("Skipping built-in platform with invalid pattern: {}", e),
            }
        }
    }

    /// Get a platform by name.
    pub fn get(&self, name: &str) -> Option<&PlatformDefinition> {
        self.platforms.get(name)
    }

    /// Resolve an inventory device type to a platform.
    ///
    /// Tries the exact name first, then `cisco_<device_type>` so bare
    /// `ios`/`nxos`/`xe` device types keep working.
    pub fn resolve(&self, device_type: &str) -> Result<&PlatformDefinition> {
        let key = device_type.trim().to_ascii_lowercase();
        self.platforms
            .get(&key)
            .or_else(|| self.platforms.get(&format!("cisco_{key}")))
            .ok_or_else(|| {
                PlatformError::UnknownPlatform {
                    name: device_type.to_string(),
                }
                .into()
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.platforms.contains_key(name)
    }
}
