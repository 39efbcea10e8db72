//! Platform definitions for the supported device families.
//!
//! A platform describes the prompts, privilege levels and configuration
//! commands of one CLI. The inventory's `device_type` selects one through
//! the [`PlatformRegistry`].

mod definition;
mod privilege_level;
mod registry;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use privilege_level::PrivilegeLevel;
pub use registry::PlatformRegistry;
