//! Driver layer: commands, configuration mode and privilege navigation
//! on top of the SSH shell channel.

mod builder;
mod generic;
mod privilege;
mod response;

pub use builder::DriverBuilder;
pub use generic::GenericDriver;
pub use privilege::{PrivilegeManager, TransitionInfo};
pub use response::Response;
