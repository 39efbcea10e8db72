//! Built-in platform definitions.
//!
//! Each module exposes `platform()` building the definition for one CLI.

pub mod arista_eos;
pub mod cisco_ios;
pub mod cisco_nxos;
pub mod juniper_junos;
