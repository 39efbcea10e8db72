//! Channel layer for prompt detection over the PTY shell.
//!
//! Output is accumulated with ANSI escapes stripped and only the tail is
//! searched for the device prompt.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::{DEFAULT_SEARCH_DEPTH, PtyChannel};
