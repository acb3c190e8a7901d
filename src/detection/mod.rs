//! Detection primitives.
//!
//! - `runner`: bounded command execution that never fails outward
//! - `path_finder`: PATH-based executable lookup with fallbacks
//! - `parser`: regex-based version extraction from CLI output

mod parser;
mod path_finder;
mod runner;

pub use parser::{parse_version, ParsedVersion};
pub use runner::{CommandOutcome, CommandRunner, SystemRunner};

pub(crate) use runner::is_shell_safe;
