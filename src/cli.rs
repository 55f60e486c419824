//! CLI domain: parse, route, output, and presentation only.
//! Ledger persistence for command runs lives here; the engine never touches disk state.

mod ledger_file;
mod output;
mod parse;
mod presentation;
mod route;

pub use ledger_file::{load_ledger, save_ledger};
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use route::{CommandOutput, RunContext, EXIT_PARTIAL};
