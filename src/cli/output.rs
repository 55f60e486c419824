//! CLI output: error mapping for the terminal.

/// Render an error with its cause chain on one line
pub fn map_error(e: &anyhow::Error) -> String {
    format!("Error: {:#}", e)
}
