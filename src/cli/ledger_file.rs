//! Ledger persistence for the CLI: JSON on disk, replaced atomically.

use crate::ledger::Ledger;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read the ledger; a missing file is an empty ledger
pub fn load_ledger(path: &Path) -> anyhow::Result<Ledger> {
    if !path.exists() {
        debug!(path = %path.display(), "No ledger file; starting empty");
        return Ok(Ledger::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ledger {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse ledger {}", path.display()))
}

/// Write the ledger to a sibling temp file, then rename over `path`
pub fn save_ledger(path: &Path, ledger: &Ledger) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(ledger).context("Failed to serialize ledger")?;

    let tmp = temp_path(path);
    {
        let mut file = std::fs::File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace ledger {}", path.display()))?;
    debug!(path = %path.display(), entries = ledger.len(), "Saved ledger");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "ledger".into());
    name.push(".tmp");
    path.with_file_name(name)
}
