//! History and persona files.
//!
//! History is a JSON array of messages; a missing file is an empty
//! conversation. Writes go through a temp file in the same directory and an
//! atomic rename.

use anyhow::Context;
use bt_domain::config::Persona;
use bt_domain::message::Message;
use std::io::Write;
use std::path::Path;

pub fn load_history(path: &Path) -> anyhow::Result<Vec<Message>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_history(path: &Path, history: &[Message]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let json = serde_json::to_string_pretty(history)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Persona from a TOML file with the same fields as the `[persona]` section.
pub fn load_persona(path: &Path) -> anyhow::Result<Persona> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
