//! Persistent rotation cursors.
//!
//! One cursor per provider id, kept in `~/.banter/cursors.json` with `0o600`
//! permissions on Unix. Updates are read-modify-write under one exclusive
//! `fs2` lock, so concurrent `banter` invocations never lose each other's
//! writes.

use anyhow::Context;
use bt_providers::RotationCursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CursorEntry {
    #[serde(flatten)]
    cursor: RotationCursor,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CursorFile {
    #[serde(default)]
    providers: BTreeMap<String, CursorEntry>,
}

pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    /// Store at `~/.banter/cursors.json`.
    pub fn default_location() -> anyhow::Result<Self> {
        let home = dirs::home_dir()
            .context("unable to determine home directory for the cursor store")?;
        Ok(Self::at(home.join(".banter").join("cursors.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cursor for `provider_id`; the first key when none was saved.
    pub fn load(&self, provider_id: &str) -> anyhow::Result<RotationCursor> {
        if !self.path.exists() {
            return Ok(RotationCursor::default());
        }
        let file = File::open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        fs2::FileExt::lock_shared(&file).context("cursor store lock failed")?;
        let raw = std::io::read_to_string(&file)?;
        fs2::FileExt::unlock(&file).context("cursor store unlock failed")?;

        let store = parse(&raw, &self.path);
        Ok(store
            .providers
            .get(provider_id)
            .map(|e| e.cursor)
            .unwrap_or_default())
    }

    pub fn save(&self, provider_id: &str, cursor: RotationCursor) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let mut file = open_for_update(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        fs2::FileExt::lock_exclusive(&file).context("cursor store lock failed")?;

        let mut raw = String::new();
        file.read_to_string(&mut raw)?;
        let mut store = parse(&raw, &self.path);
        store.providers.insert(
            provider_id.to_owned(),
            CursorEntry {
                cursor,
                updated_at: Utc::now(),
            },
        );

        let json = serde_json::to_string_pretty(&store)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        // Lock is released when `file` is dropped.
        Ok(())
    }
}

/// A corrupt store is treated as empty; the next save rewrites it.
fn parse(raw: &str, path: &Path) -> CursorFile {
    if raw.trim().is_empty() {
        return CursorFile::default();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "corrupt cursor store, starting fresh");
        CursorFile::default()
    })
}

fn open_for_update(path: &Path) -> std::io::Result<File> {
    let mut options = std::fs::OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> CursorStore {
        CursorStore::at(dir.path().join("state").join("cursors.json"))
    }

    #[test]
    fn missing_store_starts_at_first_key() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(store(&tmp).load("gemini").unwrap(), RotationCursor::default());
    }

    #[test]
    fn cursors_round_trip_per_provider() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(&tmp);
        s.save("gemini", RotationCursor::new(2)).unwrap();
        s.save("openai", RotationCursor::new(1)).unwrap();
        s.save("gemini", RotationCursor::new(3)).unwrap();

        assert_eq!(s.load("gemini").unwrap().index, 3);
        assert_eq!(s.load("openai").unwrap().index, 1);
        assert_eq!(s.load("other").unwrap().index, 0);

        let raw = std::fs::read_to_string(s.path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["providers"]["gemini"]["index"], 3);
        assert!(v["providers"]["gemini"]["updated_at"].is_string());
    }

    #[test]
    fn shorter_rewrite_leaves_no_trailing_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(&tmp);
        s.save("a-very-long-provider-identifier", RotationCursor::new(12345)).unwrap();
        std::fs::write(s.path(), "{\"providers\":{}}").unwrap();
        s.save("x", RotationCursor::new(1)).unwrap();
        let raw = std::fs::read_to_string(s.path()).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
    }

    #[test]
    fn corrupt_store_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(&tmp);
        std::fs::create_dir_all(s.path().parent().unwrap()).unwrap();
        std::fs::write(s.path(), "not json").unwrap();
        assert_eq!(s.load("gemini").unwrap().index, 0);
        s.save("gemini", RotationCursor::new(1)).unwrap();
        assert_eq!(s.load("gemini").unwrap().index, 1);
    }

    #[cfg(unix)]
    #[test]
    fn store_is_private_to_the_user() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let s = store(&tmp);
        s.save("gemini", RotationCursor::new(1)).unwrap();
        let mode = std::fs::metadata(s.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
