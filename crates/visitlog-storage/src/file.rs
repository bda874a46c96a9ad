use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tempfile::NamedTempFile;

use crate::SlotStorage;

/// Slot storage backed by one JSON file per key inside a data directory.
///
/// Key `k` maps to `<dir>/<k>.json`. Every write goes to its own uniquely
/// named temp file in the same directory and is renamed into place, so
/// writers in other processes never share a temp file and readers see either
/// the old or the new contents. Read-modify-write across processes is still
/// last-writer-wins.
#[derive(Debug)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    /// Open (creating if needed) the data directory.
    pub fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains(['/', '\\'])
            || key.contains("..")
        {
            bail!("invalid slot key: {key:?}");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SlotStorage for FileSlot {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read slot {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("create temp file in {}", self.dir.display()))?;
        tmp.write_all(value.as_bytes())
            .and_then(|()| tmp.flush())
            .with_context(|| format!("write temp file for slot {key}"))?;
        tmp.persist(&path)
            .with_context(|| format!("rename temp file into {}", path.display()))?;
        tracing::debug!(key, bytes = value.len(), "slot written");
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove slot {}", path.display())),
        }
    }
}
