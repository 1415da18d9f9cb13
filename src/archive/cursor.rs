use crate::archive::timestamp::Timestamp;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const CURSOR_FILE_NAME: &str = "cursor.json";

/// Last archived message timestamp per channel ID.
///
/// Values are kept as the stored strings so entries for channels that are no
/// longer allow-listed survive a load/save cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorState {
    channels: BTreeMap<String, String>,
}

impl CursorState {
    pub fn get(&self, channel_id: &str) -> Option<Timestamp> {
        self.channels
            .get(channel_id)
            .and_then(|raw| Timestamp::parse(raw).ok())
    }

    /// Move the cursor forward; returns false when `candidate` is not newer.
    pub fn advance(&mut self, channel_id: &str, candidate: &Timestamp) -> bool {
        if let Some(current) = self.get(channel_id)
            && *candidate <= current
        {
            return false;
        }
        self.channels
            .insert(channel_id.to_string(), candidate.as_str().to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.channels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(CURSOR_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<CursorState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let channels: BTreeMap<String, String> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(CursorState { channels }))
    }

    /// Load the stored state; unreadable state degrades to an empty one.
    pub fn load(&self) -> CursorState {
        match self.read() {
            Ok(state) => state.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "failed to read cursor state; starting fresh"
                );
                CursorState::default()
            }
        }
    }

    /// Replace the cursor file atomically via a sibling temp file.
    pub fn save(&self, state: &CursorState) -> Result<()> {
        let dir = self
            .path
            .parent()
            .context("cursor path has no parent directory")?;
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

        let data = serde_json::to_string_pretty(&state.channels)?;
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(format!("{data}\n").as_bytes())
            .context("failed to write cursor temp file")?;
        tmp.as_file()
            .sync_all()
            .context("failed to sync cursor temp file")?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
