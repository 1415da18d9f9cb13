//! Discovery of already-rendered channels and days on disk.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Channel directory names under `daily_root`, sorted case-insensitively.
pub fn list_channels(daily_root: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(daily_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to list {}", daily_root.display()));
        }
    };

    let mut channels = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", daily_root.display()))?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            channels.push(name.to_string());
        }
    }
    channels.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    Ok(channels)
}

/// Day pages `<YYYY-MM-DD>.<extension>` in `channel_dir`, newest first.
pub fn list_dates(channel_dir: &Path, extension: &str) -> Result<Vec<NaiveDate>> {
    let entries = match fs::read_dir(channel_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to list {}", channel_dir.display()));
        }
    };

    let suffix = format!(".{extension}");
    let mut dates = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", channel_dir.display()))?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(&suffix)) else {
            continue;
        };
        if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
            dates.push(date);
        }
    }
    dates.sort_by(|a, b| b.cmp(a));
    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_root_lists_nothing() {
        let tmp = tempdir().expect("tempdir");
        assert!(list_channels(&tmp.path().join("daily")).expect("list").is_empty());
        assert!(list_dates(&tmp.path().join("dev"), "html").expect("list").is_empty());
    }

    #[test]
    fn channels_sort_case_insensitively() {
        let tmp = tempdir().expect("tempdir");
        for name in ["fineract", "Dev", "announcements"] {
            fs::create_dir_all(tmp.path().join(name)).expect("mkdir");
        }
        fs::write(tmp.path().join("stray.html"), "x").expect("write");
        assert_eq!(
            list_channels(tmp.path()).expect("list"),
            vec!["announcements", "Dev", "fineract"]
        );
    }

    #[test]
    fn dates_are_newest_first_and_skip_non_pages() {
        let tmp = tempdir().expect("tempdir");
        for name in [
            "2026-02-12.html",
            "2026-02-14.html",
            "index.html",
            "notes.html",
            "2026-02-13.md",
        ] {
            fs::write(tmp.path().join(name), "x").expect("write");
        }
        let got: Vec<String> = list_dates(tmp.path(), "html")
            .expect("list")
            .into_iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(got, vec!["2026-02-14", "2026-02-12"]);
    }
}
