use crate::error::ArchiveError;
use crate::slack::client::DEFAULT_API_BASE_URL;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const TOKEN_ENV: &str = "CHAT_ARCHIVE_SLACK_TOKEN";
pub const LEGACY_TOKEN_ENV: &str = "SLACK_TOKEN";
pub const CHANNELS_ENV: &str = "CHAT_ARCHIVE_CHANNELS";
const CONFIG_PATH_ENV: &str = "CHAT_ARCHIVE_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "chat-archive.toml";
const DEFAULT_OUTPUT_DIR: &str = "docs";
const DEFAULT_STATE_DIR: &str = "state";
const DEFAULT_LOOKBACK_DAYS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Markdown,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "html" => Some(OutputFormat::Html),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "markdown",
        }
    }
}

#[derive(Clone)]
pub struct ArchiveConfig {
    pub slack_token: String,
    pub channel_allowlist: Vec<String>,
    pub output_dir: PathBuf,
    pub state_dir: PathBuf,
    pub lookback_days: u32,
    pub site_base_url: Option<String>,
    pub format: OutputFormat,
    pub api_base_url: String,
}

impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("slack_token", &redact_token(&self.slack_token))
            .field("channel_allowlist", &self.channel_allowlist)
            .field("output_dir", &self.output_dir)
            .field("state_dir", &self.state_dir)
            .field("lookback_days", &self.lookback_days)
            .field("site_base_url", &self.site_base_url)
            .field("format", &self.format)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl ArchiveConfig {
    pub fn daily_root(&self) -> PathBuf {
        self.output_dir.join("daily")
    }
}

pub fn redact_token(token: &str) -> String {
    if token.is_empty() {
        return "<unset>".to_string();
    }
    let prefix: String = token.chars().take(5).collect();
    format!("{prefix}…(redacted)")
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub channels: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub lookback_days: Option<u32>,
    pub site_base_url: Option<String>,
    pub format: Option<OutputFormat>,
    pub api_base_url: Option<String>,
}

pub fn parse_allowlist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.strip_prefix('#').map(str::trim).unwrap_or(token))
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn normalize_allowlist(entries: &[String]) -> Vec<String> {
    parse_allowlist(&entries.join(","))
}

pub fn normalize_site_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_non_empty(lookup: &impl Fn(&str) -> Option<String>, vars: &[&str]) -> Option<String> {
    vars.iter().find_map(|var| non_empty(lookup, var))
}

/// Build the effective configuration from a file layer and an env lookup.
///
/// Environment values win over the file. Nothing is validated here so the
/// `status` command can report a half-configured setup.
pub fn resolve_with(
    lookup: impl Fn(&str) -> Option<String>,
    file: FileConfig,
) -> ArchiveConfig {
    let slack_token = first_non_empty(&lookup, &[TOKEN_ENV, LEGACY_TOKEN_ENV]).unwrap_or_default();

    let channel_allowlist = match lookup(CHANNELS_ENV) {
        Some(raw) => parse_allowlist(&raw),
        None => file
            .channels
            .as_deref()
            .map(normalize_allowlist)
            .unwrap_or_default(),
    };

    let output_dir = non_empty(&lookup, "CHAT_ARCHIVE_OUTPUT_DIR")
        .map(PathBuf::from)
        .or(file.output_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let state_dir = non_empty(&lookup, "CHAT_ARCHIVE_STATE_DIR")
        .map(PathBuf::from)
        .or(file.state_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

    let file_lookback = file.lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
    let lookback_days = match non_empty(&lookup, "CHAT_ARCHIVE_LOOKBACK_DAYS") {
        Some(raw) => raw.parse::<u32>().ok().unwrap_or(file_lookback),
        None => file_lookback,
    };

    let site_base_url = match lookup("CHAT_ARCHIVE_SITE_BASE_URL") {
        Some(raw) => normalize_site_base_url(&raw),
        None => file.site_base_url.as_deref().and_then(normalize_site_base_url),
    };

    let format = non_empty(&lookup, "CHAT_ARCHIVE_FORMAT")
        .and_then(|raw| OutputFormat::parse(&raw))
        .or(file.format)
        .unwrap_or_default();

    let api_base_url = non_empty(&lookup, "CHAT_ARCHIVE_API_BASE_URL")
        .or(file.api_base_url)
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    ArchiveConfig {
        slack_token,
        channel_allowlist,
        output_dir,
        state_dir,
        lookback_days,
        site_base_url,
        format,
        api_base_url,
    }
}

pub fn validate(cfg: &ArchiveConfig) -> Result<()> {
    if cfg.slack_token.trim().is_empty() {
        return Err(ArchiveError::MissingToken(TOKEN_ENV).into());
    }
    if cfg.channel_allowlist.is_empty() {
        return Err(ArchiveError::EmptyAllowlist(CHANNELS_ENV).into());
    }
    if cfg.lookback_days == 0 {
        return Err(ArchiveError::InvalidConfig(
            "lookback days must be a positive integer".to_string(),
        )
        .into());
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var(CONFIG_PATH_ENV) {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

pub fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|err| ArchiveError::InvalidConfig(format!("{}: {err}", path.display())))?;
    let parsed = toml::from_str(&raw).map_err(|err| {
        ArchiveError::InvalidConfig(format!("failed to parse {}: {err}", path.display()))
    })?;
    Ok(parsed)
}

fn load_file_config() -> Result<FileConfig> {
    match resolve_config_path() {
        Some(path) => read_file_config(&path),
        None => Ok(FileConfig::default()),
    }
}

/// Effective configuration without validation.
pub fn load_config_unchecked() -> Result<ArchiveConfig> {
    let file = load_file_config()?;
    Ok(resolve_with(|var| env::var(var).ok(), file))
}

pub fn load_config() -> Result<ArchiveConfig> {
    let cfg = load_config_unchecked()?;
    validate(&cfg)?;
    Ok(cfg)
}
