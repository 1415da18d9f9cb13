use anyhow::Result;
use std::env;

use crate::archive::config::{
    ArchiveConfig, LEGACY_TOKEN_ENV, TOKEN_ENV, load_config_unchecked, redact_token, validate,
};
use crate::archive::cursor::CursorStore;
use crate::commands::CommandReport;

include!(concat!(env!("OUT_DIR"), "/env_keys.rs"));

fn env_key_detail(key: &str, value: Option<String>) -> String {
    match value {
        None => format!("env {key}=<unset>"),
        Some(value) if key == TOKEN_ENV || key == LEGACY_TOKEN_ENV => {
            format!("env {key}={}", redact_token(value.trim()))
        }
        Some(value) => format!("env {key}={value}"),
    }
}

pub fn config_report(cfg: &ArchiveConfig, env_lookup: impl Fn(&str) -> Option<String>) -> CommandReport {
    let mut report = CommandReport::new("status");
    report.detail(format!("slack_token={}", redact_token(&cfg.slack_token)));
    report.detail(format!("channels={}", cfg.channel_allowlist.join(",")));
    report.detail(format!("output_dir={}", cfg.output_dir.display()));
    report.detail(format!("state_dir={}", cfg.state_dir.display()));
    report.detail(format!("lookback_days={}", cfg.lookback_days));
    report.detail(format!("format={}", cfg.format.label()));
    report.detail(format!(
        "site_base_url={}",
        cfg.site_base_url.as_deref().unwrap_or("<unset>")
    ));
    report.detail(format!("api_base_url={}", cfg.api_base_url));

    let mut keys: Vec<&str> = KNOWN_ENV_KEYS.to_vec();
    keys.push(LEGACY_TOKEN_ENV);
    for key in keys {
        report.detail(env_key_detail(key, env_lookup(key)));
    }

    if let Err(err) = validate(cfg) {
        report.issue(format!("{err:#}"));
    }

    let store = CursorStore::new(&cfg.state_dir);
    let cursors = store.load();
    report.detail(format!("cursor_file={}", store.path().display()));
    report.detail(format!("cursor_channels={}", cursors.len()));
    if cursors.is_empty() {
        report.detail("cursor_state=empty; next sync starts from the lookback window");
    }
    for (channel_id, ts) in cursors.iter() {
        report.detail(format!("cursor {channel_id}={ts}"));
    }

    if !cfg.output_dir.is_dir() {
        report.issue(format!("missing output dir ({})", cfg.output_dir.display()));
    }
    if !cfg.state_dir.is_dir() {
        report.issue(format!("missing state dir ({})", cfg.state_dir.display()));
    }
    report
}

pub fn run() -> Result<CommandReport> {
    let cfg = load_config_unchecked()?;
    Ok(config_report(&cfg, |key| env::var(key).ok()))
}
