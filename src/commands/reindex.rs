use anyhow::Result;

use crate::archive::config::load_config_unchecked;
use crate::archive::sync::publish_site;
use crate::commands::CommandReport;

/// Rebuild indexes and site metadata from pages already on disk. Offline.
pub fn run() -> Result<CommandReport> {
    let cfg = load_config_unchecked()?;
    let mut report = CommandReport::new("reindex");
    report.detail(format!("output_dir={}", cfg.output_dir.display()));
    report.detail(format!("format={}", cfg.format.label()));

    let stats = publish_site(&cfg.output_dir, cfg.format, cfg.site_base_url.as_deref())?;
    tracing::info!(
        channels = stats.channels,
        written = stats.written,
        unchanged = stats.unchanged,
        "indexes published"
    );
    report.detail(format!("channels={}", stats.channels));
    report.detail(format!("files_written={}", stats.written));
    report.detail(format!("files_unchanged={}", stats.unchanged));
    report.detail(format!("changed={}", stats.written > 0));
    Ok(report)
}
