use anyhow::Result;
use chrono::Utc;

use crate::archive::config::load_config;
use crate::archive::sync::{SyncOutcome, run_sync};
use crate::commands::CommandReport;
use crate::slack::client::SlackClient;

pub fn report_outcome(outcome: &SyncOutcome) -> CommandReport {
    let mut report = CommandReport::new("sync");
    if let Some(team) = &outcome.team {
        report.detail(format!("team={team}"));
    }
    report.detail(format!("channels={}", outcome.resolved.join(",")));
    report.detail(format!("messages_fetched={}", outcome.messages_fetched));
    report.detail(format!("pages_written={}", outcome.pages_written));
    report.detail(format!("pages_unchanged={}", outcome.pages_unchanged));
    report.detail(format!("site_files_written={}", outcome.site_files_written));
    report.detail(format!("cursors_advanced={}", outcome.cursors_advanced));
    report.detail(format!("cursor_saved={}", outcome.cursor_saved));
    report.detail(format!("changed={}", outcome.changed()));

    for name in &outcome.missing {
        report.issue(format!("channel not found: {name}"));
    }
    for name in &outcome.skipped {
        report.issue(format!("channel skipped (unsafe name): {name}"));
    }
    for failure in &outcome.failed {
        report.issue(format!("channel {} failed: {}", failure.channel, failure.error));
    }
    if outcome.pages_failed > 0 {
        report.issue(format!("{} page(s) could not be written", outcome.pages_failed));
    }
    if let Some(error) = &outcome.site_error {
        report.issue(format!("index publish failed: {error}"));
    }
    report
}

pub fn run() -> Result<CommandReport> {
    let cfg = load_config()?;
    tracing::debug!(config = ?cfg, "loaded configuration");
    let client = SlackClient::new(&cfg.api_base_url, &cfg.slack_token)?;
    let outcome = run_sync(&cfg, &client, Utc::now())?;
    Ok(report_outcome(&outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::sync::ChannelFailure;

    #[test]
    fn channel_failures_become_issues() {
        let outcome = SyncOutcome {
            resolved: vec!["dev".to_string(), "ops".to_string()],
            failed: vec![ChannelFailure {
                channel: "ops".to_string(),
                error: "history request not ok: ratelimited".to_string(),
            }],
            pages_written: 2,
            ..SyncOutcome::default()
        };
        let report = report_outcome(&outcome);
        assert!(!report.ok);
        assert!(report.details.contains(&"channels=dev,ops".to_string()));
        assert!(report.details.contains(&"changed=true".to_string()));
        assert_eq!(
            report.issues,
            vec!["channel ops failed: history request not ok: ratelimited"]
        );
    }
}
