//! One incremental archive run.

use crate::archive::channels;
use crate::archive::config::{ArchiveConfig, OutputFormat};
use crate::archive::cursor::{CursorState, CursorStore};
use crate::archive::daily::group_by_date;
use crate::archive::lock::StateLock;
use crate::archive::render::{self, index, site};
use crate::archive::rows::{RunCaches, build_rows};
use crate::archive::threads::{ThreadIndex, reconcile_day};
use crate::archive::timestamp::Timestamp;
use crate::archive::writer::write_if_changed;
use crate::error::ArchiveError;
use crate::slack::api::{ApiResult, Channel, ChatApi};
use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOutcome {
    pub team: Option<String>,
    pub resolved: Vec<String>,
    pub missing: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<ChannelFailure>,
    pub messages_fetched: usize,
    pub pages_written: usize,
    pub pages_unchanged: usize,
    pub pages_failed: usize,
    pub site_files_written: usize,
    pub site_error: Option<String>,
    pub cursors_advanced: usize,
    pub cursor_saved: bool,
}

impl SyncOutcome {
    /// Any page, index, metadata file or cursor value changed.
    pub fn changed(&self) -> bool {
        self.pages_written > 0 || self.site_files_written > 0 || self.cursors_advanced > 0
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PublishStats {
    pub channels: usize,
    pub written: usize,
    pub unchanged: usize,
}

#[derive(Debug, Default)]
struct ChannelStats {
    messages: usize,
    written: usize,
    unchanged: usize,
    failed: usize,
}

/// Lower bound for the history fetch of one channel.
///
/// The lookback window normally applies; a cursor older than the window wins
/// so an overdue run does not skip messages.
pub fn fetch_origin(now: DateTime<Utc>, lookback_days: u32, cursor: Option<&Timestamp>) -> Timestamp {
    let window_start = TimeDelta::try_days(i64::from(lookback_days))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::UNIX_EPOCH);
    match cursor {
        Some(cursor) if cursor.to_datetime() < window_start => cursor.clone(),
        _ => Timestamp::from_epoch_secs(window_start.timestamp()),
    }
}

/// A channel name usable as a single directory name.
pub fn is_safe_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn identity_check<A: ChatApi + ?Sized>(api: &A) -> Result<Option<String>> {
    match api.auth_test() {
        Ok(ApiResult::Success(identity)) => {
            tracing::info!(
                team = identity.team.as_deref().unwrap_or("-"),
                user = identity.user.as_deref().unwrap_or("-"),
                "identity check ok"
            );
            Ok(identity.team)
        }
        Ok(ApiResult::Failure { error }) => Err(ArchiveError::AuthFailed(error).into()),
        Err(err) => Err(ArchiveError::AuthFailed(format!("{err:#}")).into()),
    }
}

fn live_channels<A: ChatApi + ?Sized>(api: &A) -> Result<Vec<Channel>> {
    match api.list_channels() {
        Ok(ApiResult::Success(channels)) => Ok(channels),
        Ok(ApiResult::Failure { error }) => Err(ArchiveError::ChannelListFailed(error).into()),
        Err(err) => Err(ArchiveError::ChannelListFailed(format!("{err:#}")).into()),
    }
}

pub fn run_sync<A: ChatApi + ?Sized>(
    cfg: &ArchiveConfig,
    api: &A,
    now: DateTime<Utc>,
) -> Result<SyncOutcome> {
    let mut outcome = SyncOutcome {
        team: identity_check(api)?,
        ..SyncOutcome::default()
    };

    let live = live_channels(api)?;
    let resolution = channels::resolve(&cfg.channel_allowlist, &live);
    for name in &resolution.missing {
        tracing::warn!(channel = %name, "allow-listed channel not found");
    }
    outcome.missing = resolution.missing;
    if resolution.resolved.is_empty() {
        return Err(ArchiveError::NoChannelsResolved.into());
    }

    let lock = StateLock::acquire(&cfg.state_dir)?;
    tracing::debug!(lock = %lock.path().display(), "state lock acquired");
    let store = CursorStore::new(&cfg.state_dir);
    let mut cursors = store.load();
    let mut caches = RunCaches::default();

    for channel in &resolution.resolved {
        if !is_safe_segment(&channel.name) {
            tracing::warn!(channel = %channel.name, id = %channel.id, "skipping channel with unsafe name");
            outcome.skipped.push(channel.name.clone());
            continue;
        }
        outcome.resolved.push(channel.name.clone());

        match sync_channel(cfg, api, channel, now, &mut cursors, &mut caches) {
            Ok((stats, advanced)) => {
                tracing::info!(
                    channel = %channel.name,
                    messages = stats.messages,
                    written = stats.written,
                    unchanged = stats.unchanged,
                    "channel synced"
                );
                outcome.messages_fetched += stats.messages;
                outcome.pages_written += stats.written;
                outcome.pages_unchanged += stats.unchanged;
                outcome.pages_failed += stats.failed;
                if advanced {
                    outcome.cursors_advanced += 1;
                }
            }
            Err(err) => {
                let error = format!("{err:#}");
                tracing::error!(channel = %channel.name, error = %error, "channel sync failed; skipping");
                outcome.failed.push(ChannelFailure {
                    channel: channel.name.clone(),
                    error,
                });
            }
        }
    }

    if outcome.cursors_advanced > 0 {
        match store.save(&cursors) {
            Ok(()) => outcome.cursor_saved = true,
            Err(err) => {
                tracing::error!(path = %store.path().display(), error = %format!("{err:#}"), "failed to save cursor state");
            }
        }
    }

    match publish_site(&cfg.output_dir, cfg.format, cfg.site_base_url.as_deref()) {
        Ok(stats) => outcome.site_files_written = stats.written,
        Err(err) => {
            let error = format!("{err:#}");
            tracing::error!(error = %error, "failed to publish indexes");
            outcome.site_error = Some(error);
        }
    }

    drop(lock);
    Ok(outcome)
}

fn sync_channel<A: ChatApi + ?Sized>(
    cfg: &ArchiveConfig,
    api: &A,
    channel: &Channel,
    now: DateTime<Utc>,
    cursors: &mut CursorState,
    caches: &mut RunCaches,
) -> Result<(ChannelStats, bool)> {
    let prior = cursors.get(&channel.id);
    let origin = fetch_origin(now, cfg.lookback_days, prior.as_ref());
    tracing::debug!(channel = %channel.name, oldest = %origin, "fetching history");

    let mut messages = match api.channel_history(&channel.id, &origin)? {
        ApiResult::Success(messages) => messages,
        ApiResult::Failure { error } => return Err(anyhow!("history request not ok: {error}")),
    };
    messages.sort_by(|a, b| a.ts.cmp(&b.ts));
    let newest = messages.iter().filter_map(|m| m.ts.as_ref()).max().cloned();

    let mut stats = ChannelStats {
        messages: messages.len(),
        ..ChannelStats::default()
    };
    let threads = ThreadIndex::build(&messages);
    let channel_dir = cfg.daily_root().join(&channel.name);

    for (date, day) in group_by_date(&messages, &threads) {
        let entries = reconcile_day(api, &channel.id, &day, &threads, &mut caches.thread_replies);
        let rows = build_rows(api, &channel.id, &entries, caches);
        let page = render::daily_page(cfg.format, &channel.name, date, &rows);
        let path = channel_dir.join(format!("{date}.{}", cfg.format.extension()));
        match write_if_changed(&path, &page) {
            Ok(true) => stats.written += 1,
            Ok(false) => stats.unchanged += 1,
            Err(err) => {
                tracing::error!(channel = %channel.name, date = %date, error = %format!("{err:#}"), "failed to write page");
                stats.failed += 1;
            }
        }
    }

    // A channel with unwritten pages keeps its old cursor so the next run retries.
    let advanced = match &newest {
        Some(ts) if stats.failed == 0 => cursors.advance(&channel.id, ts),
        _ => false,
    };
    Ok((stats, advanced))
}

/// Re-render indexes, stylesheet and site metadata from the pages on disk.
pub fn publish_site(
    output_dir: &Path,
    format: OutputFormat,
    site_base_url: Option<&str>,
) -> Result<PublishStats> {
    let daily_root = output_dir.join("daily");
    let ext = format.extension();
    let mut stats = PublishStats::default();
    let mut record = |changed: bool| {
        if changed {
            stats.written += 1;
        } else {
            stats.unchanged += 1;
        }
    };

    let mut listing = Vec::new();
    for channel in index::list_channels(&daily_root)? {
        let channel_dir = daily_root.join(&channel);
        let dates = index::list_dates(&channel_dir, ext)?;
        let page = render::channel_index(format, &channel, &dates);
        record(write_if_changed(&channel_dir.join(format!("index.{ext}")), &page)?);
        listing.push((channel, dates));
    }

    let names: Vec<String> = listing.iter().map(|(name, _)| name.clone()).collect();
    let global = render::global_index(format, &names);
    record(write_if_changed(&output_dir.join(format!("index.{ext}")), &global)?);
    record(write_if_changed(
        &output_dir.join(render::STYLESHEET_PATH),
        render::STYLESHEET,
    )?);

    if let Some(base) = site_base_url {
        record(write_if_changed(&output_dir.join("robots.txt"), &site::robots_txt(base))?);
        let sitemap = site::sitemap_xml(base, format, &listing);
        record(write_if_changed(&output_dir.join("sitemap.xml"), &sitemap)?);
    }

    stats.channels = listing.len();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::{FakeApi, message, reply, user};
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    const ROOT_TS: &str = "1770887700.000000";
    const REPLY_TS: &str = "1770887760.000000";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 12, 12, 0, 0)
            .single()
            .expect("now")
    }

    fn config(root: &Path, channels: &[&str]) -> ArchiveConfig {
        ArchiveConfig {
            slack_token: "xoxb-test".to_string(),
            channel_allowlist: channels.iter().map(|c| c.to_string()).collect(),
            output_dir: root.join("docs"),
            state_dir: root.join("state"),
            lookback_days: 1,
            site_base_url: None,
            format: OutputFormat::Html,
            api_base_url: "http://127.0.0.1:1".to_string(),
        }
    }

    fn thread_api() -> FakeApi {
        FakeApi::default()
            .with_channels(ApiResult::Success(vec![Channel::new("C1", "dev")]))
            .with_history(
                "C1",
                ApiResult::Success(vec![
                    reply(REPLY_TS, ROOT_TS, "reply text"),
                    message(ROOT_TS, Some(ROOT_TS), "root text"),
                ]),
            )
            .with_replies(
                "C1",
                ROOT_TS,
                vec![
                    message(ROOT_TS, Some(ROOT_TS), "root text"),
                    reply(REPLY_TS, ROOT_TS, "reply text"),
                ],
            )
            .with_user(user("U1", "ada"))
            .with_user(user("U2", "grace"))
    }

    fn ts(raw: &str) -> Timestamp {
        Timestamp::parse(raw).expect("ts")
    }

    #[test]
    fn overdue_cursor_wins_over_window() {
        let stale = Timestamp::from_epoch_secs((now() - TimeDelta::days(5)).timestamp());
        assert_eq!(fetch_origin(now(), 1, Some(&stale)), stale);
    }

    #[test]
    fn recent_cursor_uses_window_bound() {
        let fresh = Timestamp::from_epoch_secs((now() - TimeDelta::minutes(30)).timestamp());
        let bound = Timestamp::from_epoch_secs((now() - TimeDelta::days(1)).timestamp());
        assert_eq!(fetch_origin(now(), 1, Some(&fresh)), bound);
        assert_eq!(fetch_origin(now(), 1, None), bound);
    }

    #[test]
    fn history_request_starts_at_overdue_cursor() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["dev"]);
        let stale = "1770400000.000100";
        fs::create_dir_all(&cfg.state_dir).expect("mkdir");
        fs::write(cfg.state_dir.join("cursor.json"), format!("{{\"C1\": \"{stale}\"}}")).expect("cursor");

        let api = thread_api();
        run_sync(&cfg, &api, now()).expect("sync");
        let requests = api.history_requests();
        assert_eq!(requests, vec![("C1".to_string(), ts(stale))]);
    }

    #[test]
    fn channels_sharing_a_root_ts_keep_their_own_replies() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["dev", "ops"]);
        let ops_reply_ts = "1770887800.000000";
        let api = thread_api()
            .with_channels(ApiResult::Success(vec![
                Channel::new("C1", "dev"),
                Channel::new("C2", "ops"),
            ]))
            .with_history(
                "C2",
                ApiResult::Success(vec![message(ROOT_TS, Some(ROOT_TS), "ops root")]),
            )
            .with_replies("C2", ROOT_TS, vec![reply(ops_reply_ts, ROOT_TS, "ops reply")]);

        let outcome = run_sync(&cfg, &api, now()).expect("sync");
        assert!(outcome.failed.is_empty());
        assert_eq!(api.reply_calls(), 2);

        let dev = fs::read_to_string(cfg.daily_root().join("dev/2026-02-12.html")).expect("dev page");
        let ops = fs::read_to_string(cfg.daily_root().join("ops/2026-02-12.html")).expect("ops page");
        assert!(dev.contains("reply text"));
        assert!(!dev.contains("ops reply"));
        assert!(ops.contains("ops reply"));
        assert!(!ops.contains("reply text"));
    }

    #[test]
    fn unsafe_segments_are_rejected() {
        assert!(is_safe_segment("dev"));
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(!is_safe_segment(bad), "{bad}");
        }
    }

    #[test]
    fn root_and_reply_render_as_one_thread() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["dev"]);
        let api = thread_api();

        let outcome = run_sync(&cfg, &api, now()).expect("sync");
        assert_eq!(outcome.resolved, vec!["dev"]);
        assert_eq!(outcome.pages_written, 1);
        assert!(outcome.cursor_saved);
        assert!(outcome.changed());

        let page = fs::read_to_string(cfg.daily_root().join("dev/2026-02-12.html")).expect("page");
        assert_eq!(page.matches("root text").count(), 1);
        assert_eq!(page.matches("reply text").count(), 1);
        assert_eq!(page.matches("<section class=\"archive-thread\"").count(), 1);
        let root = page.find("root text").expect("root");
        let thread = page.find("archive-thread").expect("thread");
        let child = page.find("reply text").expect("reply");
        assert!(root < thread && thread < child);

        let cursors = CursorStore::new(&cfg.state_dir).load();
        assert_eq!(cursors.get("C1"), Some(ts(REPLY_TS)));
        assert!(cfg.output_dir.join("index.html").is_file());
        assert!(cfg.daily_root().join("dev/index.html").is_file());
        assert!(cfg.output_dir.join("assets/chat-archive.css").is_file());
        assert!(!cfg.output_dir.join("sitemap.xml").exists());
    }

    #[test]
    fn second_run_over_same_data_changes_nothing() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["dev"]);

        run_sync(&cfg, &thread_api(), now()).expect("first run");
        let cursor_before = fs::read_to_string(cfg.state_dir.join("cursor.json")).expect("cursor");

        let second = run_sync(&cfg, &thread_api(), now()).expect("second run");
        assert_eq!(second.pages_written, 0);
        assert_eq!(second.pages_unchanged, 1);
        assert_eq!(second.site_files_written, 0);
        assert_eq!(second.cursors_advanced, 0);
        assert!(!second.cursor_saved);
        assert!(!second.changed());
        let cursor_after = fs::read_to_string(cfg.state_dir.join("cursor.json")).expect("cursor");
        assert_eq!(cursor_before, cursor_after);
    }

    #[test]
    fn failing_channel_is_skipped_without_touching_its_cursor() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["dev", "ops", "ghost"]);
        let api = thread_api().with_channels(ApiResult::Success(vec![
            Channel::new("C1", "dev"),
            Channel::new("C2", "ops"),
        ]));

        let outcome = run_sync(&cfg, &api, now()).expect("sync");
        assert_eq!(outcome.missing, vec!["ghost"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].channel, "ops");
        assert!(outcome.failed[0].error.contains("channel_not_found"));
        assert_eq!(outcome.pages_written, 1);

        let cursors = CursorStore::new(&cfg.state_dir).load();
        assert!(cursors.get("C1").is_some());
        assert!(cursors.get("C2").is_none());
    }

    #[test]
    fn fatal_identity_failure_leaves_no_files() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["dev"]);
        let api = thread_api().with_auth(ApiResult::failure("invalid_auth"));

        let err = run_sync(&cfg, &api, now()).expect_err("auth failure");
        let archive_err = err.downcast_ref::<ArchiveError>().expect("archive error");
        assert_eq!(archive_err.code(), "E004_AUTH_FAILED");
        assert!(!cfg.output_dir.exists());
        assert!(!cfg.state_dir.exists());
    }

    #[test]
    fn no_resolved_channels_is_fatal() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["ghost"]);
        let err = run_sync(&cfg, &thread_api(), now()).expect_err("nothing resolved");
        let archive_err = err.downcast_ref::<ArchiveError>().expect("archive error");
        assert_eq!(archive_err.code(), "E006_NO_CHANNELS");
    }

    #[test]
    fn channel_listing_failure_is_fatal() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["dev"]);
        let api = thread_api().with_channels(ApiResult::http_status(500));
        let err = run_sync(&cfg, &api, now()).expect_err("listing failure");
        assert!(format!("{err:#}").contains("http_status_500"));
    }

    #[test]
    fn unsafe_channel_names_are_skipped() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["dev", ".."]);
        let api = thread_api().with_channels(ApiResult::Success(vec![
            Channel::new("C1", "dev"),
            Channel::new("C9", ".."),
        ]));
        let outcome = run_sync(&cfg, &api, now()).expect("sync");
        assert_eq!(outcome.skipped, vec![".."]);
        assert_eq!(outcome.resolved, vec!["dev"]);
    }

    #[test]
    fn reply_on_later_day_nests_under_parent_and_fetches_once() {
        let tmp = tempdir().expect("tempdir");
        let cfg = config(tmp.path(), &["dev"]);
        let next_day = "1770974100.000000";
        let api = FakeApi::default()
            .with_channels(ApiResult::Success(vec![Channel::new("C1", "dev")]))
            .with_history(
                "C1",
                ApiResult::Success(vec![
                    message(ROOT_TS, Some(ROOT_TS), "root text"),
                    reply(next_day, ROOT_TS, "late reply"),
                    message("1770974200.000000", None, "other day"),
                ]),
            );

        let outcome = run_sync(&cfg, &api, now()).expect("sync");
        assert_eq!(outcome.pages_written, 2);
        assert_eq!(api.reply_calls(), 1);

        let first = fs::read_to_string(cfg.daily_root().join("dev/2026-02-12.html")).expect("day one");
        let second = fs::read_to_string(cfg.daily_root().join("dev/2026-02-13.html")).expect("day two");
        assert!(first.contains("late reply"));
        assert!(!second.contains("late reply"));
        assert!(second.contains("other day"));
    }

    #[test]
    fn markdown_format_and_site_metadata() {
        let tmp = tempdir().expect("tempdir");
        let mut cfg = config(tmp.path(), &["dev"]);
        cfg.format = OutputFormat::Markdown;
        cfg.site_base_url = Some("https://archive.example.org".to_string());

        run_sync(&cfg, &thread_api(), now()).expect("sync");
        let page = fs::read_to_string(cfg.daily_root().join("dev/2026-02-12.md")).expect("page");
        assert!(page.starts_with("---\n"));
        let robots = fs::read_to_string(cfg.output_dir.join("robots.txt")).expect("robots");
        assert!(robots.contains("Sitemap: https://archive.example.org/sitemap.xml"));
        let sitemap = fs::read_to_string(cfg.output_dir.join("sitemap.xml")).expect("sitemap");
        assert!(sitemap.contains("<loc>https://archive.example.org/daily/dev/2026-02-12/</loc>"));
    }

    #[test]
    fn publish_site_is_idempotent_offline() {
        let tmp = tempdir().expect("tempdir");
        let output = tmp.path().join("docs");
        fs::create_dir_all(output.join("daily/dev")).expect("mkdir");
        fs::write(output.join("daily/dev/2026-02-12.html"), "<p>day</p>").expect("write");

        let first = publish_site(&output, OutputFormat::Html, None).expect("publish");
        assert_eq!(first.channels, 1);
        assert_eq!(first.written, 3);
        let second = publish_site(&output, OutputFormat::Html, None).expect("publish again");
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 3);

        let channel_index = fs::read_to_string(output.join("daily/dev/index.html")).expect("index");
        assert!(channel_index.contains("2026-02-12.html"));
    }
}
