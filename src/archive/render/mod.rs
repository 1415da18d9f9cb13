//! Pure page rendering. Nothing in here touches the filesystem except the
//! on-disk listing helpers in [`index`].

pub mod html;
pub mod index;
pub mod markdown;
pub mod site;
pub mod text;

use crate::archive::config::OutputFormat;
use chrono::NaiveDate;

pub const STYLESHEET: &str = include_str!("../../../assets/chat-archive.css");
pub const STYLESHEET_PATH: &str = "assets/chat-archive.css";

/// Per-rendering view of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRow {
    pub is_reply: bool,
    /// Reply rendered under its parent on the same page.
    pub nested: bool,
    pub time_label: String,
    pub title: String,
    pub author: String,
    /// Escaped inline fragment from [`text::format_text`].
    pub text: String,
    pub permalink: Option<String>,
    pub reactions: Vec<String>,
}

/// Site-relative link to a channel index.
pub fn channel_href(format: OutputFormat, channel: &str) -> String {
    match format {
        OutputFormat::Html => format!("daily/{channel}/index.html"),
        OutputFormat::Markdown => format!("daily/{channel}/"),
    }
}

/// Site-relative link to a day page.
pub fn day_href(format: OutputFormat, channel: &str, date: NaiveDate) -> String {
    match format {
        OutputFormat::Html => format!("daily/{channel}/{date}.html"),
        OutputFormat::Markdown => format!("daily/{channel}/{date}/"),
    }
}

pub fn daily_page(format: OutputFormat, channel: &str, date: NaiveDate, rows: &[RenderRow]) -> String {
    match format {
        OutputFormat::Html => html::daily_page(channel, date, rows),
        OutputFormat::Markdown => markdown::daily_page(channel, date, rows),
    }
}

pub fn channel_index(format: OutputFormat, channel: &str, dates: &[NaiveDate]) -> String {
    match format {
        OutputFormat::Html => html::channel_index(channel, dates),
        OutputFormat::Markdown => markdown::channel_index(channel, dates),
    }
}

pub fn global_index(format: OutputFormat, channels: &[String]) -> String {
    match format {
        OutputFormat::Html => html::global_index(channels),
        OutputFormat::Markdown => markdown::global_index(channels),
    }
}
