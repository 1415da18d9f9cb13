//! Standalone HTML documents.

use super::RenderRow;
use chrono::NaiveDate;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use regex::Regex;
use std::sync::LazyLock;

const ROOT_STYLESHEET: &str = "assets/chat-archive.css";
const CHANNEL_STYLESHEET: &str = "../../assets/chat-archive.css";

static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*]|\u{2022})\s+(.+)$").expect("bullet regex should compile")
});
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+(.+)$").expect("numbered regex should compile"));
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<a\b[^>]*>.*?</a>").expect("anchor regex should compile")
});

fn page_shell(title: &str, stylesheet: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                link rel="stylesheet" href=(stylesheet);
            }
            body {
                main class="archive-page" { (body) }
            }
        }
    }
    .into_string()
}

pub fn daily_page(channel: &str, date: NaiveDate, rows: &[RenderRow]) -> String {
    let date = date.to_string();
    let body = html! {
        header class="archive-header" {
            p class="archive-breadcrumb" {
                a href="../../index.html" { "Channels" }
                " / "
                a href="index.html" { "#" (channel) }
                " / "
                (date)
            }
            h1 { "#" (channel) " " (date) }
        }
        section class="archive-log" { (log(rows)) }
    };
    page_shell(&format!("#{channel} {date}"), CHANNEL_STYLESHEET, body)
}

/// Rows in order; each run of nested replies is wrapped in one thread section.
fn log(rows: &[RenderRow]) -> Markup {
    let mut out = String::new();
    let mut index = 0;
    while index < rows.len() {
        if !rows[index].nested {
            out.push_str(&message(&rows[index]).into_string());
            index += 1;
            continue;
        }
        let start = index;
        while index < rows.len() && rows[index].nested {
            index += 1;
        }
        let thread = html! {
            section class="archive-thread" aria-label="Thread replies" {
                @for row in &rows[start..index] { (message(row)) }
            }
        };
        out.push_str(&thread.into_string());
    }
    PreEscaped(out)
}

fn message(row: &RenderRow) -> Markup {
    let class = if row.is_reply {
        "archive-message archive-message-reply"
    } else {
        "archive-message"
    };
    html! {
        article class=(class) {
            div class="archive-meta" {
                @if row.is_reply {
                    span class="archive-reply-indicator" aria-hidden="true" { (PreEscaped("&rarr;")) }
                    span class="archive-reply-label" { "reply" }
                }
                @match &row.permalink {
                    Some(href) => {
                        a class="archive-time archive-time-link" href=(href) title=(row.title) { (row.time_label) }
                    }
                    None => {
                        span class="archive-time" title=(row.title) { (row.time_label) }
                    }
                }
                span class="archive-user" { (row.author) }
            }
            div class="archive-text" { (PreEscaped(block_format(&row.text))) }
            @if !row.reactions.is_empty() {
                div class="archive-reactions" {
                    @for reaction in &row.reactions {
                        span class="archive-reaction" { (reaction) }
                    }
                }
            }
        }
    }
}

pub fn channel_index(channel: &str, dates: &[NaiveDate]) -> String {
    let body = html! {
        header class="archive-header" {
            p class="archive-breadcrumb" {
                a href="../../index.html" { "Channels" }
                " / #" (channel)
            }
            h1 { "#" (channel) }
        }
        section class="archive-index" {
            h2 { "Days" }
            ul class="archive-day-list" {
                @for date in dates.iter().map(NaiveDate::to_string) {
                    li { a href={ (date) ".html" } { (date) } }
                }
            }
        }
    };
    page_shell(&format!("#{channel}"), CHANNEL_STYLESHEET, body)
}

pub fn global_index(channels: &[String]) -> String {
    let body = html! {
        header class="archive-header" {
            h1 { "Chat Archive" }
        }
        section class="archive-index" {
            h2 { "Channels" }
            ul class="archive-channel-list" {
                @for channel in channels {
                    li { a href={ "daily/" (channel) "/index.html" } { "#" (channel) } }
                }
            }
        }
    };
    page_shell("Chat Archive", ROOT_STYLESHEET, body)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Numbered,
}

impl ListKind {
    fn open(self) -> &'static str {
        match self {
            ListKind::Bullet => "<ul class=\"archive-list\">",
            ListKind::Numbered => "<ol class=\"archive-list archive-list-numbered\">",
        }
    }

    fn close(self) -> &'static str {
        match self {
            ListKind::Bullet => "</ul>",
            ListKind::Numbered => "</ol>",
        }
    }
}

/// Lists, line breaks and inline emphasis over an already escaped fragment.
pub fn block_format(fragment: &str) -> String {
    let normalized = fragment.replace("\r\n", "\n").replace('\r', "\n");
    if normalized.is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = normalized.split('\n').collect();
    let mut out = String::new();
    let mut list: Option<ListKind> = None;

    for (index, line) in lines.iter().enumerate() {
        let item = BULLET_RE
            .captures(line)
            .map(|caps| (ListKind::Bullet, caps))
            .or_else(|| NUMBERED_RE.captures(line).map(|caps| (ListKind::Numbered, caps)));
        if let Some((kind, caps)) = item {
            if list != Some(kind) {
                if let Some(open) = list {
                    out.push_str(open.close());
                }
                out.push_str(kind.open());
                list = Some(kind);
            }
            out.push_str("<li>");
            out.push_str(&inline_markup(caps[1].trim()));
            out.push_str("</li>");
            continue;
        }

        if let Some(open) = list.take() {
            out.push_str(open.close());
        }
        if line.trim().is_empty() {
            out.push_str("<br>");
            continue;
        }
        out.push_str("<span class=\"archive-line\">");
        out.push_str(&inline_markup(line));
        out.push_str("</span>");
        if index + 1 < lines.len() {
            out.push_str("<br>");
        }
    }
    if let Some(open) = list {
        out.push_str(open.close());
    }
    out
}

/// Emphasis outside of anchors, which are copied through untouched.
fn inline_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    for anchor in ANCHOR_RE.find_iter(line) {
        out.push_str(&emphasis(&line[cursor..anchor.start()]));
        out.push_str(anchor.as_str());
        cursor = anchor.end();
    }
    out.push_str(&emphasis(&line[cursor..]));
    out
}

fn emphasis(text: &str) -> String {
    let text = wrap_delimited(text, '*', "strong");
    let text = wrap_delimited(&text, '_', "em");
    wrap_delimited(&text, '~', "del")
}

fn is_word(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Replace `<m>inner<m>` spans with `<tag>inner</tag>`.
///
/// The opening marker must not follow a word character and the closing one
/// must not precede one; `inner` starts and ends with non-whitespace. The
/// nearest qualifying closing marker wins.
fn wrap_delimited(text: &str, marker: char, tag: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == marker
            && (i == 0 || !is_word(chars[i - 1]))
            && let Some(close) = closing_marker(&chars, i, marker)
        {
            out.push_str(&format!("<{tag}>"));
            out.extend(&chars[i + 1..close]);
            out.push_str(&format!("</{tag}>"));
            i = close + 1;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn closing_marker(chars: &[char], open: usize, marker: char) -> Option<usize> {
    let first = *chars.get(open + 1)?;
    if first.is_whitespace() {
        return None;
    }
    (open + 2..chars.len()).find(|&k| {
        chars[k] == marker
            && !chars[k - 1].is_whitespace()
            && chars.get(k + 1).is_none_or(|next| !is_word(*next))
    })
}
