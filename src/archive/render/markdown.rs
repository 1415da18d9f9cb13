//! Jekyll-style pages: front matter followed by class-based HTML rows.

use super::RenderRow;
use super::text::escape_html;
use chrono::NaiveDate;
use maud::{Markup, PreEscaped, html};

const ROOT_STYLESHEET: &str = "assets/chat-archive.css";
const CHANNEL_STYLESHEET: &str = "../../assets/chat-archive.css";
// Day pages are served at /daily/<channel>/<date>/ via their permalink.
const DAY_STYLESHEET: &str = "../../../assets/chat-archive.css";

fn front_matter(fields: &[(&str, String)]) -> String {
    let mut out = String::from("---\n");
    for (key, value) in fields {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out.push_str("---\n\n");
    out
}

fn stylesheet(href: &str) -> String {
    format!("<link rel=\"stylesheet\" href=\"{href}\">\n\n")
}

fn yaml_quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn daily_page(channel: &str, date: NaiveDate, rows: &[RenderRow]) -> String {
    let mut out = front_matter(&[
        ("title", yaml_quoted(&format!("#{channel} {date}"))),
        ("date", date.to_string()),
        ("channel", yaml_quoted(channel)),
        ("permalink", format!("/daily/{channel}/{date}/")),
    ]);
    out.push_str(&stylesheet(DAY_STYLESHEET));
    out.push_str("<section class=\"archive-log\">\n");
    for row in rows {
        out.push_str(&message(row).into_string());
        out.push('\n');
    }
    out.push_str("</section>\n");
    out
}

fn message(row: &RenderRow) -> Markup {
    let class = if row.is_reply {
        "archive-message archive-message-reply"
    } else {
        "archive-message"
    };
    let text = row.text.replace("\r\n", "\n").replace('\n', "<br>\n");
    html! {
        div class=(class) {
            @if row.is_reply {
                span class="archive-reply-indicator" aria-hidden="true" { "->" }
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
            span class="archive-text" { (PreEscaped(text)) }
            @if !row.reactions.is_empty() {
                span class="archive-reactions" {
                    @for reaction in &row.reactions {
                        span class="archive-reaction" { (reaction) }
                    }
                }
            }
        }
    }
}

pub fn channel_index(channel: &str, dates: &[NaiveDate]) -> String {
    let mut out = front_matter(&[
        ("title", yaml_quoted(&format!("#{channel}"))),
        ("channel", yaml_quoted(channel)),
        ("permalink", format!("/daily/{channel}/")),
    ]);
    out.push_str(&stylesheet(CHANNEL_STYLESHEET));
    out.push_str("<section class=\"archive-index\">\n<h2>Days</h2>\n<ul class=\"archive-day-list\">\n");
    for date in dates {
        out.push_str(&format!("<li><a href=\"{date}/\">{date}</a></li>\n"));
    }
    out.push_str("</ul>\n</section>\n");
    out
}

pub fn global_index(channels: &[String]) -> String {
    let mut out = front_matter(&[
        ("title", yaml_quoted("Chat Archive")),
        ("permalink", "/".to_string()),
    ]);
    out.push_str(&stylesheet(ROOT_STYLESHEET));
    out.push_str("<section class=\"archive-index\">\n<h2>Channels</h2>\n<ul class=\"archive-channel-list\">\n");
    for channel in channels {
        let safe = escape_html(channel);
        out.push_str(&format!("<li><a href=\"daily/{safe}/\">#{safe}</a></li>\n"));
    }
    out.push_str("</ul>\n</section>\n");
    out
}
