//! Slack markup to escaped HTML fragments.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^>]+)>").expect("token regex should compile"));
static EMOJI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([a-zA-Z0-9_+\-]+):").expect("emoji regex should compile"));

const EMOJI: &[(&str, &str)] = &[
    ("wave", "👋"),
    ("thumbsup", "👍"),
    ("+1", "👍"),
    ("thumbsdown", "👎"),
    ("-1", "👎"),
    ("slightly_smiling_face", "🙂"),
    ("smile", "😄"),
    ("grin", "😁"),
    ("wink", "😉"),
    ("face_with_monocle", "🧐"),
    ("joy", "😂"),
    ("sweat_smile", "😅"),
    ("sob", "😭"),
    ("heart", "♥️"),
    ("tada", "🎉"),
    ("clap", "👏"),
    ("pray", "🙏"),
    ("fire", "🔥"),
    ("eyes", "👀"),
    ("white_check_mark", "✅"),
    ("open_mouth", "😮"),
    ("saluting_face", "🫡"),
    ("dancer", "💃"),
    ("raised_hands", "🙌"),
];

pub fn resolve_emoji(code: &str) -> Option<&'static str> {
    EMOJI
        .iter()
        .find(|(name, _)| *name == code)
        .map(|(_, glyph)| *glyph)
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Undo the three entity escapes the chat service applies to literal text.
fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn literal(value: &str) -> String {
    escape_html(&decode_entities(value))
}

/// Escaped visible text with known emoji codes substituted.
fn display(value: &str) -> String {
    replace_emoji(&literal(value))
}

fn split_label(token: &str) -> (&str, Option<&str>) {
    match token.split_once('|') {
        Some((head, label)) => (head, Some(label)),
        None => (token, None),
    }
}

fn with_sigil(label: &str, sigil: char) -> String {
    if label.starts_with(sigil) {
        label.to_string()
    } else {
        format!("{sigil}{label}")
    }
}

fn is_supported_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://") || lower.starts_with("mailto:")
}

fn format_token<F>(token: &str, resolve_user: &mut F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(rest) = token.strip_prefix('@') {
        let (user_id, label) = split_label(rest);
        let label = label
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .or_else(|| resolve_user(user_id).filter(|l| !l.trim().is_empty()))
            .unwrap_or_else(|| user_id.to_string());
        return display(&with_sigil(&label, '@'));
    }
    if let Some(rest) = token.strip_prefix('#') {
        let (id, label) = split_label(rest);
        return display(&with_sigil(label.unwrap_or(id), '#'));
    }
    if let Some(rest) = token.strip_prefix('!') {
        let (keyword, label) = split_label(rest);
        return display(&with_sigil(label.unwrap_or(keyword), '@'));
    }

    let (url, label) = split_label(token);
    let url = url.trim();
    let shown = match label.filter(|l| !l.trim().is_empty()) {
        Some(label) => display(label),
        None => literal(url),
    };
    if !is_supported_href(url) {
        return shown;
    }
    format!("<a class=\"archive-link\" href=\"{}\">{shown}</a>", literal(url))
}

fn replace_emoji(text: &str) -> String {
    EMOJI_RE
        .replace_all(text, |caps: &Captures<'_>| match resolve_emoji(&caps[1]) {
            Some(glyph) => glyph.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Render message text as an escaped inline fragment.
///
/// Mentions go through `resolve_user`; when it yields nothing the raw ID is
/// shown. Blank input renders as an empty string.
pub fn format_text<F>(text: &str, mut resolve_user: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    if text.trim().is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for caps in TOKEN_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&display(&text[cursor..whole.start()]));
        out.push_str(&format_token(&caps[1], &mut resolve_user));
        cursor = whole.end();
    }
    out.push_str(&display(&text[cursor..]));
    out
}
