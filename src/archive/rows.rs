use crate::archive::render::RenderRow;
use crate::archive::render::text::{format_text, resolve_emoji};
use crate::archive::threads::{ReplyCache, ThreadEntry};
use crate::archive::timestamp::Timestamp;
use crate::slack::api::{ApiResult, Author, ChatApi, Message};
use crate::slack::users::display_name;
use std::collections::HashMap;

const TIME_LABEL_FORMAT: &str = "%a %H:%M";
const TITLE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Memoized lookups scoped to a single run.
#[derive(Debug, Default)]
pub struct RunCaches {
    /// Keyed by `channel:ts`; failed lookups are stored as `None`.
    permalinks: HashMap<String, Option<String>>,
    users: HashMap<String, String>,
    pub thread_replies: ReplyCache,
}

/// Display name for a user ID; falls back to the ID itself.
pub fn resolve_user<A: ChatApi + ?Sized>(api: &A, user_id: &str, caches: &mut RunCaches) -> String {
    if let Some(name) = caches.users.get(user_id) {
        return name.clone();
    }
    let name = match api.user_info(user_id) {
        Ok(ApiResult::Success(user)) => display_name(&user),
        Ok(ApiResult::Failure { error }) => {
            tracing::warn!(user = user_id, error = %error, "user lookup not ok");
            user_id.to_string()
        }
        Err(err) => {
            tracing::warn!(user = user_id, error = %format!("{err:#}"), "user lookup failed");
            user_id.to_string()
        }
    };
    caches.users.insert(user_id.to_string(), name.clone());
    name
}

pub fn resolve_permalink<A: ChatApi + ?Sized>(
    api: &A,
    channel_id: &str,
    ts: &Timestamp,
    caches: &mut RunCaches,
) -> Option<String> {
    let key = format!("{channel_id}:{ts}");
    if let Some(cached) = caches.permalinks.get(&key) {
        return cached.clone();
    }
    let link = match api.permalink(channel_id, ts) {
        Ok(ApiResult::Success(link)) => Some(link).filter(|l| !l.trim().is_empty()),
        Ok(ApiResult::Failure { error }) => {
            tracing::warn!(channel = channel_id, ts = %ts, error = %error, "permalink lookup not ok");
            None
        }
        Err(err) => {
            tracing::warn!(
                channel = channel_id,
                ts = %ts,
                error = %format!("{err:#}"),
                "permalink lookup failed"
            );
            None
        }
    };
    caches.permalinks.insert(key, link.clone());
    link
}

pub fn author_label<A: ChatApi + ?Sized>(api: &A, message: &Message, caches: &mut RunCaches) -> String {
    match message.author() {
        Some(Author::User(id)) => resolve_user(api, &id, caches),
        Some(Author::Bot(id)) => format!("bot:{id}"),
        None => "unknown".to_string(),
    }
}

fn reaction_label(name: &str, count: u32) -> String {
    match resolve_emoji(name) {
        Some(glyph) => format!("{glyph} {count}"),
        None => format!(":{name}: {count}"),
    }
}

fn to_row<A: ChatApi + ?Sized>(
    api: &A,
    channel_id: &str,
    message: &Message,
    nested: bool,
    caches: &mut RunCaches,
) -> Option<RenderRow> {
    let ts = message.ts.as_ref()?;
    let instant = ts.to_datetime();
    let author = author_label(api, message, caches);
    let text = format_text(message.text.as_deref().unwrap_or_default(), |id| {
        Some(resolve_user(api, id, caches))
    });
    let permalink = resolve_permalink(api, channel_id, ts, caches);
    Some(RenderRow {
        is_reply: message.is_reply(),
        nested,
        time_label: instant.format(TIME_LABEL_FORMAT).to_string(),
        title: instant.format(TITLE_FORMAT).to_string(),
        author,
        text,
        permalink,
        reactions: message
            .reactions
            .iter()
            .map(|r| reaction_label(&r.name, r.count))
            .collect(),
    })
}

/// Flatten reconciled entries into rows; replies follow their parent.
pub fn build_rows<A: ChatApi + ?Sized>(
    api: &A,
    channel_id: &str,
    entries: &[ThreadEntry],
    caches: &mut RunCaches,
) -> Vec<RenderRow> {
    let mut rows = Vec::new();
    for entry in entries {
        match entry {
            ThreadEntry::Parent { message, replies } => {
                rows.extend(to_row(api, channel_id, message, false, caches));
                for reply in replies {
                    rows.extend(to_row(api, channel_id, reply, true, caches));
                }
            }
            ThreadEntry::OrphanReply(message) => {
                rows.extend(to_row(api, channel_id, message, false, caches));
            }
        }
    }
    rows
}
