use crate::archive::timestamp::Timestamp;
use crate::slack::api::{ApiResult, ChatApi, Message};
use std::collections::{HashMap, HashSet};

/// Resolved replies keyed by `(channel id, root ts)`; `ts` is only unique per channel.
pub type ReplyCache = HashMap<(String, Timestamp), Vec<Message>>;

/// Parent/reply relationships visible in one channel's fetched batch.
#[derive(Debug, Default)]
pub struct ThreadIndex {
    roots: HashSet<Timestamp>,
    replies_by_root: HashMap<Timestamp, Vec<Message>>,
}

impl ThreadIndex {
    pub fn build(messages: &[Message]) -> Self {
        let mut index = ThreadIndex::default();
        for message in messages {
            let Some(ts) = &message.ts else {
                continue;
            };
            if message.is_thread_root() {
                index.roots.insert(ts.clone());
            } else if let Some(root) = &message.thread_ts {
                index
                    .replies_by_root
                    .entry(root.clone())
                    .or_default()
                    .push(message.clone());
            }
        }
        index
    }

    /// A reply whose parent is in the batch and will render nested under it.
    pub fn is_attached(&self, message: &Message) -> bool {
        message.is_reply()
            && message
                .thread_ts
                .as_ref()
                .is_some_and(|root| self.roots.contains(root))
    }

    pub fn local_replies(&self, root: &Timestamp) -> &[Message] {
        self.replies_by_root
            .get(root)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// One top-level item on a day page.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEntry {
    Parent {
        message: Message,
        replies: Vec<Message>,
    },
    /// Reply whose parent was not fetched in this batch.
    OrphanReply(Message),
}

/// Full reply list for a thread, fetched once per run.
///
/// Remote replies are merged with the locally seen ones by `ts`; a failed
/// lookup falls back to the local replies only. Either way the result is
/// cached so later dates never repeat the call.
pub fn resolve_thread_replies<A: ChatApi + ?Sized>(
    api: &A,
    channel_id: &str,
    root: &Timestamp,
    local: &[Message],
    cache: &mut ReplyCache,
) -> Vec<Message> {
    let key = (channel_id.to_string(), root.clone());
    if let Some(cached) = cache.get(&key) {
        return cached.clone();
    }

    let mut replies: Vec<Message> = local.iter().filter(|m| m.ts.is_some()).cloned().collect();
    let mut seen: HashSet<Timestamp> = replies.iter().filter_map(|m| m.ts.clone()).collect();

    match api.thread_replies(channel_id, root) {
        Ok(ApiResult::Success(remote)) => {
            for message in remote {
                let Some(ts) = message.ts.clone() else {
                    continue;
                };
                if &ts == root {
                    continue;
                }
                if seen.insert(ts) {
                    replies.push(message);
                }
            }
        }
        Ok(ApiResult::Failure { error }) => {
            tracing::warn!(channel = channel_id, thread = %root, error = %error, "thread replies lookup not ok");
        }
        Err(err) => {
            tracing::warn!(
                channel = channel_id,
                thread = %root,
                error = %format!("{err:#}"),
                "thread replies lookup failed"
            );
        }
    }

    replies.sort_by(|a, b| a.ts.cmp(&b.ts));
    cache.insert(key, replies.clone());
    replies
}

/// Turn one day's top-level messages into parents with nested replies.
///
/// `day` must already exclude attached replies and be sorted by `ts`.
pub fn reconcile_day<A: ChatApi + ?Sized>(
    api: &A,
    channel_id: &str,
    day: &[Message],
    index: &ThreadIndex,
    cache: &mut ReplyCache,
) -> Vec<ThreadEntry> {
    let mut entries = Vec::with_capacity(day.len());
    for message in day {
        let Some(ts) = &message.ts else {
            continue;
        };
        if message.is_reply() {
            entries.push(ThreadEntry::OrphanReply(message.clone()));
            continue;
        }
        let local = index.local_replies(ts);
        let replies = if message.starts_thread() || !local.is_empty() {
            resolve_thread_replies(api, channel_id, ts, local, cache)
        } else {
            Vec::new()
        };
        entries.push(ThreadEntry::Parent {
            message: message.clone(),
            replies,
        });
    }
    entries
}
