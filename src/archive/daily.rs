use crate::archive::threads::ThreadIndex;
use crate::slack::api::Message;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Bucket top-level messages by their UTC calendar day.
///
/// Replies attached to a parent in the same batch are left out; they are
/// rendered under their parent instead. Messages without a usable `ts` are
/// dropped. Each bucket is sorted ascending by `ts`.
pub fn group_by_date(messages: &[Message], index: &ThreadIndex) -> BTreeMap<NaiveDate, Vec<Message>> {
    let mut days: BTreeMap<NaiveDate, Vec<Message>> = BTreeMap::new();
    for message in messages {
        let Some(ts) = &message.ts else {
            continue;
        };
        if index.is_attached(message) {
            continue;
        }
        days.entry(ts.utc_date()).or_default().push(message.clone());
    }
    for bucket in days.values_mut() {
        bucket.sort_by(|a, b| a.ts.cmp(&b.ts));
    }
    days
}
