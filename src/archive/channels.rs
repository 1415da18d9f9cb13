use crate::slack::api::Channel;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelResolution {
    pub resolved: Vec<Channel>,
    pub missing: Vec<String>,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Match allow-list names against the live channel list.
///
/// Matching ignores case; the first live channel wins when names collide.
/// Both outputs keep allow-list order; an entry naming an already resolved
/// channel is dropped.
pub fn resolve(allowlist: &[String], live: &[Channel]) -> ChannelResolution {
    let mut by_name: HashMap<String, &Channel> = HashMap::new();
    for channel in live {
        let key = normalize(&channel.name);
        if !key.is_empty() {
            by_name.entry(key).or_insert(channel);
        }
    }

    let mut out = ChannelResolution::default();
    let mut seen: HashSet<&str> = HashSet::new();
    for allowed in allowlist {
        match by_name.get(&normalize(allowed)) {
            Some(channel) => {
                if seen.insert(channel.id.as_str()) {
                    out.resolved.push((*channel).clone());
                }
            }
            None => out.missing.push(allowed.clone()),
        }
    }
    out
}
