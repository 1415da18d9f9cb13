use crate::archive::timestamp::{self, Timestamp};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outcome of a remote call that reached the service.
///
/// Transport failures are reported as `Err` by the caller; everything the
/// service answered, including non-2xx statuses, lands here.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Success(T),
    Failure { error: String },
}

impl<T> ApiResult<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        ApiResult::Failure {
            error: error.into(),
        }
    }

    pub fn http_status(code: u16) -> Self {
        ApiResult::failure(format!("http_status_{code}"))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            ApiResult::Success(value) => ApiResult::Success(f(value)),
            ApiResult::Failure { error } => ApiResult::Failure { error },
        }
    }
}

/// Split a `{ok, error, ...}` envelope into its success or failure shape.
pub fn decode_envelope<T: DeserializeOwned>(body: Value) -> Result<ApiResult<T>> {
    let ok = body.get("ok").and_then(Value::as_bool).unwrap_or(false);
    if !ok {
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or("unknown_error");
        return Ok(ApiResult::failure(error));
    }
    let payload = serde_json::from_value(body).context("failed to decode response payload")?;
    Ok(ApiResult::Success(payload))
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Identity {
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
impl Channel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    User(String),
    Bot(String),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Message {
    #[serde(default, deserialize_with = "timestamp::lenient")]
    pub ts: Option<Timestamp>,
    #[serde(default, deserialize_with = "timestamp::lenient")]
    pub thread_ts: Option<Timestamp>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl Message {
    /// Root of a thread or a standalone message.
    pub fn is_thread_root(&self) -> bool {
        match (&self.thread_ts, &self.ts) {
            (None, _) => true,
            (Some(thread), Some(ts)) => thread == ts,
            (Some(_), None) => false,
        }
    }

    pub fn is_reply(&self) -> bool {
        !self.is_thread_root()
    }

    /// True when the service marked this message as the head of a reply thread.
    pub fn starts_thread(&self) -> bool {
        matches!((&self.thread_ts, &self.ts), (Some(thread), Some(ts)) if thread == ts)
    }

    pub fn author(&self) -> Option<Author> {
        if let Some(user) = self.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            return Some(Author::User(user.to_string()));
        }
        self.bot_id
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(|b| Author::Bot(b.to_string()))
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Profile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChannelsPage {
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MessagesPage {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PermalinkBody {
    pub permalink: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserBody {
    pub user: User,
}

pub(crate) fn next_cursor(meta: Option<ResponseMetadata>) -> Option<String> {
    meta.and_then(|m| m.next_cursor)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Read-only surface of the remote chat service used by the archiver.
///
/// Paginated endpoints are drained by the implementation; callers see the
/// concatenated result or the first failure.
pub trait ChatApi {
    fn auth_test(&self) -> Result<ApiResult<Identity>>;
    fn list_channels(&self) -> Result<ApiResult<Vec<Channel>>>;
    fn channel_history(&self, channel_id: &str, oldest: &Timestamp)
    -> Result<ApiResult<Vec<Message>>>;
    fn thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &Timestamp,
    ) -> Result<ApiResult<Vec<Message>>>;
    fn permalink(&self, channel_id: &str, message_ts: &Timestamp) -> Result<ApiResult<String>>;
    fn user_info(&self, user_id: &str) -> Result<ApiResult<User>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_failure_carries_error_code() {
        let got: ApiResult<Identity> =
            decode_envelope(json!({"ok": false, "error": "invalid_auth"})).expect("decode");
        assert_eq!(got, ApiResult::failure("invalid_auth"));
    }

    #[test]
    fn envelope_success_decodes_payload() {
        let got: ApiResult<Identity> =
            decode_envelope(json!({"ok": true, "team": "Apache", "user": "bot"})).expect("decode");
        let ApiResult::Success(identity) = got else {
            panic!("expected success");
        };
        assert_eq!(identity.team.as_deref(), Some("Apache"));
    }

    #[test]
    fn envelope_without_ok_is_failure() {
        let got: ApiResult<Identity> = decode_envelope(json!({"team": "x"})).expect("decode");
        assert_eq!(got, ApiResult::failure("unknown_error"));
    }

    #[test]
    fn message_classifies_roots_and_replies() {
        let page: MessagesPage = serde_json::from_value(json!({
            "messages": [
                {"ts": "100.000000", "thread_ts": "100.000000", "user": "U1", "text": "root"},
                {"ts": "101.000000", "thread_ts": "100.000000", "user": "U2", "text": "reply"},
                {"ts": "102.000000", "bot_id": "B1", "text": "standalone"},
                {"ts": "not-a-ts", "text": "broken"}
            ]
        }))
        .expect("page");

        let [root, reply, standalone, broken] = page.messages.as_slice() else {
            panic!("expected four messages");
        };
        assert!(root.is_thread_root());
        assert!(root.starts_thread());
        assert!(reply.is_reply());
        assert!(standalone.is_thread_root());
        assert!(!standalone.starts_thread());
        assert_eq!(standalone.author(), Some(Author::Bot("B1".to_string())));
        assert!(broken.ts.is_none());
    }

    #[test]
    fn next_cursor_ignores_blank_tokens() {
        let blank = Some(ResponseMetadata {
            next_cursor: Some("  ".to_string()),
        });
        assert_eq!(next_cursor(blank), None);
        let set = Some(ResponseMetadata {
            next_cursor: Some("dXNlcjpVMDYx".to_string()),
        });
        assert_eq!(next_cursor(set).as_deref(), Some("dXNlcjpVMDYx"));
    }
}
