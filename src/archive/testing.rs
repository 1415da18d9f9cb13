//! In-memory chat service for unit tests.

use crate::archive::timestamp::Timestamp;
use crate::slack::api::{ApiResult, Channel, ChatApi, Identity, Message, Profile, User};
use anyhow::{Result, anyhow};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub fn message(ts: &str, thread_ts: Option<&str>, text: &str) -> Message {
    Message {
        ts: Some(Timestamp::parse(ts).expect("ts")),
        thread_ts: thread_ts.map(|raw| Timestamp::parse(raw).expect("thread_ts")),
        user: Some("U1".to_string()),
        text: Some(text.to_string()),
        ..Message::default()
    }
}

pub fn reply(ts: &str, root: &str, text: &str) -> Message {
    Message {
        user: Some("U2".to_string()),
        ..message(ts, Some(root), text)
    }
}

pub fn user(id: &str, display_name: &str) -> User {
    User {
        id: Some(id.to_string()),
        name: Some(id.to_lowercase()),
        profile: Some(Profile {
            display_name: Some(display_name.to_string()),
            real_name: None,
        }),
    }
}

pub struct FakeApi {
    auth: ApiResult<Identity>,
    channels: ApiResult<Vec<Channel>>,
    history: HashMap<String, ApiResult<Vec<Message>>>,
    replies: HashMap<(String, String), Vec<Message>>,
    replies_fail: bool,
    users: HashMap<String, User>,
    reply_calls: Cell<usize>,
    user_calls: Cell<usize>,
    permalink_calls: Cell<usize>,
    history_requests: RefCell<Vec<(String, Timestamp)>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            auth: ApiResult::Success(Identity {
                team: Some("Apache".to_string()),
                user: Some("archiver".to_string()),
            }),
            channels: ApiResult::Success(Vec::new()),
            history: HashMap::new(),
            replies: HashMap::new(),
            replies_fail: false,
            users: HashMap::new(),
            reply_calls: Cell::new(0),
            user_calls: Cell::new(0),
            permalink_calls: Cell::new(0),
            history_requests: RefCell::new(Vec::new()),
        }
    }
}

impl FakeApi {
    pub fn with_auth(mut self, auth: ApiResult<Identity>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_channels(mut self, channels: ApiResult<Vec<Channel>>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_history(mut self, channel_id: &str, history: ApiResult<Vec<Message>>) -> Self {
        self.history.insert(channel_id.to_string(), history);
        self
    }

    pub fn with_replies(mut self, channel_id: &str, root: &str, replies: Vec<Message>) -> Self {
        self.replies
            .insert((channel_id.to_string(), root.to_string()), replies);
        self
    }

    pub fn failing_replies(mut self) -> Self {
        self.replies_fail = true;
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        if let Some(id) = user.id.clone() {
            self.users.insert(id, user);
        }
        self
    }

    pub fn reply_calls(&self) -> usize {
        self.reply_calls.get()
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.get()
    }

    pub fn permalink_calls(&self) -> usize {
        self.permalink_calls.get()
    }

    pub fn history_requests(&self) -> Vec<(String, Timestamp)> {
        self.history_requests.borrow().clone()
    }
}

impl ChatApi for FakeApi {
    fn auth_test(&self) -> Result<ApiResult<Identity>> {
        Ok(self.auth.clone())
    }

    fn list_channels(&self) -> Result<ApiResult<Vec<Channel>>> {
        Ok(self.channels.clone())
    }

    fn channel_history(
        &self,
        channel_id: &str,
        oldest: &Timestamp,
    ) -> Result<ApiResult<Vec<Message>>> {
        self.history_requests
            .borrow_mut()
            .push((channel_id.to_string(), oldest.clone()));
        Ok(self
            .history
            .get(channel_id)
            .cloned()
            .unwrap_or_else(|| ApiResult::failure("channel_not_found")))
    }

    fn thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &Timestamp,
    ) -> Result<ApiResult<Vec<Message>>> {
        self.reply_calls.set(self.reply_calls.get() + 1);
        if self.replies_fail {
            return Err(anyhow!("connection reset"));
        }
        let key = (channel_id.to_string(), thread_ts.as_str().to_string());
        Ok(ApiResult::Success(
            self.replies.get(&key).cloned().unwrap_or_default(),
        ))
    }

    fn permalink(&self, channel_id: &str, message_ts: &Timestamp) -> Result<ApiResult<String>> {
        self.permalink_calls.set(self.permalink_calls.get() + 1);
        Ok(ApiResult::Success(format!(
            "https://example.slack.com/archives/{channel_id}/p{}",
            message_ts.as_str().replace('.', "")
        )))
    }

    fn user_info(&self, user_id: &str) -> Result<ApiResult<User>> {
        self.user_calls.set(self.user_calls.get() + 1);
        Ok(match self.users.get(user_id) {
            Some(user) => ApiResult::Success(user.clone()),
            None => ApiResult::failure("user_not_found"),
        })
    }
}
