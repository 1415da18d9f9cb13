use crate::archive::timestamp::Timestamp;
use crate::slack::api::{
    ApiResult, Channel, ChannelsPage, ChatApi, Identity, Message, MessagesPage, PermalinkBody,
    User, UserBody, decode_envelope, next_cursor,
};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::thread;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";
const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 20;
const PAGE_SIZE: &str = "200";

/// Decides whether a rate-limited call is retried, and after how long.
pub trait RetryPolicy {
    fn next_delay(&self, attempt: u32, headers: &HeaderMap) -> Option<Duration>;
}

/// Honour the server's `Retry-After` hint exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryAfterOnce;

impl RetryPolicy for RetryAfterOnce {
    fn next_delay(&self, attempt: u32, headers: &HeaderMap) -> Option<Duration> {
        if attempt > 0 {
            return None;
        }
        retry_after(headers)
    }
}

pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs = raw.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}

pub struct SlackClient {
    http: Client,
    base_url: String,
    token: String,
    retry: Box<dyn RetryPolicy>,
}

impl SlackClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retry: Box::new(RetryAfterOnce),
        })
    }

    fn send(&self, method: &str, params: &[(&str, &str)]) -> Result<Response> {
        let url = format!("{}/{method}", self.base_url);
        self.http
            .get(&url)
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .with_context(|| format!("{method} request failed"))
    }

    fn send_with_retry(&self, method: &str, params: &[(&str, &str)]) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            let response = self.send(method, params)?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            let Some(delay) = self.retry.next_delay(attempt, response.headers()) else {
                tracing::warn!(method, attempt, "rate limited without a usable retry hint");
                return Ok(response);
            };
            tracing::warn!(
                method,
                wait_secs = delay.as_secs(),
                "rate limited; sleeping before retry"
            );
            thread::sleep(delay);
            attempt += 1;
        }
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResult<T>> {
        let response = self.send_with_retry(method, params)?;
        let status = response.status();
        if !status.is_success() {
            return Ok(ApiResult::http_status(status.as_u16()));
        }
        let body: Value = response
            .json()
            .with_context(|| format!("{method} returned a non-json body"))?;
        decode_envelope(body).with_context(|| format!("{method} payload did not decode"))
    }

    fn collect_messages(
        &self,
        method: &str,
        base_params: &[(&str, &str)],
        channel_id: &str,
    ) -> Result<ApiResult<Vec<Message>>> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = base_params.to_vec();
            if let Some(token) = cursor.as_deref() {
                params.push(("cursor", token));
            }
            let page = match self.call::<MessagesPage>(method, &params)? {
                ApiResult::Success(page) => page,
                ApiResult::Failure { error } => return Ok(ApiResult::Failure { error }),
            };
            out.extend(page.messages.into_iter().map(|mut message| {
                if message.channel.is_none() {
                    message.channel = Some(channel_id.to_string());
                }
                message
            }));
            match next_cursor(page.response_metadata) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(ApiResult::Success(out))
    }
}

impl ChatApi for SlackClient {
    fn auth_test(&self) -> Result<ApiResult<Identity>> {
        self.call("auth.test", &[])
    }

    fn list_channels(&self) -> Result<ApiResult<Vec<Channel>>> {
        let mut channels = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = vec![
                ("limit", PAGE_SIZE),
                ("exclude_archived", "true"),
                ("types", "public_channel"),
            ];
            if let Some(token) = cursor.as_deref() {
                params.push(("cursor", token));
            }
            let page = match self.call::<ChannelsPage>("conversations.list", &params)? {
                ApiResult::Success(page) => page,
                ApiResult::Failure { error } => return Ok(ApiResult::Failure { error }),
            };
            channels.extend(page.channels);
            match next_cursor(page.response_metadata) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(ApiResult::Success(channels))
    }

    fn channel_history(
        &self,
        channel_id: &str,
        oldest: &Timestamp,
    ) -> Result<ApiResult<Vec<Message>>> {
        self.collect_messages(
            "conversations.history",
            &[
                ("channel", channel_id),
                ("oldest", oldest.as_str()),
                ("inclusive", "true"),
                ("limit", PAGE_SIZE),
            ],
            channel_id,
        )
    }

    fn thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &Timestamp,
    ) -> Result<ApiResult<Vec<Message>>> {
        self.collect_messages(
            "conversations.replies",
            &[
                ("channel", channel_id),
                ("ts", thread_ts.as_str()),
                ("limit", PAGE_SIZE),
            ],
            channel_id,
        )
    }

    fn permalink(&self, channel_id: &str, message_ts: &Timestamp) -> Result<ApiResult<String>> {
        let body: ApiResult<PermalinkBody> = self.call(
            "chat.getPermalink",
            &[("channel", channel_id), ("message_ts", message_ts.as_str())],
        )?;
        Ok(body.map(|b| b.permalink))
    }

    fn user_info(&self, user_id: &str) -> Result<ApiResult<User>> {
        let body: ApiResult<UserBody> = self.call("users.info", &[("user", user_id)])?;
        Ok(body.map(|b| b.user))
    }
}
