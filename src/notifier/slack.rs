use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::Token;
use crate::builds::BuildRecord;
use crate::error::{MonitorError, Result};
use crate::monitor::BuildEvent;

use super::{MessageFormat, Notifier};

const CHANNEL_PAGE_SIZE: &str = "200";
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// A conversation visible to the bot token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlackChannel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_member: bool,
}

#[derive(Deserialize)]
struct ChannelsResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    channels: Vec<SlackChannel>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Minimal Slack Web API client.
pub struct SlackClient {
    client: Client,
    api_url: Url,
    token: Token,
}

impl SlackClient {
    pub fn new(base_url: &str, token: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("buildwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| MonitorError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(base_url)
            .map_err(|e| MonitorError::Config(format!("Invalid chat API URL: {e}")))?
            .join("api/")
            .map_err(|e| MonitorError::Config(format!("Invalid chat API URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        self.api_url
            .join(method)
            .map_err(|e| MonitorError::Config(format!("Invalid chat API method URL: {e}")))
    }

    /// Lists every non-archived channel the token can see, following pagination cursors.
    pub async fn list_channels(&self) -> Result<Vec<SlackChannel>> {
        let url = self.method_url("conversations.list")?;
        let mut channels = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(self.token.as_str())
                .query(&[
                    ("types", "public_channel,private_channel"),
                    ("exclude_archived", "true"),
                    ("limit", CHANNEL_PAGE_SIZE),
                ]);
            if !cursor.is_empty() {
                request = request.query(&[("cursor", cursor.as_str())]);
            }

            let response: ChannelsResponse = request
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if !response.ok {
                return Err(MonitorError::Config(format!(
                    "conversations.list failed: {}",
                    response.error.unwrap_or_else(|| "unknown error".to_string())
                )));
            }

            channels.extend(response.channels);

            cursor = response
                .response_metadata
                .map(|meta| meta.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
        }

        debug!("Found {} chat channels", channels.len());
        Ok(channels)
    }

    /// Finds a channel by display name. A leading `#` is ignored.
    pub async fn find_channel(&self, name: &str) -> Result<Option<SlackChannel>> {
        let wanted = name.trim_start_matches('#');
        Ok(self
            .list_channels()
            .await?
            .into_iter()
            .find(|channel| channel.name == wanted))
    }

    pub async fn post_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let url = self.method_url("chat.postMessage")?;

        let response: PostMessageResponse = self
            .client
            .post(url)
            .bearer_auth(self.token.as_str())
            .json(&PostMessageRequest {
                channel: channel_id,
                text,
            })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| MonitorError::Notify(e.to_string()))?
            .json()
            .await
            .map_err(|e| MonitorError::Notify(e.to_string()))?;

        if !response.ok {
            return Err(MonitorError::Notify(format!(
                "chat.postMessage failed: {}",
                response.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        Ok(())
    }
}

/// Posts build notifications to one Slack channel, resolved once at startup.
pub struct SlackNotifier {
    client: SlackClient,
    channel: SlackChannel,
    format: MessageFormat,
}

impl SlackNotifier {
    /// Resolves `channel_name` and returns a notifier bound to it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the channel cannot be listed or does
    /// not exist, so the caller can stop before polling starts.
    pub async fn connect(
        client: SlackClient,
        channel_name: &str,
        format: MessageFormat,
    ) -> Result<Self> {
        let channel = client
            .find_channel(channel_name)
            .await
            .map_err(|e| match e {
                MonitorError::Config(_) => e,
                other => MonitorError::Config(format!("Cannot list chat channels: {other}")),
            })?
            .ok_or_else(|| {
                MonitorError::Config(format!(
                    "Cannot find chat channel '{channel_name}'. Run `buildwatch channels` to see available names"
                ))
            })?;

        Ok(Self {
            client,
            channel,
            format,
        })
    }

    pub fn channel(&self) -> &SlackChannel {
        &self.channel
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, build: &BuildRecord, event: BuildEvent) -> Result<()> {
        info!("{}", self.format.line(build, event));
        let text = self.format.render(build, event);
        self.client.post_message(&self.channel.id, &text).await
    }
}
