//! ntfy push channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::NtfyConfig;
use crate::error::{Error, Result};
use crate::util::read_secret_file;

use super::{NotifyChannel, SendData};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes notifications to an ntfy topic.
///
/// The message body is POSTed to `{server}/{topic}` with the title in the
/// `Title` header, matching the ntfy publish API.
pub struct NtfyChannel {
    config: NtfyConfig,
    client: Client,
}

impl NtfyChannel {
    pub fn new(config: NtfyConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn publish_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.server.trim_end_matches('/'),
            self.config.topic.trim_matches('/')
        )
    }
}

#[async_trait]
impl NotifyChannel for NtfyChannel {
    fn name(&self) -> &str {
        "ntfy"
    }

    fn validate(&self) -> Result<()> {
        if self.config.server.trim().is_empty() {
            return Err(Error::ChannelConfig("ntfy: server is empty".to_string()));
        }
        if !self.config.server.starts_with("http://") && !self.config.server.starts_with("https://")
        {
            return Err(Error::ChannelConfig(format!(
                "ntfy: server must be an http(s) URL: {}",
                self.config.server
            )));
        }
        if self.config.topic.trim_matches('/').is_empty() {
            return Err(Error::ChannelConfig("ntfy: topic is empty".to_string()));
        }

        if let Some(token_file) = &self.config.token_file {
            read_secret_file(token_file)?;
        }
        Ok(())
    }

    async fn send(&self, data: &SendData) -> Result<()> {
        let mut request = self
            .client
            .post(self.publish_url())
            .header("Title", &data.title)
            .body(data.body.clone());

        if let Some(token_file) = &self.config.token_file {
            let token = read_secret_file(token_file)?;
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("ntfy publish failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!(
                "ntfy publish returned {status}: {body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(server: &str, topic: &str) -> NtfyChannel {
        NtfyChannel::new(NtfyConfig {
            server: server.to_string(),
            topic: topic.to_string(),
            token_file: None,
        })
    }

    #[test]
    fn publish_url_joins_server_and_topic() {
        assert_eq!(
            channel("https://ntfy.example.com/", "/alerts/").publish_url(),
            "https://ntfy.example.com/alerts"
        );
        assert_eq!(
            channel("https://ntfy.example.com", "alerts").publish_url(),
            "https://ntfy.example.com/alerts"
        );
    }

    #[test]
    fn validate_rejects_non_http_server() {
        let err = channel("ntfy.example.com", "alerts").validate().unwrap_err();
        assert!(matches!(err, Error::ChannelConfig(msg) if msg.contains("http")));
    }

    #[test]
    fn validate_rejects_empty_topic() {
        let err = channel("https://ntfy.example.com", "//").validate().unwrap_err();
        assert!(matches!(err, Error::ChannelConfig(msg) if msg.contains("topic")));
    }
}
