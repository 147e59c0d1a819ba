// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP implementation of [`Remote`] using reqwest.

use std::time::Duration;

use atrium_core::message::MessagePage;
use atrium_core::{
    Credentials, HeartbeatRequest, Message, MessageQuery, NewMessage, OnlineStatus, Principal,
    Registration,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::{Remote, RemoteError, RemoteFuture, RemoteResult};

/// Talks to an Atrium server's `/api/v1` endpoints.
#[derive(Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    /// Create a remote for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(HttpRemote { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// `users/<username>` with the name escaped as one path segment.
    fn user_url(&self, username: &str) -> RemoteResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.url("users"))
            .map_err(|e| RemoteError::Network(format!("invalid server url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|()| RemoteError::Network(format!("invalid server url: {}", self.base_url)))?
            .push(username);
        Ok(url)
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_decode() {
        RemoteError::Malformed(e.to_string())
    } else {
        RemoteError::Network(e.to_string())
    }
}

/// Map a response to `T`, classifying failures by status.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> RemoteResult<T> {
    let status = response.status();

    if status.is_success() {
        let text = response.text().await.map_err(transport_error)?;
        return serde_json::from_str(&text).map_err(|e| RemoteError::Malformed(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = %status, "request failed");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth(body),
        StatusCode::NOT_FOUND => RemoteError::NotFound(body),
        _ => RemoteError::Api {
            status: status.as_u16(),
            body,
        },
    })
}

impl Remote for HttpRemote {
    fn list_messages(&self, query: MessageQuery) -> RemoteFuture<'_, Vec<Message>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url("messages"))
                .query(&query.to_pairs())
                .send()
                .await
                .map_err(transport_error)?;
            let page: MessagePage = decode(response).await?;
            Ok(page.messages)
        })
    }

    fn create_message(
        &self,
        credentials: Credentials,
        content: String,
    ) -> RemoteFuture<'_, Message> {
        Box::pin(async move {
            let body = NewMessage {
                content,
                username: credentials.username,
                password: credentials.secret,
            };
            let response = self
                .client
                .post(self.url("messages"))
                .json(&body)
                .send()
                .await
                .map_err(transport_error)?;
            decode(response).await
        })
    }

    fn heartbeat(&self, request: HeartbeatRequest) -> RemoteFuture<'_, OnlineStatus> {
        Box::pin(async move {
            let response = self
                .client
                .put(self.url("heartbeat"))
                .json(&request)
                .send()
                .await
                .map_err(transport_error)?;
            decode(response).await
        })
    }

    fn get_principal(&self, username: String) -> RemoteFuture<'_, Principal> {
        Box::pin(async move {
            let url = self.user_url(&username)?;
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(transport_error)?;
            decode(response).await
        })
    }

    fn register(&self, registration: Registration) -> RemoteFuture<'_, Principal> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url("users"))
                .json(&registration)
                .send()
                .await
                .map_err(transport_error)?;
            decode(response).await
        })
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
