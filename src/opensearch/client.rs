// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! REST client for the OpenSearch engine.
//!
//! Every request goes through [`OpenSearchClient::request`], which retries rate limiting,
//! 5xx responses and connection failures with jittered exponential backoff before giving
//! up with a transient [`Error::Engine`].

use super::{EngineEndpoint, ShardAllocation};
use crate::errors::{Error, Result};
use crate::reconcilers::retry::{http_backoff, is_retryable_http_status};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

/// Flat setting holding the allocation exclude list.
pub const EXCLUDE_NAME_SETTING: &str = "cluster.routing.allocation.exclude._name";

/// Request failure before classification.
#[derive(Debug)]
enum RequestError {
    /// The engine answered with a non-success status
    Http { status: StatusCode, message: String },
    /// The request never got an answer
    Transport(String),
}

impl RequestError {
    fn is_retryable(&self) -> bool {
        match self {
            RequestError::Http { status, .. } => is_retryable_http_status(*status),
            RequestError::Transport(_) => true,
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            RequestError::Transport(msg) => write!(f, "{msg}"),
        }
    }
}

/// One row of `GET /_cat/shards?format=json`.
#[derive(Debug, Deserialize)]
struct ShardRow {
    #[serde(default)]
    node: Option<String>,
}

/// Basic-auth REST client for the engine.
#[derive(Clone)]
pub struct OpenSearchClient {
    http: HttpClient,
    username: String,
    password: String,
}

impl OpenSearchClient {
    /// Build a client. `insecure` accepts self-signed engine certificates.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(username: &str, password: &str, insecure: bool) -> Result<Self> {
        let http = HttpClient::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::engine("", format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Execute a request with retry and return the response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`] on a non-retryable status or once the backoff is exhausted.
    pub async fn request(
        &self,
        endpoint: &EngineEndpoint,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<String> {
        let url = format!("{}{}", endpoint.base_url, path);
        let mut backoff = http_backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.request_once(method.clone(), &url, body).await {
                Ok(text) => {
                    if attempt > 1 {
                        debug!(
                            method = %method,
                            url = %url,
                            attempt = attempt,
                            elapsed = ?backoff.elapsed(),
                            "Engine API call succeeded after retries"
                        );
                    }
                    return Ok(text);
                }
                Err(e) => {
                    if !e.is_retryable() {
                        error!(
                            method = %method,
                            url = %url,
                            error = %e,
                            "Non-retryable engine API error, failing immediately"
                        );
                        return Err(Error::engine(&endpoint.base_url, e.to_string()));
                    }

                    if let Some(duration) = backoff.next_backoff() {
                        warn!(
                            method = %method,
                            url = %url,
                            attempt = attempt,
                            retry_after = ?duration,
                            error = %e,
                            "Retryable engine API error, will retry"
                        );
                        tokio::time::sleep(duration).await;
                    } else {
                        error!(
                            method = %method,
                            url = %url,
                            attempt = attempt,
                            elapsed = ?backoff.elapsed(),
                            error = %e,
                            "Backoff exhausted, giving up"
                        );
                        return Err(Error::engine(
                            &endpoint.base_url,
                            format!("backoff exhausted after {attempt} attempts: {e}"),
                        ));
                    }
                }
            }
        }
    }

    async fn request_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> std::result::Result<String, RequestError> {
        debug!(method = %method, url = %url, "Engine API request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RequestError::Transport(format!("failed to send request to {url}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RequestError::Transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(RequestError::Http {
                status,
                message: text,
            });
        }

        Ok(text)
    }

    /// Current persistent exclude list, in order.
    async fn excluded_nodes(&self, endpoint: &EngineEndpoint) -> Result<Vec<String>> {
        let body = self
            .request(
                endpoint,
                Method::GET,
                "/_cluster/settings?flat_settings=true",
                None,
            )
            .await?;
        let settings: Value = serde_json::from_str(&body)?;
        Ok(parse_exclude_list(&settings))
    }

    /// Write the persistent exclude list. An empty list clears the setting.
    async fn write_excluded_nodes(
        &self,
        endpoint: &EngineEndpoint,
        nodes: &[String],
    ) -> Result<bool> {
        let value = if nodes.is_empty() {
            Value::Null
        } else {
            Value::String(nodes.join(","))
        };
        let body = json!({ "persistent": { EXCLUDE_NAME_SETTING: value } });
        let response = self
            .request(endpoint, Method::PUT, "/_cluster/settings", Some(&body))
            .await?;
        let parsed: Value = serde_json::from_str(&response)?;
        Ok(parsed
            .get("acknowledged")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }
}

/// Extract the exclude list from a flat-settings response.
fn parse_exclude_list(settings: &Value) -> Vec<String> {
    settings
        .get("persistent")
        .and_then(|p| p.get(EXCLUDE_NAME_SETTING))
        .and_then(Value::as_str)
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Whether a `_cat/shards` node column names `node`.
///
/// Relocating shards read `source -> ip id target`, so every whitespace token counts.
fn node_column_mentions(column: &str, node: &str) -> bool {
    column.split_whitespace().any(|token| token == node)
}

#[async_trait]
impl ShardAllocation for OpenSearchClient {
    async fn append_exclude(&self, endpoint: &EngineEndpoint, node: &str) -> Result<bool> {
        let mut nodes = self.excluded_nodes(endpoint).await?;
        if nodes.iter().any(|n| n == node) {
            debug!(node = %node, "Node already excluded from allocation");
            return Ok(true);
        }
        nodes.push(node.to_string());
        let acknowledged = self.write_excluded_nodes(endpoint, &nodes).await?;
        info!(node = %node, acknowledged, "Excluded node from shard allocation");
        Ok(acknowledged)
    }

    async fn remove_exclude(&self, endpoint: &EngineEndpoint, node: &str) -> Result<bool> {
        let nodes = self.excluded_nodes(endpoint).await?;
        if !nodes.iter().any(|n| n == node) {
            debug!(node = %node, "Node not in exclude list");
            return Ok(true);
        }
        let remaining: Vec<String> = nodes.into_iter().filter(|n| n != node).collect();
        let acknowledged = self.write_excluded_nodes(endpoint, &remaining).await?;
        info!(node = %node, acknowledged, "Removed node from allocation exclude list");
        Ok(acknowledged)
    }

    async fn has_shards_on(&self, endpoint: &EngineEndpoint, node: &str) -> Result<bool> {
        let body = self
            .request(
                endpoint,
                Method::GET,
                "/_cat/shards?format=json&h=index,shard,prirep,state,node",
                None,
            )
            .await?;
        let rows: Vec<ShardRow> = serde_json::from_str(&body)?;
        let present = rows
            .iter()
            .filter_map(|row| row.node.as_deref())
            .any(|column| node_column_mentions(column, node));
        debug!(node = %node, present, "Checked shard presence");
        Ok(present)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
