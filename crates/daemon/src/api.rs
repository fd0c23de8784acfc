// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! REST access to the remote charge-control service.
//!
//! Two calls are all the daemon needs: fetch the full state and replace one
//! vehicle's repeating plan list. Both fail with [`TransportError`] and are
//! never retried inline; the next scheduled fetch is the retry.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::{debug, error};

use ps_core::{Plan, Snapshot};

use crate::config::ConnectionConfig;
use crate::error::{TransportError, TransportResult};

/// Boxed future returned by [`RemoteApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// State fetcher and plan submission.
pub trait RemoteApi: Send + Sync {
    /// Fetch a full snapshot of every vehicle and its plans.
    fn fetch_snapshot(&self) -> ApiFuture<'_, Snapshot>;

    /// Replace a vehicle's repeating plans. Returns the list the remote
    /// service now holds.
    fn submit_plans<'a>(&'a self, vehicle_id: &'a str, plans: &'a [Plan]) -> ApiFuture<'a, Vec<Plan>>;
}

/// [`RemoteApi`] over HTTP.
pub struct HttpApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpApi {
    /// `base_url` is the API root, e.g. `http://host:7070/api`.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> TransportResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::Request(format!("invalid url {}: {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(HttpApi {
            client,
            base_url,
            token,
        })
    }

    pub fn from_config(conn: &ConnectionConfig) -> TransportResult<Self> {
        Self::new(&conn.api_url(), conn.token.clone(), conn.timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn state_url(&self) -> TransportResult<Url> {
        self.endpoint(&["state"])
    }

    pub fn plans_url(&self, vehicle_id: &str) -> TransportResult<Url> {
        self.endpoint(&["vehicles", vehicle_id, "plan", "repeating"])
    }

    fn endpoint(&self, segments: &[&str]) -> TransportResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::Request(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => req,
        }
    }
}

impl RemoteApi for HttpApi {
    fn fetch_snapshot(&self) -> ApiFuture<'_, Snapshot> {
        Box::pin(async move {
            let url = self.state_url()?;
            debug!("fetching state from {}", url);
            let resp = self
                .authorize(self.client.get(url))
                .send()
                .await
                .map_err(request_error)?;
            let body = read_body(resp).await.inspect_err(|e| {
                error!("fetching state failed: {}", e);
            })?;
            decode_state(body)
        })
    }

    fn submit_plans<'a>(&'a self, vehicle_id: &'a str, plans: &'a [Plan]) -> ApiFuture<'a, Vec<Plan>> {
        Box::pin(async move {
            let url = self.plans_url(vehicle_id)?;
            debug!("submitting {} plans for {} to {}", plans.len(), vehicle_id, url);
            let resp = self
                .authorize(self.client.post(url).json(plans))
                .send()
                .await
                .map_err(request_error)?;
            let body = read_body(resp).await.inspect_err(|e| {
                error!("submitting plans for {} failed: {}", vehicle_id, e);
            })?;
            decode_plans(body, plans)
        })
    }
}

fn request_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

/// Reads a response, turning non-2xx statuses into [`TransportError::Http`].
/// Returns `None` for an empty body.
async fn read_body(resp: Response) -> TransportResult<Option<Value>> {
    let status = resp.status();
    let text = resp.text().await.map_err(request_error)?;
    if !status.is_success() {
        return Err(TransportError::Http {
            status: status.as_u16(),
            body: text,
        });
    }
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| TransportError::Decode(e.to_string()))
}

/// Strips a `{"result": ...}` envelope.
fn unwrap_result(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub(crate) fn decode_state(body: Option<Value>) -> TransportResult<Snapshot> {
    let body = body.ok_or_else(|| TransportError::Decode("empty state response".into()))?;
    Snapshot::from_state(&body).map_err(|e| TransportError::Decode(e.to_string()))
}

/// An empty or null body means the submitted list was accepted as-is.
pub(crate) fn decode_plans(body: Option<Value>, submitted: &[Plan]) -> TransportResult<Vec<Plan>> {
    match body.map(unwrap_result) {
        None | Some(Value::Null) => Ok(submitted.to_vec()),
        Some(Value::Object(map)) if map.is_empty() => Ok(submitted.to_vec()),
        Some(Value::Array(items)) if items.is_empty() && !submitted.is_empty() => {
            Ok(submitted.to_vec())
        }
        Some(value @ Value::Array(_)) => {
            serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
        }
        Some(other) => Err(TransportError::Decode(format!(
            "expected a plan list, got {}",
            other
        ))),
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
