//! Async HTTP client wrapping the Circle JSON API.

use std::time::Duration;

use circle_core::{
  source::{ProfileEditor, ProfileSource, RelationshipMutator},
  user::{FollowRequest, ProfileSubject, ProfileUpdate, UserId, ViewerIdentity},
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Connection settings for the Circle API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
  pub base_url: String,
  /// Bearer token; empty means anonymous.
  pub token:    String,
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("failed to build HTTP client: {0}")]
  Build(#[source] reqwest::Error),

  #[error("invalid base URL {url:?}: {reason}")]
  BaseUrl { url: String, reason: String },

  #[error("{0:?} cannot be used as a user id in a request path")]
  InvalidSegment(String),

  #[error("{method} {path} failed: {source}")]
  Http {
    method: Method,
    path:   String,
    #[source]
    source: reqwest::Error,
  },

  #[error(
    "{method} {path} → {status}{}",
    .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
  )]
  Status {
    method:  Method,
    path:    String,
    status:  StatusCode,
    message: Option<String>,
  },
}

/// Async HTTP client for the Circle JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct ApiClient {
  client: Client,
  base:   Url,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
    let bad_base = |reason: String| ClientError::BaseUrl {
      url: config.base_url.clone(),
      reason,
    };
    let base =
      Url::parse(&config.base_url).map_err(|e| bad_base(e.to_string()))?;
    if base.cannot_be_a_base() {
      return Err(bad_base("not a hierarchical URL".into()));
    }
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(ClientError::Build)?;
    Ok(Self {
      client,
      base,
      config,
    })
  }

  /// `{base}/api/{segments...}`, each segment percent-encoded on its own, so
  /// an id can never add path levels, a query, or a fragment.
  fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
    // `..` and `.` would be dropped or resolved rather than encoded.
    if let Some(dots) = segments.iter().find(|s| matches!(**s, "." | "..")) {
      return Err(ClientError::InvalidSegment(dots.to_string()));
    }
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().push("api").extend(segments);
    }
    Ok(url)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.token.is_empty() {
      req
    } else {
      req.bearer_auth(&self.config.token)
    }
  }

  /// Send `req` and map transport failures and non-2xx statuses.
  async fn send(
    &self,
    method: Method,
    segments: &[&str],
    build: impl FnOnce(RequestBuilder) -> RequestBuilder,
  ) -> Result<Response, ClientError> {
    let url = self.url(segments)?;
    let path = format!("/{}", segments.join("/"));
    debug!(%method, %url, "request");
    let req = self.auth(self.client.request(method.clone(), url));
    let resp = build(req).send().await.map_err(|source| ClientError::Http {
      method: method.clone(),
      path: path.clone(),
      source,
    })?;

    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    // The server reports failures as `{"error": "..."}`.
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned));
    Err(ClientError::Status {
      method,
      path,
      status,
      message,
    })
  }

  async fn json<T: DeserializeOwned>(
    &self,
    method: Method,
    segments: &[&str],
    resp: Response,
  ) -> Result<T, ClientError> {
    resp.json().await.map_err(|source| ClientError::Http {
      method,
      path: format!("/{}", segments.join("/")),
      source,
    })
  }
}

// ── Users ───────────────────────────────────────────────────────────────────

impl ProfileSource for ApiClient {
  type Error = ClientError;

  /// `GET /api/users/{id}`
  async fn fetch_profile(
    &self,
    id: &UserId,
  ) -> Result<ProfileSubject, ClientError> {
    let path = ["users", id.as_str()];
    let resp = self.send(Method::GET, &path, |r| r).await?;
    self.json(Method::GET, &path, resp).await
  }

  /// `GET /api/current`
  async fn fetch_viewer(&self) -> Result<ViewerIdentity, ClientError> {
    let resp = self.send(Method::GET, &["current"], |r| r).await?;
    self.json(Method::GET, &["current"], resp).await
  }
}

impl ProfileEditor for ApiClient {
  type Error = ClientError;

  /// `PUT /api/users/{id}`
  async fn update_profile(
    &self,
    id: &UserId,
    update: ProfileUpdate,
  ) -> Result<ProfileSubject, ClientError> {
    let path = ["users", id.as_str()];
    let resp = self.send(Method::PUT, &path, |r| r.json(&update)).await?;
    self.json(Method::PUT, &path, resp).await
  }
}

// ── Follows ─────────────────────────────────────────────────────────────────

impl RelationshipMutator for ApiClient {
  type Error = ClientError;

  /// `POST /api/follow` — body `{"followingId": "<id>"}`
  async fn follow(&self, request: FollowRequest) -> Result<(), ClientError> {
    self
      .send(Method::POST, &["follow"], |r| r.json(&request))
      .await
      .map(drop)
  }

  /// `DELETE /api/unfollow/{id}`
  async fn unfollow(&self, following_id: &UserId) -> Result<(), ClientError> {
    let path = ["unfollow", following_id.as_str()];
    self.send(Method::DELETE, &path, |r| r).await.map(drop)
  }
}
