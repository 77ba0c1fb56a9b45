//! JSON search/profile service client.
//!
//! Talks to two endpoints under a configured base URL:
//!
//! - `GET {base}/search?query=<term>` returns `{"users": [...]}`
//! - `GET {base}/users/<username>` returns `{"user": {...}}`, with a 404 or
//!   `"user": null` meaning the service has no data for that account
//!
//! Status mapping: 429 is [`SearchError::RateLimited`], 401/403 is
//! [`SearchError::Auth`], anything else non-2xx is [`SearchError::Http`],
//! and an undecodable body is [`SearchError::Parse`].

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::{ProfileClient, SearchClient};
use crate::error::SearchError;
use crate::types::{Priority, Profile, RawHit};

use super::http;

/// Connection settings for [`HttpApiClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL the endpoint paths are appended to.
    pub base_url: String,
    /// Environment variable holding the session credential.
    pub session_env: String,
    /// Header the session credential is sent in.
    pub session_header: String,
    /// Fixed User-Agent. `None` rotates through browser User-Agents.
    pub user_agent: Option<String>,
    /// HTTP client timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api/v1".into(),
            session_env: "SCOUT_SESSION".into(),
            session_header: "Cookie".into(),
            user_agent: None,
            timeout_seconds: 30,
        }
    }
}

impl ApiConfig {
    /// Create a config for the given base URL with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Validate URL, header name, and timeout.
    pub fn validate(&self) -> Result<(), SearchError> {
        parse_base(&self.base_url)?;
        HeaderName::from_bytes(self.session_header.as_bytes()).map_err(|_| {
            SearchError::Config(format!(
                "session_header '{}' is not a valid header name",
                self.session_header
            ))
        })?;
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP client for the JSON search and profile endpoints.
///
/// Implements both [`SearchClient`] and [`ProfileClient`]; wrap it in an
/// `Arc` to use one instance for both roles.
pub struct HttpApiClient {
    client: reqwest::Client,
    base: Url,
    session: Option<(HeaderName, HeaderValue)>,
    user_agent: Option<String>,
}

impl fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base", &self.base.as_str())
            .field("session", &self.session.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl HttpApiClient {
    /// Build a client, reading the session credential from the
    /// environment variable named in `config`. A missing variable means
    /// requests go out without a session header.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid config and
    /// [`SearchError::Auth`] for a credential that cannot be sent as a
    /// header value.
    pub fn new(config: &ApiConfig) -> Result<Self, SearchError> {
        let client = Self::without_session(config)?;
        match std::env::var(&config.session_env) {
            Ok(secret) if !secret.trim().is_empty() => client.with_session(config, &secret),
            _ => {
                tracing::warn!(
                    env = %config.session_env,
                    "no session credential set; requests are unauthenticated"
                );
                Ok(client)
            }
        }
    }

    /// Build a client that sends no session credential.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid config.
    pub fn without_session(config: &ApiConfig) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            client: http::build_client(Duration::from_secs(config.timeout_seconds))?,
            base: parse_base(&config.base_url)?,
            session: None,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Attach a session credential, sent in `config.session_header`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Auth`] if the credential is not a valid
    /// header value. The credential itself is never included.
    pub fn with_session(mut self, config: &ApiConfig, secret: &str) -> Result<Self, SearchError> {
        let name = HeaderName::from_bytes(config.session_header.as_bytes())
            .map_err(|_| SearchError::Config("invalid session header name".into()))?;
        let mut value = HeaderValue::from_str(secret.trim()).map_err(|_| {
            SearchError::Auth("session credential is not a valid header value".into())
        })?;
        value.set_sensitive(true);
        self.session = Some((name, value));
        Ok(self)
    }

    /// Returns `true` if a session credential is attached.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn search_url(&self, term: &str) -> Url {
        let mut url = self.endpoint(&["search"]);
        url.query_pairs_mut().append_pair("query", term);
        url
    }

    fn user_url(&self, identity: &str) -> Url {
        self.endpoint(&["users", identity])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // parse_base guarantees a base that can carry path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, url: Url) -> Result<Response, SearchError> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, http::user_agent(self.user_agent.as_deref()));
        if let Some((name, value)) = &self.session {
            request = request.header(name.clone(), value.clone());
        }
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout(format!("request timed out: {}", e.without_url()))
            } else {
                SearchError::Http(format!("request failed: {}", e.without_url()))
            }
        })
    }
}

impl SearchClient for HttpApiClient {
    async fn search(&self, term: &str, priority: Priority) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(term, %priority, "search request");
        let response = self.get(self.search_url(term)).await?;
        let status = response.status();
        check_status(status, "search")?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("search response: {}", e.without_url())))?;
        tracing::trace!(hits = body.users.len(), "search response received");
        Ok(body.users.into_iter().map(RawHit::from).collect())
    }
}

impl ProfileClient for HttpApiClient {
    async fn fetch(&self, identity: &str) -> Result<Option<Profile>, SearchError> {
        let response = self.get(self.user_url(identity)).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(status, "profile")?;

        let body: UserResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("profile response: {}", e.without_url())))?;
        Ok(body.user.map(Profile::from))
    }
}

fn parse_base(base_url: &str) -> Result<Url, SearchError> {
    let url = Url::parse(base_url)
        .map_err(|e| SearchError::Config(format!("invalid base_url '{base_url}': {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(SearchError::Config(format!(
            "base_url '{base_url}' must be an http(s) URL"
        )));
    }
    Ok(url)
}

fn check_status(status: StatusCode, endpoint: &str) -> Result<(), SearchError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::TOO_MANY_REQUESTS => Err(SearchError::RateLimited(format!(
            "{endpoint} endpoint returned 429"
        ))),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SearchError::Auth(format!(
            "{endpoint} endpoint returned {status}"
        ))),
        s => Err(SearchError::Http(format!("{endpoint} endpoint returned {s}"))),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    users: Vec<UserHit>,
}

#[derive(Debug, Deserialize)]
struct UserHit {
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    follower_count: Option<u64>,
    #[serde(default)]
    is_private: Option<bool>,
    #[serde(default)]
    biography: Option<String>,
}

impl From<UserHit> for RawHit {
    fn from(hit: UserHit) -> Self {
        Self {
            identity: hit.username,
            display_name: hit.full_name.filter(|n| !n.is_empty()),
            follower_count_hint: hit.follower_count,
            is_private_hint: hit.is_private,
            bio_hint: hit.biography.filter(|b| !b.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(default)]
    user: Option<UserDetail>,
}

#[derive(Debug, Deserialize)]
struct UserDetail {
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    biography: Option<String>,
    #[serde(default)]
    follower_count: u64,
    #[serde(default)]
    following_count: u64,
    #[serde(default)]
    post_count: u64,
    #[serde(default)]
    is_verified: bool,
    #[serde(default)]
    is_business: bool,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    profile_pic_url: Option<String>,
}

impl From<UserDetail> for Profile {
    fn from(user: UserDetail) -> Self {
        Self {
            identity: user.username,
            display_name: user.full_name.unwrap_or_default(),
            biography: user.biography.unwrap_or_default(),
            follower_count: user.follower_count,
            following_count: user.following_count,
            post_count: user.post_count,
            is_verified: user.is_verified,
            is_business: user.is_business,
            is_private: user.is_private,
            avatar_url: user.profile_pic_url.filter(|u| !u.is_empty()),
        }
    }
}
