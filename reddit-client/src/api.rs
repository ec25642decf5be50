use crate::auth::RedditToken;
use crate::content::{ContentItem, Deletable, RedditCommentData, RedditPostData};
use async_trait::async_trait;
use eraser_core::{ContentKind, CoreError, RedditApiError};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Reddit caps listing pages at 100 items.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    #[serde(default)]
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
}

/// One page of a user's history, newest first.
#[derive(Debug, Clone, Default)]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub after: Option<String>,
}

/// The account operations the deletion loop relies on.
#[async_trait]
pub trait UserContentApi: Send + Sync {
    async fn current_user(&self) -> Result<RedditUserData, CoreError>;

    async fn list_user_content(
        &self,
        username: &str,
        kind: ContentKind,
        limit: u32,
        after: Option<&str>,
    ) -> Result<ContentPage, CoreError>;

    async fn delete_item(&self, item: &ContentItem) -> Result<(), CoreError>;
}

#[derive(Debug, Clone)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: String,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let http_client = build_http_client(&user_agent)?;
        Ok(Self::with_http_client(http_client, user_agent))
    }

    pub fn with_http_client(http_client: Client, user_agent: String) -> Self {
        Self {
            http_client,
            base_url: REDDIT_API_BASE.to_string(),
            user_agent,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .header("User-Agent", &self.user_agent);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if let Some(fields) = form {
            request_builder = request_builder.form(fields);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let api_error = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => RedditApiError::ItemNotFound {
                resource: endpoint.to_string(),
            },
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => RedditApiError::UnexpectedStatus {
                status_code: code,
                endpoint: endpoint.to_string(),
            },
        };
        Err(CoreError::RedditApi(api_error))
    }

    pub async fn get_user_info(&self, access_token: &str) -> Result<RedditUserData, CoreError> {
        let response = self
            .make_request(Method::GET, "/api/v1/me", access_token, None, None)
            .await?;

        let user_data: RedditUserData = response.json().await.map_err(|e| {
            error!("Failed to parse user data: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "Failed to parse user data".to_string(),
            })
        })?;

        debug!("Retrieved user info for: {}", user_data.name);
        Ok(user_data)
    }

    pub async fn get_user_content(
        &self,
        access_token: &str,
        username: &str,
        kind: ContentKind,
        limit: u32,
        after: Option<&str>,
    ) -> Result<ContentPage, CoreError> {
        let endpoint = user_content_endpoint(username, kind);
        let limit_str = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut params = vec![("sort", "new"), ("raw_json", "1"), ("limit", limit_str.as_str())];
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(params.as_slice()), None)
            .await?;
        let body = response.text().await?;

        let page = parse_content_page(kind, &body).map_err(|e| {
            error!("Failed to parse {} listing for u/{}: {}", kind, username, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse {} for u/{}", kind.plural(), username),
            })
        })?;

        info!(
            "Retrieved {} {} from u/{}",
            page.items.len(),
            kind.plural(),
            username
        );
        Ok(page)
    }

    pub async fn delete_thing(&self, access_token: &str, fullname: &str) -> Result<(), CoreError> {
        self.make_request(
            Method::POST,
            "/api/del",
            access_token,
            None,
            Some(&[("id", fullname)][..]),
        )
        .await?;
        debug!("Deleted {}", fullname);
        Ok(())
    }
}

pub(crate) fn build_http_client(user_agent: &str) -> Result<Client, CoreError> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .build()?)
}

pub fn user_content_endpoint(username: &str, kind: ContentKind) -> String {
    let listing = match kind {
        ContentKind::Post => "submitted",
        ContentKind::Comment => "comments",
    };
    format!("/user/{}/{}", username, listing)
}

fn parse_listing<T: DeserializeOwned>(body: &str) -> Result<RedditListing<T>, CoreError> {
    Ok(serde_json::from_str(body)?)
}

/// Decodes a user listing body into content items of the requested kind.
pub fn parse_content_page(kind: ContentKind, body: &str) -> Result<ContentPage, CoreError> {
    let (items, after) = match kind {
        ContentKind::Post => {
            let listing: RedditListing<RedditPostData> = parse_listing(body)?;
            let items = listing
                .data
                .children
                .into_iter()
                .map(|child| ContentItem::from(child.data))
                .collect();
            (items, listing.data.after)
        }
        ContentKind::Comment => {
            let listing: RedditListing<RedditCommentData> = parse_listing(body)?;
            let items = listing
                .data
                .children
                .into_iter()
                .map(|child| ContentItem::from(child.data))
                .collect();
            (items, listing.data.after)
        }
    };
    Ok(ContentPage { items, after })
}

/// The authenticated handle a run works with once authorization succeeds.
#[derive(Debug, Clone)]
pub struct RedditSession {
    api: RedditApiClient,
    token: RedditToken,
}

impl RedditSession {
    pub fn new(api: RedditApiClient, token: RedditToken) -> Self {
        Self { api, token }
    }

    pub fn token(&self) -> &RedditToken {
        &self.token
    }

    pub fn api(&self) -> &RedditApiClient {
        &self.api
    }
}

#[async_trait]
impl UserContentApi for RedditSession {
    async fn current_user(&self) -> Result<RedditUserData, CoreError> {
        self.api.get_user_info(&self.token.access_token).await
    }

    async fn list_user_content(
        &self,
        username: &str,
        kind: ContentKind,
        limit: u32,
        after: Option<&str>,
    ) -> Result<ContentPage, CoreError> {
        self.api
            .get_user_content(&self.token.access_token, username, kind, limit, after)
            .await
    }

    async fn delete_item(&self, item: &ContentItem) -> Result<(), CoreError> {
        self.api
            .delete_thing(&self.token.access_token, &item.fullname())
            .await
    }
}
