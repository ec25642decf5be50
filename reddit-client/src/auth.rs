use crate::api::{build_http_client, RedditApiClient, RedditSession};
use crate::callback::{CallbackListener, CallbackPayload};
use eraser_core::{ConfigError, CoreError, EraserConfig, RedditApiError};
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, HttpRequest,
    HttpResponse, RedirectUrl, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Fixed anti-forgery state sent with every authorization request.
pub const OAUTH_STATE: &str = "uniquestate";

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub user_agent: String,
    pub auth_url: String,
    pub token_url: String,
}

impl RedditOAuth2Config {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        user_agent: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            user_agent,
            auth_url: REDDIT_AUTH_URL.to_string(),
            token_url: REDDIT_TOKEN_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

impl From<&EraserConfig> for RedditOAuth2Config {
    fn from(config: &EraserConfig) -> Self {
        Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.redirect_uri.clone(),
            config.user_agent.clone(),
        )
    }
}

/// Access credential for the current run. Lives in memory only.
#[derive(Debug, Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= SystemTime::now()
    }

    fn from_response(response: &BasicTokenResponse) -> Self {
        let expires_in = response.expires_in().unwrap_or(Duration::from_secs(3600));
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_at: SystemTime::now() + expires_in,
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    PendingAuthorization { csrf_token: CsrfToken },
    Authenticated { token: RedditToken },
    TokenExpired { token: RedditToken },
}

pub struct RedditClient {
    config: RedditOAuth2Config,
    oauth_client: BasicClient,
    http_client: reqwest::Client,
    auth_state: AuthState,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(config.auth_url.clone()).map_err(|e| invalid_url("auth_url", e))?;
        let token_url =
            TokenUrl::new(config.token_url.clone()).map_err(|e| invalid_url("token_url", e))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| invalid_url("redirect_uri", e))?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth)
        .set_redirect_uri(redirect_url);

        let http_client = build_http_client(&config.user_agent)?;

        Ok(Self {
            config,
            oauth_client,
            http_client,
            auth_state: AuthState::NotAuthenticated,
        })
    }

    pub fn get_required_scopes() -> Vec<&'static str> {
        vec!["identity", "history", "edit"]
    }

    pub fn generate_auth_url(&mut self, scopes: &[&str]) -> Result<(String, CsrfToken), CoreError> {
        let (auth_url, csrf_token) = self
            .oauth_client
            .authorize_url(|| CsrfToken::new(OAUTH_STATE.to_string()))
            .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("duration", "permanent")
            .url();

        debug!("Generated auth URL with scopes {:?}", scopes);
        self.auth_state = AuthState::PendingAuthorization {
            csrf_token: csrf_token.clone(),
        };
        Ok((auth_url.to_string(), csrf_token))
    }

    /// Validates a captured redirect and pulls the one-time code out of it.
    pub fn accept_callback(
        &self,
        payload: CallbackPayload,
        expected_state: &CsrfToken,
    ) -> Result<AuthorizationCode, CoreError> {
        if let Some(reason) = payload.error {
            return Err(RedditApiError::AuthenticationFailed { reason }.into());
        }
        if let Some(state) = payload.state.as_deref() {
            if state != expected_state.secret() {
                return Err(RedditApiError::AuthenticationFailed {
                    reason: "CSRF token mismatch".to_string(),
                }
                .into());
            }
        }
        payload
            .code
            .map(AuthorizationCode::new)
            .ok_or_else(|| RedditApiError::AuthorizationCodeMissing.into())
    }

    /// Trades the authorization code for an access token. The code is
    /// consumed either way.
    pub async fn exchange_code(&mut self, code: AuthorizationCode) -> Result<RedditToken, CoreError> {
        let http_client = self.http_client.clone();
        let response = self
            .oauth_client
            .exchange_code(code)
            .request_async(|request| send_token_request(http_client, request))
            .await
            .map_err(|e| {
                let reason = describe_token_error(e);
                error!("Token exchange failed: {}", reason);
                CoreError::RedditApi(RedditApiError::TokenExchangeFailed { reason })
            })?;

        let token = RedditToken::from_response(&response);
        info!("Obtained access token with scopes {:?}", token.scope);
        self.set_token(token.clone());
        Ok(token)
    }

    pub fn set_token(&mut self, token: RedditToken) {
        self.auth_state = if token.is_expired() {
            AuthState::TokenExpired { token }
        } else {
            AuthState::Authenticated { token }
        };
    }

    pub fn get_auth_state(&self) -> &AuthState {
        &self.auth_state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth_state, AuthState::Authenticated { .. })
    }

    pub fn needs_refresh(&self) -> bool {
        matches!(self.auth_state, AuthState::TokenExpired { .. })
    }

    /// Hands the credential over to an API session.
    pub fn into_session(self) -> Result<RedditSession, CoreError> {
        match self.auth_state {
            AuthState::Authenticated { token } => {
                let api =
                    RedditApiClient::with_http_client(self.http_client, self.config.user_agent);
                Ok(RedditSession::new(api, token))
            }
            AuthState::TokenExpired { .. } => Err(RedditApiError::InvalidToken.into()),
            AuthState::PendingAuthorization { .. } => Err(RedditApiError::AuthenticationFailed {
                reason: "Authentication pending".to_string(),
            }
            .into()),
            AuthState::NotAuthenticated => Err(RedditApiError::AuthenticationFailed {
                reason: "Not authenticated".to_string(),
            }
            .into()),
        }
    }
}

async fn send_token_request(
    http_client: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http_client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn describe_token_error(err: RequestTokenError<reqwest::Error, BasicErrorResponse>) -> String {
    match err {
        RequestTokenError::ServerResponse(response) => response.to_string(),
        RequestTokenError::Request(e) => format!("token request failed: {}", e),
        RequestTokenError::Parse(e, _) => format!("unreadable token response: {}", e),
        RequestTokenError::Other(message) => message,
    }
}

fn invalid_url(field: &str, err: oauth2::url::ParseError) -> CoreError {
    ConfigError::InvalidUrl {
        field: field.to_string(),
        reason: err.to_string(),
    }
    .into()
}

/// Runs the interactive authorization: prints and opens the consent URL,
/// waits for the single redirect, then exchanges the code.
pub struct Authenticator {
    client: RedditClient,
    callback_addr: SocketAddr,
    open_browser: bool,
}

impl Authenticator {
    pub fn new(config: &EraserConfig) -> Result<Self, CoreError> {
        Ok(Self {
            client: RedditClient::new(RedditOAuth2Config::from(config))?,
            callback_addr: config.callback_addr,
            open_browser: true,
        })
    }

    pub fn with_client(client: RedditClient, callback_addr: SocketAddr) -> Self {
        Self {
            client,
            callback_addr,
            open_browser: true,
        }
    }

    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    pub async fn authenticate(self, cancel: &CancellationToken) -> Result<RedditSession, CoreError> {
        let listener = CallbackListener::bind(self.callback_addr).await?;
        self.authenticate_with(listener, cancel).await
    }

    pub async fn authenticate_with(
        mut self,
        listener: CallbackListener,
        cancel: &CancellationToken,
    ) -> Result<RedditSession, CoreError> {
        let scopes = RedditClient::get_required_scopes();
        let (auth_url, csrf_token) = self.client.generate_auth_url(&scopes)?;

        println!("\nPlease authorize the application:");
        println!("\n{}\n", auth_url);

        if self.open_browser {
            if let Err(e) = open::that(&auth_url) {
                warn!("Failed to open browser: {}", e);
                println!(
                    "Could not open browser automatically. Please copy and paste the URL manually: {}",
                    auth_url
                );
            }
        }

        println!("Waiting for authorization...");
        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Authorization cancelled while waiting for the redirect");
                return Err(CoreError::Cancelled);
            }
            payload = listener.wait() => payload,
        };

        let code = self.client.accept_callback(payload, &csrf_token)?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CoreError::Cancelled),
            token = self.client.exchange_code(code) => { token?; }
        }

        println!("\nAuthorization successful!");
        self.client.into_session()
    }
}
