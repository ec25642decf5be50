use crate::error::ConfigError;
use std::net::SocketAddr;
use std::time::Duration;

pub const CLIENT_ID_VAR: &str = "REDDIT_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "REDDIT_CLIENT_SECRET";
pub const USER_AGENT_VAR: &str = "REDDIT_USER_AGENT";
pub const DELETE_LIMIT_VAR: &str = "REDDIT_DELETE_LIMIT";

pub const REQUIRED_VARS: [&str; 3] = [CLIENT_ID_VAR, CLIENT_SECRET_VAR, USER_AGENT_VAR];

/// Must match the redirect URI registered for the Reddit app exactly.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080";
pub const DEFAULT_CALLBACK_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8080);
pub const DEFAULT_DELETE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct EraserConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub redirect_uri: String,
    pub callback_addr: SocketAddr,
    pub delete_limit: Option<usize>,
    pub delete_delay: Duration,
}

impl EraserConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as missing. All missing required names are
    /// reported together, in the order of [`REQUIRED_VARS`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|&name| read(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnvironmentVariables { names: missing });
        }

        let delete_limit = match read(DELETE_LIMIT_VAR) {
            Some(raw) => Some(parse_limit(&raw)?),
            None => None,
        };

        Ok(Self {
            client_id: read(CLIENT_ID_VAR).unwrap_or_default(),
            client_secret: read(CLIENT_SECRET_VAR).unwrap_or_default(),
            user_agent: read(USER_AGENT_VAR).unwrap_or_default(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            callback_addr: SocketAddr::from(DEFAULT_CALLBACK_ADDR),
            delete_limit,
            delete_delay: DEFAULT_DELETE_DELAY,
        })
    }
}

fn parse_limit(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(ConfigError::InvalidValue {
            field: DELETE_LIMIT_VAR.to_string(),
            value: raw.to_string(),
        }),
    }
}
