//! Client configuration.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::Error;

pub const DEFAULT_USER_AGENT: &str = concat!("jsonapi-client/", env!("CARGO_PKG_VERSION"));

const BASE_URL_VAR: &str = "JSONAPI_BASE_URL";
const TOKEN_VAR: &str = "JSONAPI_TOKEN";
const USER_AGENT_VAR: &str = "JSONAPI_USER_AGENT";

/// The `authorization` header value, sent verbatim.
///
/// A resolver is called again for every request built, so it can hand out
/// a freshly rotated token each time.
#[derive(Clone)]
pub enum Token {
    Static(String),
    Resolver(Arc<dyn Fn() -> Option<String> + Send + Sync>),
}

impl Token {
    pub fn resolver<F>(resolve: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Token::Resolver(Arc::new(resolve))
    }

    pub fn resolve(&self) -> Option<String> {
        match self {
            Token::Static(value) => Some(value.clone()),
            Token::Resolver(resolve) => resolve(),
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Static(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Static(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Static(_) => f.write_str("Token::Static(..)"),
            Token::Resolver(_) => f.write_str("Token::Resolver(..)"),
        }
    }
}

/// Settings shared by every request a `Client` makes.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: Url,
    pub token: Option<Token>,
    pub user_agent: String,
}

impl ClientOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn builder(base_url: &str) -> ClientOptionsBuilder {
        ClientOptionsBuilder {
            base_url: base_url.to_string(),
            token: None,
            user_agent: None,
        }
    }

    /// Read `JSONAPI_BASE_URL`, and optionally `JSONAPI_TOKEN` and
    /// `JSONAPI_USER_AGENT`, from the environment. A missing base URL is
    /// `Error::Config`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(BASE_URL_VAR).ok_or_else(|| Error::Config(format!("{BASE_URL_VAR} is not set")))?;
        let mut builder = Self::builder(&base_url);
        if let Some(token) = lookup(TOKEN_VAR) {
            builder = builder.token(token);
        }
        if let Some(user_agent) = lookup(USER_AGENT_VAR) {
            builder = builder.user_agent(user_agent);
        }
        builder.build()
    }
}

#[derive(Debug)]
pub struct ClientOptionsBuilder {
    base_url: String,
    token: Option<Token>,
    user_agent: Option<String>,
}

impl ClientOptionsBuilder {
    pub fn token(mut self, token: impl Into<Token>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<ClientOptions, Error> {
        let base_url = Url::parse(self.base_url.trim())?;
        Ok(ClientOptions {
            base_url,
            token: self.token,
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}
