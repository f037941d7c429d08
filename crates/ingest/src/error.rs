use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no {0} token available, run `jobwatch auth`")]
    MissingToken(&'static str),

    #[error("UPWORK_API_KEY and UPWORK_API_SECRET must be set")]
    MissingCredentials,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("failed to update env file: {0}")]
    EnvFile(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AuthError {
    /// True when the operator has to re-run the authorization flow.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, AuthError::MissingToken(_) | AuthError::MissingCredentials)
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl SearchError {
    pub fn needs_reauth(&self) -> bool {
        matches!(self, SearchError::Auth(e) if e.needs_reauth())
    }
}
