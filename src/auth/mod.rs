//! Authentication header construction for GitHub API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString};

/// Authentication method for GitHub API.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// HTTP basic authentication with login and password.
    Basic {
        /// Account login.
        login: String,
        /// Account password.
        password: SecretString,
    },
    /// OAuth or personal access token.
    Token(SecretString),
}

impl AuthMethod {
    /// Creates a basic authentication method.
    pub fn basic(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            login: login.into(),
            password: SecretString::new(password.into()),
        }
    }

    /// Creates a token authentication method.
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(SecretString::new(token.into()))
    }

    /// Builds the `Authorization` header value.
    pub fn header_value(&self) -> String {
        match self {
            Self::Basic { login, password } => {
                format!("Basic {}", basic_auth(login, password.expose_secret()))
            }
            Self::Token(token) => token_auth(token.expose_secret()),
        }
    }

    /// Returns a description safe to log.
    pub fn redacted(&self) -> String {
        match self {
            Self::Basic { login, .. } => format!("basic({}:***)", login),
            Self::Token(token) => {
                let exposed = token.expose_secret();
                if exposed.starts_with("ghp_") {
                    "token(ghp_***)".to_string()
                } else if exposed.starts_with("github_pat_") {
                    "token(github_pat_***)".to_string()
                } else if exposed.starts_with("gho_") {
                    "token(gho_***)".to_string()
                } else {
                    "token(***)".to_string()
                }
            }
        }
    }
}

/// Encodes `login:password` for HTTP basic authentication.
///
/// Returns the credential only, plain base64 with no line breaks. The
/// `Authorization` header value is `Basic <credential>`, which is what
/// [`AuthMethod::header_value`] produces.
pub fn basic_auth(login: &str, password: &str) -> String {
    STANDARD.encode(format!("{}:{}", login, password))
}

/// Builds the complete `Authorization` header value for a token,
/// `Bearer <token>`. Unlike [`basic_auth`], no prefix needs adding.
pub fn token_auth(token: &str) -> String {
    format!("Bearer {}", token)
}
