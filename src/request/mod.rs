//! HTTP verbs, request parameters and per-request options.

use crate::auth::AuthMethod;
use crate::errors::{GitHubError, GitHubResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Paths that GitHub only serves to authenticated callers.
static TOKEN_REQUIRED: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![Regex::new(r"repos/.+/.+/comments").expect("Failed to compile token-required regex")]
});

/// HTTP verb supported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
}

impl Verb {
    /// Every supported verb.
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Delete, Verb::Patch];

    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    /// Returns true if parameters travel in a JSON body rather than the query string.
    pub fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Converts to the transport's method type.
    pub fn method(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = GitHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| GitHubError::unsupported_method(&name.to_ascii_lowercase()))
    }
}

impl TryFrom<&reqwest::Method> for Verb {
    type Error = GitHubError;

    fn try_from(method: &reqwest::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// Request parameters as a string-keyed JSON map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a parameter, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Gets a parameter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Removes a parameter.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Normalizes keys recursively.
    ///
    /// Keys are trimmed, entries whose key trims to nothing or whose value is
    /// `null` are dropped, and nested objects and arrays are normalized the
    /// same way. Scalar values keep their JSON type.
    pub fn normalize(self) -> Self {
        Self(normalize_map(self.0))
    }

    /// Encodes the parameters as query string pairs.
    ///
    /// Scalars are stringified, arrays are joined with commas, nested objects
    /// are sent as compact JSON.
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), query_value(v)))
            .collect()
    }

    /// Converts into a JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Params {
    type Error = GitHubError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(GitHubError::invalid_parameter(format!(
                "parameters must be a JSON object, got {}",
                other
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn normalize_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter_map(|(key, value)| {
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            normalize_value(value).map(|v| (key.to_string(), v))
        })
        .collect()
}

fn normalize_value(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(Value::Object(normalize_map(map))),
        Value::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(normalize_value).collect(),
        )),
        scalar => Some(scalar),
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(query_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the default `Accept` media type.
    pub accept: Option<String>,
    /// Extra headers sent with the request.
    pub headers: Vec<(String, String)>,
    /// Credentials used instead of the configured ones.
    pub auth: Option<AuthMethod>,
}

impl RequestOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `Accept` media type.
    pub fn accept(mut self, media_type: impl Into<String>) -> Self {
        self.accept = Some(media_type.into());
        self
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the credentials for this request.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }
}

/// A single API call: verb, path, parameters and options.
#[derive(Debug, Clone)]
pub struct Request {
    verb: Verb,
    path: String,
    params: Params,
    options: RequestOptions,
}

impl Request {
    /// Creates a request with no parameters.
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            params: Params::default(),
            options: RequestOptions::default(),
        }
    }

    /// Creates a request from a verb name, rejecting unsupported verbs.
    pub fn parse(method: &str, path: impl Into<String>) -> GitHubResult<Self> {
        Ok(Self::new(method.parse()?, path))
    }

    /// Sets the parameters. They are normalized on the way in.
    pub fn params(mut self, params: Params) -> Self {
        self.params = params.normalize();
        self
    }

    /// Sets the options.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Gets the verb.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Gets the path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Gets the normalized parameters.
    pub fn get_params(&self) -> &Params {
        &self.params
    }

    /// Gets the options.
    pub fn get_options(&self) -> &RequestOptions {
        &self.options
    }

    /// Query pairs for verbs without a body.
    pub fn query(&self) -> Vec<(String, String)> {
        if self.verb.has_body() {
            Vec::new()
        } else {
            self.params.to_query()
        }
    }

    /// JSON body for verbs that carry one. Empty parameters send no body.
    pub fn body(&self) -> Option<Value> {
        if self.verb.has_body() && !self.params.is_empty() {
            Some(self.params.clone().into_value())
        } else {
            None
        }
    }

    /// Returns true if the path is only served to authenticated callers.
    pub fn requires_token(&self) -> bool {
        requires_token(&self.path)
    }
}

/// Returns true if the path is only served to authenticated callers.
pub fn requires_token(path: &str) -> bool {
    TOKEN_REQUIRED.iter().any(|re| re.is_match(path))
}
