//! Endpoints described as data: name, aliases, verb and path template.

use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::request::{Params, Request, Verb};
use std::collections::BTreeMap;

/// One REST endpoint.
///
/// Path templates use `:name` segments, e.g. `/repos/:user/:repo/events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Canonical name.
    pub name: &'static str,
    /// Alternative names resolving to the same endpoint.
    pub aliases: &'static [&'static str],
    /// HTTP verb.
    pub verb: Verb,
    /// Path template.
    pub path: &'static str,
}

impl Endpoint {
    /// Describes a GET endpoint.
    pub const fn get(
        name: &'static str,
        aliases: &'static [&'static str],
        path: &'static str,
    ) -> Self {
        Self {
            name,
            aliases,
            verb: Verb::Get,
            path,
        }
    }

    /// Returns true if `name` is the canonical name or one of the aliases.
    pub fn responds_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }

    /// Placeholder names in template order.
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> {
        self.path.split('/').filter_map(|segment| segment.strip_prefix(':'))
    }

    /// Interpolates the path template.
    pub fn expand(&self, args: &PathArgs) -> GitHubResult<String> {
        let segments = self
            .path
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => args.require(name),
                None => Ok(segment),
            })
            .collect::<GitHubResult<Vec<_>>>()?;
        Ok(segments.join("/"))
    }

    /// Builds the request for this endpoint.
    pub fn request(&self, args: &PathArgs, params: Params) -> GitHubResult<Request> {
        Ok(Request::new(self.verb, self.expand(args)?).params(params))
    }
}

/// Finds an endpoint by canonical name or alias.
pub fn find<'t>(table: &'t [Endpoint], name: &str) -> GitHubResult<&'t Endpoint> {
    table.iter().find(|e| e.responds_to(name)).ok_or_else(|| {
        GitHubError::new(
            GitHubErrorKind::UnknownEndpoint,
            format!("unknown endpoint: {}", name),
        )
    })
}

/// Values for path template placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathArgs(BTreeMap<String, String>);

impl PathArgs {
    /// Creates empty arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Sets a value when one is given.
    pub fn with_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    /// Sets a value only if none is present.
    pub fn or_default(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.0
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
        self
    }

    /// Gets a value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn require(&self, name: &str) -> GitHubResult<&str> {
        let value = self
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| GitHubError::missing_parameter(name))?;

        if value
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
        {
            return Err(GitHubError::invalid_parameter(format!(
                "{} contains characters not allowed in a path segment: {:?}",
                name, value
            )));
        }
        if value == "." || value == ".." {
            return Err(GitHubError::invalid_parameter(format!(
                "{} cannot be a dot segment: {:?}",
                name, value
            )));
        }

        Ok(value)
    }
}
