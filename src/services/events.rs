//! Event operations.

use crate::client::GitHubClient;
use crate::endpoint::{self, Endpoint, PathArgs};
use crate::errors::GitHubResult;
use crate::pagination::Paginator;
use crate::request::{Params, Request};
use crate::response::ApiResponse;

/// Public events: `GET /events`.
pub const PUBLIC: Endpoint = Endpoint::get(
    "public",
    &["public_events", "list_public", "list_public_events"],
    "/events",
);

/// Repository events: `GET /repos/:user/:repo/events`.
pub const REPOSITORY: Endpoint = Endpoint::get(
    "repository",
    &["repos", "repo_events", "repository_events", "list_repository_events"],
    "/repos/:user/:repo/events",
);

/// Issue events for a repository: `GET /repos/:user/:repo/issues/events`.
pub const ISSUE: Endpoint = Endpoint::get(
    "issue",
    &["issues", "issue_events", "list_issue_events"],
    "/repos/:user/:repo/issues/events",
);

/// Public events for a network of repositories: `GET /networks/:user/:repo/events`.
pub const NETWORK: Endpoint = Endpoint::get(
    "network",
    &[
        "repo_network",
        "repository_network",
        "list_repo_network_events",
        "list_repository_network_events",
    ],
    "/networks/:user/:repo/events",
);

/// Public events for an organization: `GET /orgs/:org/events`.
pub const ORG: Endpoint = Endpoint::get(
    "org",
    &["organization", "list_orgs", "list_org_events", "list_organization_events"],
    "/orgs/:org/events",
);

/// Every events endpoint.
pub const EVENT_ENDPOINTS: &[Endpoint] = &[PUBLIC, REPOSITORY, ISSUE, NETWORK, ORG];

/// Service for event operations.
///
/// Repository-scoped calls fall back to the client's configured user and
/// repository when none are passed.
pub struct EventsService<'a> {
    client: &'a GitHubClient,
}

impl<'a> EventsService<'a> {
    /// Creates a new events service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Lists public events.
    pub async fn public(&self, params: Params) -> GitHubResult<ApiResponse> {
        self.call(PUBLIC.name, PathArgs::new(), params).await
    }

    /// Lists events for a repository.
    pub async fn repository(
        &self,
        user: Option<&str>,
        repo: Option<&str>,
        params: Params,
    ) -> GitHubResult<ApiResponse> {
        self.call(REPOSITORY.name, user_repo(user, repo), params).await
    }

    /// Lists issue events for a repository.
    pub async fn issue(
        &self,
        user: Option<&str>,
        repo: Option<&str>,
        params: Params,
    ) -> GitHubResult<ApiResponse> {
        self.call(ISSUE.name, user_repo(user, repo), params).await
    }

    /// Lists public events for a network of repositories.
    pub async fn network(
        &self,
        user: Option<&str>,
        repo: Option<&str>,
        params: Params,
    ) -> GitHubResult<ApiResponse> {
        self.call(NETWORK.name, user_repo(user, repo), params).await
    }

    /// Lists public events for an organization.
    pub async fn org(&self, org: &str, params: Params) -> GitHubResult<ApiResponse> {
        self.call(ORG.name, PathArgs::new().with("org", org), params)
            .await
    }

    /// Calls an events endpoint by canonical name or alias.
    pub async fn call(
        &self,
        name: &str,
        args: PathArgs,
        params: Params,
    ) -> GitHubResult<ApiResponse> {
        let request = self.request_for(name, args, params)?;
        self.client.send(request).await
    }

    /// Walks every page of an events endpoint.
    pub fn paginate(
        &self,
        name: &str,
        args: PathArgs,
        params: Params,
    ) -> GitHubResult<Paginator<'a>> {
        let request = self.request_for(name, args, params)?;
        Ok(self.client.paginate(request))
    }

    /// Builds the request an endpoint call would send.
    pub fn request_for(&self, name: &str, args: PathArgs, params: Params) -> GitHubResult<Request> {
        let endpoint = endpoint::find(EVENT_ENDPOINTS, name)?;
        let config = self.client.config();
        let args = args
            .or_default("user", config.user.as_deref())
            .or_default("repo", config.repo.as_deref());

        tracing::trace!(
            endpoint = endpoint.name,
            requested = name,
            "Resolved events endpoint"
        );
        endpoint.request(&args, params)
    }
}

fn user_repo(user: Option<&str>, repo: Option<&str>) -> PathArgs {
    PathArgs::new().with_opt("user", user).with_opt("repo", repo)
}
