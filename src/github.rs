//! Fetches a repository's issues from the GitHub REST API.
//!
//! One GET for the issue list (a single page, newest first), then one GET per
//! issue that has comments. No pagination.

use miette::Diagnostic;
use serde::Deserialize;
use tracing::debug;
use ureq::{Agent, http::HeaderMap};

pub const API_ROOT: &str = "https://api.github.com";

pub fn agent() -> Agent {
    Agent::new_with_config(
        Agent::config_builder()
            .http_status_as_error(false)
            .user_agent("issue2csv")
            .build(),
    )
}

/// Splits an `owner/name` repository identifier.
pub fn parse_repo(repo: &str) -> Result<(String, String), Error> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner.to_owned(), name.to_owned()))
        }
        _ => Err(Error::InvalidRepo {
            input: repo.to_owned(),
        }),
    }
}

pub fn fetch_issues(
    agent: &Agent,
    api_root: &str,
    token: Option<&str>,
    owner: &str,
    name: &str,
) -> Result<Vec<IssueResponse>, Error> {
    let url = format!("{api_root}/repos/{owner}/{name}/issues");
    get_json(
        agent,
        &url,
        &[("state", "all"), ("per_page", "100")],
        token,
        "listing issues",
    )
}

pub fn fetch_comments(
    agent: &Agent,
    api_root: &str,
    token: Option<&str>,
    owner: &str,
    name: &str,
    number: u64,
) -> Result<Vec<CommentResponse>, Error> {
    let url = format!("{api_root}/repos/{owner}/{name}/issues/{number}/comments");
    get_json(agent, &url, &[], token, "listing issue comments")
}

fn get_json<T: serde::de::DeserializeOwned>(
    agent: &Agent,
    url: &str,
    query: &[(&str, &str)],
    token: Option<&str>,
    activity: &'static str,
) -> Result<T, Error> {
    debug!("GET {url}");
    let mut request = agent
        .get(url)
        .header("Accept", "application/vnd.github+json");
    for (param, value) in query {
        request = request.query(*param, *value);
    }
    if let Some(token) = token {
        request = request.header("Authorization", &format!("Bearer {token}"));
    }
    let mut response = request.call().map_err(|source| Error::Api {
        activity,
        source: Box::new(source),
    })?;

    let status = response.status();
    let throttled = status.as_u16() == 429
        || (status.as_u16() == 403 && rate_limit_exhausted(response.headers()));
    if throttled {
        return Err(Error::RateLimited {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        let body = response.body_mut().read_to_string().unwrap_or_default();
        return Err(Error::Status {
            activity,
            status: status.as_u16(),
            body,
        });
    }

    let value: serde_json::Value =
        response.body_mut().read_json().map_err(|source| Error::Api {
            activity,
            source: Box::new(source),
        })?;
    serde_json::from_value(value).map_err(|source| Error::UnexpectedResponse { source })
}

// GitHub reports primary rate limiting as 403 with an exhausted quota header,
// secondary rate limiting as 429.
fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|remaining| remaining == "0")
}

#[derive(Debug, Deserialize)]
pub struct IssueResponse {
    pub number: u64,
    pub assignee: Option<User>,
    pub created_at: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub comments: u64,
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentResponse {
    pub user: Option<User>,
    pub created_at: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error("{input} is not a valid repository identifier")]
    #[diagnostic(
        code(github::invalid_repo),
        help("Repositories are identified as owner/name, e.g. Kaggle/kaggle-api")
    )]
    InvalidRepo { input: String },
    #[error("Could not communicate with GitHub while {activity}: {source}")]
    #[diagnostic(
        code(github::api),
        help("Check your network connection and GitHub configuration")
    )]
    Api {
        activity: &'static str,
        source: Box<ureq::Error>,
    },
    #[error("GitHub throttled the request (HTTP {status})")]
    #[diagnostic(
        code(github::rate_limited),
        help("Provide a token via GITHUB_TOKEN or the token file, or try again later")
    )]
    RateLimited { status: u16 },
    #[error("GitHub returned status {status} while {activity}: {body}")]
    #[diagnostic(
        code(github::status),
        help("Check the repository identifier and your credentials")
    )]
    Status {
        activity: &'static str,
        status: u16,
        body: String,
    },
    #[error("Received unexpected data from GitHub: {source}")]
    #[diagnostic(
        code(github::unexpected_response),
        help("It's possible GitHub has updated their API, please report this issue")
    )]
    UnexpectedResponse { source: serde_json::Error },
}
