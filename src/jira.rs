//! Fetches single issues from a Jira instance's REST API.
//!
//! One GET per issue key against `/rest/api/2/issue/{key}`; the response
//! carries the issue fields and its comments in one document.

use miette::Diagnostic;
use serde::Deserialize;
use tracing::debug;
use ureq::Agent;

pub fn agent() -> Agent {
    Agent::new_with_config(
        Agent::config_builder()
            .http_status_as_error(false)
            .user_agent("issue2csv")
            .build(),
    )
}

/// Performs one synchronous GET for the issue and decodes the body.
///
/// A 429 response is surfaced as [`Error::RateLimited`]; any other non-2xx
/// status as [`Error::Status`]. Neither is retried.
pub fn fetch_issue(
    agent: &Agent,
    base_url: &str,
    token: Option<&str>,
    key: &str,
) -> Result<IssueResponse, Error> {
    let url = format!("{}/rest/api/2/issue/{key}", base_url.trim_end_matches('/'));
    debug!("GET {url}");
    let mut request = agent.get(&url).header("Accept", "application/json");
    if let Some(token) = token {
        request = request.header("Authorization", &format!("Bearer {token}"));
    }
    let mut response = request.call().map_err(|source| Error::Api {
        activity: "fetching the issue",
        source: Box::new(source),
    })?;

    let status = response.status();
    if status.as_u16() == 429 {
        return Err(Error::RateLimited { key: key.to_owned() });
    }
    if !status.is_success() {
        let body = response.body_mut().read_to_string().unwrap_or_default();
        return Err(Error::Status {
            activity: "fetching the issue",
            status: status.as_u16(),
            body,
        });
    }

    let value: serde_json::Value =
        response.body_mut().read_json().map_err(|source| Error::Api {
            activity: "reading the issue response",
            source: Box::new(source),
        })?;
    serde_json::from_value(value).map_err(|source| Error::UnexpectedResponse { source })
}

#[derive(Debug, Deserialize)]
pub struct IssueResponse {
    pub key: String,
    pub fields: Fields,
}

#[derive(Debug, Deserialize)]
pub struct Fields {
    pub issuetype: Option<NamedField>,
    pub assignee: Option<User>,
    pub created: Option<String>,
    pub description: Option<String>,
    pub comment: Option<CommentContainer>,
}

#[derive(Debug, Deserialize)]
pub struct NamedField {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct User {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentContainer {
    pub comments: Vec<CommentResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CommentResponse {
    pub author: Option<User>,
    pub created: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error("Could not communicate with Jira while {activity}: {source}")]
    #[diagnostic(
        code(jira::api),
        help("Check your network connection and the Jira base URL")
    )]
    Api {
        activity: &'static str,
        source: Box<ureq::Error>,
    },
    #[error("Jira throttled the request for {key} (HTTP 429)")]
    #[diagnostic(
        code(jira::rate_limited),
        help("Provide a token via JIRA_TOKEN or the token file, or try again later")
    )]
    RateLimited { key: String },
    #[error("Jira returned status {status} while {activity}: {body}")]
    #[diagnostic(
        code(jira::status),
        help("Check the issue key and your credentials")
    )]
    Status {
        activity: &'static str,
        status: u16,
        body: String,
    },
    #[error("Received unexpected data from Jira: {source}")]
    #[diagnostic(
        code(jira::unexpected_response),
        help("It's possible the Jira API has changed shape, please report this issue")
    )]
    UnexpectedResponse { source: serde_json::Error },
}
