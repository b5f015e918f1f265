//! Reduces decoded issue documents to flat, single-line records.
//!
//! Field mapping happens here, in one place: optional fields (assignee,
//! description, comment body) resolve to empty strings, required fields
//! (issue key, created date) fail with [`Error::MissingField`]. All free
//! text passes through [`normalize_whitespace`] so no written value can
//! carry a raw newline into a CSV cell.

use miette::Diagnostic;
use time::{
    OffsetDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::{github, jira};

/// One CSV row per fetched issue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueRecord {
    pub issue_key: String,
    pub issue_type: String,
    pub assignee: String,
    pub created_iso: String,
    pub created_epoch: i64,
    pub description: String,
}

/// One CSV row per comment, in API response order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentRecord {
    pub issue_key: String,
    pub author: String,
    pub created_epoch: i64,
    pub created_human: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timestamp {
    pub iso: String,
    pub epoch: i64,
    pub human: String,
}

/// Collapses every whitespace run (spaces, tabs, newlines) to a single space
/// and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Jira renders created dates as 2016-04-01T12:00:00.000+0000, GitHub as
// RFC 3339 (2016-04-01T12:00:00Z).
const JIRA_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    version = 2,
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond digits:3]]][offset_hour sign:mandatory][offset_minute]"
);
const HUMAN_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Parses a provider timestamp into its three renderings: the original ISO
/// string, epoch seconds (sub-second precision discarded), and a human form
/// in UTC.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, Error> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(value, JIRA_DATE))
        .map_err(|source| Error::Timestamp {
            value: value.to_owned(),
            source,
        })?;
    let human = parsed.to_offset(UtcOffset::UTC).format(HUMAN_DATE)?;
    Ok(Timestamp {
        iso: value.to_owned(),
        epoch: parsed.unix_timestamp(),
        human,
    })
}

pub fn flatten_jira_issue(
    issue: &jira::IssueResponse,
) -> Result<(IssueRecord, Vec<CommentRecord>), Error> {
    let fields = &issue.fields;
    let created = fields.created.as_deref().ok_or(Error::MissingField {
        path: "fields.created",
    })?;
    let timestamp = parse_timestamp(created)?;

    let record = IssueRecord {
        issue_key: issue.key.clone(),
        issue_type: fields
            .issuetype
            .as_ref()
            .map(|issuetype| issuetype.name.clone())
            .unwrap_or_default(),
        assignee: fields
            .assignee
            .as_ref()
            .map(|assignee| assignee.display_name.clone())
            .unwrap_or_default(),
        created_iso: timestamp.iso,
        created_epoch: timestamp.epoch,
        description: normalize_whitespace(fields.description.as_deref().unwrap_or_default()),
    };

    let source_comments = fields
        .comment
        .as_ref()
        .map(|container| container.comments.as_slice())
        .unwrap_or_default();
    let mut comments = Vec::with_capacity(source_comments.len());
    for comment in source_comments {
        let created = comment.created.as_deref().ok_or(Error::MissingField {
            path: "fields.comment.comments[].created",
        })?;
        let timestamp = parse_timestamp(created)?;
        comments.push(CommentRecord {
            issue_key: issue.key.clone(),
            author: comment
                .author
                .as_ref()
                .map(|author| author.display_name.clone())
                .unwrap_or_default(),
            created_epoch: timestamp.epoch,
            created_human: timestamp.human,
            body: normalize_whitespace(comment.body.as_deref().unwrap_or_default()),
        });
    }

    Ok((record, comments))
}

pub fn flatten_github_issue(
    owner: &str,
    name: &str,
    issue: &github::IssueResponse,
    source_comments: &[github::CommentResponse],
) -> Result<(IssueRecord, Vec<CommentRecord>), Error> {
    let issue_key = format!("{owner}/{name}#{}", issue.number);
    let created = issue
        .created_at
        .as_deref()
        .ok_or(Error::MissingField { path: "created_at" })?;
    let timestamp = parse_timestamp(created)?;

    let record = IssueRecord {
        issue_key: issue_key.clone(),
        // GitHub has no Jira-style issue type, but the list endpoint marks
        // pull requests.
        issue_type: if issue.pull_request.is_some() {
            "PullRequest".to_owned()
        } else {
            "Issue".to_owned()
        },
        assignee: issue
            .assignee
            .as_ref()
            .map(|assignee| assignee.login.clone())
            .unwrap_or_default(),
        created_iso: timestamp.iso,
        created_epoch: timestamp.epoch,
        description: normalize_whitespace(issue.body.as_deref().unwrap_or_default()),
    };

    let mut comments = Vec::with_capacity(source_comments.len());
    for comment in source_comments {
        let created = comment
            .created_at
            .as_deref()
            .ok_or(Error::MissingField { path: "created_at" })?;
        let timestamp = parse_timestamp(created)?;
        comments.push(CommentRecord {
            issue_key: issue_key.clone(),
            author: comment
                .user
                .as_ref()
                .map(|user| user.login.clone())
                .unwrap_or_default(),
            created_epoch: timestamp.epoch,
            created_human: timestamp.human,
            body: normalize_whitespace(comment.body.as_deref().unwrap_or_default()),
        });
    }

    Ok((record, comments))
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error("The response is missing the required field {path}")]
    #[diagnostic(
        code(flatten::missing_field),
        help("The provider returned an issue without a field this export depends on")
    )]
    MissingField { path: &'static str },
    #[error("Could not interpret {value:?} as a timestamp: {source}")]
    #[diagnostic(
        code(flatten::timestamp),
        help("Created dates must be ISO-8601, e.g. 2016-04-01T12:00:00.000+0000")
    )]
    Timestamp {
        value: String,
        source: time::error::Parse,
    },
    #[error("Could not render a timestamp: {0}")]
    #[diagnostic(code(flatten::timestamp_format))]
    Format(#[from] time::error::Format),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn jira_issue(assignee: Option<&str>, description: Option<&str>) -> jira::IssueResponse {
        jira::IssueResponse {
            key: "CAMEL-10597".to_owned(),
            fields: jira::Fields {
                issuetype: Some(jira::NamedField {
                    name: "Bug".to_owned(),
                }),
                assignee: assignee.map(|name| jira::User {
                    display_name: name.to_owned(),
                }),
                created: Some("2016-04-01T12:00:00.000+0000".to_owned()),
                description: description.map(str::to_owned),
                comment: None,
            },
        }
    }

    #[test]
    fn whitespace_runs_collapse_to_single_spaces() {
        assert_eq!(
            normalize_whitespace("first line\nsecond\tline\r\n  third   line  "),
            "first line second line third line"
        );
    }

    #[test]
    fn whitespace_only_input_becomes_empty() {
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn jira_created_date_round_trips_to_epoch() {
        let timestamp = parse_timestamp("2016-04-01T12:00:00.000+0000").unwrap();
        assert_eq!(timestamp.epoch, 1_459_512_000);
        assert_eq!(timestamp.human, "2016-04-01 12:00:00");
        assert_eq!(timestamp.iso, "2016-04-01T12:00:00.000+0000");
    }

    #[test]
    fn rfc3339_date_parses_to_the_same_instant() {
        let timestamp = parse_timestamp("2016-04-01T12:00:00Z").unwrap();
        assert_eq!(timestamp.epoch, 1_459_512_000);
    }

    #[test]
    fn offsets_are_honoured_when_computing_the_epoch() {
        let timestamp = parse_timestamp("2016-04-01T14:00:00.000+0200").unwrap();
        assert_eq!(timestamp.epoch, 1_459_512_000);
        assert_eq!(timestamp.human, "2016-04-01 12:00:00");
    }

    #[test]
    fn sub_second_precision_is_discarded() {
        let timestamp = parse_timestamp("2016-04-01T12:00:00.999+0000").unwrap();
        assert_eq!(timestamp.epoch, 1_459_512_000);
    }

    #[test]
    fn garbage_timestamps_are_rejected() {
        assert!(matches!(
            parse_timestamp("last Tuesday"),
            Err(Error::Timestamp { .. })
        ));
    }

    #[test]
    fn jira_issue_flattens_to_a_single_line_record() {
        let issue = jira_issue(Some("Claus Ibsen"), Some("First paragraph.\n\nSecond\nparagraph."));
        let (record, comments) = flatten_jira_issue(&issue).unwrap();
        assert_eq!(
            record,
            IssueRecord {
                issue_key: "CAMEL-10597".to_owned(),
                issue_type: "Bug".to_owned(),
                assignee: "Claus Ibsen".to_owned(),
                created_iso: "2016-04-01T12:00:00.000+0000".to_owned(),
                created_epoch: 1_459_512_000,
                description: "First paragraph. Second paragraph.".to_owned(),
            }
        );
        assert!(comments.is_empty());
    }

    #[test]
    fn missing_assignee_resolves_to_empty_string() {
        let issue = jira_issue(None, None);
        let (record, _) = flatten_jira_issue(&issue).unwrap();
        assert_eq!(record.assignee, "");
        assert_eq!(record.description, "");
    }

    #[test]
    fn missing_created_date_is_an_error() {
        let mut issue = jira_issue(None, None);
        issue.fields.created = None;
        assert!(matches!(
            flatten_jira_issue(&issue),
            Err(Error::MissingField {
                path: "fields.created"
            })
        ));
    }

    #[test]
    fn jira_comments_keep_source_order() {
        let mut issue = jira_issue(None, None);
        issue.fields.comment = Some(jira::CommentContainer {
            comments: vec![
                jira::CommentResponse {
                    author: Some(jira::User {
                        display_name: "First Author".to_owned(),
                    }),
                    created: Some("2016-04-02T09:00:00.000+0000".to_owned()),
                    body: Some("I can\nreproduce this".to_owned()),
                },
                jira::CommentResponse {
                    author: None,
                    created: Some("2016-04-03T09:00:00.000+0000".to_owned()),
                    body: None,
                },
            ],
        });

        let (_, comments) = flatten_jira_issue(&issue).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author, "First Author");
        assert_eq!(comments[0].body, "I can reproduce this");
        assert_eq!(comments[0].created_human, "2016-04-02 09:00:00");
        assert_eq!(comments[1].author, "");
        assert!(comments[0].created_epoch < comments[1].created_epoch);
    }

    #[test]
    fn github_issue_key_includes_the_repository() {
        let issue = github::IssueResponse {
            number: 42,
            assignee: None,
            created_at: Some("2020-06-01T00:00:00Z".to_owned()),
            body: Some("A body".to_owned()),
            comments: 0,
            pull_request: None,
        };
        let (record, _) = flatten_github_issue("Kaggle", "kaggle-api", &issue, &[]).unwrap();
        assert_eq!(record.issue_key, "Kaggle/kaggle-api#42");
        assert_eq!(record.issue_type, "Issue");
    }

    #[test]
    fn github_pull_requests_are_marked_as_such() {
        let issue = github::IssueResponse {
            number: 7,
            assignee: None,
            created_at: Some("2020-06-01T00:00:00Z".to_owned()),
            body: None,
            comments: 0,
            pull_request: Some(serde_json::json!({})),
        };
        let (record, _) = flatten_github_issue("o", "r", &issue, &[]).unwrap();
        assert_eq!(record.issue_type, "PullRequest");
    }
}
