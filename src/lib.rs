//! Export issue-tracker records to CSV.
//!
//! Two independent pipelines, each fetch → flatten → write-row:
//! one pulls single Jira issues by key, the other pulls the issues of a
//! GitHub repository. Both produce the same pair of CSV schemas, one file
//! for issue rows and one for comment rows.

use std::path::Path;

use clap::Parser;
use miette::Diagnostic;
use tracing::info;

use crate::{
    config::Config,
    csv_out::{COMMENT_HEADER, CsvSink, ISSUE_HEADER},
    flatten::{CommentRecord, IssueRecord},
};

pub mod cli;
pub mod config;
pub mod csv_out;
pub mod flatten;
pub mod github;
pub mod jira;

pub fn run() -> Result<(), Error> {
    let cli = cli::Cli::parse();
    let config = Config::load(&cli.token_file)?;
    match cli.command {
        cli::Command::Jira {
            keys,
            base_url,
            issues,
            comments,
        } => export_jira(&config, &base_url, &keys, &issues, &comments),
        cli::Command::Github {
            repo,
            issues,
            comments,
        } => export_github(&config, github::API_ROOT, &repo, &issues, &comments),
    }
}

/// Fetches each Jira issue by key and writes one issue row plus one row per
/// comment.
///
/// All fetching happens before either output file is opened, so a failed run
/// leaves the files untouched.
pub fn export_jira(
    config: &Config,
    base_url: &str,
    keys: &[String],
    issues_path: &Path,
    comments_path: &Path,
) -> Result<(), Error> {
    let agent = jira::agent();
    let token = config.jira_token.as_deref();

    let mut flattened = Vec::with_capacity(keys.len());
    for key in keys {
        let issue = jira::fetch_issue(&agent, base_url, token, key)?;
        flattened.push(flatten::flatten_jira_issue(&issue)?);
    }

    write_records(&flattened, issues_path, comments_path)
}

/// Fetches the issues of a GitHub repository (one page) and writes one issue
/// row plus one row per comment.
pub fn export_github(
    config: &Config,
    api_root: &str,
    repo: &str,
    issues_path: &Path,
    comments_path: &Path,
) -> Result<(), Error> {
    let (owner, name) = github::parse_repo(repo)?;
    let agent = github::agent();
    let token = config.github_token.as_deref();

    let issues = github::fetch_issues(&agent, api_root, token, &owner, &name)?;
    let mut flattened = Vec::with_capacity(issues.len());
    for issue in &issues {
        let comments = if issue.comments > 0 {
            github::fetch_comments(&agent, api_root, token, &owner, &name, issue.number)?
        } else {
            Vec::new()
        };
        flattened.push(flatten::flatten_github_issue(&owner, &name, issue, &comments)?);
    }

    write_records(&flattened, issues_path, comments_path)
}

fn write_records(
    flattened: &[(IssueRecord, Vec<CommentRecord>)],
    issues_path: &Path,
    comments_path: &Path,
) -> Result<(), Error> {
    let mut issue_sink = CsvSink::append(issues_path, &ISSUE_HEADER)?;
    let mut comment_sink = CsvSink::append(comments_path, &COMMENT_HEADER)?;

    let mut comment_rows = 0;
    for (issue, comments) in flattened {
        issue_sink.write_issue(issue)?;
        for comment in comments {
            comment_sink.write_comment(comment)?;
            comment_rows += 1;
        }
    }
    issue_sink.flush()?;
    comment_sink.flush()?;

    info!(
        "Wrote {} issue rows to {} and {comment_rows} comment rows to {}",
        flattened.len(),
        issues_path.display(),
        comments_path.display(),
    );
    Ok(())
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Jira(#[from] jira::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    GitHub(#[from] github::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Flatten(#[from] flatten::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Csv(#[from] csv_out::Error),
}
