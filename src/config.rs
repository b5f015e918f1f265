//! Credentials, loaded once at startup and passed explicitly into the
//! fetchers.
//!
//! A token comes from its environment variable first, then from a
//! dotenv-style token file (`NAME=value` lines). Both sources are optional;
//! without a token, requests go out unauthenticated and accept the risk of
//! being throttled.

use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
};

use miette::Diagnostic;

pub const JIRA_TOKEN_VAR: &str = "JIRA_TOKEN";
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub jira_token: Option<String>,
    pub github_token: Option<String>,
}

impl Config {
    /// Resolves both tokens. A missing token file is not an error; an
    /// existing but unreadable one is.
    pub fn load(token_file: &Path) -> Result<Self, Error> {
        let file_vars = if token_file.exists() {
            let contents =
                std::fs::read_to_string(token_file).map_err(|source| Error::TokenFile {
                    path: token_file.into(),
                    source,
                })?;
            parse_token_file(&contents)
        } else {
            HashMap::new()
        };
        Ok(Self {
            jira_token: resolve(JIRA_TOKEN_VAR, &file_vars),
            github_token: resolve(GITHUB_TOKEN_VAR, &file_vars),
        })
    }
}

fn resolve(name: &str, file_vars: &HashMap<String, String>) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| {
            file_vars
                .get(name)
                .cloned()
                .filter(|value| !value.is_empty())
        })
}

fn parse_token_file(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (name, value) = line.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            Some((name.trim().to_owned(), value.to_owned()))
        })
        .collect()
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error("Could not read token file {}: {source}", path.display())]
    #[diagnostic(
        code(config::token_file),
        help("Pass --token-file to point at a readable file, or rely on environment variables")
    )]
    TokenFile {
        path: PathBuf,
        source: std::io::Error,
    },
}
