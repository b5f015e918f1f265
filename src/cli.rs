//! Command-line surface: one subcommand per provider.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "issue2csv", version, about)]
pub struct Cli {
    /// Dotenv-style file to read API tokens from when they are not set in the
    /// environment.
    #[arg(long, global = true, default_value = "token.env")]
    pub token_file: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Export one or more Jira issues and their comments.
    Jira {
        /// Issue keys, e.g. CAMEL-10597.
        #[arg(required = true)]
        keys: Vec<String>,

        /// Base URL of the Jira instance.
        #[arg(long, default_value = "https://issues.apache.org/jira")]
        base_url: String,

        /// CSV file for issue rows.
        #[arg(long, default_value = "issues.csv")]
        issues: PathBuf,

        /// CSV file for comment rows.
        #[arg(long, default_value = "comments.csv")]
        comments: PathBuf,
    },
    /// Export the issues of a GitHub repository and their comments.
    Github {
        /// Repository in owner/name form, e.g. Kaggle/kaggle-api.
        repo: String,

        /// CSV file for issue rows.
        #[arg(long, default_value = "issues.csv")]
        issues: PathBuf,

        /// CSV file for comment rows.
        #[arg(long, default_value = "comments.csv")]
        comments: PathBuf,
    },
}
