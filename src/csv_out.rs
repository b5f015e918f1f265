//! CSV output: create-or-append sinks with the header written exactly once.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use miette::Diagnostic;

use crate::flatten::{CommentRecord, IssueRecord};

pub const ISSUE_HEADER: [&str; 6] = [
    "issue_key",
    "issue_type",
    "assignee",
    "created_iso",
    "created_epoch",
    "description",
];

pub const COMMENT_HEADER: [&str; 5] = [
    "issue_key",
    "author",
    "created_epoch",
    "created_human",
    "comment",
];

/// A CSV file opened for appending. The header row goes in only when the
/// file is new or empty; appending to an existing export never repeats it.
#[derive(Debug)]
pub struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvSink {
    pub fn append(path: &Path, header: &[&str]) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| Error::Open {
                path: path.into(),
                source,
            })?;
        let is_empty = file
            .metadata()
            .map_err(|source| Error::Open {
                path: path.into(),
                source,
            })?
            .len()
            == 0;

        let mut sink = Self {
            writer: csv::Writer::from_writer(file),
            path: path.into(),
        };
        if is_empty {
            sink.write_row(header)?;
        }
        Ok(sink)
    }

    pub fn write_issue(&mut self, record: &IssueRecord) -> Result<(), Error> {
        let epoch = record.created_epoch.to_string();
        self.write_row(&[
            &record.issue_key,
            &record.issue_type,
            &record.assignee,
            &record.created_iso,
            &epoch,
            &record.description,
        ])
    }

    pub fn write_comment(&mut self, record: &CommentRecord) -> Result<(), Error> {
        let epoch = record.created_epoch.to_string();
        self.write_row(&[
            &record.issue_key,
            &record.author,
            &epoch,
            &record.created_human,
            &record.body,
        ])
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush().map_err(|source| Error::Flush {
            path: self.path.clone(),
            source,
        })
    }

    fn write_row<T: AsRef<[u8]>>(&mut self, row: &[T]) -> Result<(), Error> {
        self.writer.write_record(row).map_err(|source| Error::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error("Could not open {} for writing: {source}", path.display())]
    #[diagnostic(
        code(csv::open),
        help("Check that the output directory exists and is writable")
    )]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not write a row to {}: {source}", path.display())]
    #[diagnostic(code(csv::write))]
    Write { path: PathBuf, source: csv::Error },
    #[error("Could not flush {}: {source}", path.display())]
    #[diagnostic(code(csv::flush))]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },
}
