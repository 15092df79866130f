use polytype::Type;
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::program::Expression;

/// A program could not be re-derived under a grammar: its head was admissible, but the number of
/// arguments it is applied to disagrees with the head's resolved type.
///
/// This never happens for programs the grammar produced itself.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "{expr} is applied to {given} arguments, but its type {tp} takes {expected} \
     (request {request})"
)]
pub struct GrammarFailure {
    pub request: Type,
    pub tp: Type,
    pub expr: Expression,
    pub given: usize,
    pub expected: usize,
    pub environment: Vec<Type>,
}

/// What is written to disk when scoring hits a [`GrammarFailure`].
///
/// [`GrammarFailure`]: struct.GrammarFailure.html
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub error: String,
    pub grammar: String,
    pub request: String,
    pub program: String,
    pub environment: Vec<String>,
}

/// Write `report` as `grammarFailure<secs>_<pid>.json` under `directory`, creating it as needed.
pub(crate) fn export(directory: &Path, report: &FailureReport) -> io::Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = directory.join(format!("grammarFailure{}_{}.json", secs, std::process::id()));
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(path)
}
