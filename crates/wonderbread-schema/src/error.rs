//! Error types for contract definition, response validation and ranking checks.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while building or looking up response contracts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid contract {contract}: {reason}")]
    InvalidContract { contract: String, reason: String },

    #[error("unknown contract: {0}")]
    UnknownContract(String),

    #[error("contract already registered: {0}")]
    DuplicateContract(String),
}

/// Result type for contract operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// What is wrong with a single value in a model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// A required field is absent.
    Missing,

    /// The value has the wrong JSON type.
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    /// A workflow label that is not exactly one ASCII letter.
    InvalidLabel { value: String },

    /// A range whose start lies after its end.
    InvertedRange { start: i64, end: i64 },
}

/// One offending location in a response, addressed by a dotted path
/// (`pred_ranking[2]`, `B.start`). Keys holding `.` or `[` are quoted in
/// brackets (`["a.b"]`). The root is rendered as `$`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub path: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "$" } else { &self.path };
        match &self.kind {
            IssueKind::Missing => write!(f, "{path}: missing required field"),
            IssueKind::WrongType { expected, found } => {
                write!(f, "{path}: expected {expected}, found {found}")
            }
            IssueKind::InvalidLabel { value } => {
                write!(f, "{path}: {value:?} is not a single-letter workflow label")
            }
            IssueKind::InvertedRange { start, end } => {
                write!(f, "{path}: start {start} is after end {end}")
            }
        }
    }
}

/// A response that parsed as JSON but does not satisfy its contract.
///
/// Carries every offending location found in one pass, not just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("response does not satisfy {contract}: {}", render_issues(.issues))]
pub struct ValidationError {
    pub contract: String,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Paths of all offending fields, in discovery order.
    pub fn paths(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.path.as_str()).collect()
    }

    /// Whether any issue is reported at exactly `path`.
    pub fn mentions(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure to turn raw model text into a validated response.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("model response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("validated {contract} response could not be read as a typed value: {source}")]
    Typed {
        contract: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A ranking that does not order the candidate set exactly once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "ranking does not cover the candidates exactly once (duplicates: {duplicates:?}, missing: {missing:?}, unknown: {unknown:?})"
)]
pub struct RankingError {
    pub duplicates: Vec<i64>,
    pub missing: Vec<i64>,
    pub unknown: Vec<i64>,
}
