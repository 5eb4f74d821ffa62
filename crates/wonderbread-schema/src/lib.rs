//! WONDERBREAD response contracts
//!
//! Defines the expected JSON shape of a model's answer for each benchmark task
//! and provides:
//! - `describe`: a JSON-Schema descriptor for schema-constrained generation
//! - `validate` / `parse_response`: checking decoded output against a contract,
//!   reporting every offending field at once
//! - typed response structs for the scoring code that consumes them
//!
//! Contracts are either fixed-shape objects or mappings keyed by identifiers
//! discovered at runtime (step UUIDs, workflow labels).

pub mod contract;
pub mod describe;
pub mod error;
pub mod registry;
pub mod responses;
pub mod validate;

pub use contract::{ContractRule, ContractShape, FieldSpec, FieldType, ResponseContract};
pub use describe::{describe, SchemaDescriptor, FORMAT_KIND};
pub use error::{
    FieldIssue, IssueKind, RankingError, ResponseError, Result, SchemaError, ValidationError,
};
pub use registry::{ContractName, SchemaRegistry};
pub use responses::{
    AccuracyJudgment, CompletionJudgment, RankingJudgment, Response, SegmentationByRange,
    SegmentationByUuid, WorkflowRange,
};
pub use validate::{parse_response, validate, ValidatedObject, ValidationWarning};
