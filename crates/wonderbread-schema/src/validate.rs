//! Validation of decoded model output against a response contract.
//!
//! Validation is lenient about additional information (unrecognised keys in
//! a fixed-shape object are kept and ignored) and strict about the declared
//! fields. Every issue is collected in a single pass.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::contract::{ContractRule, ContractShape, FieldType, ResponseContract};
use crate::error::{FieldIssue, IssueKind, ResponseError, ValidationError};

/// A non-fatal observation about an otherwise valid response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

/// A response known to satisfy its contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedObject {
    contract: String,
    value: Value,
    warnings: Vec<ValidationWarning>,
}

impl ValidatedObject {
    pub fn contract(&self) -> &str {
        &self.contract
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Deserialize into the typed response consumed by scoring code.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ResponseError> {
        serde_json::from_value(self.value).map_err(|source| ResponseError::Typed {
            contract: self.contract,
            source,
        })
    }
}

#[derive(Default)]
struct Findings {
    issues: Vec<FieldIssue>,
    warnings: Vec<ValidationWarning>,
}

impl Findings {
    fn issue(&mut self, path: &str, kind: IssueKind) {
        self.issues.push(FieldIssue {
            path: path.to_string(),
            kind,
        });
    }
}

/// Check `raw` against `contract`.
///
/// An empty mapping is a valid dynamic-keyed response (zero discovered items).
pub fn validate(contract: &ResponseContract, raw: &Value) -> Result<ValidatedObject, ValidationError> {
    let mut findings = Findings::default();
    check_contract(contract, raw, "", &mut findings);

    if findings.issues.is_empty() {
        Ok(ValidatedObject {
            contract: contract.name.clone(),
            value: raw.clone(),
            warnings: findings.warnings,
        })
    } else {
        Err(ValidationError {
            contract: contract.name.clone(),
            issues: findings.issues,
        })
    }
}

/// Decode raw model text and validate it.
///
/// A single surrounding Markdown code fence (```` ```json ... ``` ````) is
/// removed before decoding.
pub fn parse_response(contract: &ResponseContract, raw: &str) -> Result<ValidatedObject, ResponseError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    Ok(validate(contract, &value)?)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    // Drop the info string on the opening line ("json").
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

fn check_contract(contract: &ResponseContract, value: &Value, path: &str, findings: &mut Findings) {
    let Value::Object(obj) = value else {
        findings.issue(
            path,
            IssueKind::WrongType {
                expected: "object",
                found: json_kind(value),
            },
        );
        return;
    };

    match &contract.shape {
        ContractShape::FixedFields(fields) => {
            for field in fields {
                let field_path = child(path, &field.name);
                match obj.get(&field.name) {
                    None if field.required => findings.issue(&field_path, IssueKind::Missing),
                    None => {}
                    Some(Value::Null) if !field.required => {}
                    Some(v) => check_value(&field.ty, v, &field_path, findings),
                }
            }
            for rule in &contract.rules {
                check_rule(rule, obj, path, findings);
            }
        }
        ContractShape::DynamicKeyed { value: value_ty } => {
            for (key, v) in obj {
                check_value(value_ty, v, &child(path, key), findings);
            }
        }
    }
}

fn check_value(ty: &FieldType, value: &Value, path: &str, findings: &mut Findings) {
    let ok = match ty {
        FieldType::String => value.is_string(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Integer => value.is_i64(),
        FieldType::Label => match value {
            Value::String(s) => {
                if !is_label(s) {
                    findings.issue(path, IssueKind::InvalidLabel { value: s.clone() });
                }
                true
            }
            _ => false,
        },
        FieldType::Array(items) => match value {
            Value::Array(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    check_value(items, element, &format!("{path}[{i}]"), findings);
                }
                true
            }
            _ => false,
        },
        FieldType::Object(contract) => {
            check_contract(contract, value, path, findings);
            true
        }
    };

    if !ok {
        findings.issue(
            path,
            IssueKind::WrongType {
                expected: ty.kind(),
                found: json_kind(value),
            },
        );
    }
}

fn check_rule(rule: &ContractRule, obj: &Map<String, Value>, path: &str, findings: &mut Findings) {
    match rule {
        ContractRule::OrderedRange { start, end } => {
            let bounds = obj
                .get(start)
                .and_then(Value::as_i64)
                .zip(obj.get(end).and_then(Value::as_i64));
            if let Some((s, e)) = bounds {
                if s > e {
                    findings.issue(path, IssueKind::InvertedRange { start: s, end: e });
                }
            }
        }
        ContractRule::EmptyWhenTrue { flag, list } => {
            let flagged = obj.get(flag).and_then(Value::as_bool).unwrap_or(false);
            let entries = obj.get(list).and_then(Value::as_array).map_or(0, Vec::len);
            if flagged && entries > 0 {
                findings.warnings.push(ValidationWarning {
                    path: child(path, list),
                    message: format!("{flag} is true but {list} lists {entries} entries"),
                });
            }
        }
    }
}

fn is_label(s: &str) -> bool {
    let mut chars = s.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

/// Path of `key` under `path`. Keys that would read as a separator are quoted
/// in brackets: `items["a.b"]`.
fn child(path: &str, key: &str) -> String {
    if key.contains(['.', '[']) {
        format!("{path}[{key:?}]")
    } else if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json"), "```json");
    }

    #[test]
    fn test_is_label() {
        assert!(is_label("A"));
        assert!(is_label("b"));
        assert!(!is_label(""));
        assert!(!is_label("AB"));
        assert!(!is_label("1"));
    }

    #[test]
    fn test_json_kind_distinguishes_floats() {
        assert_eq!(json_kind(&json!(1)), "integer");
        assert_eq!(json_kind(&json!(1.5)), "number");
        assert_eq!(json_kind(&json!(null)), "null");
    }

    #[test]
    fn test_label_issue_reported_once() {
        let c = ResponseContract::dynamic("labels", FieldType::Label);
        let err = validate(&c, &json!({ "UUID_0": "AB" })).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(
            err.issues[0].kind,
            IssueKind::InvalidLabel {
                value: "AB".to_string()
            }
        );
    }

    #[test]
    fn test_integer_must_fit_i64() {
        let c = ResponseContract::dynamic("counts", FieldType::Integer);
        assert!(validate(&c, &json!({ "n": i64::MAX })).is_ok());

        let err = validate(&c, &json!({ "n": u64::MAX })).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "n");
        assert_eq!(
            err.issues[0].kind,
            IssueKind::WrongType {
                expected: "integer",
                found: "number"
            }
        );
    }

    #[test]
    fn test_child_path_quotes_separator_keys() {
        assert_eq!(child("", "plain"), "plain");
        assert_eq!(child("outer", "plain"), "outer.plain");
        assert_eq!(child("", "a.b"), "[\"a.b\"]");
        assert_eq!(child("outer", "x[0]"), "outer[\"x[0]\"]");

        let c = ResponseContract::dynamic("labels", FieldType::Label);
        let err = validate(&c, &json!({ "a.b": 1, "a": { "b": 1 } })).unwrap_err();
        let mut paths: Vec<_> = err.issues.iter().map(|i| i.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["[\"a.b\"]", "a"]);
    }
}
