//! Response contract definitions.
//!
//! A [`ResponseContract`] is either a fixed set of named fields or a mapping
//! whose keys are only known at runtime (one key per demonstration step,
//! one key per discovered workflow). The two shapes are separate variants of
//! [`ContractShape`], so a contract can never be both.

use std::collections::BTreeSet;

use crate::error::{Result, SchemaError};

/// The type of a single value inside a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    /// A single ASCII letter naming a workflow (`"A"`, `"B"`, ...).
    Label,
    Array(Box<FieldType>),
    Object(Box<ResponseContract>),
}

impl FieldType {
    pub fn array_of(items: FieldType) -> Self {
        FieldType::Array(Box::new(items))
    }

    pub fn object(contract: ResponseContract) -> Self {
        FieldType::Object(Box::new(contract))
    }

    /// Name used in schema bodies and validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Label => "label",
            FieldType::Array(_) => "array",
            FieldType::Object(_) => "object",
        }
    }

    fn has_dynamic_keys(&self) -> bool {
        match self {
            FieldType::Array(items) => items.has_dynamic_keys(),
            FieldType::Object(contract) => contract.has_dynamic_keys(),
            _ => false,
        }
    }

    fn check(&self) -> Result<()> {
        match self {
            FieldType::Array(items) => items.check(),
            FieldType::Object(contract) => contract.check(),
            _ => Ok(()),
        }
    }
}

/// A named field of a fixed-shape contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,

    /// Optional fields may be absent or `null`.
    pub required: bool,

    pub description: Option<String>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    /// Attach a description (builder pattern).
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Shape of a contract: fixed fields or runtime-keyed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractShape {
    FixedFields(Vec<FieldSpec>),
    DynamicKeyed { value: FieldType },
}

/// A cross-field invariant checked on every object validated against a
/// fixed-shape contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractRule {
    /// Integer field `start` must not exceed integer field `end`. Rejects.
    OrderedRange { start: String, end: String },

    /// When boolean `flag` is true, array `list` must be empty or absent. Warns only.
    EmptyWhenTrue { flag: String, list: String },
}

/// The expected structure of one task's model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContract {
    pub name: String,
    pub shape: ContractShape,
    pub rules: Vec<ContractRule>,
}

impl ResponseContract {
    /// Create a fixed-shape contract.
    pub fn fixed(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            shape: ContractShape::FixedFields(fields),
            rules: Vec::new(),
        }
    }

    /// Create a contract whose keys are supplied at runtime, each mapping to `value`.
    pub fn dynamic(name: impl Into<String>, value: FieldType) -> Self {
        Self {
            name: name.into(),
            shape: ContractShape::DynamicKeyed { value },
            rules: Vec::new(),
        }
    }

    /// Add a rule to this contract (builder pattern).
    pub fn with_rule(mut self, rule: ContractRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn is_dynamic_keyed(&self) -> bool {
        matches!(self.shape, ContractShape::DynamicKeyed { .. })
    }

    /// Declared fields; empty for dynamic-keyed contracts.
    pub fn fields(&self) -> &[FieldSpec] {
        match &self.shape {
            ContractShape::FixedFields(fields) => fields,
            ContractShape::DynamicKeyed { .. } => &[],
        }
    }

    /// Shape of every value; `None` for fixed-shape contracts.
    pub fn value_contract(&self) -> Option<&FieldType> {
        match &self.shape {
            ContractShape::FixedFields(_) => None,
            ContractShape::DynamicKeyed { value } => Some(value),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Whether this contract, or any contract nested in it, has open key sets.
    pub fn has_dynamic_keys(&self) -> bool {
        match &self.shape {
            ContractShape::DynamicKeyed { .. } => true,
            ContractShape::FixedFields(fields) => fields.iter().any(|f| f.ty.has_dynamic_keys()),
        }
    }

    /// Verify the contract is well formed, recursing into nested contracts.
    ///
    /// A fixed-shape contract must declare at least one field, field names must
    /// be unique, and every rule must reference fields of the right type.
    pub fn check(&self) -> Result<()> {
        match &self.shape {
            ContractShape::FixedFields(fields) => {
                if fields.is_empty() {
                    return Err(self.invalid("fixed-shape contract declares no fields"));
                }
                let mut seen = BTreeSet::new();
                for field in fields {
                    if field.name.is_empty() {
                        return Err(self.invalid("field name must not be empty"));
                    }
                    if !seen.insert(field.name.as_str()) {
                        return Err(self.invalid(format!("duplicate field '{}'", field.name)));
                    }
                    field.ty.check()?;
                }
                for rule in &self.rules {
                    self.check_rule(rule)?;
                }
            }
            ContractShape::DynamicKeyed { value } => {
                if !self.rules.is_empty() {
                    return Err(self.invalid("rules require a fixed-shape contract"));
                }
                value.check()?;
            }
        }
        Ok(())
    }

    fn check_rule(&self, rule: &ContractRule) -> Result<()> {
        match rule {
            ContractRule::OrderedRange { start, end } => {
                self.expect_field(start, "integer")?;
                self.expect_field(end, "integer")
            }
            ContractRule::EmptyWhenTrue { flag, list } => {
                self.expect_field(flag, "boolean")?;
                self.expect_field(list, "array")
            }
        }
    }

    fn expect_field(&self, name: &str, kind: &str) -> Result<()> {
        match self.field(name) {
            Some(f) if f.ty.kind() == kind => Ok(()),
            Some(f) => Err(self.invalid(format!(
                "rule field '{}' is {}, expected {}",
                name,
                f.ty.kind(),
                kind
            ))),
            None => Err(self.invalid(format!("rule references unknown field '{}'", name))),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidContract {
            contract: self.name.clone(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> ResponseContract {
        ResponseContract::fixed(
            "range",
            vec![
                FieldSpec::required("start", FieldType::Integer),
                FieldSpec::required("end", FieldType::Integer),
            ],
        )
        .with_rule(ContractRule::OrderedRange {
            start: "start".to_string(),
            end: "end".to_string(),
        })
    }

    #[test]
    fn test_fixed_contract_accessors() {
        let c = range();
        assert!(!c.is_dynamic_keyed());
        assert_eq!(c.fields().len(), 2);
        assert!(c.value_contract().is_none());
        assert!(c.check().is_ok());
    }

    #[test]
    fn test_dynamic_contract_accessors() {
        let c = ResponseContract::dynamic("labels", FieldType::Label);
        assert!(c.is_dynamic_keyed());
        assert!(c.fields().is_empty());
        assert_eq!(c.value_contract(), Some(&FieldType::Label));
        assert!(c.check().is_ok());
    }

    #[test]
    fn test_empty_fixed_contract_rejected() {
        let err = ResponseContract::fixed("empty", vec![]).check().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidContract { ref contract, .. } if contract == "empty"));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let c = ResponseContract::fixed(
            "dup",
            vec![
                FieldSpec::required("thinking", FieldType::String),
                FieldSpec::required("thinking", FieldType::String),
            ],
        );
        assert!(c.check().unwrap_err().to_string().contains("duplicate field"));
    }

    #[test]
    fn test_nested_invalid_contract_rejected() {
        let c = ResponseContract::dynamic(
            "outer",
            FieldType::object(ResponseContract::fixed("inner", vec![])),
        );
        let err = c.check().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidContract { ref contract, .. } if contract == "inner"));
    }

    #[test]
    fn test_rule_on_wrong_field_type_rejected() {
        let c = ResponseContract::fixed(
            "bad_rule",
            vec![
                FieldSpec::required("flag", FieldType::String),
                FieldSpec::optional("items", FieldType::array_of(FieldType::String)),
            ],
        )
        .with_rule(ContractRule::EmptyWhenTrue {
            flag: "flag".to_string(),
            list: "items".to_string(),
        });
        assert!(c.check().unwrap_err().to_string().contains("expected boolean"));
    }

    #[test]
    fn test_rule_on_dynamic_contract_rejected() {
        let c = ResponseContract::dynamic("labels", FieldType::Label).with_rule(
            ContractRule::OrderedRange {
                start: "start".to_string(),
                end: "end".to_string(),
            },
        );
        assert!(c.check().is_err());
    }

    #[test]
    fn test_has_dynamic_keys_recurses() {
        let c = ResponseContract::fixed(
            "wrapper",
            vec![FieldSpec::required(
                "segments",
                FieldType::object(ResponseContract::dynamic("labels", FieldType::Label)),
            )],
        );
        assert!(c.has_dynamic_keys());
        assert!(!range().has_dynamic_keys());
    }
}
