//! Rendering contracts into JSON-Schema descriptors for schema-constrained
//! generation.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::contract::{ContractShape, FieldType, ResponseContract};
use crate::error::Result;

/// Marker telling the model client this is a JSON-schema-constrained request.
pub const FORMAT_KIND: &str = "json_schema";

/// A contract rendered for a model-invocation client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDescriptor {
    pub format_kind: String,
    pub schema_name: String,

    /// Strictness actually applied. Always false for open key sets.
    pub strict: bool,

    pub schema_body: Value,

    /// True when the caller asked for strict mode and it was refused.
    #[serde(skip)]
    pub strict_downgraded: bool,
}

impl SchemaDescriptor {
    /// The `response_format` object as sent on the wire.
    pub fn to_wire(&self) -> Value {
        json!({
            "type": self.format_kind,
            "json_schema": {
                "name": self.schema_name,
                "strict": self.strict,
                "schema": self.schema_body,
            }
        })
    }
}

/// Render `contract` as a descriptor named `name`.
///
/// Strict mode cannot express open key sets, so a strict request on a contract
/// with dynamic keys anywhere inside it is downgraded to non-strict and flagged
/// through [`SchemaDescriptor::strict_downgraded`].
pub fn describe(contract: &ResponseContract, name: &str, strict: bool) -> Result<SchemaDescriptor> {
    contract.check()?;

    let honoured = strict && !contract.has_dynamic_keys();

    Ok(SchemaDescriptor {
        format_kind: FORMAT_KIND.to_string(),
        schema_name: name.to_string(),
        strict: honoured,
        schema_body: contract_schema(contract, honoured),
        strict_downgraded: strict && !honoured,
    })
}

fn contract_schema(contract: &ResponseContract, strict: bool) -> Value {
    match &contract.shape {
        ContractShape::FixedFields(fields) => {
            let mut properties = Map::new();
            let mut required = Vec::new();

            for field in fields {
                let mut schema = type_schema(&field.ty, strict);
                if strict && !field.required {
                    make_nullable(&mut schema);
                }
                if let (Some(text), Value::Object(obj)) = (&field.description, &mut schema) {
                    obj.insert("description".to_string(), Value::String(text.clone()));
                }
                properties.insert(field.name.clone(), schema);

                if strict || field.required {
                    required.push(Value::String(field.name.clone()));
                }
            }

            let mut body = Map::new();
            body.insert("type".to_string(), json!("object"));
            body.insert("properties".to_string(), Value::Object(properties));
            body.insert("required".to_string(), Value::Array(required));
            if strict {
                body.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            Value::Object(body)
        }
        ContractShape::DynamicKeyed { value } => json!({
            "type": "object",
            "additionalProperties": type_schema(value, false),
        }),
    }
}

fn type_schema(ty: &FieldType, strict: bool) -> Value {
    match ty {
        FieldType::String => json!({ "type": "string" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::Integer => json!({ "type": "integer" }),
        FieldType::Label => json!({
            "type": "string",
            "minLength": 1,
            "maxLength": 1,
            "pattern": "^[A-Za-z]$",
        }),
        FieldType::Array(items) => json!({
            "type": "array",
            "items": type_schema(items, strict),
        }),
        FieldType::Object(contract) => contract_schema(contract, strict),
    }
}

// Strict mode requires every property; optional ones admit null instead.
fn make_nullable(schema: &mut Value) {
    let nullable = match schema.get("type") {
        Some(Value::String(name)) => json!([name, "null"]),
        _ => return,
    };
    if let Value::Object(obj) = schema {
        obj.insert("type".to_string(), nullable);
    }
}
