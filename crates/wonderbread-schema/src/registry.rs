//! The canonical set of response contracts.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::contract::{ContractRule, FieldSpec, FieldType, ResponseContract};
use crate::describe::{describe, SchemaDescriptor};
use crate::error::{ResponseError, Result, SchemaError};
use crate::responses::Response;
use crate::validate::{parse_response, validate, ValidatedObject};

/// Contracts shipped with the benchmark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContractName {
    /// Demo segmentation, one label per step identifier.
    SegmentationByUuid,

    /// Demo segmentation, one step range per workflow label.
    SegmentationByRange,

    /// Demo validation, was the workflow completed.
    CompletionJudgment,

    /// Demo validation, was the SOP followed accurately.
    AccuracyJudgment,

    /// SOP ranking, best first.
    RankingJudgment,
}

impl ContractName {
    pub const ALL: [ContractName; 5] = [
        ContractName::SegmentationByUuid,
        ContractName::SegmentationByRange,
        ContractName::CompletionJudgment,
        ContractName::AccuracyJudgment,
        ContractName::RankingJudgment,
    ];

    /// Registry key, as accepted by `wonderbread schema <name>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractName::SegmentationByUuid => "segmentation_by_uuid",
            ContractName::SegmentationByRange => "segmentation_by_range",
            ContractName::CompletionJudgment => "completion_judgment",
            ContractName::AccuracyJudgment => "accuracy_judgment",
            ContractName::RankingJudgment => "ranking_judgment",
        }
    }

    /// Build the contract definition.
    pub fn contract(&self) -> ResponseContract {
        match self {
            ContractName::SegmentationByUuid => {
                ResponseContract::dynamic(self.as_str(), FieldType::Label)
            }
            ContractName::SegmentationByRange => {
                ResponseContract::dynamic(self.as_str(), FieldType::object(workflow_range()))
            }
            ContractName::CompletionJudgment => ResponseContract::fixed(
                self.as_str(),
                vec![
                    thinking("Step-by-step reasoning about completion status"),
                    FieldSpec::required("was_completed", FieldType::Boolean)
                        .describe("Whether the workflow was successfully completed"),
                ],
            ),
            ContractName::AccuracyJudgment => ResponseContract::fixed(
                self.as_str(),
                vec![
                    thinking("Step-by-step reasoning about accuracy"),
                    FieldSpec::optional("inaccurate_steps", FieldType::array_of(FieldType::String))
                        .describe("List of steps that were performed inaccurately or out of order"),
                    FieldSpec::required("was_accurate", FieldType::Boolean)
                        .describe("Whether the SOP was accurately followed"),
                ],
            )
            .with_rule(ContractRule::EmptyWhenTrue {
                flag: "was_accurate".to_string(),
                list: "inaccurate_steps".to_string(),
            }),
            ContractName::RankingJudgment => ResponseContract::fixed(
                self.as_str(),
                vec![
                    thinking("Step-by-step reasoning about the ranking"),
                    FieldSpec::required("pred_ranking", FieldType::array_of(FieldType::Integer))
                        .describe(
                            "List of SOP IDs ranked from best to worst. First ID is best, last is worst.",
                        ),
                ],
            ),
        }
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractName {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        ContractName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownContract(s.to_string()))
    }
}

fn thinking(description: &str) -> FieldSpec {
    FieldSpec::required("thinking", FieldType::String).describe(description)
}

fn workflow_range() -> ResponseContract {
    ResponseContract::fixed(
        "workflow_range",
        vec![
            FieldSpec::required("start", FieldType::Integer)
                .describe("Starting UUID for this workflow"),
            FieldSpec::required("end", FieldType::Integer).describe("Ending UUID for this workflow"),
        ],
    )
    .with_rule(ContractRule::OrderedRange {
        start: "start".to_string(),
        end: "end".to_string(),
    })
}

static GLOBAL: Lazy<Result<SchemaRegistry>> = Lazy::new(SchemaRegistry::standard);

/// Immutable set of checked contracts, keyed by contract name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    contracts: BTreeMap<String, ResponseContract>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every [`ContractName`] contract.
    pub fn standard() -> Result<Self> {
        let mut registry = Self::new();
        for name in ContractName::ALL {
            registry.register(name.contract())?;
        }
        Ok(registry)
    }

    /// Process-wide standard registry, built on first use.
    pub fn global() -> Result<&'static SchemaRegistry> {
        Lazy::force(&GLOBAL).as_ref().map_err(|e| e.clone())
    }

    /// Add a contract after checking it is well formed.
    pub fn register(&mut self, contract: ResponseContract) -> Result<()> {
        contract.check()?;
        if self.contracts.contains_key(&contract.name) {
            return Err(SchemaError::DuplicateContract(contract.name));
        }
        debug!(contract = %contract.name, dynamic = contract.is_dynamic_keyed(), "registered contract");
        self.contracts.insert(contract.name.clone(), contract);
        Ok(())
    }

    /// Look up a contract by name.
    pub fn get(&self, name: &str) -> Result<&ResponseContract> {
        self.contracts
            .get(name)
            .ok_or_else(|| SchemaError::UnknownContract(name.to_string()))
    }

    /// Registered contract names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    /// Render a registered contract, logging when strict mode is refused.
    pub fn describe(&self, contract: &str, schema_name: &str, strict: bool) -> Result<SchemaDescriptor> {
        let descriptor = describe(self.get(contract)?, schema_name, strict)?;
        if descriptor.strict_downgraded {
            warn!(
                contract = %contract,
                schema_name = %schema_name,
                "strict mode is not supported for dynamic keys; sending non-strict schema"
            );
        }
        Ok(descriptor)
    }

    /// Validate an already decoded value against the named contract.
    pub fn validate(&self, contract: &str, raw: &Value) -> std::result::Result<ValidatedObject, ResponseError> {
        Ok(validate(self.get(contract)?, raw)?)
    }

    /// Decode raw model text (optionally code-fenced) and validate it.
    pub fn parse(&self, contract: &str, raw: &str) -> std::result::Result<ValidatedObject, ResponseError> {
        parse_response(self.get(contract)?, raw)
    }

    /// Decode, validate and convert raw model text into `T`.
    pub fn parse_as<T: Response>(&self, raw: &str) -> std::result::Result<T, ResponseError> {
        self.parse(T::CONTRACT.as_str(), raw)?.into_typed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_names_round_trip() {
        for name in ContractName::ALL {
            assert_eq!(name.as_str().parse::<ContractName>().unwrap(), name);
            assert_eq!(name.contract().name, name.as_str());
        }
        assert!("nope".parse::<ContractName>().is_err());
    }

    #[test]
    fn test_standard_registry_holds_all_contracts() {
        let registry = SchemaRegistry::standard().unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names.len(), ContractName::ALL.len());
        assert!(registry.get("ranking_judgment").is_ok());
    }

    #[test]
    fn test_global_registry_available() {
        let registry = SchemaRegistry::global().unwrap();
        assert!(registry.get(ContractName::SegmentationByUuid.as_str()).is_ok());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = SchemaRegistry::standard().unwrap();
        let err = registry
            .register(ContractName::RankingJudgment.contract())
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateContract("ranking_judgment".to_string()));
    }

    #[test]
    fn test_invalid_contract_not_registered() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.register(ResponseContract::fixed("empty", vec![])).is_err());
        assert_eq!(registry.names().count(), 0);
    }

    #[test]
    fn test_unknown_contract_lookup() {
        let registry = SchemaRegistry::standard().unwrap();
        assert!(matches!(
            registry.get("missing"),
            Err(SchemaError::UnknownContract(_))
        ));
    }
}
