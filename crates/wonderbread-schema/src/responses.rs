//! Typed views of validated responses, as consumed by task scoring code.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::RankingError;
use crate::registry::ContractName;

/// A typed response bound to the contract that validates it.
pub trait Response: serde::de::DeserializeOwned {
    const CONTRACT: ContractName;
}

/// Demonstration step identifier -> workflow label.
///
/// Example: `{"UUID_0": "A", "UUID_1": "A", "UUID_2": "B"}`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentationByUuid(pub BTreeMap<String, String>);

impl Response for SegmentationByUuid {
    const CONTRACT: ContractName = ContractName::SegmentationByUuid;
}

/// Inclusive span of step identifiers assigned to one workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRange {
    pub start: i64,
    pub end: i64,
}

impl WorkflowRange {
    pub fn contains(&self, step: i64) -> bool {
        self.start <= step && step <= self.end
    }
}

/// Workflow label -> step range.
///
/// Example: `{"A": {"start": 0, "end": 5}, "B": {"start": 6, "end": 10}}`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentationByRange(pub BTreeMap<String, WorkflowRange>);

impl SegmentationByRange {
    /// Label of the first workflow whose range contains `step`.
    pub fn label_for(&self, step: i64) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, range)| range.contains(step))
            .map(|(label, _)| label.as_str())
    }
}

impl Response for SegmentationByRange {
    const CONTRACT: ContractName = ContractName::SegmentationByRange;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionJudgment {
    pub thinking: String,
    pub was_completed: bool,
}

impl Response for CompletionJudgment {
    const CONTRACT: ContractName = ContractName::CompletionJudgment;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyJudgment {
    pub thinking: String,
    #[serde(default)]
    pub inaccurate_steps: Option<Vec<String>>,
    pub was_accurate: bool,
}

impl AccuracyJudgment {
    /// Steps reported as deviating; empty when none were found.
    pub fn deviations(&self) -> &[String] {
        self.inaccurate_steps.as_deref().unwrap_or(&[])
    }
}

impl Response for AccuracyJudgment {
    const CONTRACT: ContractName = ContractName::AccuracyJudgment;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingJudgment {
    pub thinking: String,
    /// Candidate identifiers, best first.
    pub pred_ranking: Vec<i64>,
}

impl RankingJudgment {
    /// Check that the ranking orders every candidate exactly once.
    ///
    /// The contract itself cannot know the candidate set, so ranking tasks
    /// call this after validation.
    pub fn check_against(&self, candidates: &[i64]) -> Result<(), RankingError> {
        let expected: BTreeSet<i64> = candidates.iter().copied().collect();
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        let mut unknown = BTreeSet::new();

        for &id in &self.pred_ranking {
            if !seen.insert(id) {
                duplicates.insert(id);
            }
            if !expected.contains(&id) {
                unknown.insert(id);
            }
        }
        let missing: Vec<i64> = expected.difference(&seen).copied().collect();

        if duplicates.is_empty() && unknown.is_empty() && missing.is_empty() {
            Ok(())
        } else {
            Err(RankingError {
                duplicates: duplicates.into_iter().collect(),
                missing,
                unknown: unknown.into_iter().collect(),
            })
        }
    }
}

impl Response for RankingJudgment {
    const CONTRACT: ContractName = ContractName::RankingJudgment;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(ids: &[i64]) -> RankingJudgment {
        RankingJudgment {
            thinking: String::new(),
            pred_ranking: ids.to_vec(),
        }
    }

    #[test]
    fn test_complete_ranking_passes() {
        assert!(ranking(&[2, 1, 3]).check_against(&[1, 2, 3]).is_ok());
    }

    #[test]
    fn test_ranking_reports_all_problems() {
        let err = ranking(&[1, 1, 7]).check_against(&[1, 2, 3]).unwrap_err();
        assert_eq!(err.duplicates, vec![1]);
        assert_eq!(err.missing, vec![2, 3]);
        assert_eq!(err.unknown, vec![7]);
    }

    #[test]
    fn test_deviations_default_empty() {
        let judgment = AccuracyJudgment {
            thinking: "ok".to_string(),
            inaccurate_steps: None,
            was_accurate: true,
        };
        assert!(judgment.deviations().is_empty());
    }

    #[test]
    fn test_label_for_step() {
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), WorkflowRange { start: 0, end: 5 });
        map.insert("B".to_string(), WorkflowRange { start: 6, end: 10 });
        let seg = SegmentationByRange(map);
        assert_eq!(seg.label_for(3), Some("A"));
        assert_eq!(seg.label_for(6), Some("B"));
        assert_eq!(seg.label_for(11), None);
    }
}
