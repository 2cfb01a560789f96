use std::collections::HashMap;

use serde::Serialize;

use super::aggregation::{AggregatedExam, AggregatedRisk};
use super::catalog::{ExamId, ExamSchedule, ExamType, FunctionId, RiskId};

/// One (function, exam) pair with the risks that apply to the function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionAssociationRecord {
    pub function_id: FunctionId,
    pub exam_id: ExamId,
    #[serde(flatten)]
    pub schedule: ExamSchedule,
    pub risk_ids: Vec<RiskId>,
}

impl FunctionAssociationRecord {
    pub fn exam_type(&self) -> ExamType {
        self.schedule.exam_type()
    }

    pub fn periodicity_months(&self) -> Option<u32> {
        self.schedule.periodicity_months()
    }
}

/// Maps each function to the risks whose aggregated entry references it, in first-seen
/// order. Only the aggregated structure is consulted.
pub fn invert_risks(risks: &[AggregatedRisk]) -> HashMap<FunctionId, Vec<RiskId>> {
    risks
        .iter()
        .fold(HashMap::new(), |mut by_function, aggregated| {
            for function in &aggregated.functions {
                let ids: &mut Vec<RiskId> = by_function.entry(function.id).or_default();
                if !ids.contains(&aggregated.risk.id) {
                    ids.push(aggregated.risk.id);
                }
            }
            by_function
        })
}

/// Flattens the aggregated exams back into per-function submission records.
pub fn rebuild(
    risks: &[AggregatedRisk],
    exams: &[AggregatedExam],
) -> Vec<FunctionAssociationRecord> {
    let risks_by_function = invert_risks(risks);

    exams
        .iter()
        .flat_map(|exam| {
            let risks_by_function = &risks_by_function;
            exam.functions
                .iter()
                .map(move |function| FunctionAssociationRecord {
                    function_id: function.id,
                    exam_id: exam.exam.id,
                    schedule: exam.schedule,
                    risk_ids: risks_by_function
                        .get(&function.id)
                        .cloned()
                        .unwrap_or_default(),
                })
        })
        .collect()
}
