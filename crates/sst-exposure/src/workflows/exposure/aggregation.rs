use std::collections::HashMap;
use std::hash::Hash;

use serde::{Serialize, Serializer};
use tracing::warn;

use super::catalog::{
    AgentCatalogRef, AgentId, ExamCatalogRef, ExamId, ExamSchedule, ExamType, FunctionId,
    RiskCatalogRef, RiskGroup, RiskId,
};
use super::domain::{FunctionRef, JobFunction};

/// Natural identity of an aggregated exam.
pub type ExamKey = (ExamId, ExamType);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedExam {
    pub exam: ExamCatalogRef,
    pub schedule: ExamSchedule,
    pub functions: Vec<FunctionRef>,
}

impl AggregatedExam {
    pub fn key(&self) -> ExamKey {
        (self.exam.id, self.schedule.exam_type())
    }

    pub fn periodicity_months(&self) -> Option<u32> {
        self.schedule.periodicity_months()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRisk {
    pub risk: RiskCatalogRef,
    pub functions: Vec<FunctionRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedAgent {
    pub agent: AgentCatalogRef,
    pub functions: Vec<FunctionRef>,
}

// Aggregated entries go out flat: catalog fields sit next to the function list.

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedExamWire<'a> {
    exam_id: ExamId,
    exam_code: &'a str,
    exam_name: &'a str,
    #[serde(flatten)]
    schedule: ExamSchedule,
    functions: &'a [FunctionRef],
}

impl Serialize for AggregatedExam {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AggregatedExamWire {
            exam_id: self.exam.id,
            exam_code: &self.exam.code,
            exam_name: &self.exam.name,
            schedule: self.schedule,
            functions: &self.functions,
        }
        .serialize(serializer)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedRiskWire<'a> {
    risk_id: RiskId,
    group: RiskGroup,
    description: &'a str,
    functions: &'a [FunctionRef],
}

impl Serialize for AggregatedRisk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AggregatedRiskWire {
            risk_id: self.risk.id,
            group: self.risk.group,
            description: &self.risk.description,
            functions: &self.functions,
        }
        .serialize(serializer)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedAgentWire<'a> {
    agent_id: AgentId,
    esocial_code: &'a str,
    description: &'a str,
    functions: &'a [FunctionRef],
}

impl Serialize for AggregatedAgent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AggregatedAgentWire {
            agent_id: self.agent.id,
            esocial_code: &self.agent.esocial_code,
            description: &self.agent.description,
            functions: &self.functions,
        }
        .serialize(serializer)
    }
}

/// Two functions required the same exam and type with different periodicities. The first
/// periodicity seen is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicityConflict {
    pub exam_id: ExamId,
    pub exam_type: ExamType,
    pub kept_months: Option<u32>,
    pub conflicting_months: Option<u32>,
    pub function_id: FunctionId,
}

/// Deduplicated exposure universe for a set of functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureAggregate {
    pub exams: Vec<AggregatedExam>,
    pub risks: Vec<AggregatedRisk>,
    pub agents: Vec<AggregatedAgent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<PeriodicityConflict>,
}

impl ExposureAggregate {
    pub fn is_empty(&self) -> bool {
        self.exams.is_empty() && self.risks.is_empty() && self.agents.is_empty()
    }
}

/// Folds functions into the three deduplicated collections. Pure: the result depends only
/// on `functions` and their order.
pub fn aggregate(functions: &[JobFunction]) -> ExposureAggregate {
    let mut exams = Accumulator::default();
    let mut risks = Accumulator::default();
    let mut agents = Accumulator::default();
    let mut conflicts = Vec::new();

    for function in functions {
        let reference = function.reference();

        for association in &function.exams {
            let key = (association.exam_catalog.id, association.exam_type());
            let existing = exams.add(key, &reference, || AggregatedExam {
                exam: association.exam_catalog.clone(),
                schedule: association.schedule,
                functions: Vec::new(),
            });
            if let Some(entry) = existing {
                if entry.schedule != association.schedule {
                    warn!(
                        exam_id = %key.0,
                        exam_type = %key.1,
                        function_id = %function.id,
                        kept = ?entry.periodicity_months(),
                        conflicting = ?association.schedule.periodicity_months(),
                        "periodicity conflict, keeping first value"
                    );
                    conflicts.push(PeriodicityConflict {
                        exam_id: key.0,
                        exam_type: key.1,
                        kept_months: entry.periodicity_months(),
                        conflicting_months: association.schedule.periodicity_months(),
                        function_id: function.id,
                    });
                }
            }
        }

        for association in &function.risks {
            risks.add(association.risk_catalog.id, &reference, || AggregatedRisk {
                risk: association.risk_catalog.clone(),
                functions: Vec::new(),
            });
        }

        for association in &function.agents {
            agents.add(association.agent_catalog.id, &reference, || AggregatedAgent {
                agent: association.agent_catalog.clone(),
                functions: Vec::new(),
            });
        }
    }

    ExposureAggregate {
        exams: exams.into_entries(),
        risks: risks.into_entries(),
        agents: agents.into_entries(),
        conflicts,
    }
}

trait Referenced {
    fn functions_mut(&mut self) -> &mut Vec<FunctionRef>;
}

impl Referenced for AggregatedExam {
    fn functions_mut(&mut self) -> &mut Vec<FunctionRef> {
        &mut self.functions
    }
}

impl Referenced for AggregatedRisk {
    fn functions_mut(&mut self) -> &mut Vec<FunctionRef> {
        &mut self.functions
    }
}

impl Referenced for AggregatedAgent {
    fn functions_mut(&mut self) -> &mut Vec<FunctionRef> {
        &mut self.functions
    }
}

/// First-seen ordered map local to a single aggregation pass.
struct Accumulator<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<V>,
}

impl<K, V> Default for Accumulator<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K, V> Accumulator<K, V>
where
    K: Eq + Hash,
    V: Referenced,
{
    /// Records `function` against `key`. Returns the entry when the key was already
    /// present, `None` when this call created it.
    fn add(&mut self, key: K, function: &FunctionRef, seed: impl FnOnce() -> V) -> Option<&V> {
        match self.index.get(&key).copied() {
            Some(position) => {
                let entry = &mut self.entries[position];
                let functions = entry.functions_mut();
                if !functions.iter().any(|existing| existing.id == function.id) {
                    functions.push(function.clone());
                }
                Some(&self.entries[position])
            }
            None => {
                let mut entry = seed();
                entry.functions_mut().push(function.clone());
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    fn into_entries(self) -> Vec<V> {
        self.entries
    }
}
