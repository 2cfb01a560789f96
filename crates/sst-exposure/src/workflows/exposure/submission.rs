//! Submission payloads for the document endpoints. Field names follow the backend contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::aggregation::{AggregatedAgent, AggregatedRisk, ExposureAggregate};
use super::catalog::{AgentId, ExamId, ExamType, FunctionId, RiskId};
use super::rebuild::{rebuild, FunctionAssociationRecord};

/// Compliance document being assembled from the aggregated exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pgr,
    Ltcat,
    Ltip,
    Pcmso,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pgr => "PGR",
            Self::Ltcat => "LTCAT",
            Self::Ltip => "LTIP",
            Self::Pcmso => "PCMSO",
        }
    }

    pub const fn submits_exams(self) -> bool {
        matches!(self, Self::Pcmso)
    }

    pub const fn submits_agents(self) -> bool {
        matches!(self, Self::Ltcat | Self::Ltip)
    }

    pub const fn submits_risks(self) -> bool {
        matches!(self, Self::Pgr)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document kind '{0}' (expected pgr, ltcat, ltip or pcmso)")]
pub struct UnknownDocumentKind(pub String);

impl FromStr for DocumentKind {
    type Err = UnknownDocumentKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pgr" => Ok(Self::Pgr),
            "ltcat" => Ok(Self::Ltcat),
            "ltip" => Ok(Self::Ltip),
            "pcmso" => Ok(Self::Pcmso),
            _ => Err(UnknownDocumentKind(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskLink {
    pub risco_id: RiskId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSubmission {
    pub funcao_id: FunctionId,
    pub exame_id: ExamId,
    pub tipo_exame: ExamType,
    pub periodicidade_meses: Option<u32>,
    pub riscos: Vec<RiskLink>,
}

impl From<&FunctionAssociationRecord> for ExamSubmission {
    fn from(record: &FunctionAssociationRecord) -> Self {
        Self {
            funcao_id: record.function_id,
            exame_id: record.exam_id,
            tipo_exame: record.exam_type(),
            periodicidade_meses: record.periodicity_months(),
            riscos: record
                .risk_ids
                .iter()
                .map(|&risco_id| RiskLink { risco_id })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSubmission {
    pub funcao_id: FunctionId,
    pub agente_nocivo_id: AgentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSubmission {
    pub funcao_id: FunctionId,
    pub risco_id: RiskId,
}

pub fn exam_submissions(records: &[FunctionAssociationRecord]) -> Vec<ExamSubmission> {
    records.iter().map(ExamSubmission::from).collect()
}

pub fn agent_submissions(agents: &[AggregatedAgent]) -> Vec<AgentSubmission> {
    agents
        .iter()
        .flat_map(|agent| {
            agent.functions.iter().map(move |function| AgentSubmission {
                funcao_id: function.id,
                agente_nocivo_id: agent.agent.id,
            })
        })
        .collect()
}

pub fn risk_submissions(risks: &[AggregatedRisk]) -> Vec<RiskSubmission> {
    risks
        .iter()
        .flat_map(|risk| {
            risk.functions.iter().map(move |function| RiskSubmission {
                funcao_id: function.id,
                risco_id: risk.risk.id,
            })
        })
        .collect()
}

/// Aggregation-derived fields of a document submission. Fields a document does not
/// carry are omitted from the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentPayload {
    #[serde(rename = "exames", skip_serializing_if = "Option::is_none")]
    pub exams: Option<Vec<ExamSubmission>>,
    #[serde(rename = "agentesNocivos", skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<AgentSubmission>>,
    #[serde(rename = "riscosPGR", skip_serializing_if = "Option::is_none")]
    pub risks: Option<Vec<RiskSubmission>>,
}

impl DocumentPayload {
    pub fn build(kind: DocumentKind, aggregate: &ExposureAggregate) -> Self {
        let exams = kind.submits_exams().then(|| {
            let records = rebuild(&aggregate.risks, &aggregate.exams);
            exam_submissions(&records)
        });
        let agents = kind
            .submits_agents()
            .then(|| agent_submissions(&aggregate.agents));
        let risks = kind
            .submits_risks()
            .then(|| risk_submissions(&aggregate.risks));

        Self {
            exams,
            agents,
            risks,
        }
    }
}
