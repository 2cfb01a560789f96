use serde::{Deserialize, Serialize};

use super::catalog::{
    AgentCatalogRef, ExamCatalogRef, ExamSchedule, ExamType, FunctionId, RiskCatalogRef,
    ScheduleError, SectorId,
};

/// Organizational sector together with the job functions it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sector {
    pub id: SectorId,
    pub name: String,
    #[serde(default)]
    pub functions: Vec<JobFunction>,
}

impl Sector {
    pub fn selection(&self) -> SectorRef {
        SectorRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// A sector as selected by the user, before its functions are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRef {
    pub id: SectorId,
    pub name: String,
}

/// Job function with its embedded risk, agent and exam associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFunction {
    pub id: FunctionId,
    pub name: String,
    pub sector_id: SectorId,
    /// Filled in by the resolver from the sector the function was retrieved through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_name: Option<String>,
    #[serde(default)]
    pub risks: Vec<RiskAssociation>,
    #[serde(default)]
    pub agents: Vec<AgentAssociation>,
    #[serde(default)]
    pub exams: Vec<ExamAssociation>,
}

impl JobFunction {
    pub fn reference(&self) -> FunctionRef {
        FunctionRef {
            id: self.id,
            name: self.name.clone(),
            sector_name: self.sector_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssociation {
    pub id: u64,
    pub risk_catalog: RiskCatalogRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAssociation {
    pub id: u64,
    pub agent_catalog: AgentCatalogRef,
}

/// Link between a function and a catalog exam under a given schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExamAssociationWire", into = "ExamAssociationWire")]
pub struct ExamAssociation {
    pub id: u64,
    pub exam_catalog: ExamCatalogRef,
    pub schedule: ExamSchedule,
}

impl ExamAssociation {
    pub fn exam_type(&self) -> ExamType {
        self.schedule.exam_type()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExamAssociationWire {
    id: u64,
    exam_catalog: ExamCatalogRef,
    exam_type: ExamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    periodicity_months: Option<u32>,
}

impl TryFrom<ExamAssociationWire> for ExamAssociation {
    type Error = ScheduleError;

    fn try_from(wire: ExamAssociationWire) -> Result<Self, Self::Error> {
        let schedule = ExamSchedule::from_parts(wire.exam_type, wire.periodicity_months)?;
        Ok(Self {
            id: wire.id,
            exam_catalog: wire.exam_catalog,
            schedule,
        })
    }
}

impl From<ExamAssociation> for ExamAssociationWire {
    fn from(association: ExamAssociation) -> Self {
        Self {
            id: association.id,
            exam_catalog: association.exam_catalog,
            exam_type: association.schedule.exam_type(),
            periodicity_months: association.schedule.periodicity_months(),
        }
    }
}

/// Lightweight reference to the function that requires an aggregated entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRef {
    pub id: FunctionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_decodes_with_missing_association_lists() {
        let function: JobFunction = serde_json::from_value(json!({
            "id": 4,
            "name": "Welder",
            "sectorId": 2,
        }))
        .expect("function decodes");
        assert!(function.risks.is_empty());
        assert!(function.exams.is_empty());
        assert!(function.sector_name.is_none());
    }

    #[test]
    fn exam_association_round_trips_wire_shape() {
        let value = json!({
            "id": 10,
            "examCatalog": { "id": 7, "code": "0281", "name": "Audiometry" },
            "examType": "PERIODICO",
            "periodicityMonths": 12,
        });
        let association: ExamAssociation =
            serde_json::from_value(value.clone()).expect("association decodes");
        assert_eq!(association.schedule, ExamSchedule::Periodic { months: 12 });
        assert_eq!(
            serde_json::to_value(&association).expect("serializes"),
            value
        );
    }

    #[test]
    fn periodic_association_without_months_is_rejected() {
        let result = serde_json::from_value::<ExamAssociation>(json!({
            "id": 10,
            "examCatalog": { "id": 7 },
            "examType": "PERIODIC",
        }));
        assert!(result.is_err());
    }
}
