use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

catalog_id!(
    /// Organizational sector identifier.
    SectorId
);
catalog_id!(
    /// Job function identifier.
    FunctionId
);
catalog_id!(
    /// Medical exam catalog identifier.
    ExamId
);
catalog_id!(
    /// Labor risk catalog identifier.
    RiskId
);
catalog_id!(
    /// Noxious agent catalog identifier (eSocial table 24).
    AgentId
);

/// Medical exam catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamCatalogRef {
    pub id: ExamId,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// Labor risk catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCatalogRef {
    pub id: RiskId,
    pub group: RiskGroup,
    #[serde(default)]
    pub description: String,
}

/// Noxious agent catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCatalogRef {
    pub id: AgentId,
    #[serde(default)]
    pub esocial_code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskGroup {
    #[serde(rename = "FISICO", alias = "PHYSICAL")]
    Physical,
    #[serde(rename = "QUIMICO", alias = "CHEMICAL")]
    Chemical,
    #[serde(rename = "BIOLOGICO", alias = "BIOLOGICAL")]
    Biological,
    #[serde(rename = "ERGONOMICO", alias = "ERGONOMIC")]
    Ergonomic,
    #[serde(rename = "ACIDENTE", alias = "ACCIDENT")]
    Accident,
}

impl RiskGroup {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Physical => "Physical",
            Self::Chemical => "Chemical",
            Self::Biological => "Biological",
            Self::Ergonomic => "Ergonomic",
            Self::Accident => "Accident",
        }
    }
}

/// Occupational exam type. Together with the exam id it forms the aggregation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "ADMISSIONAL")]
    Admissional,
    #[serde(rename = "PERIODICO", alias = "PERIODIC")]
    Periodic,
    #[serde(rename = "RETORNO_AO_TRABALHO", alias = "RETURN_TO_WORK")]
    ReturnToWork,
    #[serde(rename = "MUDANCA_DE_FUNCAO", alias = "CHANGE_OF_FUNCTION")]
    ChangeOfFunction,
    #[serde(rename = "DEMISSIONAL", alias = "DISMISSAL")]
    Dismissal,
}

impl ExamType {
    /// Code expected by the submission endpoint (`tipoExame`).
    pub const fn code(self) -> &'static str {
        match self {
            Self::Admissional => "ADMISSIONAL",
            Self::Periodic => "PERIODICO",
            Self::ReturnToWork => "RETORNO_AO_TRABALHO",
            Self::ChangeOfFunction => "MUDANCA_DE_FUNCAO",
            Self::Dismissal => "DEMISSIONAL",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Admissional => "Admissional",
            Self::Periodic => "Periodic",
            Self::ReturnToWork => "Return to work",
            Self::ChangeOfFunction => "Change of function",
            Self::Dismissal => "Dismissal",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// When an exam is due. Only periodic exams carry a periodicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExamSchedule {
    Admissional,
    Periodic { months: u32 },
    ReturnToWork,
    ChangeOfFunction,
    Dismissal,
}

impl ExamSchedule {
    /// Builds a schedule from the loose wire pair. A periodic exam without a positive
    /// periodicity is rejected; a periodicity on any other type is dropped.
    pub fn from_parts(
        exam_type: ExamType,
        periodicity_months: Option<u32>,
    ) -> Result<Self, ScheduleError> {
        let schedule = match exam_type {
            ExamType::Admissional => Self::Admissional,
            ExamType::Periodic => match periodicity_months {
                Some(months) if months > 0 => Self::Periodic { months },
                _ => return Err(ScheduleError::MissingPeriodicity),
            },
            ExamType::ReturnToWork => Self::ReturnToWork,
            ExamType::ChangeOfFunction => Self::ChangeOfFunction,
            ExamType::Dismissal => Self::Dismissal,
        };
        Ok(schedule)
    }

    pub const fn exam_type(self) -> ExamType {
        match self {
            Self::Admissional => ExamType::Admissional,
            Self::Periodic { .. } => ExamType::Periodic,
            Self::ReturnToWork => ExamType::ReturnToWork,
            Self::ChangeOfFunction => ExamType::ChangeOfFunction,
            Self::Dismissal => ExamType::Dismissal,
        }
    }

    pub const fn periodicity_months(self) -> Option<u32> {
        match self {
            Self::Periodic { months } => Some(months),
            _ => None,
        }
    }
}

impl Serialize for ExamSchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("examType", &self.exam_type())?;
        map.serialize_entry("periodicityMonths", &self.periodicity_months())?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("periodic exams require a positive periodicityMonths")]
    MissingPeriodicity,
}
