use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::workflows::exposure::catalog::{
    AgentCatalogRef, AgentId, ExamCatalogRef, ExamId, ExamSchedule, FunctionId, RiskCatalogRef,
    RiskGroup, RiskId, SectorId,
};
use crate::workflows::exposure::domain::{
    AgentAssociation, ExamAssociation, JobFunction, RiskAssociation, Sector, SectorRef,
};
use crate::workflows::exposure::resolver::{FunctionSource, ResolverSettings, SourceError};

pub(super) const NOISE: u64 = 1;
pub(super) const DUST: u64 = 2;
pub(super) const POSTURE: u64 = 3;
pub(super) const AUDIOMETRY: u64 = 7;
pub(super) const SPIROMETRY: u64 = 8;
pub(super) const PRODUCTION: u64 = 10;
pub(super) const ADMIN: u64 = 20;

pub(super) fn risk(id: u64, group: RiskGroup, description: &str) -> RiskAssociation {
    RiskAssociation {
        id: 1000 + id,
        risk_catalog: RiskCatalogRef {
            id: RiskId(id),
            group,
            description: description.to_string(),
        },
    }
}

pub(super) fn noise() -> RiskAssociation {
    risk(NOISE, RiskGroup::Physical, "Continuous noise")
}

pub(super) fn agent(id: u64, esocial_code: &str) -> AgentAssociation {
    AgentAssociation {
        id: 2000 + id,
        agent_catalog: AgentCatalogRef {
            id: AgentId(id),
            esocial_code: esocial_code.to_string(),
            description: format!("Agent {esocial_code}"),
        },
    }
}

pub(super) fn exam(id: u64, name: &str, schedule: ExamSchedule) -> ExamAssociation {
    ExamAssociation {
        id: 3000 + id,
        exam_catalog: ExamCatalogRef {
            id: ExamId(id),
            code: format!("{id:04}"),
            name: name.to_string(),
        },
        schedule,
    }
}

pub(super) fn audiometry(months: u32) -> ExamAssociation {
    exam(AUDIOMETRY, "Audiometry", ExamSchedule::Periodic { months })
}

pub(super) fn function(
    id: u64,
    name: &str,
    sector: u64,
    risks: Vec<RiskAssociation>,
    exams: Vec<ExamAssociation>,
) -> JobFunction {
    JobFunction {
        id: FunctionId(id),
        name: name.to_string(),
        sector_id: SectorId(sector),
        sector_name: None,
        risks,
        agents: Vec::new(),
        exams,
    }
}

pub(super) fn sector_ref(id: u64, name: &str) -> SectorRef {
    SectorRef {
        id: SectorId(id),
        name: name.to_string(),
    }
}

/// "Production" owns F1 (noise, periodic audiometry); "Admin" owns F2 (audiometry only).
pub(super) fn production_and_admin() -> (Sector, Sector) {
    let production = Sector {
        id: SectorId(PRODUCTION),
        name: "Production".to_string(),
        functions: vec![function(1, "F1", PRODUCTION, vec![noise()], vec![audiometry(12)])],
    };
    let admin = Sector {
        id: SectorId(ADMIN),
        name: "Admin".to_string(),
        functions: vec![function(2, "F2", ADMIN, Vec::new(), vec![audiometry(12)])],
    };
    (production, admin)
}

pub(super) fn settings() -> ResolverSettings {
    ResolverSettings {
        request_timeout: Duration::from_secs(2),
        max_concurrent_requests: 8,
    }
}

#[derive(Clone)]
enum Reply {
    Body(Value),
    Fail(SourceError),
}

/// Scriptable in-memory backend.
#[derive(Default)]
pub(super) struct MemorySource {
    sectors: HashMap<SectorId, Reply>,
    functions: HashMap<FunctionId, Value>,
    delays: HashMap<SectorId, Duration>,
    calls: Mutex<Vec<SectorId>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemorySource {
    pub(super) fn with_sector(mut self, sector: &Sector) -> Self {
        let body = serde_json::to_value(&sector.functions).expect("functions serialize");
        self.sectors.insert(sector.id, Reply::Body(body));
        for function in &sector.functions {
            self.functions.insert(
                function.id,
                serde_json::to_value(function).expect("function serializes"),
            );
        }
        self
    }

    pub(super) fn with_page(mut self, sector: &Sector) -> Self {
        let content = serde_json::to_value(&sector.functions).expect("functions serialize");
        let body = json!({ "content": content, "totalElements": sector.functions.len() });
        self.sectors.insert(sector.id, Reply::Body(body));
        self
    }

    pub(super) fn with_body(mut self, sector: u64, body: Value) -> Self {
        self.sectors.insert(SectorId(sector), Reply::Body(body));
        self
    }

    pub(super) fn with_function(mut self, function: &JobFunction) -> Self {
        self.functions.insert(
            function.id,
            serde_json::to_value(function).expect("function serializes"),
        );
        self
    }

    pub(super) fn with_function_body(mut self, id: u64, body: Value) -> Self {
        self.functions.insert(FunctionId(id), body);
        self
    }

    pub(super) fn failing(mut self, sector: u64, error: SourceError) -> Self {
        self.sectors.insert(SectorId(sector), Reply::Fail(error));
        self
    }

    pub(super) fn delayed(mut self, sector: u64, delay: Duration) -> Self {
        self.delays.insert(SectorId(sector), delay);
        self
    }

    pub(super) fn calls(&self) -> Vec<SectorId> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FunctionSource for MemorySource {
    async fn functions_by_sector(&self, sector: SectorId) -> Result<Value, SourceError> {
        self.calls.lock().expect("calls mutex poisoned").push(sector);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&sector) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.sectors.get(&sector).cloned() {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Fail(error)) => Err(error),
            None => Ok(json!([])),
        }
    }

    async fn function_by_id(&self, function: FunctionId) -> Result<Value, SourceError> {
        self.functions
            .get(&function)
            .cloned()
            .ok_or(SourceError::NotFound)
    }
}
