use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use sst_exposure::error::AppError;
use sst_exposure::workflows::exposure::{
    FunctionId, FunctionSource, Sector, SectorId, SectorRef, SourceError,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Offline backend answering from a list of sectors, used by the CLI commands.
#[derive(Debug, Clone, Default)]
pub(crate) struct FixtureFunctionSource {
    sectors: Vec<Sector>,
}

impl FixtureFunctionSource {
    pub(crate) fn new(sectors: Vec<Sector>) -> Self {
        Self { sectors }
    }

    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub(crate) fn from_json(raw: &str) -> Result<Self, AppError> {
        let sectors: Vec<Sector> = serde_json::from_str(raw)?;
        Ok(Self::new(sectors))
    }

    /// Maps requested ids to selections, naming unknown sectors by id so they still
    /// surface in failure notices.
    pub(crate) fn selection(&self, ids: &[u64]) -> Vec<SectorRef> {
        ids.iter()
            .map(|&id| match self.sector(SectorId(id)) {
                Some(sector) => sector.selection(),
                None => SectorRef {
                    id: SectorId(id),
                    name: format!("Sector {id}"),
                },
            })
            .collect()
    }

    pub(crate) fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    fn sector(&self, id: SectorId) -> Option<&Sector> {
        self.sectors.iter().find(|sector| sector.id == id)
    }
}

#[async_trait]
impl FunctionSource for FixtureFunctionSource {
    async fn functions_by_sector(&self, sector: SectorId) -> Result<Value, SourceError> {
        let sector = self.sector(sector).ok_or(SourceError::Status {
            status: 404,
            message: format!("sector {sector} is not part of the fixture"),
        })?;
        serde_json::to_value(&sector.functions)
            .map_err(|err| SourceError::Transport(err.to_string()))
    }

    async fn function_by_id(&self, function: FunctionId) -> Result<Value, SourceError> {
        let found = self
            .sectors
            .iter()
            .flat_map(|sector| sector.functions.iter())
            .find(|candidate| candidate.id == function)
            .ok_or(SourceError::NotFound)?;
        serde_json::to_value(found).map_err(|err| SourceError::Transport(err.to_string()))
    }
}
