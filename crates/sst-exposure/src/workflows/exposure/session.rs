use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::aggregation::{aggregate, ExposureAggregate};
use super::catalog::FunctionId;
use super::domain::{JobFunction, SectorRef};
use super::rebuild::{rebuild, FunctionAssociationRecord};
use super::resolver::{FunctionResolver, FunctionSource, ResolutionWarning, ResolveError};

/// Immutable result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureSnapshot {
    pub generation: u64,
    pub selection: Vec<SectorRef>,
    pub functions: Vec<JobFunction>,
    pub aggregate: ExposureAggregate,
    pub records: Vec<FunctionAssociationRecord>,
    pub warnings: Vec<ResolutionWarning>,
    pub computed_at: DateTime<Utc>,
}

impl ExposureSnapshot {
    pub fn empty() -> Self {
        Self::compute(0, Vec::new(), Vec::new(), Vec::new())
    }

    pub fn compute(
        generation: u64,
        selection: Vec<SectorRef>,
        functions: Vec<JobFunction>,
        warnings: Vec<ResolutionWarning>,
    ) -> Self {
        let aggregate = aggregate(&functions);
        let records = rebuild(&aggregate.risks, &aggregate.exams);
        Self {
            generation,
            selection,
            functions,
            aggregate,
            records,
            warnings,
            computed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SelectionOutcome {
    Committed(Arc<ExposureSnapshot>),
    /// A newer selection started while this one was resolving; its result was dropped.
    Superseded { generation: u64, latest: u64 },
}

impl SelectionOutcome {
    pub fn snapshot(&self) -> Option<&Arc<ExposureSnapshot>> {
        match self {
            Self::Committed(snapshot) => Some(snapshot),
            Self::Superseded { .. } => None,
        }
    }
}

/// Owns the current selection's snapshot and discards results of stale selections.
pub struct ExposureSession<S: ?Sized> {
    resolver: FunctionResolver<S>,
    generation: AtomicU64,
    current: RwLock<Arc<ExposureSnapshot>>,
}

impl<S> ExposureSession<S>
where
    S: FunctionSource + ?Sized,
{
    pub fn new(resolver: FunctionResolver<S>) -> Self {
        Self {
            resolver,
            generation: AtomicU64::new(0),
            current: RwLock::new(Arc::new(ExposureSnapshot::empty())),
        }
    }

    pub fn snapshot(&self) -> Arc<ExposureSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replaces the selection and recomputes from scratch.
    pub async fn select(&self, sectors: Vec<SectorRef>) -> SelectionOutcome {
        let generation = self.begin();
        let resolution = self.resolver.resolve(&sectors).await;
        let warnings = resolution.warnings();
        let snapshot =
            ExposureSnapshot::compute(generation, sectors, resolution.functions, warnings);
        self.commit(snapshot)
    }

    /// Re-fetches one function and recomputes the committed selection with it. A function
    /// not yet part of the snapshot is added as an individual selection. While a newer
    /// selection is still resolving the refresh is not applied; the outcome is
    /// `Superseded` carrying the committed and the latest generation.
    pub async fn refresh_function(
        &self,
        function: FunctionId,
    ) -> Result<SelectionOutcome, ResolveError> {
        let mut refreshed = self.resolver.resolve_function(function).await?;

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let base = Arc::clone(&guard);
        let generation = base.generation + 1;
        if let Err(latest) = self.generation.compare_exchange(
            base.generation,
            generation,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            debug!(
                function_id = %function,
                committed = base.generation,
                latest,
                "refresh skipped while a newer selection resolves"
            );
            return Ok(SelectionOutcome::Superseded {
                generation: base.generation,
                latest,
            });
        }

        let mut functions = base.functions.clone();
        match functions.iter_mut().find(|existing| existing.id == function) {
            Some(existing) => {
                if refreshed.sector_name.is_none() {
                    refreshed.sector_name = existing.sector_name.take();
                }
                *existing = refreshed;
            }
            None => functions.push(refreshed),
        }

        let snapshot = Arc::new(ExposureSnapshot::compute(
            generation,
            base.selection.clone(),
            functions,
            base.warnings.clone(),
        ));
        announce(&snapshot);
        *guard = Arc::clone(&snapshot);
        Ok(SelectionOutcome::Committed(snapshot))
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(&self, snapshot: ExposureSnapshot) -> SelectionOutcome {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let latest = self.generation.load(Ordering::SeqCst);
        if latest != snapshot.generation {
            debug!(
                generation = snapshot.generation,
                latest, "discarding stale aggregation pass"
            );
            return SelectionOutcome::Superseded {
                generation: snapshot.generation,
                latest,
            };
        }

        announce(&snapshot);
        let snapshot = Arc::new(snapshot);
        *guard = Arc::clone(&snapshot);
        SelectionOutcome::Committed(snapshot)
    }
}

fn announce(snapshot: &ExposureSnapshot) {
    info!(
        generation = snapshot.generation,
        functions = snapshot.functions.len(),
        exams = snapshot.aggregate.exams.len(),
        risks = snapshot.aggregate.risks.len(),
        agents = snapshot.aggregate.agents.len(),
        "exposure snapshot committed"
    );
}
