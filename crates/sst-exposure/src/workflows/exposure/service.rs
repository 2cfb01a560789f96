use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::aggregation::{aggregate, ExposureAggregate};
use super::catalog::FunctionId;
use super::domain::{JobFunction, SectorRef};
use super::rebuild::{rebuild, FunctionAssociationRecord};
use super::resolver::{
    FunctionResolver, FunctionSource, ResolutionWarning, ResolveError, ResolverSettings,
};
use super::session::{ExposureSession, ExposureSnapshot, SelectionOutcome};
use super::submission::{DocumentKind, DocumentPayload};

/// Everything a document builder needs from one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReport {
    pub document: DocumentKind,
    pub functions: Vec<JobFunction>,
    pub aggregate: ExposureAggregate,
    pub records: Vec<FunctionAssociationRecord>,
    pub payload: DocumentPayload,
    pub warnings: Vec<ResolutionWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Composes the resolver, the pure aggregation stages and the shared selection session.
pub struct ExposureService<S: ?Sized> {
    resolver: FunctionResolver<S>,
    session: ExposureSession<S>,
}

impl<S> ExposureService<S>
where
    S: FunctionSource + ?Sized,
{
    pub fn new(source: Arc<S>, settings: ResolverSettings) -> Self {
        let resolver = FunctionResolver::new(Arc::clone(&source), settings);
        let session = ExposureSession::new(FunctionResolver::new(source, settings));
        Self { resolver, session }
    }

    /// One-shot aggregation for a document, independent of the shared session.
    pub async fn aggregate_sectors(
        &self,
        document: DocumentKind,
        sectors: &[SectorRef],
    ) -> AggregationReport {
        let resolution = self.resolver.resolve(sectors).await;
        let notice = resolution.partial_failure().map(|failure| failure.to_string());
        let warnings = resolution.warnings();
        let functions = resolution.functions;

        let aggregate = aggregate(&functions);
        let records = rebuild(&aggregate.risks, &aggregate.exams);
        let payload = DocumentPayload::build(document, &aggregate);

        info!(
            %document,
            sectors = sectors.len(),
            records = records.len(),
            warnings = warnings.len(),
            "document aggregation built"
        );

        AggregationReport {
            document,
            functions,
            aggregate,
            records,
            payload,
            warnings,
            notice,
        }
    }

    pub async fn function(&self, function: FunctionId) -> Result<JobFunction, ResolveError> {
        self.resolver.resolve_function(function).await
    }

    pub async fn select(&self, sectors: Vec<SectorRef>) -> SelectionOutcome {
        self.session.select(sectors).await
    }

    pub async fn refresh_function(
        &self,
        function: FunctionId,
    ) -> Result<SelectionOutcome, ResolveError> {
        self.session.refresh_function(function).await
    }

    pub fn snapshot(&self) -> Arc<ExposureSnapshot> {
        self.session.snapshot()
    }
}
