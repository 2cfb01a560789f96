//! Occupational exposure aggregation shared by the PGR, LTCAT, LTIP and PCMSO builders.
//!
//! Selected sectors are resolved into job functions, folded into deduplicated exam, risk
//! and noxious-agent collections, and flattened back into per-function association
//! records for submission. Every pass recomputes from scratch.

pub mod aggregation;
pub mod catalog;
pub mod domain;
pub mod http;
pub mod payload;
pub mod rebuild;
pub mod resolver;
pub mod router;
pub mod service;
pub mod session;
pub mod submission;

#[cfg(test)]
mod tests;

pub use aggregation::{
    aggregate, AggregatedAgent, AggregatedExam, AggregatedRisk, ExamKey, ExposureAggregate,
    PeriodicityConflict,
};
pub use catalog::{
    AgentCatalogRef, AgentId, ExamCatalogRef, ExamId, ExamSchedule, ExamType, FunctionId,
    RiskCatalogRef, RiskGroup, RiskId, ScheduleError, SectorId,
};
pub use domain::{
    AgentAssociation, ExamAssociation, FunctionRef, JobFunction, RiskAssociation, Sector,
    SectorRef,
};
pub use http::HttpFunctionSource;
pub use payload::{
    decode_function_listing, DecodedListing, MalformedResponseShape, RejectedFunction,
};
pub use rebuild::{invert_risks, rebuild, FunctionAssociationRecord};
pub use resolver::{
    FunctionResolver, FunctionSource, MalformedSector, PartialResolutionFailure, Resolution,
    ResolutionWarning, ResolveError, ResolverSettings, SectorFailure, SkippedFunction,
    SourceError,
};
pub use router::exposure_router;
pub use service::{AggregationReport, ExposureService};
pub use session::{ExposureSession, ExposureSnapshot, SelectionOutcome};
pub use submission::{
    AgentSubmission, DocumentKind, DocumentPayload, ExamSubmission, RiskLink, RiskSubmission,
    UnknownDocumentKind,
};
