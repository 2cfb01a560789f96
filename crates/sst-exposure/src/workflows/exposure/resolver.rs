use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::catalog::{FunctionId, SectorId};
use super::domain::{JobFunction, SectorRef};
use super::payload::{decode_function, decode_function_listing};

/// Read side of the REST collaborator. Bodies are returned undecoded so the resolver can
/// apply its shape tolerance uniformly across adapters.
#[async_trait]
pub trait FunctionSource: Send + Sync {
    async fn functions_by_sector(&self, sector: SectorId) -> Result<Value, SourceError>;
    async fn function_by_id(&self, function: FunctionId) -> Result<Value, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("resource not found")]
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("could not retrieve function {function}: {source}")]
    Source {
        function: FunctionId,
        #[source]
        source: SourceError,
    },
    #[error("function {function} payload is invalid: {source}")]
    Decode {
        function: FunctionId,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_concurrent_requests: 8,
        }
    }
}

/// A sector whose retrieval failed outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorFailure {
    pub sector: SectorRef,
    pub reason: String,
}

/// A sector that answered with a body in no recognized shape; counted as zero functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedSector {
    pub sector: SectorRef,
    pub shape: &'static str,
}

/// A function dropped from an otherwise readable sector listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFunction {
    pub sector: SectorRef,
    pub index: usize,
    pub function_id: Option<FunctionId>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionWarning {
    SectorFailed {
        sector_id: SectorId,
        sector_name: String,
        reason: String,
    },
    MalformedResponse {
        sector_id: SectorId,
        sector_name: String,
        shape: &'static str,
    },
    FunctionSkipped {
        sector_id: SectorId,
        sector_name: String,
        function_id: Option<FunctionId>,
        reason: String,
    },
}

/// Non-fatal notice listing the sectors that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResolutionFailure {
    pub sectors: Vec<SectorRef>,
}

impl fmt::Display for PartialResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sectors.iter().map(|s| s.name.as_str()).collect();
        write!(
            f,
            "{} sector(s) could not be resolved: {}",
            self.sectors.len(),
            names.join(", ")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub functions: Vec<JobFunction>,
    pub resolved: Vec<SectorId>,
    pub failures: Vec<SectorFailure>,
    pub malformed: Vec<MalformedSector>,
    pub skipped: Vec<SkippedFunction>,
}

impl Resolution {
    pub fn partial_failure(&self) -> Option<PartialResolutionFailure> {
        if self.failures.is_empty() {
            return None;
        }
        Some(PartialResolutionFailure {
            sectors: self.failures.iter().map(|f| f.sector.clone()).collect(),
        })
    }

    pub fn warnings(&self) -> Vec<ResolutionWarning> {
        let failed = self.failures.iter().map(|f| ResolutionWarning::SectorFailed {
            sector_id: f.sector.id,
            sector_name: f.sector.name.clone(),
            reason: f.reason.clone(),
        });
        let malformed = self
            .malformed
            .iter()
            .map(|m| ResolutionWarning::MalformedResponse {
                sector_id: m.sector.id,
                sector_name: m.sector.name.clone(),
                shape: m.shape,
            });
        let skipped = self
            .skipped
            .iter()
            .map(|s| ResolutionWarning::FunctionSkipped {
                sector_id: s.sector.id,
                sector_name: s.sector.name.clone(),
                function_id: s.function_id,
                reason: s.reason.clone(),
            });
        failed.chain(malformed).chain(skipped).collect()
    }
}

/// Resolves selected sectors into the union of their job functions.
pub struct FunctionResolver<S: ?Sized> {
    source: Arc<S>,
    settings: ResolverSettings,
}

impl<S> FunctionResolver<S>
where
    S: FunctionSource + ?Sized,
{
    pub fn new(source: Arc<S>, settings: ResolverSettings) -> Self {
        Self { source, settings }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Fetches every distinct sector concurrently. Outcomes are folded in selection
    /// order, never arrival order, so the aggregation tie-break stays deterministic.
    pub async fn resolve(&self, sectors: &[SectorRef]) -> Resolution {
        let selection = distinct_sectors(sectors);
        let timeout = self.settings.request_timeout;
        let source = &self.source;

        let outcomes: Vec<(SectorRef, Result<Value, SourceError>)> =
            stream::iter(selection.into_iter().map(|sector| async move {
                let outcome =
                    match tokio::time::timeout(timeout, source.functions_by_sector(sector.id))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(SourceError::Timeout(timeout)),
                    };
                (sector, outcome)
            }))
            .buffered(self.settings.max_concurrent_requests.max(1))
            .collect()
            .await;

        let mut resolution = Resolution::default();
        let mut seen: HashSet<FunctionId> = HashSet::new();

        for (sector, outcome) in outcomes {
            let body = match outcome {
                Ok(body) => body,
                Err(error) => {
                    warn!(
                        sector_id = %sector.id,
                        sector = %sector.name,
                        %error,
                        "sector resolution failed"
                    );
                    resolution.failures.push(SectorFailure {
                        sector,
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            let listing = match decode_function_listing(body) {
                Ok(listing) => listing,
                Err(error) => {
                    warn!(
                        sector_id = %sector.id,
                        sector = %sector.name,
                        %error,
                        "treating sector as empty"
                    );
                    resolution.malformed.push(MalformedSector {
                        sector,
                        shape: error.shape,
                    });
                    continue;
                }
            };

            for rejected in listing.rejected {
                warn!(
                    sector_id = %sector.id,
                    index = rejected.index,
                    function_id = ?rejected.function_id,
                    reason = %rejected.reason,
                    "skipping undecodable function"
                );
                resolution.skipped.push(SkippedFunction {
                    sector: sector.clone(),
                    index: rejected.index,
                    function_id: rejected.function_id,
                    reason: rejected.reason,
                });
            }

            for mut function in listing.functions {
                if !seen.insert(function.id) {
                    debug!(
                        function_id = %function.id,
                        sector_id = %sector.id,
                        "duplicate function skipped"
                    );
                    continue;
                }
                function.sector_name = Some(sector.name.clone());
                resolution.functions.push(function);
            }
            resolution.resolved.push(sector.id);
        }

        info!(
            resolved = resolution.resolved.len(),
            failed = resolution.failures.len(),
            malformed = resolution.malformed.len(),
            skipped = resolution.skipped.len(),
            functions = resolution.functions.len(),
            "sector resolution finished"
        );

        resolution
    }

    /// Refreshes a single function outside the sector-driven flow.
    pub async fn resolve_function(
        &self,
        function: FunctionId,
    ) -> Result<JobFunction, ResolveError> {
        let timeout = self.settings.request_timeout;
        let body = match tokio::time::timeout(timeout, self.source.function_by_id(function)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(SourceError::Timeout(timeout)),
        }
        .map_err(|source| ResolveError::Source { function, source })?;

        decode_function(body).map_err(|source| ResolveError::Decode { function, source })
    }
}

fn distinct_sectors(sectors: &[SectorRef]) -> Vec<SectorRef> {
    let mut seen = HashSet::new();
    sectors
        .iter()
        .filter(|sector| seen.insert(sector.id))
        .cloned()
        .collect()
}
