use super::common::*;
use crate::workflows::exposure::catalog::{FunctionId, SectorId};
use crate::workflows::exposure::domain::Sector;
use crate::workflows::exposure::resolver::{
    FunctionResolver, ResolutionWarning, ResolveError, ResolverSettings, SourceError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn resolver(source: MemorySource) -> (Arc<MemorySource>, FunctionResolver<MemorySource>) {
    resolver_with(source, settings())
}

fn resolver_with(
    source: MemorySource,
    settings: ResolverSettings,
) -> (Arc<MemorySource>, FunctionResolver<MemorySource>) {
    let source = Arc::new(source);
    (Arc::clone(&source), FunctionResolver::new(source, settings))
}

fn function_ids(functions: &[crate::workflows::exposure::domain::JobFunction]) -> Vec<u64> {
    functions.iter().map(|f| f.id.0).collect()
}

#[tokio::test]
async fn failed_sector_does_not_abort_resolution() {
    let (production, _) = production_and_admin();
    let (_, resolver) = resolver(MemorySource::default().with_sector(&production).failing(
        ADMIN,
        SourceError::Status {
            status: 500,
            message: "boom".to_string(),
        },
    ));

    let resolution = resolver
        .resolve(&[sector_ref(PRODUCTION, "Production"), sector_ref(ADMIN, "Admin")])
        .await;

    assert_eq!(function_ids(&resolution.functions), vec![1]);
    assert_eq!(resolution.failures.len(), 1);
    assert_eq!(resolution.failures[0].sector.id, SectorId(ADMIN));
    assert_eq!(resolution.resolved, vec![SectorId(PRODUCTION)]);
    let failure = resolution.partial_failure().expect("partial failure reported");
    assert_eq!(failure.sectors.len(), 1);
    assert!(failure.to_string().contains("Admin"));
}

#[tokio::test]
async fn duplicate_sector_ids_are_fetched_once() {
    let (production, _) = production_and_admin();
    let (source, resolver) = resolver(MemorySource::default().with_sector(&production));

    let resolution = resolver
        .resolve(&[
            sector_ref(PRODUCTION, "Production"),
            sector_ref(PRODUCTION, "Production"),
        ])
        .await;

    assert_eq!(source.calls(), vec![SectorId(PRODUCTION)]);
    assert_eq!(resolution.functions.len(), 1);
    assert!(resolution.partial_failure().is_none());
}

#[tokio::test]
async fn functions_are_tagged_and_deduplicated_keeping_first() {
    let shared = function(1, "Shared", PRODUCTION, vec![noise()], Vec::new());
    let production = Sector {
        id: SectorId(PRODUCTION),
        name: "Production".to_string(),
        functions: vec![shared.clone()],
    };
    let admin = Sector {
        id: SectorId(ADMIN),
        name: "Admin".to_string(),
        functions: vec![shared, function(2, "Clerk", ADMIN, Vec::new(), Vec::new())],
    };
    let (_, resolver) = resolver(
        MemorySource::default()
            .with_sector(&production)
            .with_sector(&admin),
    );

    let resolution = resolver
        .resolve(&[sector_ref(PRODUCTION, "Production"), sector_ref(ADMIN, "Admin")])
        .await;

    assert_eq!(function_ids(&resolution.functions), vec![1, 2]);
    assert_eq!(
        resolution.functions[0].sector_name.as_deref(),
        Some("Production")
    );
    assert_eq!(resolution.functions[1].sector_name.as_deref(), Some("Admin"));
}

#[tokio::test]
async fn malformed_listing_counts_as_empty_with_warning() {
    let (production, _) = production_and_admin();
    let (_, resolver) = resolver(
        MemorySource::default()
            .with_sector(&production)
            .with_body(ADMIN, json!({ "items": [] })),
    );

    let resolution = resolver
        .resolve(&[sector_ref(PRODUCTION, "Production"), sector_ref(ADMIN, "Admin")])
        .await;

    assert_eq!(function_ids(&resolution.functions), vec![1]);
    assert!(resolution.failures.is_empty());
    assert_eq!(resolution.malformed.len(), 1);
    assert_eq!(
        resolution.warnings(),
        vec![ResolutionWarning::MalformedResponse {
            sector_id: SectorId(ADMIN),
            sector_name: "Admin".to_string(),
            shape: "object without content",
        }]
    );
}

#[tokio::test]
async fn undecodable_function_is_skipped_without_dropping_its_sector() {
    let broken = json!({
        "id": 5,
        "name": "F5",
        "sectorId": PRODUCTION,
        "exams": [{
            "id": 3050,
            "examCatalog": { "id": AUDIOMETRY, "code": "0007", "name": "Audiometry" },
            "examType": "PERIODICO"
        }]
    });
    let valid = serde_json::to_value(function(
        1,
        "F1",
        PRODUCTION,
        vec![noise()],
        vec![audiometry(12)],
    ))
    .expect("function serializes");
    let (_, resolver) =
        resolver(MemorySource::default().with_body(PRODUCTION, json!([valid, broken])));

    let resolution = resolver
        .resolve(&[sector_ref(PRODUCTION, "Production")])
        .await;

    assert_eq!(function_ids(&resolution.functions), vec![1]);
    assert_eq!(resolution.resolved, vec![SectorId(PRODUCTION)]);
    assert!(resolution.malformed.is_empty());
    assert!(resolution.failures.is_empty());
    assert_eq!(resolution.skipped.len(), 1);
    assert_eq!(resolution.skipped[0].function_id, Some(FunctionId(5)));

    let warnings = resolution.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0],
        ResolutionWarning::FunctionSkipped {
            sector_id: SectorId(PRODUCTION),
            function_id: Some(FunctionId(5)),
            ..
        }
    ));
}

#[tokio::test]
async fn page_envelopes_are_unwrapped() {
    let (_, admin) = production_and_admin();
    let (_, resolver) = resolver(MemorySource::default().with_page(&admin));

    let resolution = resolver.resolve(&[sector_ref(ADMIN, "Admin")]).await;

    assert_eq!(function_ids(&resolution.functions), vec![2]);
}

#[tokio::test]
async fn selection_order_wins_over_arrival_order() {
    let (production, admin) = production_and_admin();
    let (_, resolver) = resolver(
        MemorySource::default()
            .with_sector(&production)
            .with_sector(&admin)
            .delayed(PRODUCTION, Duration::from_millis(40)),
    );

    let resolution = resolver
        .resolve(&[sector_ref(PRODUCTION, "Production"), sector_ref(ADMIN, "Admin")])
        .await;

    assert_eq!(function_ids(&resolution.functions), vec![1, 2]);
    assert_eq!(
        resolution.resolved,
        vec![SectorId(PRODUCTION), SectorId(ADMIN)]
    );
}

#[tokio::test]
async fn sectors_are_fetched_concurrently() {
    let (production, admin) = production_and_admin();
    let (source, resolver) = resolver(
        MemorySource::default()
            .with_sector(&production)
            .with_sector(&admin)
            .delayed(PRODUCTION, Duration::from_millis(30))
            .delayed(ADMIN, Duration::from_millis(30)),
    );

    resolver
        .resolve(&[sector_ref(PRODUCTION, "Production"), sector_ref(ADMIN, "Admin")])
        .await;

    assert_eq!(source.max_in_flight(), 2);
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let (production, admin) = production_and_admin();
    let (source, resolver) = resolver_with(
        MemorySource::default()
            .with_sector(&production)
            .with_sector(&admin)
            .delayed(PRODUCTION, Duration::from_millis(10))
            .delayed(ADMIN, Duration::from_millis(10)),
        ResolverSettings {
            request_timeout: Duration::from_secs(2),
            max_concurrent_requests: 1,
        },
    );

    let resolution = resolver
        .resolve(&[sector_ref(PRODUCTION, "Production"), sector_ref(ADMIN, "Admin")])
        .await;

    assert_eq!(source.max_in_flight(), 1);
    assert_eq!(resolution.functions.len(), 2);
}

#[tokio::test]
async fn slow_sector_times_out_as_failure() {
    let (production, admin) = production_and_admin();
    let (_, resolver) = resolver_with(
        MemorySource::default()
            .with_sector(&production)
            .with_sector(&admin)
            .delayed(ADMIN, Duration::from_millis(500)),
        ResolverSettings {
            request_timeout: Duration::from_millis(50),
            max_concurrent_requests: 4,
        },
    );

    let resolution = resolver
        .resolve(&[sector_ref(PRODUCTION, "Production"), sector_ref(ADMIN, "Admin")])
        .await;

    assert_eq!(function_ids(&resolution.functions), vec![1]);
    assert_eq!(resolution.failures.len(), 1);
    assert!(resolution.failures[0].reason.contains("timed out"));
}

#[tokio::test]
async fn empty_selection_resolves_to_nothing() {
    let (source, resolver) = resolver(MemorySource::default());

    let resolution = resolver.resolve(&[]).await;

    assert!(resolution.functions.is_empty());
    assert!(resolution.warnings().is_empty());
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn resolve_function_decodes_single_function() {
    let welder = function(9, "Welder", PRODUCTION, vec![noise()], vec![audiometry(6)]);
    let (_, resolver) = resolver(MemorySource::default().with_function(&welder));

    let resolved = resolver
        .resolve_function(FunctionId(9))
        .await
        .expect("function resolves");

    assert_eq!(resolved, welder);
}

#[tokio::test]
async fn resolve_function_reports_missing_and_invalid_payloads() {
    let (_, resolver) = resolver(
        MemorySource::default().with_function_body(4, json!({ "id": 4, "name": 12 })),
    );

    match resolver.resolve_function(FunctionId(3)).await {
        Err(ResolveError::Source {
            function,
            source: SourceError::NotFound,
        }) => assert_eq!(function, FunctionId(3)),
        other => panic!("expected not found, got {other:?}"),
    }

    match resolver.resolve_function(FunctionId(4)).await {
        Err(ResolveError::Decode { function, .. }) => assert_eq!(function, FunctionId(4)),
        other => panic!("expected decode error, got {other:?}"),
    }
}
