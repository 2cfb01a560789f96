use crate::infra::FixtureFunctionSource;
use clap::{Args, ValueEnum};
use sst_exposure::config::TelemetryConfig;
use sst_exposure::error::AppError;
use sst_exposure::telemetry;
use sst_exposure::workflows::exposure::{
    AggregationReport, DocumentKind, ExamSchedule, ExposureService, FunctionAssociationRecord,
    ResolutionWarning, ResolverSettings, Sector, SelectionOutcome,
};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Args, Debug)]
pub(crate) struct AggregateArgs {
    /// JSON file holding the sectors (with their functions) to aggregate from.
    #[arg(long)]
    pub(crate) fixture: PathBuf,
    /// Sector id to include; repeat the flag to select several sectors.
    #[arg(long = "sector", required = true)]
    pub(crate) sectors: Vec<u64>,
    /// Document the aggregation is built for (pgr, ltcat, ltip or pcmso).
    #[arg(long, default_value = "pcmso")]
    pub(crate) document: DocumentKind,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
    /// Log filter for diagnostics written to stderr.
    #[arg(long, default_value = "warn")]
    pub(crate) log_level: String,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Document the demo aggregation is built for.
    #[arg(long, default_value = "pcmso")]
    pub(crate) document: DocumentKind,
    /// Skip the shared-session portion of the demo.
    #[arg(long)]
    pub(crate) skip_session: bool,
}

pub(crate) async fn run_aggregate(args: AggregateArgs) -> Result<(), AppError> {
    let AggregateArgs {
        fixture,
        sectors,
        document,
        format,
        log_level,
    } = args;

    telemetry::init_cli(&TelemetryConfig { log_level })?;

    let source = FixtureFunctionSource::from_path(&fixture)?;
    let selection = source.selection(&sectors);
    let service = ExposureService::new(Arc::new(source), ResolverSettings::default());
    let report = service.aggregate_sectors(document, &selection).await;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => out.write_all(render_report(&report).as_bytes())?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &report).map_err(std::io::Error::from)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_records_csv(&report, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        document,
        skip_session,
    } = args;

    let source = Arc::new(FixtureFunctionSource::new(demo_sectors()?));
    let selection: Vec<_> = source.sectors().iter().map(Sector::selection).collect();
    let service = ExposureService::new(Arc::clone(&source), ResolverSettings::default());

    println!("Occupational exposure aggregation demo");
    let report = service.aggregate_sectors(document, &selection).await;
    print!("{}", render_report(&report));

    if skip_session {
        return Ok(());
    }

    println!("\nShared session: select every sector, then drop the first one");
    if let SelectionOutcome::Committed(snapshot) = service.select(selection.clone()).await {
        println!(
            "- generation {} | {} functions | {} exams",
            snapshot.generation,
            snapshot.functions.len(),
            snapshot.aggregate.exams.len()
        );
    }

    let remaining = selection.into_iter().skip(1).collect();
    match service.select(remaining).await {
        SelectionOutcome::Committed(snapshot) => {
            println!(
                "- generation {} | {} functions | {} exams",
                snapshot.generation,
                snapshot.functions.len(),
                snapshot.aggregate.exams.len()
            );
            for record in &snapshot.records {
                println!("  - {}", describe_record(record));
            }
        }
        SelectionOutcome::Superseded { generation, latest } => {
            println!("- generation {generation} superseded by {latest}");
        }
    }

    Ok(())
}

pub(crate) fn render_report(report: &AggregationReport) -> String {
    let mut lines = vec![format!(
        "{} aggregation: {} functions | {} exams | {} risks | {} agents",
        report.document,
        report.functions.len(),
        report.aggregate.exams.len(),
        report.aggregate.risks.len(),
        report.aggregate.agents.len()
    )];

    if let Some(notice) = &report.notice {
        lines.push(format!("Notice: {notice}"));
    }

    if !report.aggregate.exams.is_empty() {
        lines.push("\nExams".to_string());
        for exam in &report.aggregate.exams {
            lines.push(format!(
                "- {} | {} | {}",
                exam.exam.name,
                schedule_label(&exam.schedule),
                function_names(exam.functions.iter().map(|f| f.name.as_str()))
            ));
        }
    }

    if !report.aggregate.risks.is_empty() {
        lines.push("\nRisks".to_string());
        for risk in &report.aggregate.risks {
            lines.push(format!(
                "- [{}] {} | {}",
                risk.risk.group.label(),
                risk.risk.description,
                function_names(risk.functions.iter().map(|f| f.name.as_str()))
            ));
        }
    }

    if !report.aggregate.agents.is_empty() {
        lines.push("\nNoxious agents".to_string());
        for agent in &report.aggregate.agents {
            lines.push(format!(
                "- {} {} | {}",
                agent.agent.esocial_code,
                agent.agent.description,
                function_names(agent.functions.iter().map(|f| f.name.as_str()))
            ));
        }
    }

    for conflict in &report.aggregate.conflicts {
        lines.push(format!(
            "Periodicity conflict on exam {} ({}): kept {:?}, ignored {:?} from function {}",
            conflict.exam_id,
            conflict.exam_type,
            conflict.kept_months,
            conflict.conflicting_months,
            conflict.function_id
        ));
    }

    for warning in &report.warnings {
        let line = match warning {
            ResolutionWarning::SectorFailed {
                sector_name, reason, ..
            } => format!("Warning: sector {sector_name} failed: {reason}"),
            ResolutionWarning::MalformedResponse {
                sector_name, shape, ..
            } => format!("Warning: sector {sector_name} answered with {shape}"),
            ResolutionWarning::FunctionSkipped {
                sector_name,
                function_id,
                reason,
                ..
            } => match function_id {
                Some(id) => {
                    format!("Warning: function {id} in sector {sector_name} skipped: {reason}")
                }
                None => format!("Warning: a function in sector {sector_name} skipped: {reason}"),
            },
        };
        lines.push(line);
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}

/// One CSV row per rebuilt function/exam association.
pub(crate) fn write_records_csv<W: Write>(
    report: &AggregationReport,
    writer: W,
) -> Result<(), AppError> {
    let functions_by_id: HashMap<_, _> = report
        .functions
        .iter()
        .map(|function| (function.id, function))
        .collect();
    let exam_names: HashMap<_, _> = report
        .aggregate
        .exams
        .iter()
        .map(|exam| (exam.key(), exam.exam.name.as_str()))
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "function_id",
        "function_name",
        "sector_name",
        "exam_id",
        "exam_name",
        "exam_type",
        "periodicity_months",
        "risk_ids",
    ])
    .map_err(std::io::Error::from)?;

    for record in &report.records {
        let function = functions_by_id.get(&record.function_id);
        let risk_ids: Vec<String> = record.risk_ids.iter().map(ToString::to_string).collect();
        csv.write_record([
            record.function_id.to_string(),
            function.map(|f| f.name.clone()).unwrap_or_default(),
            function
                .and_then(|f| f.sector_name.clone())
                .unwrap_or_default(),
            record.exam_id.to_string(),
            exam_names
                .get(&(record.exam_id, record.exam_type()))
                .map(|name| name.to_string())
                .unwrap_or_default(),
            record.exam_type().code().to_string(),
            record
                .periodicity_months()
                .map(|months| months.to_string())
                .unwrap_or_default(),
            risk_ids.join(";"),
        ])
        .map_err(std::io::Error::from)?;
    }

    csv.flush()?;
    Ok(())
}

fn describe_record(record: &FunctionAssociationRecord) -> String {
    let risks: Vec<String> = record.risk_ids.iter().map(ToString::to_string).collect();
    format!(
        "function {} -> exam {} ({}) risks [{}]",
        record.function_id,
        record.exam_id,
        schedule_label(&record.schedule),
        risks.join(", ")
    )
}

fn schedule_label(schedule: &ExamSchedule) -> String {
    match schedule.periodicity_months() {
        Some(months) => format!("{} every {} months", schedule.exam_type().label(), months),
        None => schedule.exam_type().label().to_string(),
    }
}

fn function_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

fn demo_sectors() -> Result<Vec<Sector>, AppError> {
    Ok(serde_json::from_str(DEMO_SECTORS)?)
}

const DEMO_SECTORS: &str = r#"[
    {
        "id": 10,
        "name": "Production",
        "functions": [
            {
                "id": 1,
                "name": "Press operator",
                "sectorId": 10,
                "risks": [
                    { "id": 1001, "riskCatalog": { "id": 1, "group": "FISICO", "description": "Continuous noise" } },
                    { "id": 1002, "riskCatalog": { "id": 2, "group": "QUIMICO", "description": "Mineral dust" } }
                ],
                "agents": [
                    { "id": 2001, "agentCatalog": { "id": 1, "esocialCode": "02.01.001", "description": "Noise" } }
                ],
                "exams": [
                    { "id": 3001, "examCatalog": { "id": 7, "code": "0007", "name": "Audiometry" }, "examType": "ADMISSIONAL" },
                    { "id": 3002, "examCatalog": { "id": 7, "code": "0007", "name": "Audiometry" }, "examType": "PERIODICO", "periodicityMonths": 12 },
                    { "id": 3003, "examCatalog": { "id": 8, "code": "0008", "name": "Spirometry" }, "examType": "PERIODICO", "periodicityMonths": 24 }
                ]
            }
        ]
    },
    {
        "id": 20,
        "name": "Admin",
        "functions": [
            {
                "id": 2,
                "name": "Office assistant",
                "sectorId": 20,
                "risks": [
                    { "id": 1003, "riskCatalog": { "id": 3, "group": "ERGONOMICO", "description": "Prolonged sitting" } }
                ],
                "exams": [
                    { "id": 3004, "examCatalog": { "id": 7, "code": "0007", "name": "Audiometry" }, "examType": "PERIODICO", "periodicityMonths": 12 }
                ]
            }
        ]
    }
]"#;
