use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::info;

use ssa_registry::config::AppConfig;
use ssa_registry::error::AppError;
use ssa_registry::infra::{
    InMemoryApplicationStore, InMemoryAuditStore, InMemoryPersonStore, InMemorySsnStore,
};
use ssa_registry::telemetry;
use ssa_registry::workflows::issuance::{
    issuance_router, CitizenshipStatus, IssuanceWorkflow, PersonDraft, WorkflowError,
};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "SSA Registry",
    about = "Run the SSN application and issuance workflow service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk an issuance scenario end to end on the console
    Demo,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo => run_demo(),
    }
}

type MemoryWorkflow = IssuanceWorkflow<
    InMemoryPersonStore,
    InMemoryApplicationStore,
    InMemorySsnStore,
    InMemoryAuditStore,
>;

fn build_workflow(config: &AppConfig) -> MemoryWorkflow {
    IssuanceWorkflow::new(
        Arc::new(InMemoryPersonStore::default()),
        Arc::new(InMemoryApplicationStore::default()),
        Arc::new(InMemorySsnStore::default()),
        Arc::new(InMemoryAuditStore::default()),
        config.issuance.policy(),
    )
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let workflow = Arc::new(build_workflow(&config));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(issuance_router(workflow))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "ssa registry service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_demo() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let workflow = build_workflow(&config);

    let applicant = PersonDraft {
        first_name: "Maria".to_string(),
        middle_name: None,
        last_name: "Santos".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1991, 4, 17).unwrap_or_default(),
        place_of_birth: "Des Moines, IA".to_string(),
        mothers_maiden_name: "Alvarez".to_string(),
        fathers_name: "Carlos Santos".to_string(),
        citizenship: CitizenshipStatus::UsCitizen,
    };

    println!("SSN issuance demo");
    println!("-----------------");

    let application = workflow.submit(applicant)?;
    println!(
        "submitted application {} ({}) - status {}",
        application.id,
        application.reference,
        application.status.label()
    );

    let approved = workflow.approve(application.id, "demo-admin")?;
    let masked = approved
        .assigned_ssn
        .as_ref()
        .map(|ssn| ssn.masked())
        .unwrap_or_else(|| "none".to_string());
    println!(
        "approved application {} - status {}, number {masked}",
        approved.id,
        approved.status.label()
    );

    match workflow.approve(application.id, "second-admin") {
        Err(WorkflowError::NotPending) => {
            println!("second approval correctly refused: application already reviewed");
        }
        other => println!("unexpected second approval outcome: {other:?}"),
    }

    println!("recent audit trail:");
    let entries = workflow
        .audit()
        .recent(10)
        .map_err(WorkflowError::Repository)?;
    for entry in entries {
        println!("  [{}] {} - {}", entry.action, entry.actor, entry.details);
    }

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
