use anyhow::Context;
use clap::{Parser, Subcommand};
use clinic_core::config::{
    grouping_policy_from_env_value, medication_policy_from_env_value, store_path_from_env_value,
};
use clinic_core::constants::{GROUPING_ENV, MEDICATIONS_ENV, STORE_PATH_ENV};
use clinic_core::{
    ClinicService, CoreConfig, Department, ReconcileReport, RequestFilter, RequestId, Status,
    TaskBatch,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Reconcile clinical task batches into patient requests")]
struct Cli {
    /// JSON store file (`default` for clinic_data/db.json); in-memory when unset
    #[arg(long, global = true)]
    store: Option<String>,
    /// Grouping policy: `patient` or `department`
    #[arg(long, global = true)]
    grouping: Option<String>,
    /// Medication projection: `concatenate` or `dedupe`
    #[arg(long, global = true)]
    medications: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process task batch files in order
    Process {
        /// Batch files (`{"tasks": [...]}`)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print every request after processing
        #[arg(long)]
        print: bool,
    },
    /// List patient requests
    Requests {
        /// Only this patient's requests
        #[arg(long)]
        patient: Option<String>,
        /// Only requests assigned to this department
        #[arg(long)]
        department: Option<String>,
        /// Only open requests
        #[arg(long)]
        open: bool,
    },
    /// Show one request with its messages and medications
    Show {
        /// Request id (32 lowercase hex characters)
        request_id: String,
    },
}

#[derive(Serialize)]
struct BatchSummary<'a> {
    file: String,
    #[serde(flatten)]
    report: &'a ReconcileReport,
}

/// Resolve configuration from flags, falling back to the environment.
fn resolve_config(cli: &Cli) -> anyhow::Result<CoreConfig> {
    let from = |flag: &Option<String>, env: &str| flag.clone().or_else(|| std::env::var(env).ok());

    let store_path = store_path_from_env_value(from(&cli.store, STORE_PATH_ENV));
    let grouping = grouping_policy_from_env_value(from(&cli.grouping, GROUPING_ENV))?;
    let medications = medication_policy_from_env_value(from(&cli.medications, MEDICATIONS_ENV))?;

    Ok(CoreConfig::new(store_path, grouping, medications)?)
}

fn print_yaml<T: Serialize>(value: &T) -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    let Some(command) = cli.command else {
        println!("Use --help for usage");
        return Ok(());
    };

    let service = ClinicService::new(&cfg)?;
    tracing::info!(grouping = %cfg.grouping(), medications = %cfg.medications(), "clinic ready");

    match command {
        Commands::Process { files, print } => {
            for file in files {
                let batch = TaskBatch::from_path(&file)
                    .with_context(|| format!("loading {}", file.display()))?;
                let report = service
                    .process_batch(&batch)
                    .with_context(|| format!("processing {}", file.display()))?;
                print_yaml(&[BatchSummary {
                    file: file.display().to_string(),
                    report: &report,
                }])?;
            }
            if print {
                print_yaml(&service.list_views(&RequestFilter::default())?)?;
            }
        }
        Commands::Requests {
            patient,
            department,
            open,
        } => {
            let filter = RequestFilter {
                patient_id: patient,
                department: department.as_deref().map(Department::parse).transpose()?,
                status: open.then_some(Status::Open),
                task_id: None,
            };
            let views = service.list_views(&filter)?;
            if views.is_empty() {
                println!("No requests found.");
            } else {
                print_yaml(&views)?;
            }
        }
        Commands::Show { request_id } => {
            let id = RequestId::parse(&request_id)?;
            print_yaml(&service.request_view(&id)?)?;
        }
    }

    Ok(())
}
