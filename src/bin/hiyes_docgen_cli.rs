//! HIYES DocGen CLI - Bridge interface for the web platform
//!
//! Commands: templates, analyze, generate, regenerate, encode, decode, check
//! Outputs JSON to stdout, logs to stderr (RUST_LOG)
//! Returns 1 on usage/load errors, 2 on a failed operation

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use hiyes_docgen::{
    document_number, variables::project_date, GenerateRequest, GeneratedDocument,
    GenerationPipeline, GeneratorConfig, InMemoryLedger, TemplateRegistry,
};

#[derive(Parser)]
#[command(name = "hiyes-docgen-cli")]
#[command(about = "HIYES DocGen CLI - Business Document Generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to templates directory (overrides the config file)
    #[arg(short, long)]
    templates_dir: Option<PathBuf>,

    /// Path to a JSON generator config
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available templates
    Templates,

    /// Show a template's variables split into standard and extra
    Analyze {
        /// Template ID
        #[arg(short, long)]
        template: String,
    },

    /// Generate a document
    Generate {
        /// Template ID
        #[arg(short, long)]
        template: String,

        /// JSON payload (GenerateRequest)
        #[arg(short, long)]
        payload: String,

        /// Documents already issued on the project date
        #[arg(long, default_value_t = 0)]
        issued: u32,
    },

    /// Re-render a stored document from its generation data
    Regenerate {
        /// JSON of a previously generated document
        #[arg(short, long)]
        document: String,
    },

    /// Encode a date and daily counter as a document number
    Encode {
        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Daily counter (1-999)
        #[arg(short = 'n', long)]
        counter: u32,
    },

    /// Decode a document number
    Decode {
        #[arg(long)]
        code: String,
    },

    /// Structural check of a document number
    Check {
        #[arg(long)]
        code: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Templates => {
            let pipeline = match load_pipeline(cli.config.as_deref(), cli.templates_dir) {
                Ok(p) => p,
                Err(status) => return status,
            };
            let templates: Vec<_> = pipeline
                .list_templates()
                .iter()
                .map(|t| json!({
                    "id": t.id,
                    "name": t.name,
                    "version": t.template_version,
                    "kind": t.kind,
                    "deprecated": t.deprecated,
                }))
                .collect();
            emit(&Value::Array(templates), ExitCode::SUCCESS)
        }

        Commands::Analyze { template } => {
            let pipeline = match load_pipeline(cli.config.as_deref(), cli.templates_dir) {
                Ok(p) => p,
                Err(status) => return status,
            };
            match pipeline.analyze_template(&template) {
                Ok(variables) => emit(&json!({ "success": true, "variables": variables }), ExitCode::SUCCESS),
                Err(e) => emit(&json!({ "success": false, "error": e.to_string() }), ExitCode::from(2)),
            }
        }

        Commands::Generate { template, payload, issued } => {
            let pipeline = match load_pipeline(cli.config.as_deref(), cli.templates_dir) {
                Ok(p) => p,
                Err(status) => return status,
            };
            let request: GenerateRequest = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => {
                    return emit(
                        &json!({ "success": false, "error": format!("Invalid payload: {e}") }),
                        ExitCode::FAILURE,
                    );
                }
            };

            // Ensure template_id matches
            let request = GenerateRequest { template_id: template, ..request };

            let date = project_date(&request.project, Utc::now().date_naive());
            let ledger = InMemoryLedger::with_issued(date, issued);

            match pipeline.generate(&request, &ledger) {
                Ok(document) => emit(&json!({ "success": true, "document": document }), ExitCode::SUCCESS),
                Err(e) => {
                    let message = if e.is_daily_limit() {
                        "daily document limit reached".to_string()
                    } else {
                        e.to_string()
                    };
                    emit(&json!({ "success": false, "error": message }), ExitCode::from(2))
                }
            }
        }

        Commands::Regenerate { document } => {
            let pipeline = match load_pipeline(cli.config.as_deref(), cli.templates_dir) {
                Ok(p) => p,
                Err(status) => return status,
            };
            let original: GeneratedDocument = match serde_json::from_str(&document) {
                Ok(d) => d,
                Err(e) => {
                    return emit(
                        &json!({ "success": false, "error": format!("Invalid document: {e}") }),
                        ExitCode::FAILURE,
                    );
                }
            };

            match pipeline.regenerate(&original) {
                Ok(outcome) => emit(
                    &json!({
                        "success": true,
                        "content_changed": outcome.content_changed,
                        "document": outcome.document,
                    }),
                    ExitCode::SUCCESS,
                ),
                Err(e) => emit(&json!({ "success": false, "error": e.to_string() }), ExitCode::from(2)),
            }
        }

        Commands::Encode { date, counter } => match document_number::encode(date, counter) {
            Ok(code) => emit(&json!({ "success": true, "code": code }), ExitCode::SUCCESS),
            Err(e) => emit(&json!({ "success": false, "error": e.to_string() }), ExitCode::from(2)),
        },

        Commands::Decode { code } => match document_number::decode(&code) {
            Some(decoded) => emit(&json!({ "valid": true, "decoded": decoded }), ExitCode::SUCCESS),
            None => emit(&json!({ "valid": false, "code": code }), ExitCode::from(2)),
        },

        Commands::Check { code } => {
            let valid = document_number::is_valid(&code);
            let status = if valid { ExitCode::SUCCESS } else { ExitCode::from(2) };
            emit(&json!({ "valid": valid, "code": code }), status)
        }
    }
}

/// Config file, then `--templates-dir` override, then the template registry.
fn load_pipeline(
    config_path: Option<&Path>,
    templates_dir: Option<PathBuf>,
) -> Result<GenerationPipeline, ExitCode> {
    let mut config = match config_path {
        Some(path) => GeneratorConfig::load(path).map_err(|e| {
            error!(error = %e, "failed to load config");
            emit(&json!({ "error": e.to_string() }), ExitCode::FAILURE)
        })?,
        None => GeneratorConfig::default(),
    };
    if let Some(dir) = templates_dir {
        config.templates_dir = dir;
    }

    let registry = TemplateRegistry::load_from_dir(&config.templates_dir).map_err(|e| {
        error!(error = %e, "failed to load templates");
        emit(
            &json!({ "error": format!("Failed to load templates: {e}") }),
            ExitCode::FAILURE,
        )
    })?;

    Ok(GenerationPipeline::new(registry, config))
}

fn emit(value: &Value, status: ExitCode) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(out) => {
            println!("{out}");
            status
        }
        Err(e) => {
            eprintln!("failed to serialise output: {e}");
            ExitCode::FAILURE
        }
    }
}
