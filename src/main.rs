use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod db;
mod error;
mod import;
#[cfg(test)]
mod memory;
mod models;
mod report;
mod schema;
mod service;
mod store;

use crate::db::PgRecordStore;
use crate::error::RecordError;
use crate::schema::{RawCloseInput, RawUpdateInput};
use crate::service::RecordService;

#[derive(Parser)]
#[command(name = "academic-records")]
#[command(about = "Close, correct and report final academic grades", long_about = None)]
struct Cli {
    /// Maximum number of pooled Postgres connections
    #[arg(long, global = true, default_value_t = 5)]
    max_connections: u32,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample students, teachers and assignments
    Seed,
    /// Close final grades from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print a student's report card as JSON
    ReportCard {
        student_id: String,
        /// Also write the report card as markdown
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Close the final grade for a student and assignment
    Close {
        #[arg(long, allow_negative_numbers = true)]
        student_id: i64,
        #[arg(long, allow_negative_numbers = true)]
        assignment_id: i64,
        #[arg(long, allow_negative_numbers = true)]
        final_score: f64,
        /// Approved or Failed; derived from the score when omitted
        #[arg(long)]
        status: Option<String>,
    },
    /// Correct the score and/or status of a closed grade
    Update {
        record_id: String,
        #[arg(long, allow_negative_numbers = true)]
        final_score: Option<f64>,
        #[arg(long)]
        status: Option<String>,
    },
}

/// Marks a failure whose `{error}` body has already been printed.
#[derive(Debug, Error)]
#[error("operation failed")]
struct Reported;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,academic_records=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let outcome = run(cli.command, &pool).await;
    pool.close().await;

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) if err.is::<Reported>() => Ok(ExitCode::FAILURE),
        Err(err) => Err(err),
    }
}

async fn run(command: Commands, pool: &PgPool) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let service = RecordService::new(PgRecordStore::new(pool.clone()));
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let summary = finish(import::import_csv(&service, file).await)?;
            println!(
                "Closed {} grades from {} ({} already closed, {} rejected).",
                summary.closed,
                csv.display(),
                summary.already_closed,
                summary.rejected
            );
        }
        Commands::ReportCard { student_id, out } => {
            let service = RecordService::new(PgRecordStore::new(pool.clone()));
            let result = match schema::parse_id(&student_id) {
                Some(id) => service.generate_report_card(id).await,
                None => Err(RecordError::InvalidInput("invalid student id".to_string())),
            };
            let card = finish(result)?;
            if let Some(out) = out {
                std::fs::write(&out, report::build_report(&card))?;
                eprintln!("Report written to {}.", out.display());
            }
            print_json(&card)?;
        }
        Commands::Close {
            student_id,
            assignment_id,
            final_score,
            status,
        } => {
            let service = RecordService::new(PgRecordStore::new(pool.clone()));
            let raw = RawCloseInput {
                student_user_id: Some(student_id),
                assignment_id: Some(assignment_id),
                final_score: Some(final_score),
                status,
            };
            let result = match schema::validate_close(raw) {
                Ok(input) => service.close_record(input).await,
                Err(errors) => Err(errors.into()),
            };
            print_json(&finish(result)?)?;
        }
        Commands::Update {
            record_id,
            final_score,
            status,
        } => {
            let service = RecordService::new(PgRecordStore::new(pool.clone()));
            let raw = RawUpdateInput {
                final_score,
                status,
            };
            let result = match (schema::parse_id(&record_id), schema::validate_update(raw)) {
                (None, _) => Err(RecordError::InvalidInput("invalid record id".to_string())),
                (Some(_), Err(errors)) => Err(errors.into()),
                (Some(id), Ok(patch)) => service.update_record(id, patch).await,
            };
            print_json(&finish(result)?)?;
        }
    }

    Ok(())
}

/// Prints the `{error}` body for a failed operation and turns it into `Reported`.
fn finish<T>(result: Result<T, RecordError>) -> anyhow::Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            if let RecordError::Store(source) = &err {
                tracing::error!(error = ?source, "academic records operation failed");
            }
            print_json(&err.to_response())?;
            Err(Reported.into())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
