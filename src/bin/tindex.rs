//! tindex CLI - Command-line interface for the tindex scoring engine
//!
//! Commands:
//! - log: Apply one task update to a program file
//! - stats: Compute the statistics snapshot for a program file
//! - validate: Validate task-update request schema
//! - doctor: Diagnose engine, catalog, and program-file health
//! - schema: Print schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use tindex::catalog;
use tindex::pipeline::{apply_task_update, compute_statistics, STATS_SCHEMA_VERSION};
use tindex::request::{RequestAdapter, TaskUpdateRequest, UpdateKind, SCHEMA_VERSION};
use tindex::store::JsonFileStore;
use tindex::streak::StreakEvaluator;
use tindex::tier;
use tindex::types::TaskId;
use tindex::{EngineError, ENGINE_VERSION, PRODUCER_NAME};

/// tindex - On-device scoring engine for habit coaching
#[derive(Parser)]
#[command(name = "tindex")]
#[command(author = "Apexion Labs")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Transform daily task logs into score trends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one task update to a program file
    Log {
        /// Program JSON file to update in place
        #[arg(short, long)]
        program: PathBuf,

        /// Task id (e.g. "exercise", "sleep", "meals")
        #[arg(short, long)]
        task: String,

        /// Calendar day of the log (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Progress percentage for simple/slider/sleep tasks
        #[arg(long)]
        progress: Option<f64>,

        /// Checked item index for checklist tasks (repeatable)
        #[arg(long)]
        check: Vec<u32>,

        /// Meal quality score for meal tasks
        #[arg(long)]
        meal_score: Option<f64>,

        /// Optional note attached to a meal
        #[arg(long)]
        note: Option<String>,

        /// Delete a previously logged meal by id
        #[arg(long)]
        delete_meal: Option<uuid::Uuid>,

        /// Evaluation date override (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Compute the statistics snapshot for a program file
    Stats {
        /// Program JSON file
        #[arg(short, long)]
        program: PathBuf,

        /// Evaluation date override (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Output format
        #[arg(long, default_value = "summary")]
        output_format: OutputFormat,
    },

    /// Validate task-update request schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine, catalog, and program-file health
    Doctor {
        /// Check a program file
        #[arg(long)]
        program: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one request per line)
    Ndjson,
    /// JSON array of requests
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable summary
    Summary,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (tindex.task_update.v1)
    Input,
    /// Output schema (tindex.stats.v1)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), TindexCliError> {
    match cli.command {
        Commands::Log {
            program,
            task,
            date,
            progress,
            check,
            meal_score,
            note,
            delete_meal,
            today,
            output_format,
        } => cmd_log(
            &program,
            &task,
            date,
            progress,
            check,
            meal_score,
            note,
            delete_meal,
            today,
            output_format,
        ),

        Commands::Stats {
            program,
            today,
            output_format,
        } => cmd_stats(&program, today, output_format),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { program, json } => cmd_doctor(program.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_log(
    program_path: &Path,
    task: &str,
    date: Option<NaiveDate>,
    progress: Option<f64>,
    check: Vec<u32>,
    meal_score: Option<f64>,
    note: Option<String>,
    delete_meal: Option<uuid::Uuid>,
    today: Option<NaiveDate>,
    output_format: OutputFormat,
) -> Result<(), TindexCliError> {
    let mut program = JsonFileStore::load_path(program_path)?;

    let update = match (progress, !check.is_empty(), meal_score, delete_meal) {
        (Some(raw_progress), false, None, None) => UpdateKind::Progress { raw_progress },
        (None, true, None, None) => UpdateKind::Checklist {
            checked_items: check.into_iter().collect(),
        },
        (None, false, Some(score), None) => UpdateKind::Meal { score, note },
        (None, false, None, Some(meal_id)) => UpdateKind::DeleteMeal { meal_id },
        _ => {
            return Err(TindexCliError::UpdateShape);
        }
    };

    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let request = TaskUpdateRequest {
        schema_version: SCHEMA_VERSION.to_string(),
        user_id: program.user_id.clone(),
        date: date.unwrap_or(today),
        task: parse_task_id(task)?,
        update,
    };

    let outcome = apply_task_update(&mut program, &request, today)?;
    JsonFileStore::save_path(program_path, &program)?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&outcome)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Summary => {
            println!(
                "{}: streak {}{}",
                outcome.task.as_str(),
                outcome.streak,
                if outcome.qualified { " (qualified)" } else { "" }
            );
            println!(
                "score {} ({:+.2} today)",
                outcome.snapshot.current_score, outcome.daily_score_delta
            );
            for id in &outcome.newly_unlocked {
                println!("unlocked: {}", id);
            }
        }
    }

    Ok(())
}

fn cmd_stats(
    program_path: &Path,
    today: Option<NaiveDate>,
    output_format: OutputFormat,
) -> Result<(), TindexCliError> {
    let program = JsonFileStore::load_path(program_path)?;
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let snapshot = compute_statistics(&program, today);

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&snapshot)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Summary => {
            println!("Score:  {} ({:+.1}%)", snapshot.current_score, snapshot.trend_pct);
            println!(
                "Tier:   {} ({}-{}), {:.0}% through{}",
                snapshot.tier.name,
                snapshot.tier.min_score,
                snapshot.tier.max_score,
                snapshot.tier.progress * 100.0,
                snapshot
                    .tier
                    .points_to_next
                    .map(|p| format!(", {p} to next"))
                    .unwrap_or_default()
            );
            println!("Days:   {}", snapshot.series.len());
            println!("\nStreaks:");
            for streak in &snapshot.streaks {
                println!("  {:<14} {}", streak.task.as_str(), streak.count);
            }
            if !snapshot.quality.flags.is_empty() {
                println!(
                    "\n{} of {} entries skipped",
                    snapshot.quality.entries_skipped, snapshot.quality.entries_seen
                );
            }
        }
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), TindexCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let requests = match input_format {
        InputFormat::Ndjson => RequestAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => RequestAdapter::parse_array(&input_data)?,
    };

    let failures = RequestAdapter::validate_all(&requests);

    let report = ValidationReport {
        total_requests: requests.len(),
        valid_requests: requests.len() - failures.len(),
        invalid_requests: failures.len(),
        errors: failures,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total requests:   {}", report.total_requests);
        println!("Valid requests:   {}", report.valid_requests);
        println!("Invalid requests: {}", report.invalid_requests);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Request {} (user {}): {}",
                    err.index,
                    err.user_id.as_deref().unwrap_or("unknown"),
                    err.error
                );
            }
        }
    }

    if report.invalid_requests > 0 {
        Err(TindexCliError::ValidationFailed(report.invalid_requests))
    } else {
        Ok(())
    }
}

fn cmd_doctor(program: Option<&Path>, json: bool) -> Result<(), TindexCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("tindex version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_versions".to_string(),
        status: CheckStatus::Ok,
        message: format!("input: {}, output: {}", SCHEMA_VERSION, STATS_SCHEMA_VERSION),
    });

    // Catalog integrity: weights and pools
    let bad_weights = catalog::all_definitions()
        .iter()
        .filter(|def| def.impact_weight <= 0.0)
        .count();
    if bad_weights == 0
        && catalog::total_positive_impact() > 0.0
        && catalog::total_negative_impact() > 0.0
    {
        checks.push(DoctorCheck {
            name: "catalog".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "{} tasks, pools +{} / -{}",
                catalog::all_definitions().len(),
                catalog::total_positive_impact(),
                catalog::total_negative_impact()
            ),
        });
    } else {
        checks.push(DoctorCheck {
            name: "catalog".to_string(),
            status: CheckStatus::Error,
            message: format!("{} definitions with non-positive weight", bad_weights),
        });
    }

    // Tier table contiguity
    let contiguous = tier::all_tiers()
        .windows(2)
        .all(|pair| pair[0].max_score + 1 == pair[1].min_score);
    checks.push(DoctorCheck {
        name: "tiers".to_string(),
        status: if contiguous {
            CheckStatus::Ok
        } else {
            CheckStatus::Error
        },
        message: if contiguous {
            format!("{} contiguous brackets", tier::all_tiers().len())
        } else {
            "tier brackets have gaps".to_string()
        },
    });

    // Program file health, including the streak-cache invariant
    if let Some(program_path) = program {
        if program_path.exists() {
            match JsonFileStore::load_path(program_path) {
                Ok(program) => {
                    let today = Utc::now().date_naive();
                    let drifted: Vec<&str> = catalog::all_definitions()
                        .iter()
                        .filter(|def| {
                            program.streak_state(&def.id).count
                                != StreakEvaluator::streak_for_task(&program, &def.id, today)
                        })
                        .map(|def| def.id.as_str())
                        .collect();

                    if drifted.is_empty() {
                        checks.push(DoctorCheck {
                            name: "program".to_string(),
                            status: CheckStatus::Ok,
                            message: format!(
                                "{} log entries, streak cache consistent",
                                program.task_log.len()
                            ),
                        });
                    } else {
                        checks.push(DoctorCheck {
                            name: "program".to_string(),
                            status: CheckStatus::Warning,
                            message: format!("streak cache drift: {}", drifted.join(", ")),
                        });
                    }
                }
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "program".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Cannot load program file: {}", e),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "program".to_string(),
                status: CheckStatus::Warning,
                message: "Program file does not exist".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("tindex Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(TindexCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), TindexCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: {}", SCHEMA_VERSION);
            println!();
            println!("A task-update request carries:");
            println!();
            println!("- user_id: owner of the program document");
            println!("- date: calendar day the log applies to (YYYY-MM-DD)");
            println!("- task: catalog task id");
            println!("  dos:    sun_exposure, exercise, sleep, meals, supplements");
            println!("  don'ts: alcohol, stress, abstinence");
            println!("- update: one of four shapes, tagged by \"type\":");
            println!("  1. progress   - raw_progress percentage (simple/slider/sleep)");
            println!("  2. checklist  - checked_items indices (supplements)");
            println!("  3. meal       - score 0-100 plus optional note (meals)");
            println!("  4. delete_meal - meal_id of a previously logged meal");
        }
        SchemaType::Output => {
            println!("Output Schema: {}", STATS_SCHEMA_VERSION);
            println!();
            println!("A stats snapshot contains:");
            println!();
            println!("- producer: {{ name, version, instance_id }}");
            println!("- computed_at_utc, user_id");
            println!("- current_score: rounded score, bounded 200-1100");
            println!("- trend_pct: movement against the first smoothed point");
            println!("- tier: {{ name, min_score, max_score, progress, points_to_next }}");
            println!("- series: daily {{ day_index, smoothed_value }} points");
            println!("- streaks: per-task consecutive-day counts");
            println!("- key_factors: tasks ranked by streak, then impact");
            println!("- quality: {{ entries_seen, entries_skipped, flags }}");
        }
    }

    Ok(())
}

// Helper functions

fn parse_task_id(raw: &str) -> Result<TaskId, TindexCliError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| TindexCliError::ParseError(format!("invalid task id '{raw}'")))
}

// Error types

#[derive(Debug)]
enum TindexCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    UpdateShape,
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for TindexCliError {
    fn from(e: io::Error) -> Self {
        TindexCliError::Io(e)
    }
}

impl From<EngineError> for TindexCliError {
    fn from(e: EngineError) -> Self {
        TindexCliError::Engine(e)
    }
}

impl From<serde_json::Error> for TindexCliError {
    fn from(e: serde_json::Error) -> Self {
        TindexCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TindexCliError> for CliError {
    fn from(e: TindexCliError) -> Self {
        match e {
            TindexCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TindexCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'tindex doctor' to check program health".to_string()),
            },
            TindexCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TindexCliError::UpdateShape => CliError {
                code: "UPDATE_SHAPE".to_string(),
                message: "Exactly one of --progress, --check, --meal-score, --delete-meal is required".to_string(),
                hint: Some("Pick the update flag matching the task's behavior".to_string()),
            },
            TindexCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} requests failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            TindexCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            TindexCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_requests: usize,
    valid_requests: usize,
    invalid_requests: usize,
    errors: Vec<tindex::request::RequestFailure>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
