//! Focus CLI - Command-line interface for the focus engine
//!
//! Commands:
//! - run: Stream ingestion messages from stdin through one live session
//! - transform: Replay a file of precomputed frames (batch mode)
//! - doctor: Diagnose configuration and environment
//! - schema: Print message schemas

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use focus_engine::clock::ManualClock;
use focus_engine::logging::init_logging;
use focus_engine::protocol::{result_to_json, summary_to_json, FocusResultMessage};
use focus_engine::providers::PrecomputedFrame;
use focus_engine::types::{PhoneSignal, SessionSummary};
use focus_engine::{
    EngineConfig, EngineError, FocusProcessor, PrecomputedFrames, Providers, SessionRegistry,
    SubmitOutcome, ENGINE_VERSION, PRODUCER_NAME,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Focus - live attention scoring from per-frame landmarks
#[derive(Parser)]
#[command(name = "focus")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Fuse blink, expression, hand and phone signals into a focus score", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream ingestion messages from stdin (one JSON message per line)
    Run {
        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Replay precomputed frames (batch mode)
    Transform {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Frame rate used to advance time for frames without a timestamp
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Append the session summary to the output
        #[arg(long)]
        summary: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one result per line)
    Ndjson,
    /// JSON array of results
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Ingestion and summary request messages
    Input,
    /// focus_result and summary response messages
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FocusCliError> {
    let config = match cli.config.as_deref() {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Run { flush } => cmd_run(config, flush),

        Commands::Transform {
            input,
            output,
            input_format,
            output_format,
            fps,
            summary,
        } => cmd_transform(config, &input, &output, input_format, output_format, fps, summary),

        Commands::Doctor { json } => cmd_doctor(cli.config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_run(config: EngineConfig, flush: bool) -> Result<(), FocusCliError> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(stream_stdin(config, flush))
}

async fn stream_stdin(config: EngineConfig, flush: bool) -> Result<(), FocusCliError> {
    let providers = Providers::new(Arc::new(PrecomputedFrames), Arc::new(PrecomputedFrames));
    let registry = SessionRegistry::new(config, providers);
    let (id, mut results) = registry.open().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match registry.submit(id, trimmed).await? {
            SubmitOutcome::Queued => {
                let result = results
                    .recv()
                    .await
                    .ok_or(EngineError::SessionClosed(id))?;
                writeln!(stdout, "{}", result_to_json(&result)?)?;
            }
            SubmitOutcome::Summary(summary) => {
                writeln!(stdout, "{}", summary_to_json(&summary)?)?;
            }
            SubmitOutcome::Ignored => continue,
        }

        if flush {
            stdout.flush()?;
        }
    }

    let summary = registry.summary(id, false).await?;
    writeln!(stdout, "{}", summary_to_json(&summary)?)?;
    stdout.flush()?;

    registry.close(id).await?;
    Ok(())
}

fn cmd_transform(
    config: EngineConfig,
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    fps: f64,
    with_summary: bool,
) -> Result<(), FocusCliError> {
    if fps.is_nan() || fps <= 0.0 {
        return Err(FocusCliError::InvalidArgument(format!("fps must be positive, got {fps}")));
    }

    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let frames: Vec<PrecomputedFrame> = match input_format {
        InputFormat::Ndjson => input_data
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?,
        InputFormat::Json => serde_json::from_str(&input_data)?,
    };

    if frames.is_empty() {
        return Err(FocusCliError::NoFrames);
    }

    let start = frames.first().and_then(|f| f.timestamp).unwrap_or(0.0);
    let clock = ManualClock::new(start);
    let mut processor = FocusProcessor::with_clock(config, Arc::new(clock.clone()));

    let mut results: Vec<FocusResultMessage> = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        match frame.timestamp {
            Some(ts) => clock.set(ts),
            None if index > 0 => clock.advance(1.0 / fps),
            None => {}
        }

        let phone = PhoneSignal::from_detections(&frame.detections);
        let result = processor.process(frame.landmarks.as_ref(), phone);
        results.push(FocusResultMessage::from(&result));
    }

    let summary = with_summary.then(|| processor.summary(false));
    let output_data = format_output(&results, summary.as_ref(), &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    tracing::info!(frames = results.len(), "transform complete");
    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), FocusCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Focus engine version {}", ENGINE_VERSION),
    });

    match config_path {
        Some(path) if path.exists() => match fs::read_to_string(path) {
            Ok(content) => match EngineConfig::from_json(&content) {
                Ok(config) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (debounce {} frames, calibration {} frames)",
                        config.blink.debounce_frames, config.expression.calibration_frames
                    ),
                }),
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                }),
            },
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            }),
        },
        Some(_) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist, defaults will be used".to_string(),
        }),
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        }),
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
        println!("Focus Doctor Report");
        println!("===================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FocusCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), FocusCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", input_json_schema());
            } else {
                println!("Input messages (one JSON object per line)");
                println!();
                println!("1. frame - one video frame");
                println!("   {{ \"type\": \"frame\", \"image\": \"<base64>\" }}");
                println!("   The CLI decodes the image as a precomputed frame:");
                println!("   {{ \"timestamp\"?, \"landmarks\"?, \"detections\": [...] }}");
                println!();
                println!("2. summary - pull the session summary");
                println!("   {{ \"type\": \"summary\", \"reset\"?: bool }}");
                println!();
                println!("Any other message is ignored.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", output_json_schema());
            } else {
                println!("Output messages");
                println!();
                println!("- focus_result: one per processed frame");
                println!("  phone, phone_confidence, tired, tired_score,");
                println!("  fidgety, fidgety_score, focus_score, is_focused");
                println!("- summary: {{ phone, tired, fidgety, focus_score, focus_timeline: [[t, s], ...] }}");
            }
        }
    }

    Ok(())
}

// Helper functions

fn format_output(
    results: &[FocusResultMessage],
    summary: Option<&SessionSummary>,
    format: &OutputFormat,
) -> Result<String, FocusCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::with_capacity(results.len() + 1);
            for result in results {
                lines.push(serde_json::to_string(result)?);
            }
            if let Some(summary) = summary {
                lines.push(serde_json::to_string(summary)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let value = match summary {
                Some(summary) => serde_json::json!({ "results": results, "summary": summary }),
                None => serde_json::to_value(results)?,
            };
            if matches!(format, OutputFormat::JsonPretty) {
                Ok(serde_json::to_string_pretty(&value)?)
            } else {
                Ok(serde_json::to_string(&value)?)
            }
        }
    }
}

fn input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "focus.client_message",
        "oneOf": [
            {
                "type": "object",
                "required": ["type", "image"],
                "properties": {
                    "type": { "const": "frame" },
                    "image": { "type": "string", "contentEncoding": "base64" }
                }
            },
            {
                "type": "object",
                "required": ["type"],
                "properties": {
                    "type": { "const": "summary" },
                    "reset": { "type": "boolean", "default": false }
                }
            }
        ]
    })
    .to_string()
}

fn output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "focus.server_message",
        "oneOf": [
            {
                "type": "object",
                "required": ["type", "phone", "phone_confidence", "tired", "tired_score",
                             "fidgety", "fidgety_score", "focus_score", "is_focused"],
                "properties": {
                    "type": { "const": "focus_result" },
                    "phone": { "type": "boolean" },
                    "phone_confidence": { "type": "number" },
                    "tired": { "type": "boolean" },
                    "tired_score": { "type": "number", "minimum": 0, "maximum": 1 },
                    "fidgety": { "type": "boolean" },
                    "fidgety_score": { "type": "number", "minimum": 0, "maximum": 1 },
                    "focus_score": { "type": "number", "minimum": 0, "maximum": 1 },
                    "is_focused": { "type": "boolean" }
                }
            },
            {
                "type": "object",
                "required": ["phone", "tired", "fidgety", "focus_score", "focus_timeline"],
                "properties": {
                    "phone": { "type": "integer" },
                    "tired": { "type": "integer" },
                    "fidgety": { "type": "integer" },
                    "focus_score": { "type": "number" },
                    "focus_timeline": {
                        "type": "array",
                        "items": { "type": "array", "prefixItems": [{ "type": "integer" }, { "type": "number" }] }
                    }
                }
            }
        ]
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum FocusCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    InvalidArgument(String),
    NoFrames,
    DoctorFailed,
}

impl From<io::Error> for FocusCliError {
    fn from(e: io::Error) -> Self {
        FocusCliError::Io(e)
    }
}

impl From<EngineError> for FocusCliError {
    fn from(e: EngineError) -> Self {
        FocusCliError::Engine(e)
    }
}

impl From<serde_json::Error> for FocusCliError {
    fn from(e: serde_json::Error) -> Self {
        FocusCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FocusCliError> for CliError {
    fn from(e: FocusCliError) -> Self {
        match e {
            FocusCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FocusCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FocusCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'focus schema input' for the expected format".to_string()),
            },
            FocusCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: None,
            },
            FocusCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            FocusCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

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
