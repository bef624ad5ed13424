//! ossus-parse-worker - subprocess for parsing historical combat log files.
//!
//! Spawned by a host application so a large bulk parse can't fragment the
//! main process's heap. Decodes the file with a parallel fan-out, rectifies
//! timestamps, folds state sequentially, and prints a JSON summary of the
//! session to stdout.
//!
//! Usage: ossus-parse-worker <file_path>

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use ossus_core::combat_log::rectify;
use ossus_core::encounter::summary::EncounterSummary;
use ossus_core::reader::{self, BulkParseResult};
use ossus_core::session::parse_log_filename;
use ossus_core::signal_processor::EventProcessor;
use ossus_core::state::SessionCache;
use ossus_core::LogParser;
use ossus_types::SegmenterConfig;
use tracing_subscriber::filter::EnvFilter;

/// Everything the host process needs to resume from where the worker
/// stopped, plus the computed encounter summaries.
#[derive(Debug, Serialize)]
struct WorkerOutput {
    end_pos: u64,
    line_count: u64,
    event_count: usize,
    malformed_count: usize,
    encounter_count: usize,
    encounters: Vec<EncounterSummary>,
    player_name: Option<String>,
    area_name: Option<String>,
    elapsed_ms: u128,
}

/// Initialize logging, writing to OSSUS_LOG_PATH if set, otherwise stderr.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var("OSSUS_LOG_PATH")
        && let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(file)
            .init();
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        tracing::error!("Usage: ossus-parse-worker <file_path>");
        return ExitCode::FAILURE;
    }
    let file_path = PathBuf::from(&args[1]);

    let timer = std::time::Instant::now();
    match parse_file(&file_path) {
        Ok(mut output) => {
            output.elapsed_ms = timer.elapsed().as_millis();
            match serde_json::to_string(&output) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize worker output");
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "parse error");
            ExitCode::FAILURE
        }
    }
}

fn parse_file(file_path: &Path) -> Result<WorkerOutput, String> {
    // Session date comes from the filename
    let session_start = parse_log_filename(file_path)
        .ok_or_else(|| format!("invalid log filename: {}", file_path.display()))?;

    let parser = LogParser::new(session_start);
    let BulkParseResult {
        mut events,
        malformed,
        end_pos,
        line_count,
    } = reader::read_log_file(file_path, &parser).map_err(|e| e.to_string())?;

    if !malformed.is_empty() {
        tracing::warn!(count = malformed.len(), "malformed lines skipped");
    }

    rectify(&mut events);

    // Strictly sequential state fold over the rectified stream
    let mut cache = SessionCache::new();
    let mut processor = EventProcessor::new(SegmenterConfig::default());
    let event_count = events.len();
    for event in events {
        let _ = processor.process_event(event, &mut cache);
    }

    // Flush the trailing encounter into history
    cache.push_new_encounter();

    let encounters = cache.encounter_history.summaries().to_vec();
    tracing::info!(
        events = event_count,
        encounters = encounters.len(),
        "bulk parse complete"
    );

    Ok(WorkerOutput {
        end_pos,
        line_count,
        event_count,
        malformed_count: malformed.len(),
        encounter_count: encounters.len(),
        encounters,
        player_name: cache
            .player_initialized
            .then(|| ossus_core::resolve(cache.player.name).to_string()),
        area_name: (!cache.current_area.area_name.is_empty())
            .then(|| cache.current_area.area_name.clone()),
        elapsed_ms: 0, // Filled in by the caller
    })
}
