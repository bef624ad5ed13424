//! Log file ingestion: bulk memory-mapped reads and live tailing.
//!
//! Bulk mode fans line decoding out across cores (lines are independent);
//! everything order-dependent happens later, after rectification. Live mode
//! reads one appended line at a time and hands decoded events to a channel.

use std::fs;
use std::io::SeekFrom;
use std::path::Path;

use encoding_rs::WINDOWS_1252;
use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::prelude::*;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};

use crate::combat_log::{CombatEvent, LogParser, MalformedLine};

/// Result of a bulk parse: decoded events, the lines that failed to decode
/// (kept separately for diagnostics), and cursor bookkeeping.
#[derive(Debug)]
pub struct BulkParseResult {
    pub events: Vec<CombatEvent>,
    pub malformed: Vec<MalformedLine>,
    pub end_pos: u64,
    pub line_count: u64,
}

/// Parse a whole log file: mmap, split lines, decode in parallel.
///
/// The returned events are in decode order, not timeline order; run them
/// through the rectifier before any state-dependent processing.
pub fn read_log_file<P: AsRef<Path>>(
    path: P,
    parser: &LogParser,
) -> std::io::Result<BulkParseResult> {
    let file = fs::File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let bytes = mmap.as_ref();
    let end_pos = bytes.len() as u64;

    // Find all line boundaries
    let mut line_ranges: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    for end in memchr_iter(b'\n', bytes) {
        if end > start {
            line_ranges.push((start, end));
        }
        start = end + 1;
    }
    if start < bytes.len() {
        line_ranges.push((start, bytes.len()));
    }
    let line_count = line_ranges.len() as u64;

    let results: Vec<Result<CombatEvent, MalformedLine>> = line_ranges
        .par_iter()
        .enumerate()
        .map(|(idx, &(start, end))| {
            let (line, _, _) = WINDOWS_1252.decode(&bytes[start..end]);
            parser.parse_line(idx as u64 + 1, line.trim_end_matches('\r'))
        })
        .collect();

    let mut events = Vec::with_capacity(results.len());
    let mut malformed = Vec::new();
    for result in results {
        match result {
            Ok(event) => events.push(event),
            Err(error) => malformed.push(error),
        }
    }

    Ok(BulkParseResult {
        events,
        malformed,
        end_pos,
        line_count,
    })
}

/// Tail a growing log file from a byte offset, sending decoded events down
/// the channel as lines are appended. Returns when the receiver is dropped
/// or the file becomes unreadable.
pub async fn tail_log_file<P: AsRef<Path>>(
    path: P,
    start_line: u64,
    start_byte: u64,
    parser: LogParser,
    tx: mpsc::Sender<CombatEvent>,
) -> std::io::Result<()> {
    let file = File::open(&path).await?;
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(start_byte)).await?;

    let mut line_number = start_line;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                // No new data yet
                sleep(Duration::from_millis(100)).await;
            }
            Ok(_) => {
                line_number += 1;
                let (line, _, _) = WINDOWS_1252.decode(&buf);
                match parser.parse_line(line_number, line.trim_end()) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            return Ok(());
                        }
                    }
                    Err(error) => {
                        tracing::debug!(%error, "skipping malformed tail line");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "tail read failed");
                return Err(e);
            }
        }
    }
}
