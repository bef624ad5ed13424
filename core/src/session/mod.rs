//! Parsing session orchestration.
//!
//! A session owns one shared [`SessionCache`] behind a read/write lock:
//! live updates and bulk rebuilds take the write side, point-in-time
//! queries come in through the read side and observe prefix-consistent
//! state. Bulk reparses build a fresh cache off to the side and swap it in
//! atomically - a stale reparse (superseded by a newer request) is
//! discarded wholesale, never partially applied.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use chrono::NaiveDateTime;
use thiserror::Error;

use ossus_types::SegmenterConfig;

use crate::combat_log::{CombatEvent, LogParser, rectify};
use crate::reader::{self, BulkParseResult};
use crate::signal_processor::{EventProcessor, SignalHandler, dispatch_signals};
use crate::state::SessionCache;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("log filename has no parseable timestamp: {0}")]
    InvalidFilename(PathBuf),
    #[error("session has no active file")]
    NoActiveFile,
}

/// Outcome of a bulk reparse request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReparseOutcome {
    /// The fresh state was swapped in
    Applied { events: usize, malformed: usize },
    /// A newer reparse started while this one ran; the result was discarded
    Superseded,
}

/// Generation ticket for one bulk reparse.
#[derive(Debug, Clone)]
pub struct ReparseTicket {
    generation: Arc<AtomicU64>,
    ticket: u64,
}

impl ReparseTicket {
    /// Whether this reparse is still the newest one requested.
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.ticket
    }
}

pub struct ParsingSession {
    active_file: Option<PathBuf>,
    session_start: NaiveDateTime,
    parser: LogParser,
    processor: EventProcessor,
    config: SegmenterConfig,
    cache: Arc<RwLock<SessionCache>>,
    signal_handlers: Vec<Box<dyn SignalHandler + Send>>,
    reparse_generation: Arc<AtomicU64>,
    pub current_byte: Option<u64>,
    pub current_line: u64,
}

impl ParsingSession {
    pub fn new(path: PathBuf, config: SegmenterConfig) -> Result<Self, SessionError> {
        let session_start = parse_log_filename(&path)
            .ok_or_else(|| SessionError::InvalidFilename(path.clone()))?;
        Ok(Self {
            parser: LogParser::new(session_start),
            processor: EventProcessor::new(config.clone()),
            config,
            session_start,
            active_file: Some(path),
            cache: Arc::new(RwLock::new(SessionCache::new())),
            signal_handlers: Vec::new(),
            reparse_generation: Arc::new(AtomicU64::new(0)),
            current_byte: None,
            current_line: 0,
        })
    }

    pub fn session_start(&self) -> NaiveDateTime {
        self.session_start
    }

    pub fn active_file(&self) -> Option<&Path> {
        self.active_file.as_deref()
    }

    pub fn parser(&self) -> &LogParser {
        &self.parser
    }

    /// Register a signal consumer. Each handler is fault-isolated: one
    /// panicking subscriber never blocks the others or log ingestion.
    pub fn add_signal_handler(&mut self, handler: Box<dyn SignalHandler + Send>) {
        self.signal_handlers.push(handler);
    }

    /// Shared handle for concurrent point-in-time readers.
    pub fn state(&self) -> Arc<RwLock<SessionCache>> {
        Arc::clone(&self.cache)
    }

    /// Run a closure against the current state under the read lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&SessionCache) -> R) -> R {
        f(&read_lock(&self.cache))
    }

    /// Apply one live event (tail mode) and fan its signals out.
    pub fn apply_live_event(&mut self, event: CombatEvent) {
        self.current_line = self.current_line.max(event.line_number);
        let signals = {
            let mut cache = match self.cache.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            self.processor.process_event(event, &mut cache)
        };
        if signals.is_empty() {
            return;
        }
        let cache = read_lock(&self.cache);
        dispatch_signals(&mut self.signal_handlers, &signals, cache.current_encounter());
    }

    /// Take a generation ticket for a bulk reparse. Taking a new ticket
    /// invalidates every older one.
    pub fn begin_reparse(&self) -> ReparseTicket {
        let ticket = self.reparse_generation.fetch_add(1, Ordering::SeqCst) + 1;
        ReparseTicket {
            generation: Arc::clone(&self.reparse_generation),
            ticket,
        }
    }

    /// Swap a freshly built cache in, unless the ticket went stale.
    pub fn commit_reparse(&mut self, ticket: &ReparseTicket, fresh: SessionCache) -> bool {
        if !ticket.is_current() {
            tracing::info!("reparse superseded; discarding stale result");
            return false;
        }
        match self.cache.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        true
    }

    /// Bulk/historical mode: decode the whole active file in parallel,
    /// rectify, fold sequentially into a fresh state, then swap it in.
    pub fn reparse(&mut self) -> Result<ReparseOutcome, SessionError> {
        let path = self.active_file.clone().ok_or(SessionError::NoActiveFile)?;
        let ticket = self.begin_reparse();

        let BulkParseResult {
            mut events,
            malformed,
            end_pos,
            line_count,
        } = reader::read_log_file(&path, &self.parser)?;

        if !malformed.is_empty() {
            tracing::warn!(count = malformed.len(), "malformed lines skipped during bulk parse");
        }

        rectify(&mut events);

        // Sequential fold: state updates are order-dependent and never
        // run in parallel
        let mut fresh = SessionCache::new();
        fresh.load_boss_definitions(self.with_state(|c| c.boss_definitions().to_vec()));
        let mut processor = EventProcessor::new(self.config.clone());
        let event_count = events.len();
        let mut signals = Vec::new();
        for event in events {
            signals.extend(processor.process_event(event, &mut fresh));
        }

        if !self.commit_reparse(&ticket, fresh) {
            return Ok(ReparseOutcome::Superseded);
        }
        self.current_byte = Some(end_pos);
        self.current_line = line_count;

        let cache = read_lock(&self.cache);
        dispatch_signals(&mut self.signal_handlers, &signals, cache.current_encounter());
        drop(cache);

        Ok(ReparseOutcome::Applied {
            events: event_count,
            malformed: malformed.len(),
        })
    }
}

fn read_lock(cache: &Arc<RwLock<SessionCache>>) -> RwLockReadGuard<'_, SessionCache> {
    match cache.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Extract the session start timestamp from a log filename like
/// `combat_2025-12-10_18_12_15_087604.txt`.
pub fn parse_log_filename(path: &Path) -> Option<NaiveDateTime> {
    let stem = path.file_stem()?.to_str()?.trim_start_matches("combat_");
    NaiveDateTime::parse_from_str(stem, "%Y-%m-%d_%H_%M_%S_%f").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PLAYER: &str =
        "@Jerran Zeva#689501114780828|(4749.87,4694.53,710.05,0.00)|(288866/288866)";
    const TRASH: &str =
        "Dread Monster {3291675820556288}:5320000112430|(133.95,-120.16,-8.85,0.00)|(1392000/1392000)";

    fn damage_line(time: &str, amount: i32) -> String {
        format!(
            "[{time}] [{PLAYER}] [{TRASH}] [Strike {{100}}] [ApplyEffect {{836045448945477}}: Damage {{836045448945501}}] ({amount} kinetic {{836045448940873}}) <{amount}>"
        )
    }

    fn write_log(dir: &Path, lines: &[String]) -> PathBuf {
        let path = dir.join("combat_2025-12-10_18_12_15_087604.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn filename_timestamp_parsing() {
        let stamp =
            parse_log_filename(Path::new("combat_2025-12-10_18_12_15_087604.txt")).unwrap();
        assert_eq!(stamp.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-12-10 18:12:15");
        assert!(parse_log_filename(Path::new("notes.txt")).is_none());
    }

    #[test]
    fn reparse_builds_state_from_the_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(
            dir.path(),
            &[
                damage_line("18:20:00.000", 1000),
                "garbage line".to_string(),
                damage_line("18:20:05.000", 500),
                format!(
                    "[18:20:10.000] [{PLAYER}] [] [] [Event {{836045448945472}}: ExitCombat {{836045448945490}}]"
                ),
            ],
        );

        let mut session = ParsingSession::new(path, SegmenterConfig::default()).unwrap();
        let outcome = session.reparse().unwrap();
        assert_eq!(
            outcome,
            ReparseOutcome::Applied {
                events: 3,
                malformed: 1
            }
        );
        assert_eq!(session.current_line, 4);

        session.with_state(|cache| {
            let enc = cache.last_combat_encounter().unwrap();
            assert_eq!(enc.duration_seconds(), Some(10));
            let total = enc
                .accumulated_data
                .get(&689501114780828)
                .map(|acc| acc.damage_dealt)
                .unwrap();
            assert_eq!(total, 1500);
        });
    }

    #[test]
    fn stale_reparse_is_discarded_not_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(dir.path(), &[damage_line("18:20:00.000", 1000)]);
        let mut session = ParsingSession::new(path, SegmenterConfig::default()).unwrap();

        let old_ticket = session.begin_reparse();
        // A newer request arrives while the first fold is still running
        let new_ticket = session.begin_reparse();

        let mut stale = SessionCache::new();
        stale.player.id = 111;
        stale.player_initialized = true;
        assert!(!session.commit_reparse(&old_ticket, stale));
        session.with_state(|cache| assert!(!cache.player_initialized));

        let mut current = SessionCache::new();
        current.player.id = 222;
        current.player_initialized = true;
        assert!(session.commit_reparse(&new_ticket, current));
        session.with_state(|cache| assert_eq!(cache.player.id, 222));
    }

    #[test]
    fn live_events_update_shared_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(dir.path(), &[]);
        let mut session = ParsingSession::new(path, SegmenterConfig::default()).unwrap();

        let parser = session.parser().clone();
        let event = parser
            .parse_line(1, &damage_line("18:20:00.000", 750))
            .unwrap();
        session.apply_live_event(event);

        session.with_state(|cache| {
            let enc = cache.current_encounter().unwrap();
            assert!(enc.is_active());
            assert_eq!(enc.events.len(), 1);
        });
        assert_eq!(session.current_line, 1);
    }
}
