//! Lightweight area extraction from log files.
//!
//! Scans a file for AreaEntered events without running the full decode
//! pipeline, so callers can label files by the operations visited in them.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Result as IoResult};
use std::path::Path;

use encoding_rs::WINDOWS_1252;

use crate::combat_log::LogParser;
use crate::context::resolve;
use crate::game_data::effect_type_id;

/// A single area visit extracted from a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAreaEntry {
    pub area_id: i64,
    pub area_name: String,
    pub difficulty_id: i64,
    pub difficulty_name: String,
}

/// The AreaEntered effect type id as raw bytes, for cheap pre-filtering
/// before any decoding happens.
const MARKER_BYTES: &[u8] = b"{836045448953664}";

/// Extract the deduplicated list of areas visited in a log file.
///
/// Lines are read as raw bytes; only lines containing the AreaEntered marker
/// are decoded (Windows-1252) and parsed.
pub fn extract_areas_from_file(path: &Path) -> IoResult<Vec<FileAreaEntry>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let parser = LogParser::default();
    let mut areas = Vec::new();
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    let mut line_buf = Vec::new();
    let mut line_number = 0u64;

    loop {
        line_buf.clear();
        let bytes_read = reader.read_until(b'\n', &mut line_buf)?;
        if bytes_read == 0 {
            break;
        }
        line_number += 1;

        if !line_buf
            .windows(MARKER_BYTES.len())
            .any(|w| w == MARKER_BYTES)
        {
            continue;
        }

        let (line, _, _) = WINDOWS_1252.decode(&line_buf);
        let Ok(event) = parser.parse_line(line_number, line.trim_end()) else {
            continue;
        };
        if event.effect.type_id != effect_type_id::AREAENTERED {
            continue;
        }

        let entry = FileAreaEntry {
            area_id: event.effect.effect_id,
            area_name: resolve(event.effect.effect_name).to_string(),
            difficulty_id: event.effect.difficulty_id,
            difficulty_name: resolve(event.effect.difficulty_name).to_string(),
        };
        if seen.insert((entry.area_id, entry.difficulty_id)) {
            areas.push(entry);
        }
    }

    Ok(areas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn extracts_deduplicated_areas() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[18:28:08.183] [@Jerran Zeva#689501114780828|(-8.56,3.11,-0.98,358.89)|(426912/442951)] [] [] [AreaEntered {{836045448953664}}: The Dread Palace {{137438993410}} 8 Player Master {{836045448953655}}] (he3000) <v7.0.0b>"
        )
        .unwrap();
        writeln!(
            file,
            "[18:28:09.000] [@Jerran Zeva#689501114780828|(-8.56,3.11,-0.98,358.89)|(426912/442951)] [@Jerran Zeva#689501114780828|(-8.56,3.11,-0.98,358.89)|(426912/442951)] [Force Speed {{812165430771712}}] [ApplyEffect {{836045448945477}}: Force Speed {{812165430771712}}] ()"
        )
        .unwrap();
        writeln!(
            file,
            "[18:30:08.183] [@Jerran Zeva#689501114780828|(-8.56,3.11,-0.98,358.89)|(426912/442951)] [] [] [AreaEntered {{836045448953664}}: The Dread Palace {{137438993410}} 8 Player Master {{836045448953655}}] (he3000) <v7.0.0b>"
        )
        .unwrap();

        let areas = extract_areas_from_file(file.path()).unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].area_name, "The Dread Palace");
        assert_eq!(areas[0].area_id, 137438993410);
        assert_eq!(areas[0].difficulty_name, "8 Player Master");
        assert_eq!(areas[0].difficulty_id, 836045448953655);
    }

    #[test]
    fn ignores_files_without_area_events() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a combat log line").unwrap();
        let areas = extract_areas_from_file(file.path()).unwrap();
        assert!(areas.is_empty());
    }
}
