//! Candidate discovery
//!
//! Lists recordings in a directory that the ledger has not seen yet.

use super::ledger::ProcessedFileLedger;
use std::fs::DirEntry;
use std::path::Path;

/// Names starting with this are hidden
const HIDDEN_MARKER: char = '.';

/// Whether `file_name` looks like a recording with `extension`
pub fn is_recording_name(file_name: &str, extension: &str) -> bool {
    if file_name.starts_with(HIDDEN_MARKER) {
        return false;
    }
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.eq_ignore_ascii_case(extension),
        None => false,
    }
}

/// UTF-8 name of a non-directory entry; unreadable entries are logged and skipped
fn file_entry_name(entry: std::io::Result<DirEntry>) -> Option<String> {
    let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!("Skipping unreadable directory entry: {}", e);
            return None;
        }
    };
    match entry.file_type() {
        Ok(kind) if kind.is_dir() => return None,
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("Skipping {:?}: {}", entry.path(), e);
            return None;
        }
    }
    match entry.file_name().to_str() {
        Some(name) => Some(name.to_string()),
        None => {
            tracing::debug!("Skipping non-UTF-8 filename {:?}", entry.file_name());
            None
        }
    }
}

/// Unsynced recordings in `dir`, sorted by filename
///
/// Directories, hidden files, other extensions, non-UTF-8 names and names
/// already in the ledger are skipped, as are entries that cannot be read.
/// Only failing to open `dir` itself is an error.
pub fn discover_candidates(
    dir: &Path,
    extension: &str,
    ledger: &ProcessedFileLedger,
) -> std::io::Result<Vec<String>> {
    let mut candidates = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let Some(name) = file_entry_name(entry) else {
            continue;
        };
        if !is_recording_name(&name, extension) {
            continue;
        }
        if ledger.is_processed(&name) {
            continue;
        }
        candidates.push(name);
    }

    candidates.sort();
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_recording_names() {
        assert!(is_recording_name("rec_00001.wav", "wav"));
        assert!(is_recording_name("REC_00001.WAV", "wav"));
        assert!(!is_recording_name(".hidden.wav", "wav"));
        assert!(!is_recording_name("notes.txt", "wav"));
        assert!(!is_recording_name("wav", "wav"));
    }

    #[test]
    fn test_discovery_scenario() {
        let dir = tempdir().unwrap();
        let recordings = dir.path().join("recordings");
        fs::create_dir(&recordings).unwrap();
        for name in ["rec_00000.wav", "rec_00001.wav", "notes.txt", ".hidden.wav"] {
            fs::write(recordings.join(name), b"x").unwrap();
        }
        fs::create_dir(recordings.join("archive.wav")).unwrap();

        let ledger_path = dir.path().join(".processed");
        fs::write(&ledger_path, "rec_00000.wav\n").unwrap();
        let mut ledger = ProcessedFileLedger::new(&ledger_path);
        ledger.load().unwrap();

        let found = discover_candidates(&recordings, "wav", &ledger).unwrap();
        assert_eq!(found, vec!["rec_00001.wav".to_string()]);
    }

    #[test]
    fn test_sorted_by_name() {
        let dir = tempdir().unwrap();
        for name in ["rec_00002.wav", "rec_00000.wav", "rec_00001.wav"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let ledger = ProcessedFileLedger::new(dir.path().join("unused"));

        let found = discover_candidates(dir.path(), "wav", &ledger).unwrap();
        assert_eq!(found, vec!["rec_00000.wav", "rec_00001.wav", "rec_00002.wav"]);
    }

    #[test]
    fn test_unreadable_entry_is_skipped() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(file_entry_name(Err(err)), None);

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("rec_00000.wav"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(file_entry_name)
            .collect();
        assert_eq!(names, vec!["rec_00000.wav".to_string()]);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempdir().unwrap();
        let ledger = ProcessedFileLedger::new(dir.path().join("unused"));
        assert!(discover_candidates(&dir.path().join("nope"), "wav", &ledger).is_err());
    }
}
