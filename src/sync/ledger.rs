//! Processed-file ledger
//!
//! A growth-only set of recording filenames the server has acknowledged.
//! On storage it is one name per line, newline-terminated. Every addition
//! rewrites the whole file through a temp file and rename, so the file on
//! storage is always a complete, de-duplicated snapshot.

use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filename for ledger: {0:?}")]
    InvalidName(String),
}

pub struct ProcessedFileLedger {
    path: PathBuf,
    /// Insertion order, as written to storage
    entries: Vec<String>,
    index: HashSet<String>,
}

impl ProcessedFileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            index: HashSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory set with the contents of the ledger file
    ///
    /// A missing file is an empty ledger. On error the in-memory set is
    /// left empty.
    pub fn load(&mut self) -> Result<(), LedgerError> {
        self.entries.clear();
        self.index.clear();

        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No processed log at {:?}, starting fresh", self.path);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        let mut index = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let name = line.strip_suffix('\r').unwrap_or(&line);
            if name.is_empty() {
                continue;
            }
            if index.insert(name.to_string()) {
                entries.push(name.to_string());
            }
        }

        self.entries = entries;
        self.index = index;
        tracing::info!("Loaded {} processed file(s) from log", self.entries.len());
        Ok(())
    }

    pub fn is_processed(&self, file_name: &str) -> bool {
        self.index.contains(file_name)
    }

    /// Record `file_name` as delivered and persist the ledger
    ///
    /// Already-present names are a no-op with no write. If persisting
    /// fails the name stays in memory and the error is returned.
    pub fn mark_processed(&mut self, file_name: &str) -> Result<(), LedgerError> {
        if file_name.is_empty() || file_name.contains('\n') || file_name.contains('\r') {
            return Err(LedgerError::InvalidName(file_name.to_string()));
        }
        if self.is_processed(file_name) {
            return Ok(());
        }

        self.index.insert(file_name.to_string());
        self.entries.push(file_name.to_string());

        self.persist()?;
        tracing::info!("Marked as processed: {}", file_name);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were added
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    fn persist(&self) -> Result<(), LedgerError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut out = std::io::BufWriter::new(tmp.as_file_mut());
            for name in &self.entries {
                writeln!(out, "{}", name)?;
            }
            out.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| LedgerError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_log_is_empty() {
        let dir = tempdir().unwrap();
        let mut ledger = ProcessedFileLedger::new(dir.path().join(".processed"));
        ledger.load().unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.is_processed("rec_00000.wav"));
    }

    #[test]
    fn test_mark_then_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".processed");

        let mut ledger = ProcessedFileLedger::new(&path);
        ledger.load().unwrap();
        ledger.mark_processed("rec_00000.wav").unwrap();
        ledger.mark_processed("rec_00001.wav").unwrap();

        let mut fresh = ProcessedFileLedger::new(&path);
        fresh.load().unwrap();
        assert!(fresh.is_processed("rec_00000.wav"));
        assert!(fresh.is_processed("rec_00001.wav"));
        assert!(!fresh.is_processed("rec_00002.wav"));
        assert_eq!(fresh.entries(), &["rec_00000.wav", "rec_00001.wav"]);
    }

    #[test]
    fn test_mark_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".processed");

        let mut ledger = ProcessedFileLedger::new(&path);
        ledger.mark_processed("rec_00007.wav").unwrap();
        let before = fs::read_to_string(&path).unwrap();

        ledger.mark_processed("rec_00007.wav").unwrap();
        let after = fs::read_to_string(&path).unwrap();

        assert_eq!(before, "rec_00007.wav\n");
        assert_eq!(before, after);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_load_skips_blanks_and_duplicates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".processed");
        fs::write(&path, "a.wav\n\nb.wav\r\na.wav\nc.wav").unwrap();

        let mut ledger = ProcessedFileLedger::new(&path);
        ledger.load().unwrap();
        assert_eq!(ledger.entries(), &["a.wav", "b.wav", "c.wav"]);

        // Rewrite on the next mark is de-duplicated and newline-terminated.
        ledger.mark_processed("d.wav").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "a.wav\nb.wav\nc.wav\nd.wav\n"
        );
    }

    #[test]
    fn test_load_replaces_memory_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".processed");
        let mut ledger = ProcessedFileLedger::new(&path);
        ledger.mark_processed("x.wav").unwrap();

        fs::write(&path, "y.wav\n").unwrap();
        ledger.load().unwrap();
        assert!(!ledger.is_processed("x.wav"));
        assert!(ledger.is_processed("y.wav"));
    }

    #[test]
    fn test_rejects_names_with_newlines() {
        let dir = tempdir().unwrap();
        let mut ledger = ProcessedFileLedger::new(dir.path().join(".processed"));
        assert!(matches!(
            ledger.mark_processed("bad\nname.wav"),
            Err(LedgerError::InvalidName(_))
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let dir = tempdir().unwrap();
        // Parent of the ledger path is a regular file, so nothing can be written.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let mut ledger = ProcessedFileLedger::new(blocker.join(".processed"));
        assert!(ledger.mark_processed("rec_00000.wav").is_err());
        assert!(ledger.is_processed("rec_00000.wav"));
    }

    #[test]
    fn test_unreadable_log_is_error() {
        let dir = tempdir().unwrap();
        // A directory where the log should be.
        let path = dir.path().join(".processed");
        fs::create_dir(&path).unwrap();

        let mut ledger = ProcessedFileLedger::new(&path);
        assert!(ledger.load().is_err());
    }
}
