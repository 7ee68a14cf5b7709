//! Durable ledger of processed post identifiers
//!
//! The ledger is an append-only log with one identifier per line (a
//! single-column CSV, so files written by older tooling load unchanged).
//! It is read fully into memory at startup; every [`DedupLedger::record`]
//! appends and flushes to disk before the in-memory set is updated, so a
//! crash in between can only cause a harmless re-check, never a lost record.
//!
//! # Example
//!
//! ```no_run
//! use replybot::storage::DedupLedger;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), replybot::error::PersistenceError> {
//! let mut ledger = DedupLedger::open(Path::new("processed_tweets_log.csv"))?;
//! if !ledger.contains("1790000000000000000") {
//!     ledger.record("1790000000000000000")?;
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::utils::error::PersistenceError;

/// Append-only set of identifiers that have been replied to
#[derive(Debug)]
pub struct DedupLedger {
    path: PathBuf,
    ids: HashSet<String>,
}

impl DedupLedger {
    /// Load the ledger at `path`; a missing file is an empty ledger
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let ids = match File::open(path) {
            Ok(file) => read_ids(BufReader::new(file)).map_err(|source| PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(source) => {
                return Err(PersistenceError::Open {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        tracing::debug!(path = %path.display(), count = ids.len(), "Ledger loaded");

        Ok(Self {
            path: path.to_path_buf(),
            ids,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Durably append `id`, then add it to the in-memory set
    ///
    /// Recording an identifier that is already present is a no-op.
    pub fn record(&mut self, id: &str) -> Result<(), PersistenceError> {
        let id = id.trim();
        if id.is_empty() || self.ids.contains(id) {
            return Ok(());
        }

        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| PersistenceError::Open {
                path: self.path.clone(),
                source,
            })?;
        writeln!(file, "{id}").map_err(write_err)?;
        file.sync_data().map_err(write_err)?;

        self.ids.insert(id.to_string());
        tracing::debug!(id = %id, "Recorded processed id");
        Ok(())
    }

    /// Identifiers to hand to discovery as exclusions
    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_ids(reader: impl BufRead) -> std::io::Result<HashSet<String>> {
    let mut ids = HashSet::new();
    for line in reader.lines() {
        let line = line?;
        // First CSV column only; quoted values are unwrapped
        let first = line.split(',').next().unwrap_or_default();
        let id = first.trim().trim_matches('"');
        if !id.is_empty() {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}
