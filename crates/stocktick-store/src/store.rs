//! File-backed history store with atomic replace.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;

use stocktick_core::{Observation, Symbol, UtcDateTime};

use crate::error::StoreError;
use crate::history::{DropReason, History, RecordOutcome};

/// What to do when the backing file exists but cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptPolicy {
    /// Refuse startup and surface [`StoreError::Corrupt`]. (Default)
    #[default]
    Fail,
    /// Rename the bad file to `<path>.corrupt-<unix-ts>` and continue
    /// with an empty history.
    Quarantine,
}

/// One observation skipped during an append, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedObservation {
    pub symbol: Symbol,
    pub timestamp: UtcDateTime,
    pub reason: DropReason,
}

/// Outcome of one append call. A non-empty `dropped` list is the partial
/// failure surface: the appended observations are still committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendReport {
    pub appended: usize,
    pub dropped: Vec<DroppedObservation>,
}

impl AppendReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Durable store for one history file.
///
/// The store owns no in-memory state beyond its path; the caller holds the
/// [`History`] and passes it into [`append`](HistoryStore::append). The
/// on-disk file, if fully written, is always a complete parseable snapshot
/// of the history as of the end of the last committed append.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    csv_export: bool,
}

impl HistoryStore {
    /// Read the backing file if present and validate it.
    ///
    /// A missing file yields an empty history; the file itself is created
    /// by the first successful append. An unreadable, unparseable, or
    /// invariant-violating file is handled per `policy`.
    pub fn open(
        path: impl Into<PathBuf>,
        policy: CorruptPolicy,
    ) -> Result<(Self, History), StoreError> {
        let store = Self {
            path: path.into(),
            csv_export: true,
        };

        if !store.path.exists() {
            return Ok((store, History::new()));
        }

        match store.try_load() {
            Ok(history) => Ok((store, history)),
            Err(detail) => match policy {
                CorruptPolicy::Fail => Err(StoreError::Corrupt {
                    path: store.path.clone(),
                    detail,
                }),
                CorruptPolicy::Quarantine => {
                    let archived = store.quarantine()?;
                    tracing::warn!(
                        path = %store.path.display(),
                        archived = %archived.display(),
                        detail = %detail,
                        "corrupt history file quarantined, starting empty"
                    );
                    Ok((store, History::new()))
                }
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_csv_export(mut self, csv_export: bool) -> Self {
        self.csv_export = csv_export;
        self
    }

    /// Merge a fetched batch into `history` and persist it.
    ///
    /// Per symbol: the observation is appended when it is strictly newer
    /// than the last recorded one, otherwise dropped and reported. The
    /// full history is rewritten atomically when at least one observation
    /// was recorded; a failed replace leaves the previous snapshot intact
    /// and the caller may retry on the next cycle.
    pub fn append(
        &self,
        history: &mut History,
        batch: Vec<Observation>,
    ) -> Result<AppendReport, StoreError> {
        let mut report = AppendReport::default();

        for observation in batch {
            let symbol = observation.symbol.clone();
            let timestamp = observation.timestamp;
            match history.record(observation) {
                RecordOutcome::Recorded => report.appended += 1,
                RecordOutcome::Dropped(reason) => report.dropped.push(DroppedObservation {
                    symbol,
                    timestamp,
                    reason,
                }),
            }
        }

        // Nothing recorded means the on-disk snapshot is already current.
        if report.appended > 0 {
            self.persist(history)?;
        }

        Ok(report)
    }

    /// Write the full history snapshot via write-to-temp-then-rename.
    ///
    /// The temporary file lives in the target's parent directory so the
    /// final rename stays on one filesystem. Any failure before the
    /// rename drops the temp file and leaves the committed file alone.
    pub fn persist(&self, history: &History) -> Result<(), StoreError> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(parent)?;

        serde_json::to_writer_pretty(&mut temp, history)?;
        temp.flush()?;
        temp.as_file().sync_all()?;

        temp.persist(&self.path).map_err(|e| StoreError::Replace {
            path: self.path.clone(),
            source: e.error,
        })?;

        if self.csv_export {
            if let Err(error) = self.export_csv(history) {
                // The JSON snapshot is the source of truth; a failed CSV
                // export never fails the append.
                tracing::warn!(
                    path = %self.csv_path().display(),
                    %error,
                    "csv export failed"
                );
            }
        }

        Ok(())
    }

    fn try_load(&self) -> Result<History, String> {
        let raw = fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        let history: History = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
        history.validate().map_err(|v| v.to_string())?;
        Ok(history)
    }

    fn quarantine(&self) -> Result<PathBuf, StoreError> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let archived = PathBuf::from(format!("{}.corrupt-{stamp}", self.path.display()));
        fs::rename(&self.path, &archived).map_err(|source| StoreError::Quarantine {
            path: self.path.clone(),
            source,
        })?;
        Ok(archived)
    }

    fn csv_path(&self) -> PathBuf {
        self.path.with_extension("csv")
    }

    /// Export the history as a flat CSV sibling file for easier analysis.
    fn export_csv(&self, history: &History) -> std::io::Result<()> {
        let mut out = String::from("Symbol,Timestamp,Price,Change,Percent_Change\n");

        for symbol in history.symbols() {
            if let Some(points) = history.points(symbol) {
                for point in points {
                    let change = point.change.map(|v| v.to_string()).unwrap_or_default();
                    let percent = point
                        .percent_change
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    out.push_str(&format!(
                        "{},{},{},{},{}\n",
                        symbol, point.timestamp, point.price, change, percent
                    ));
                }
            }
        }

        fs::write(self.csv_path(), out)
    }
}
