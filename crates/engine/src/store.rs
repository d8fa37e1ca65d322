//! Report store: immutable per-run artifacts plus an append-only history index.

use chrono::Utc;
use readyprobe_common::hash::{sha256_bytes, sha256_file};
use readyprobe_common::{Error, Result, RunId};
use readyprobe_report_schema::{validate_report, CompositeReport, HistoryEntry};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// History index file name inside the report directory.
pub const HISTORY_FILE: &str = "history.jsonl";

/// Outcome of checking an artifact against its recorded checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Intact,
    Modified { expected: String, actual: String },
    Missing,
}

/// Directory of persisted reports.
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    /// Open (creating if needed) the report directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact file name for a run.
    pub fn file_name(run_id: &RunId) -> String {
        let key = run_id.as_str().strip_prefix("run-").unwrap_or(run_id.as_str());
        format!("report-{}.json", key)
    }

    /// Validate and write `report` exactly once, then index it.
    pub fn persist(&self, report: &CompositeReport) -> Result<PathBuf> {
        let validation = validate_report(report).map_err(|e| Error::InvalidReport(e.to_string()))?;
        for warning in &validation.warnings {
            warn!("Report {}: {}", report.run_id, warning);
        }
        if !validation.valid {
            let errors: Vec<String> = validation.errors.iter().map(|e| e.to_string()).collect();
            return Err(Error::InvalidReport(errors.join("; ")));
        }

        let file = Self::file_name(&report.run_id);
        let path = self.dir.join(&file);
        let content = serde_json::to_vec_pretty(report)?;

        let mut handle = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(handle) => handle,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Persistence(format!(
                    "report for {} already exists at {}",
                    report.run_id,
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let entry = HistoryEntry {
            run_id: report.run_id.clone(),
            target_address: report.target_address.clone(),
            file,
            sha256: sha256_bytes(&content),
            overall_score: report.overall_score,
            readiness_tier: report.readiness_tier,
            written_at: Utc::now(),
        };
        let written = handle
            .write_all(&content)
            .and_then(|()| handle.sync_all())
            .map_err(Error::from)
            .and_then(|()| self.append_history(&entry));
        drop(handle);

        // An artifact that is not indexed cannot be found again.
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!("Failed to remove unindexed {}: {}", path.display(), cleanup);
            }
            return Err(Error::Persistence(format!(
                "report for {} was not recorded: {}",
                report.run_id, e
            )));
        }

        let mut permissions = fs::metadata(&path)?.permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions)?;

        info!("Report written to {}", path.display());
        Ok(path)
    }

    fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut history = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(HISTORY_FILE))?;
        history.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Every indexed run, oldest first.
    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        let path = self.dir.join(HISTORY_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping malformed history line {}: {}", number + 1, e),
            }
        }
        debug!("{} run(s) in history", entries.len());
        Ok(entries)
    }

    /// History entry for `run_id`, or the newest entry for "latest".
    pub fn find(&self, run_id: &str) -> Result<HistoryEntry> {
        let history = self.history()?;
        let found = if run_id == "latest" {
            history.into_iter().last()
        } else {
            history.into_iter().find(|e| e.run_id.as_str() == run_id)
        };
        found.ok_or_else(|| Error::ReportNotFound(run_id.to_string()))
    }

    /// Load a persisted report.
    pub fn load(&self, run_id: &str) -> Result<CompositeReport> {
        let entry = self.find(run_id)?;
        let content = fs::read_to_string(self.dir.join(&entry.file))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Compare an artifact with the checksum recorded when it was written.
    pub fn verify(&self, run_id: &str) -> Result<Verification> {
        let entry = self.find(run_id)?;
        let path = self.dir.join(&entry.file);
        if !path.exists() {
            return Ok(Verification::Missing);
        }
        let actual = sha256_file(&path)?;
        if actual == entry.sha256 {
            Ok(Verification::Intact)
        } else {
            Ok(Verification::Modified {
                expected: entry.sha256,
                actual,
            })
        }
    }
}
