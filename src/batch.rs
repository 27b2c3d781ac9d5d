//! Batch driver: archive discovery, per-archive conversion and the run log

use crate::config::ConverterConfig;
use crate::convert::Converter;
use crate::io::kmz_reader::archive_stem;
use crate::types::{ConversionOutcome, KmzResult};
use chrono::{DateTime, Local};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Batch-level cancellation: once set, no further conversions are started
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a batch run, partitioned by archive base name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub successful: Vec<String>,
    pub skipped: Vec<String>,
    /// Base name and error description
    pub failed: Vec<(String, String)>,
    /// Archives not started because the batch was cancelled
    pub cancelled: Vec<String>,
}

impl BatchResult {
    pub fn record(&mut self, name: String, result: KmzResult<ConversionOutcome>) {
        match result {
            Ok(ConversionOutcome::Converted(_)) => self.successful.push(name),
            Ok(ConversionOutcome::Skipped(_)) => self.skipped.push(name),
            Err(e) => {
                log::error!("  ❌ Failed: {} → {}", name, e);
                self.failed.push((name, e.to_string()));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.successful.len() + self.skipped.len() + self.failed.len() + self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "──────────────────────────────")?;
        if !self.successful.is_empty() {
            writeln!(f, "✅ Successful: {}", self.successful.join(", "))?;
        }
        if !self.skipped.is_empty() {
            writeln!(f, "⏭️ Skipped: {}", self.skipped.join(", "))?;
        }
        if !self.failed.is_empty() {
            let names: Vec<&str> = self.failed.iter().map(|(n, _)| n.as_str()).collect();
            writeln!(f, "❌ Failed: {}", names.join(", "))?;
            for (name, reason) in &self.failed {
                writeln!(f, "   {}: {}", name, reason)?;
            }
        }
        if !self.cancelled.is_empty() {
            writeln!(f, "⛔ Not started (cancelled): {}", self.cancelled.join(", "))?;
        }
        write!(f, "──────────────────────────────")
    }
}

/// Archives directly inside `dir` with the given extension (case-insensitive), sorted
pub fn discover_archives(dir: &Path, extension: &str) -> KmzResult<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches && path.is_file() {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

/// Append-only record of successfully converted archives
pub struct ConversionLog {
    path: PathBuf,
}

impl ConversionLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Section text for one run: sorted, deduplicated names under a timestamp header
    pub fn format_section(names: &[String], timestamp: &DateTime<Local>) -> Option<String> {
        if names.is_empty() {
            return None;
        }
        let sorted: BTreeSet<&str> = names.iter().map(String::as_str).collect();

        let mut section = format!(
            "\n--- Conversion on {} ---\n",
            timestamp.format("%m/%d/%Y %H:%M:%S")
        );
        for name in sorted {
            section.push_str(name);
            section.push('\n');
        }
        section.push('\n');
        Some(section)
    }

    /// Append a section for `names`; returns false when there was nothing to log
    pub fn append_run(&self, names: &[String], timestamp: &DateTime<Local>) -> std::io::Result<bool> {
        let section = match Self::format_section(names, timestamp) {
            Some(s) => s,
            None => return Ok(false),
        };
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(section.as_bytes())?;
        Ok(true)
    }
}

/// Converts every archive of the input directory
pub struct BatchDriver {
    converter: Converter,
    cancel: CancelFlag,
}

impl BatchDriver {
    pub fn new(config: ConverterConfig) -> KmzResult<Self> {
        config.validate()?;
        Ok(Self {
            converter: Converter::new(config)?,
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ConverterConfig {
        self.converter.config()
    }

    /// Run the whole batch, then append the run's successes to the log file
    pub fn run(&self) -> KmzResult<BatchResult> {
        let config = self.config();
        std::fs::create_dir_all(&config.output_dir)?;

        let archives = discover_archives(&config.input_dir, &config.archive_extension)?;
        if archives.is_empty() {
            log::info!("No KMZ files found in: {}", config.input_dir.display());
            return Ok(BatchResult::default());
        }
        log::info!("Found {} archives in {}", archives.len(), config.input_dir.display());

        let result = self.run_archives(&archives);

        let log_file = ConversionLog::new(config.log_file_path());
        if let Err(e) = log_file.append_run(&result.successful, &Local::now()) {
            log::warn!("Failed to update {}: {}", log_file.path().display(), e);
        }
        Ok(result)
    }

    /// Convert the given archives and collect their outcomes
    pub fn run_archives(&self, archives: &[PathBuf]) -> BatchResult {
        // Archives sharing a base name target the same output; only the first
        // one may run concurrently, the rest go afterwards in order.
        let mut seen = HashSet::new();
        let (first, repeats): (Vec<&PathBuf>, Vec<&PathBuf>) =
            archives.iter().partition(|a| seen.insert(archive_stem(a)));

        let mut outcomes = self.convert_all(&first);
        outcomes.extend(repeats.into_iter().map(|a| self.convert_one(a)));

        let mut result = BatchResult::default();
        for (name, outcome) in outcomes {
            match outcome {
                Some(outcome) => result.record(name, outcome),
                None => result.cancelled.push(name),
            }
        }
        if !result.cancelled.is_empty() {
            log::warn!("Batch cancelled, {} archives not started", result.cancelled.len());
        }
        result
    }

    fn convert_one(&self, archive: &Path) -> (String, Option<KmzResult<ConversionOutcome>>) {
        let name = archive_stem(archive);
        if self.cancel.is_cancelled() {
            return (name, None);
        }
        let outcome = self.converter.convert(archive);
        (name, Some(outcome))
    }

    #[cfg(feature = "parallel")]
    fn convert_all(&self, archives: &[&PathBuf]) -> Vec<(String, Option<KmzResult<ConversionOutcome>>)> {
        use rayon::prelude::*;

        let jobs = self.config().jobs;
        if jobs <= 1 || archives.len() <= 1 {
            return archives.iter().map(|a| self.convert_one(a)).collect();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => {
                log::debug!("Converting on {} worker threads", jobs);
                pool.install(|| archives.par_iter().map(|a| self.convert_one(a)).collect())
            }
            Err(e) => {
                log::warn!("Failed to build thread pool ({}), converting sequentially", e);
                archives.iter().map(|a| self.convert_one(a)).collect()
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn convert_all(&self, archives: &[&PathBuf]) -> Vec<(String, Option<KmzResult<ConversionOutcome>>)> {
        archives.iter().map(|a| self.convert_one(a)).collect()
    }
}

/// Convert every archive in `config.input_dir`
pub fn convert_directory(config: ConverterConfig) -> KmzResult<BatchResult> {
    BatchDriver::new(config)?.run()
}
