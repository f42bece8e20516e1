//! Generation driver: sizing, the entry loop and the final report.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{ArchiveConfig, MethodTagPolicy};
use crate::directory::{write_central_directory, DirectorySummary};
use crate::entry::{entry_name, write_entry, EntryRecord};
use crate::error::{Result, ZiplodeError};
use crate::fs_utils::{check_disk_space, create_directory, file_size, format_size, DiskSpace};
use crate::pattern::try_generate_pattern;
use crate::writer::CountingWriter;

/// Upper bound on the number of entries in one archive.
pub const MAX_ENTRIES: usize = 1000;
/// Log a progress line every this many entries.
const PROGRESS_INTERVAL: usize = 100;

/// Lifecycle of one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Validating,
    Initializing,
    WritingEntries,
    WritingDirectory,
    Done,
    Failed,
}

/// Entry count and per-entry payload size derived from a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryPlan {
    pub target_bytes: u64,
    pub entry_count: usize,
    pub pattern_size: usize,
    /// The computed count exceeded [`MAX_ENTRIES`] and the pattern was resized.
    pub clamped: bool,
}

/// Work out how many entries to write and how large each payload is.
pub fn plan_entries(config: &ArchiveConfig) -> EntryPlan {
    let target_bytes = config.target_bytes();
    let pattern = (config.pattern_size as u64).max(1);
    let count = (target_bytes / pattern).max(1);
    if count > MAX_ENTRIES as u64 {
        EntryPlan {
            target_bytes,
            entry_count: MAX_ENTRIES,
            pattern_size: (target_bytes / MAX_ENTRIES as u64) as usize,
            clamped: true,
        }
    } else {
        EntryPlan {
            target_bytes,
            entry_count: count as usize,
            pattern_size: pattern as usize,
            clamped: false,
        }
    }
}

/// Passed to the progress callback after each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryProgress {
    /// Entries written so far.
    pub done: usize,
    pub total: usize,
    /// Stream position after the entry.
    pub bytes_written: u64,
}

/// Everything written by one successful run.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    pub plan: EntryPlan,
    pub entries: Vec<EntryRecord>,
    pub directory: DirectorySummary,
    /// Total bytes written, end record included.
    pub archive_bytes: u64,
    /// Payload synthesis, entry loop and directory.
    pub elapsed: Duration,
}

/// Metrics of a finished archive file.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub output: PathBuf,
    pub entry_count: usize,
    pub pattern_size: usize,
    pub target_bytes: u64,
    pub archive_bytes: u64,
    pub elapsed_secs: f64,
    /// Archive size divided by target size.
    pub ratio: f64,
    /// Target size divided by archive size.
    pub expansion: f64,
    pub compression_level: u8,
    pub method_tag: MethodTagPolicy,
}

impl GenerationReport {
    fn new(
        output: &Path,
        config: &ArchiveConfig,
        layout: &ArchiveLayout,
        archive_bytes: u64,
    ) -> Self {
        let target = layout.plan.target_bytes;
        Self {
            output: output.to_path_buf(),
            entry_count: layout.entries.len(),
            pattern_size: layout.plan.pattern_size,
            target_bytes: target,
            archive_bytes,
            elapsed_secs: layout.elapsed.as_secs_f64(),
            ratio: archive_bytes as f64 / target as f64,
            expansion: if archive_bytes == 0 {
                0.0
            } else {
                target as f64 / archive_bytes as f64
            },
            compression_level: config.compression_level,
            method_tag: config.method_tag,
        }
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Archive: {}", self.output.display())?;
        writeln!(
            f,
            "Entries: {} x {}",
            self.entry_count,
            format_size(self.pattern_size as u64)
        )?;
        writeln!(f, "Target size: {}", format_size(self.target_bytes))?;
        writeln!(
            f,
            "Archive size: {} ({} bytes)",
            format_size(self.archive_bytes),
            self.archive_bytes
        )?;
        writeln!(f, "Ratio: {:.4}%", self.ratio * 100.0)?;
        writeln!(f, "Expansion: {:.1}x", self.expansion)?;
        write!(f, "Time: {:.3}s", self.elapsed_secs)
    }
}

/// Drives one generation call through its [`Stage`]s.
///
/// The configuration is borrowed for the whole call; the running offset and
/// the entry list are owned here and never shared.
pub struct BombGenerator<'a> {
    config: &'a ArchiveConfig,
    stage: Stage,
    failed_during: Option<Stage>,
}

impl<'a> BombGenerator<'a> {
    pub fn new(config: &'a ArchiveConfig) -> Self {
        Self {
            config,
            stage: Stage::Validating,
            failed_during: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Stage that was active when the call failed.
    pub fn failed_during(&self) -> Option<Stage> {
        self.failed_during
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = ?self.stage, to = ?stage, "stage");
        self.stage = stage;
    }

    fn fail(&mut self, err: ZiplodeError) -> ZiplodeError {
        error!(stage = ?self.stage, code = err.code().as_i32(), "{err}");
        self.failed_during = Some(self.stage);
        self.stage = Stage::Failed;
        err
    }

    /// Validate the configuration and write a complete archive to `writer`.
    /// The writer is flushed and handed back on success.
    pub fn write_to<W, F>(&mut self, writer: W, progress: F) -> Result<(W, ArchiveLayout)>
    where
        W: Write,
        F: FnMut(EntryProgress),
    {
        self.enter(Stage::Validating);
        if let Err(e) = self.config.validate() {
            return Err(self.fail(e));
        }
        let mut out = CountingWriter::new(writer);
        let layout = self.run(&mut out, progress)?;
        Ok((out.into_inner(), layout))
    }

    /// Validate, create `path` and write the archive into it.
    ///
    /// Validation failures leave no file behind. A failure after the file is
    /// created leaves whatever was written so far.
    pub fn write_file<F>(&mut self, path: &Path, progress: F) -> Result<GenerationReport>
    where
        F: FnMut(EntryProgress),
    {
        self.enter(Stage::Validating);
        if let Err(e) = self.preflight(path) {
            return Err(self.fail(e));
        }

        self.enter(Stage::Initializing);
        let file = match File::create(path) {
            Ok(f) => f,
            Err(source) => {
                return Err(self.fail(ZiplodeError::FileCreate {
                    path: path.to_path_buf(),
                    source,
                }))
            }
        };
        let mut out = CountingWriter::new(BufWriter::new(file));
        let layout = self.run(&mut out, progress)?;
        drop(out);

        let archive_bytes = file_size(path).map_err(ZiplodeError::Write)?;
        let report = GenerationReport::new(path, self.config, &layout, archive_bytes);
        info!(
            file = %path.display(),
            size = %format_size(archive_bytes),
            ratio = %format!("{:.4}%", report.ratio * 100.0),
            "archive complete"
        );
        Ok(report)
    }

    fn preflight(&self, path: &Path) -> Result<()> {
        self.config.validate_for(path)?;
        let estimate = self.config.target_bytes() / MAX_ENTRIES as u64;
        match check_disk_space(path, estimate) {
            DiskSpace::Sufficient => Ok(()),
            DiskSpace::Insufficient { available } => Err(ZiplodeError::InvalidParameter(format!(
                "insufficient disk space: need about {}, {} available",
                format_size(estimate),
                format_size(available)
            ))),
            DiskSpace::Unknown => {
                warn!(path = %path.display(), "could not determine free disk space");
                Ok(())
            }
        }
    }

    fn run<W, F>(&mut self, out: &mut CountingWriter<W>, mut progress: F) -> Result<ArchiveLayout>
    where
        W: Write,
        F: FnMut(EntryProgress),
    {
        self.enter(Stage::Initializing);
        let plan = plan_entries(self.config);
        info!(
            target_size = %format_size(plan.target_bytes),
            entries = plan.entry_count,
            pattern_size = plan.pattern_size,
            level = self.config.compression_level,
            "planning archive"
        );
        if plan.clamped {
            debug!(max = MAX_ENTRIES, pattern_size = plan.pattern_size, "entry count clamped");
        }
        if self.config.nested_compression {
            warn!(
                levels = self.config.nested_levels,
                "nested compression is not supported, ignoring"
            );
        }

        let started = Instant::now();
        let payload = match try_generate_pattern(plan.pattern_size, self.config.pattern_char) {
            Ok(p) => p,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(Stage::WritingEntries);
        let mut entries = Vec::with_capacity(plan.entry_count);
        for index in 0..plan.entry_count {
            let name = entry_name(index);
            let record = match write_entry(out, &name, &payload, self.config.method_tag) {
                Ok(r) => r,
                Err(e) => return Err(self.fail(e)),
            };
            entries.push(record);

            let done = index + 1;
            if done % PROGRESS_INTERVAL == 0 || done == plan.entry_count {
                info!("progress: {done}/{}", plan.entry_count);
            }
            progress(EntryProgress {
                done,
                total: plan.entry_count,
                bytes_written: out.position(),
            });
        }

        self.enter(Stage::WritingDirectory);
        let directory = match write_central_directory(out, &entries) {
            Ok(d) => d,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = out.flush() {
            return Err(self.fail(e.into()));
        }
        let elapsed = started.elapsed();

        self.enter(Stage::Done);
        Ok(ArchiveLayout {
            plan,
            entries,
            directory,
            archive_bytes: out.position(),
            elapsed,
        })
    }
}

/// Write an archive for `config` into any writer.
pub fn generate_to_writer<W, F>(
    writer: W,
    config: &ArchiveConfig,
    progress: F,
) -> Result<(W, ArchiveLayout)>
where
    W: Write,
    F: FnMut(EntryProgress),
{
    BombGenerator::new(config).write_to(writer, progress)
}

/// Write an archive for `config` to `path`.
pub fn generate_file<P, F>(
    path: P,
    config: &ArchiveConfig,
    progress: F,
) -> Result<GenerationReport>
where
    P: AsRef<Path>,
    F: FnMut(EntryProgress),
{
    BombGenerator::new(config).write_file(path.as_ref(), progress)
}

/// Like [`generate_file`], creating the parent directory first when missing.
pub fn generate_file_with_parents<P, F>(
    path: P,
    config: &ArchiveConfig,
    progress: F,
) -> Result<GenerationReport>
where
    P: AsRef<Path>,
    F: FnMut(EntryProgress),
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        config.validate_for(path)?;
        create_directory(parent).map_err(|source| ZiplodeError::FileCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    generate_file(path, config, progress)
}
