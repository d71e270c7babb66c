//! Traversal and worker pool.
//!
//! One thread walks the input tree and feeds a bounded queue, `workers`
//! threads clean files from it, and a collector thread watches the error
//! channel. The first error stops the run: no new files are picked up, files
//! already being written are finished, and the error is returned.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use crossbeam_channel as channel;
use mgc_core::{Error, Report, Result};
use mgc_obfuscate::{Obfuscator, Sequence};
use mgc_sources::{Entry, InputFile, KubeResource, Omitter, OutputSink, kube, walk};

use crate::Reporter;

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub files_obfuscated: u64,
    pub files_omitted: u64,
    pub lines: u64,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub stats: RunStats,
}

enum FileOutcome {
    Omitted,
    Obfuscated { lines: u64 },
}

#[derive(Default)]
struct Counters {
    obfuscated: AtomicU64,
    lines: AtomicU64,
}

pub struct Pipeline {
    obfuscators: Sequence,
    omitters: Vec<Box<dyn Omitter>>,
    sink: Box<dyn OutputSink>,
    workers: usize,
}

impl Pipeline {
    pub fn new(
        obfuscators: Sequence,
        omitters: Vec<Box<dyn Omitter>>,
        sink: Box<dyn OutputSink>,
        workers: usize,
    ) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        Ok(Self {
            obfuscators,
            omitters,
            sink,
            workers,
        })
    }

    pub fn obfuscators(&self) -> &Sequence {
        &self.obfuscators
    }

    /// Clean every file under `input`.
    pub fn run(&self, input: &Path) -> Result<RunOutcome> {
        if !input.is_dir() {
            return Err(Error::Config(format!(
                "input {} is not a directory",
                input.display()
            )));
        }
        tracing::info!(input = %input.display(), workers = self.workers, "starting run");

        let reporter = Reporter::new();
        let counters = Counters::default();
        let abort = AtomicBool::new(false);

        let (work_tx, work_rx) = channel::bounded::<InputFile>(self.workers);
        let (err_tx, err_rx) = channel::unbounded::<Error>();

        let first_error = thread::scope(|s| {
            let abort = &abort;
            let reporter = &reporter;
            let counters = &counters;

            let collector = s.spawn(move || {
                let mut first = None;
                for err in err_rx.iter() {
                    tracing::error!(error = %err, fatal = err.is_fatal(), "run failed");
                    abort.store(true, Ordering::SeqCst);
                    if first.is_none() {
                        first = Some(err);
                    }
                }
                first
            });

            let traversal_errors = err_tx.clone();
            let traversal = s.spawn(move || {
                let result = walk(input, |entry| {
                    if abort.load(Ordering::SeqCst) {
                        return Ok(false);
                    }
                    match entry {
                        Entry::File(file) => Ok(work_tx.send(file).is_ok()),
                        Entry::Symlink(relative) => {
                            tracing::debug!(path = %relative, "omitting symlink");
                            reporter.omit(relative);
                            Ok(true)
                        }
                    }
                });
                if let Err(e) = result {
                    let _ = traversal_errors.send(e);
                }
            });

            let workers: Vec<_> = (0..self.workers)
                .map(|id| {
                    let work_rx = work_rx.clone();
                    let err_tx = err_tx.clone();
                    s.spawn(move || {
                        while let Ok(file) = work_rx.recv() {
                            if abort.load(Ordering::SeqCst) {
                                break;
                            }
                            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process(&file)))
                                .unwrap_or_else(|payload| Err(panic_error(payload)));
                            match outcome {
                                Ok(FileOutcome::Omitted) => {
                                    tracing::debug!(worker = id, path = %file.relative, "omitted");
                                    reporter.omit(file.relative);
                                }
                                Ok(FileOutcome::Obfuscated { lines }) => {
                                    tracing::debug!(worker = id, path = %file.relative, lines, "obfuscated");
                                    counters.obfuscated.fetch_add(1, Ordering::Relaxed);
                                    counters.lines.fetch_add(lines, Ordering::Relaxed);
                                }
                                Err(e) => {
                                    abort.store(true, Ordering::SeqCst);
                                    let _ = err_tx.send(Error::at_path(file.path, e));
                                }
                            }
                        }
                    })
                })
                .collect();
            drop(work_rx);
            drop(err_tx);

            let mut thread_panicked = traversal.join().is_err();
            for worker in workers {
                thread_panicked |= worker.join().is_err();
            }
            let first = collector.join().unwrap_or(None);
            match (first, thread_panicked) {
                (Some(err), _) => Some(err),
                (None, true) => Some(Error::Other(anyhow::anyhow!("a pipeline thread panicked"))),
                (None, false) => None,
            }
        });

        if let Some(err) = first_error {
            return Err(err);
        }

        let stats = RunStats {
            files_obfuscated: counters.obfuscated.load(Ordering::SeqCst),
            files_omitted: reporter.omitted() as u64,
            lines: counters.lines.load(Ordering::SeqCst),
        };
        tracing::info!(
            files_obfuscated = stats.files_obfuscated,
            files_omitted = stats.files_omitted,
            lines = stats.lines,
            "run finished"
        );

        Ok(RunOutcome {
            report: reporter.report(&self.obfuscators),
            stats,
        })
    }

    fn is_omitted(&self, file: &InputFile) -> Result<bool> {
        let mut resources: Option<Vec<KubeResource>> = None;
        for omitter in &self.omitters {
            if omitter.omit_path(&file.relative)? {
                return Ok(true);
            }
            if !omitter.inspects_resources() || !kube::is_manifest(&file.path) {
                continue;
            }
            if resources.is_none() {
                resources = Some(kube::load(&file.path)?);
            }
            for resource in resources.iter().flatten() {
                if omitter.omit_kube_resource(resource)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn process(&self, file: &InputFile) -> Result<FileOutcome> {
        if self.is_omitted(file)? {
            return Ok(FileOutcome::Omitted);
        }

        let relative = self.obfuscators.path(&file.relative)?;
        let mut sink = self.sink.create(&relative, &file.permissions)?;

        let mut lines = 0;
        let written = file.open().and_then(|reader| {
            for line in reader {
                sink.write_line(&self.obfuscators.contents(&line?)?)?;
                lines += 1;
            }
            Ok(())
        });
        let closed = sink.close();
        written?;
        closed?;

        Ok(FileOutcome::Obfuscated { lines })
    }
}

/// Turn a caught panic into an error so it stops the run like any other.
fn panic_error(payload: Box<dyn Any + Send>) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    Error::Other(anyhow::anyhow!("worker panicked: {}", message))
}
