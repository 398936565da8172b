//! Batch generation.
//!
//! A batch reads payloads from one [`PayloadSource`], drops the ones that fail
//! validation, and renders every survivor with one shared [`RenderOptions`]
//! template. Survivor *i* (1-based, in input order) is written as
//! `{prefix}_{i}.{ext}` in the output directory.
//!
//! ## Failure scope
//!
//! | Failure | Effect |
//! |---|---|
//! | Invalid payload | dropped before indexing, logged, no result |
//! | Capacity or write error | recorded in that item's [`GenerationResult`] |
//! | Source file unreadable | whole batch fails with [`BatchError`] |
//!
//! Invalid payloads are dropped here but abort single-mode generation
//! ([`crate::pipeline::generate`] returns `InvalidPayload`). A batch input is
//! often a scraped list where skipping bad rows is the useful behavior.
//!
//! ## Parallelism
//!
//! With `parallel` set, items run on the global rayon pool. Indices are assigned
//! before dispatch and results come back in input order; only the order of
//! progress events varies.

use crate::config::QrConfig;
use crate::imaging::SymbolEncoder;
use crate::logging::Logger;
use crate::pipeline::{GenerateError, RenderOptions, check_payload, render};
use crate::types::{OutputFile, OutputFormat};
use crate::validate::{DEFAULT_BACKGROUND, parse_color};
use crate::writer;
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("cannot read batch source {}: {source}", path.display())]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed CSV in {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where batch payloads come from.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadSource {
    /// In-memory list, in order.
    List(Vec<String>),
    /// UTF-8 text, one payload per line. Blank lines are skipped.
    Lines(PathBuf),
    /// First column of a CSV file. Other columns are ignored.
    Csv(PathBuf),
}

/// A batch: payload source plus the template shared by every item.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub source: PayloadSource,
    pub options: RenderOptions,
    pub prefix: String,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Written with each payload to a `{name}_metadata.txt` sidecar.
    pub metadata: Option<String>,
    pub csv_has_header: bool,
    pub parallel: bool,
}

impl BatchJob {
    pub fn from_config(source: PayloadSource, config: &QrConfig) -> Self {
        Self {
            source,
            options: RenderOptions::from_config(config),
            prefix: config.batch.prefix.clone(),
            output_dir: config.batch.output_dir.clone(),
            format: config.output.format,
            metadata: config.batch.metadata.clone(),
            csv_has_header: config.batch.csv_has_header,
            parallel: config.batch.parallel,
        }
    }

    /// Output name for the `index`-th surviving payload (1-based).
    pub fn item_name(&self, index: usize) -> String {
        format!("{}_{}", self.prefix, index)
    }
}

/// Outcome of one validated payload.
#[derive(Debug)]
pub struct GenerationResult {
    /// 1-based position among surviving payloads.
    pub index: usize,
    pub name: String,
    pub payload: String,
    pub outcome: Result<OutputFile, GenerateError>,
}

impl GenerationResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ItemFinished {
        completed: usize,
        total: usize,
        name: String,
        ok: bool,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}

/// Read raw payloads from a source, trimmed, with empty entries removed.
pub fn load_payloads(source: &PayloadSource, csv_has_header: bool) -> Result<Vec<String>, BatchError> {
    match source {
        PayloadSource::List(items) => Ok(items
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        PayloadSource::Lines(path) => {
            let content = fs::read_to_string(path).map_err(|source| BatchError::Source {
                path: path.clone(),
                source,
            })?;
            Ok(content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect())
        }
        PayloadSource::Csv(path) => {
            // Open first so a missing file is a source error, not a CSV error
            let file = fs::File::open(path).map_err(|source| BatchError::Source {
                path: path.clone(),
                source,
            })?;
            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(csv_has_header)
                .flexible(true)
                .from_reader(file);

            let mut payloads = Vec::new();
            for record in rdr.records() {
                let record = record.map_err(|source| BatchError::Csv {
                    path: path.clone(),
                    source,
                })?;
                if let Some(first) = record.get(0).map(str::trim).filter(|s| !s.is_empty()) {
                    payloads.push(first.to_string());
                }
            }
            Ok(payloads)
        }
    }
}

/// Run a batch and return one result per validated payload, in input order.
pub fn run_batch(
    job: &BatchJob,
    encoder: &dyn SymbolEncoder,
    log: &dyn Logger,
    progress: Option<Sender<BatchEvent>>,
) -> Result<Vec<GenerationResult>, BatchError> {
    let raw = load_payloads(&job.source, job.csv_has_header)?;
    let payloads: Vec<String> = raw
        .into_iter()
        .filter(|p| match check_payload(p, job.options.require_url, log) {
            Ok(()) => true,
            Err(e) => {
                log.warn(&format!("skipping batch payload: {e}"));
                false
            }
        })
        .collect();

    fs::create_dir_all(&job.output_dir).map_err(|source| BatchError::OutputDir {
        path: job.output_dir.clone(),
        source,
    })?;

    let total = payloads.len();
    log.info(&format!("batch of {total} payloads -> {}", job.output_dir.display()));
    emit(&progress, BatchEvent::Started { total });

    let completed = AtomicUsize::new(0);
    let run_one = |(i, payload): (usize, &String)| {
        let result = run_item(job, encoder, i + 1, payload, log);
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        emit(
            &progress,
            BatchEvent::ItemFinished {
                completed: done,
                total,
                name: result.name.clone(),
                ok: result.is_ok(),
            },
        );
        result
    };

    let results: Vec<GenerationResult> = if job.parallel {
        payloads.par_iter().enumerate().map(run_one).collect()
    } else {
        payloads.iter().enumerate().map(run_one).collect()
    };

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let failed = results.len() - succeeded;
    log.info(&format!("batch finished: {succeeded} succeeded, {failed} failed"));
    emit(&progress, BatchEvent::Finished { succeeded, failed });

    Ok(results)
}

fn run_item(
    job: &BatchJob,
    encoder: &dyn SymbolEncoder,
    index: usize,
    payload: &str,
    log: &dyn Logger,
) -> GenerationResult {
    let name = job.item_name(index);
    let path = job
        .output_dir
        .join(format!("{name}.{}", job.format.extension()));
    // render() has already logged any background substitution
    let background = parse_color(&job.options.background).unwrap_or(DEFAULT_BACKGROUND);

    let outcome = render(encoder, payload, &job.options, log)
        .and_then(|img| writer::save_raster(&img, &path, job.format, background))
        .and_then(|file| {
            if let Some(metadata) = &job.metadata {
                writer::write_metadata(&job.output_dir, &name, payload, metadata)?;
            }
            Ok(file)
        });

    match &outcome {
        Ok(file) => log.debug(&format!("{name}: wrote {}", file.path.display())),
        Err(e) => log.error(&format!("{name}: {e}")),
    }

    GenerationResult {
        index,
        name,
        payload: payload.to_string(),
        outcome,
    }
}

fn emit(progress: &Option<Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = progress {
        // A dropped receiver only means nobody is watching
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockEncoder;
    use crate::logging::{Level, MemoryLogger};
    use crate::test_helpers::test_config;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn job(tmp: &TempDir, payloads: &[&str]) -> BatchJob {
        let mut config = test_config();
        config.batch.output_dir = tmp.path().join("out");
        let source = PayloadSource::List(payloads.iter().map(|s| s.to_string()).collect());
        BatchJob::from_config(source, &config)
    }

    // =========================================================================
    // Payload sources
    // =========================================================================

    #[test]
    fn list_source_trims_and_skips_blanks() {
        let source = PayloadSource::List(vec![" a ".into(), "".into(), "b".into()]);
        assert_eq!(load_payloads(&source, false).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn lines_source_skips_blank_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("urls.txt");
        fs::write(&path, "https://a.example\n\n   \nhttps://b.example\r\n").unwrap();
        let payloads = load_payloads(&PayloadSource::Lines(path), false).unwrap();
        assert_eq!(payloads, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn csv_source_reads_first_column_only() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("urls.csv");
        fs::write(&path, "https://a.example,first\nhttps://b.example,second,extra\n,empty\n").unwrap();
        let payloads = load_payloads(&PayloadSource::Csv(path), false).unwrap();
        assert_eq!(payloads, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn csv_header_row_is_skipped_when_configured() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("urls.csv");
        fs::write(&path, "url,label\nhttps://a.example,x\n").unwrap();
        assert_eq!(
            load_payloads(&PayloadSource::Csv(path.clone()), true).unwrap(),
            vec!["https://a.example"]
        );
        assert_eq!(load_payloads(&PayloadSource::Csv(path), false).unwrap().len(), 2);
    }

    #[test]
    fn missing_source_file_fails_whole_batch() {
        let tmp = TempDir::new().unwrap();
        let mut job = job(&tmp, &[]);
        job.source = PayloadSource::Lines(tmp.path().join("missing.txt"));
        let encoder = MockEncoder::new(21);
        let log = MemoryLogger::new();

        let result = run_batch(&job, &encoder, &log, None);
        assert!(matches!(result, Err(BatchError::Source { .. })));
        assert!(encoder.get_calls().is_empty());
    }

    #[test]
    fn missing_csv_is_source_error() {
        let tmp = TempDir::new().unwrap();
        let source = PayloadSource::Csv(tmp.path().join("missing.csv"));
        assert!(matches!(
            load_payloads(&source, false),
            Err(BatchError::Source { .. })
        ));
    }

    // =========================================================================
    // run_batch
    // =========================================================================

    #[test]
    fn invalid_payloads_are_dropped_before_indexing() {
        let tmp = TempDir::new().unwrap();
        let mut job = job(
            &tmp,
            &["https://a.example", "not a url", "https://b.example", "https://c.example"],
        );
        job.options.require_url = true;
        let encoder = MockEncoder::new(21);
        let log = MemoryLogger::new();

        let results = run_batch(&job, &encoder, &log, None).unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["qr_1", "qr_2", "qr_3"]);
        assert_eq!(results[1].payload, "https://b.example");
        assert!(results.iter().all(|r| r.is_ok()));

        let skipped: Vec<_> = log
            .at(Level::Warn)
            .into_iter()
            .filter(|r| r.message.contains("skipping"))
            .collect();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].message.contains("not a url"));
    }

    #[test]
    fn item_failure_does_not_abort_batch() {
        let tmp = TempDir::new().unwrap();
        let job = job(&tmp, &["ok", "this one is too long", "fine"]);
        let encoder = MockEncoder::with_capacity(21, 5);
        let log = MemoryLogger::new();

        let results = run_batch(&job, &encoder, &log, None).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1].outcome, Err(GenerateError::Encoding(_))));
        assert!(results[2].is_ok());
        assert!(tmp.path().join("out/qr_3.png").exists());
        assert!(!tmp.path().join("out/qr_2.png").exists());
        assert!(log.contains(Level::Error, "qr_2"));
    }

    #[test]
    fn files_use_prefix_and_format_extension() {
        let tmp = TempDir::new().unwrap();
        let mut job = job(&tmp, &["a", "b"]);
        job.prefix = "ticket".into();
        job.format = OutputFormat::Jpeg;
        let encoder = MockEncoder::new(21);
        let log = MemoryLogger::new();

        let results = run_batch(&job, &encoder, &log, None).unwrap();
        let out = tmp.path().join("out");
        assert!(out.join("ticket_1.jpg").exists());
        assert!(out.join("ticket_2.jpg").exists());
        assert_eq!(results[0].outcome.as_ref().unwrap().format, OutputFormat::Jpeg);
    }

    #[test]
    fn metadata_sidecars_are_written_per_item() {
        let tmp = TempDir::new().unwrap();
        let mut job = job(&tmp, &["first", "second"]);
        job.metadata = Some("spring".into());
        let encoder = MockEncoder::new(21);
        let log = MemoryLogger::new();

        run_batch(&job, &encoder, &log, None).unwrap();
        let sidecar = fs::read_to_string(tmp.path().join("out/qr_2_metadata.txt")).unwrap();
        assert_eq!(sidecar, "second\nspring\n");
    }

    #[test]
    fn progress_events_bracket_items() {
        let tmp = TempDir::new().unwrap();
        let job = job(&tmp, &["a", "b"]);
        let encoder = MockEncoder::new(21);
        let log = MemoryLogger::new();
        let (tx, rx) = mpsc::channel();

        run_batch(&job, &encoder, &log, Some(tx)).unwrap();
        let events: Vec<BatchEvent> = rx.iter().collect();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], BatchEvent::Started { total: 2 });
        assert_eq!(
            events[2],
            BatchEvent::ItemFinished {
                completed: 2,
                total: 2,
                name: "qr_2".into(),
                ok: true
            }
        );
        assert_eq!(
            events[3],
            BatchEvent::Finished {
                succeeded: 2,
                failed: 0
            }
        );
    }

    #[test]
    fn parallel_batch_preserves_order() {
        let tmp = TempDir::new().unwrap();
        let payloads: Vec<String> = (0..12).map(|i| format!("payload-{i}")).collect();
        let refs: Vec<&str> = payloads.iter().map(String::as_str).collect();
        let mut job = job(&tmp, &refs);
        job.parallel = true;
        let encoder = MockEncoder::new(21);
        let log = MemoryLogger::new();

        let results = run_batch(&job, &encoder, &log, None).unwrap();
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.index, i + 1);
            assert_eq!(r.name, format!("qr_{}", i + 1));
            assert_eq!(r.payload, format!("payload-{i}"));
        }
        assert_eq!(encoder.get_calls().len(), 12);
    }

    #[test]
    fn empty_batch_still_reports() {
        let tmp = TempDir::new().unwrap();
        let job = job(&tmp, &[]);
        let encoder = MockEncoder::new(21);
        let log = MemoryLogger::new();
        let (tx, rx) = mpsc::channel();

        let results = run_batch(&job, &encoder, &log, Some(tx)).unwrap();
        assert!(results.is_empty());
        let events: Vec<BatchEvent> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                BatchEvent::Started { total: 0 },
                BatchEvent::Finished {
                    succeeded: 0,
                    failed: 0
                }
            ]
        );
    }
}
