// logcore - loader/mod.rs
//
// Producer/worker-pool/consumer pipeline: the producer splits the mapped
// input into ordered batches, N workers preprocess+parse independently,
// and the consumer reassembles output in input order. Grounded on the
// source's loader threading model, generalized from its single hard-coded
// format to dispatch through `parsers::ParserKind`.

use crate::config::LoaderConfig;
use crate::error::{LoaderError, ParseIssue, Result};
use crate::mmap::MappedFile;
use crate::parsers::{self, LogRecord, ParserKind};
use crate::preprocess::{Preprocessor, PreprocessorConfig};
use crate::queue::ThreadSafeQueue;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A batch of raw lines read from the input, tagged with its position in
/// the overall ordering.
struct LogBatch {
    id: u64,
    lines: Vec<String>,
}

/// The parsed counterpart of a `LogBatch`, in source-line order.
struct ProcessedBatch {
    id: u64,
    records: Vec<LogRecord>,
}

/// Running counters surfaced to the host after a load completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadStats {
    pub total_lines_read: u64,
    pub processed_lines: u64,
    pub failed_lines: u64,
    pub total_batches: u64,
}

/// Runs the full producer/worker/consumer pipeline over `config.file_path`
/// and returns every parsed record in input order plus run statistics.
pub fn load(config: &LoaderConfig) -> Result<(Vec<LogRecord>, LoadStats)> {
    let mapped = MappedFile::open(&config.file_path)?;
    let input_queue: Arc<ThreadSafeQueue<LogBatch>> = Arc::new(ThreadSafeQueue::new());
    let output_queue: Arc<ThreadSafeQueue<ProcessedBatch>> = Arc::new(ThreadSafeQueue::new());

    let total_lines_read = Arc::new(AtomicU64::new(0));
    let failed_lines = Arc::new(AtomicU64::new(0));
    let total_batches = Arc::new(AtomicU64::new(0));

    let num_workers = config.resolved_num_threads();
    info!(num_workers, path = %config.file_path.display(), "starting load");

    std::thread::scope(|scope| -> Result<()> {
        let batch_sizing = config.batch_sizing;
        let producer_input_queue = Arc::clone(&input_queue);
        let producer_total_batches = Arc::clone(&total_batches);
        let producer_total_lines_read = Arc::clone(&total_lines_read);
        scope.spawn(move || {
            produce(
                &mapped,
                &producer_input_queue,
                batch_sizing,
                &producer_total_batches,
                &producer_total_lines_read,
            );
        });

        let mut worker_handles = Vec::with_capacity(num_workers.max(1));
        for worker_id in 0..num_workers.max(1) {
            let worker_input = Arc::clone(&input_queue);
            let worker_output = Arc::clone(&output_queue);
            let worker_failed = Arc::clone(&failed_lines);
            let parser = parsers::build_parser(config)?;
            let preprocessor = if config.enable_preprocessing {
                Some(Preprocessor::new(PreprocessorConfig::default())?)
            } else {
                None
            };
            let max_errors = config.max_parse_errors_logged;
            worker_handles.push(scope.spawn(move || {
                run_worker(
                    worker_id,
                    &worker_input,
                    &worker_output,
                    &parser,
                    preprocessor.as_ref(),
                    &worker_failed,
                    max_errors,
                );
            }));
        }

        for handle in worker_handles {
            handle.join().expect("worker thread panicked");
        }
        output_queue.done();
        Ok(())
    })?;

    let records = consume(&output_queue);
    let stats = LoadStats {
        total_lines_read: total_lines_read.load(Ordering::Relaxed),
        processed_lines: records.len() as u64,
        failed_lines: failed_lines.load(Ordering::Relaxed),
        total_batches: total_batches.load(Ordering::Relaxed),
    };
    info!(?stats, "load complete");
    Ok((records, stats))
}

fn produce(
    mapped: &MappedFile,
    input_queue: &ThreadSafeQueue<LogBatch>,
    batch_sizing: crate::config::BatchSizing,
    total_batches: &AtomicU64,
    total_lines_read: &AtomicU64,
) {
    let mut scanner = mapped.scanner();
    let mut current_batch_size = batch_sizing.initial;
    let mut batch_id = 0u64;
    let mut buffer = Vec::with_capacity(current_batch_size);

    loop {
        let Some(line) = scanner.next_line() else {
            break;
        };
        buffer.push(String::from_utf8_lossy(line).into_owned());
        total_lines_read.fetch_add(1, Ordering::Relaxed);

        if buffer.len() >= current_batch_size {
            dispatch_batch(input_queue, &mut buffer, &mut batch_id, total_batches);
            current_batch_size = adapt_batch_size(input_queue, current_batch_size, batch_sizing);
        }
    }
    if !buffer.is_empty() {
        dispatch_batch(input_queue, &mut buffer, &mut batch_id, total_batches);
    }
    input_queue.done();
    debug!(batches = batch_id, "producer finished");
}

fn dispatch_batch(
    input_queue: &ThreadSafeQueue<LogBatch>,
    buffer: &mut Vec<String>,
    batch_id: &mut u64,
    total_batches: &AtomicU64,
) {
    let lines = std::mem::take(buffer);
    input_queue.push(LogBatch { id: *batch_id, lines });
    *batch_id += 1;
    total_batches.fetch_add(1, Ordering::Relaxed);
}

/// Samples queue depth against the configured watermarks and returns the
/// next batch size; halves under backpressure (with a brief pause) and
/// doubles when the queue is running dry.
fn adapt_batch_size(
    input_queue: &ThreadSafeQueue<LogBatch>,
    current: usize,
    sizing: crate::config::BatchSizing,
) -> usize {
    let depth = input_queue.size();
    if depth > sizing.queue_high_watermark {
        std::thread::sleep(std::time::Duration::from_millis(50));
        (current / 2).max(sizing.min)
    } else if depth < sizing.queue_low_watermark {
        (current * 2).min(sizing.max)
    } else {
        current
    }
}

fn run_worker(
    worker_id: usize,
    input_queue: &ThreadSafeQueue<LogBatch>,
    output_queue: &ThreadSafeQueue<ProcessedBatch>,
    parser: &ParserKind,
    preprocessor: Option<&Preprocessor>,
    failed_lines: &AtomicU64,
    max_errors_logged: usize,
) {
    let mut errors_logged = 0usize;
    while let Some(batch) = input_queue.wait_and_pop() {
        let mut records = Vec::with_capacity(batch.lines.len());
        for (offset, line) in batch.lines.iter().enumerate() {
            let cleaned = match preprocessor {
                Some(pp) => pp.clean_line(line).0,
                None => line.clone(),
            };
            if !parser.validate(&cleaned) {
                failed_lines.fetch_add(1, Ordering::Relaxed);
                if errors_logged < max_errors_logged {
                    let issue = ParseIssue {
                        line_number: batch.id * u64::try_from(batch.lines.len().max(1)).unwrap_or(1)
                            + offset as u64,
                        format: "configured",
                        reason: "line failed parser validation".to_string(),
                    };
                    warn!(worker_id, %issue, "parse failure");
                    errors_logged += 1;
                } else if errors_logged == max_errors_logged {
                    warn!(worker_id, "further parse failures suppressed");
                    errors_logged += 1;
                }
                continue;
            }
            records.push(parser.parse(&cleaned));
        }
        output_queue.push(ProcessedBatch { id: batch.id, records });
    }
}

/// Drains the output queue, reassembling batches in `id` order even though
/// workers may finish out of order.
fn consume(output_queue: &ThreadSafeQueue<ProcessedBatch>) -> Vec<LogRecord> {
    let mut pending: BTreeMap<u64, ProcessedBatch> = BTreeMap::new();
    let mut next_expected = 0u64;
    let mut records = Vec::new();

    while let Some(batch) = output_queue.wait_and_pop() {
        pending.insert(batch.id, batch);
        while let Some(batch) = pending.remove(&next_expected) {
            records.extend(batch.records);
            next_expected += 1;
        }
    }
    while let Some(batch) = pending.remove(&next_expected) {
        records.extend(batch.records);
        next_expected += 1;
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BatchSizing, LogType};
    use std::io::Write;

    fn write_lines(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f
    }

    #[test]
    fn loads_all_lines_in_order() {
        let f = write_lines(&["one", "two", "three", "four", "five"]);
        let mut config = LoaderConfig::new(f.path(), LogType::Line);
        config.num_threads = 2;
        config.batch_sizing = BatchSizing {
            initial: 2,
            min: 1,
            max: 4,
            queue_high_watermark: 200,
            queue_low_watermark: 10,
        };

        let (records, stats) = load(&config).unwrap();
        let bodies: Vec<&str> = records.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["one", "two", "three", "four", "five"]);
        assert_eq!(stats.total_lines_read, 5);
        assert_eq!(stats.processed_lines, 5);
        assert_eq!(stats.failed_lines, 0);
    }

    #[test]
    fn empty_file_yields_zero_batches() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let config = LoaderConfig::new(f.path(), LogType::Line);
        let (records, stats) = load(&config).unwrap();
        assert!(records.is_empty());
        assert_eq!(stats.total_batches, 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let config = LoaderConfig::new("/nonexistent/path/nope.log", LogType::Line);
        assert!(matches!(load(&config), Err(LoaderError::Io { .. })));
    }
}
