//! Batch executors: a default "pool mode" (one task per image on the
//! worker pool) and an opt-in "pipeline mode" (three bounded-queue
//! worker groups for decode/resize/encode) for large, `max_speed`
//! batches (§4.7, §4.8), plus the mutex-guarded error collector
//! (§4.9) both modes report through.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};

use crate::pipeline;
use crate::pool::BufferPool;
use crate::registry;
use crate::workers::WorkerPool;
use crate::{BatchItem, BatchOptions, BatchResult, ResizeOptions};

/// Number of items at or above which `max_speed` engages pipeline mode
/// instead of pool mode (§4.8; implementation constant within the
/// spec's allowed [20, 50] range — see DESIGN.md).
const PIPELINE_THRESHOLD: usize = 32;

/// One resolved unit of work, shared internal representation for both
/// the basename-convention entry point and the explicit custom-batch
/// entry point.
struct Job {
    input: PathBuf,
    output: PathBuf,
    options: Arc<ResizeOptions>,
}

/// Mutex-guarded accumulator workers report into exactly once per item
/// (§4.9).
struct ErrorCollector {
    inner: Mutex<BatchResult>,
}

impl ErrorCollector {
    fn new() -> Self {
        Self { inner: Mutex::new(BatchResult::default()) }
    }

    fn record_ok(&self) {
        self.inner.lock().unwrap().record_ok();
    }

    fn record_err(&self, input_path: &Path, message: &str) {
        self.inner
            .lock()
            .unwrap()
            .record_err(format!("{}: {message}", input_path.display()));
    }

    fn into_result(self) -> BatchResult {
        self.inner.into_inner().unwrap()
    }
}

/// Resize every file in `input_paths`, writing results under
/// `output_dir` with each input's basename (§4.7). All jobs share
/// `options` by reference.
pub fn batch_resize(
    input_paths: &[PathBuf],
    output_dir: &Path,
    options: &ResizeOptions,
    batch_options: &BatchOptions,
) -> BatchResult {
    let shared_options = Arc::new(options.clone());
    let jobs: Vec<Job> = input_paths
        .iter()
        .map(|input| Job {
            input: input.clone(),
            output: output_dir.join(
                input
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| input.clone()),
            ),
            options: Arc::clone(&shared_options),
        })
        .collect();
    run_batch(jobs, batch_options)
}

/// Resize an explicit list of `(input, output, options)` triples
/// (§4.7's "custom batch" variant): each item's own options are used
/// verbatim instead of one shared set.
pub fn batch_resize_custom(items: &[BatchItem], batch_options: &BatchOptions) -> BatchResult {
    let jobs: Vec<Job> = items
        .iter()
        .map(|item| Job {
            input: item.input_path.clone(),
            output: item.output_path.clone(),
            options: Arc::new(item.options.clone()),
        })
        .collect();
    run_batch(jobs, batch_options)
}

fn run_batch(jobs: Vec<Job>, batch_options: &BatchOptions) -> BatchResult {
    if batch_options.max_speed && jobs.len() >= PIPELINE_THRESHOLD {
        run_pipeline_mode(jobs, batch_options)
    } else {
        run_pool_mode(jobs, batch_options)
    }
}

/// Default executor: one worker-pool task per job (§4.7). `WorkerPool`
/// is shared through an `Arc` so submitted tasks can both check and
/// raise its abort flag when `stop_on_error` is set.
fn run_pool_mode(jobs: Vec<Job>, batch_options: &BatchOptions) -> BatchResult {
    let pool = Arc::new(WorkerPool::new(batch_options.resolved_threads()));
    let buffers = Arc::new(BufferPool::new());
    let collector = Arc::new(ErrorCollector::new());
    let stop_on_error = batch_options.stop_on_error;

    for job in jobs {
        let pool_ref = Arc::clone(&pool);
        let buffers = Arc::clone(&buffers);
        let collector = Arc::clone(&collector);
        pool.submit(move || {
            if stop_on_error && pool_ref.is_aborted() {
                return;
            }
            match pipeline::process_one(&job.input, &job.output, &job.options, Some(&buffers)) {
                Ok(()) => collector.record_ok(),
                Err(err) => {
                    collector.record_err(&job.input, &err.phrase());
                    if stop_on_error {
                        pool_ref.abort();
                    }
                }
            }
        });
    }
    pool.drain();

    let pool = Arc::try_unwrap(pool).unwrap_or_else(|_| unreachable!("all task clones dropped after drain"));
    pool.shutdown();

    Arc::try_unwrap(collector)
        .unwrap_or_else(|arc| ErrorCollector { inner: Mutex::new(arc.inner.lock().unwrap().clone()) })
        .into_result()
}

/// Three-stage pipeline executor (§4.8): decode, resize and encode run
/// on separate worker groups connected by small bounded queues, so a
/// slow stage applies backpressure instead of unbounded buffering.
fn run_pipeline_mode(jobs: Vec<Job>, batch_options: &BatchOptions) -> BatchResult {
    let total_threads = batch_options.resolved_threads().max(4);
    // decoders : resizers : encoders = 1 : 2 : 1, each group >= 1.
    let resizers = (total_threads * 2 / 4).max(1);
    let remaining = total_threads.saturating_sub(resizers).max(2);
    let decoders = (remaining / 2).max(1);
    let encoders = (remaining - decoders).max(1);

    let decoded_bound = (resizers * 2).max(2);
    let resized_bound = (encoders * 2).max(2);

    let buffers = Arc::new(BufferPool::new());
    let collector = Arc::new(ErrorCollector::new());
    let abort = Arc::new(AtomicBool::new(false));
    let stop_on_error = batch_options.stop_on_error;

    let input_queue: Arc<Mutex<std::collections::VecDeque<Job>>> =
        Arc::new(Mutex::new(jobs.into_iter().collect()));

    let (decoded_tx, decoded_rx) = sync_channel::<DecodedItem>(decoded_bound);
    let decoded_rx = Arc::new(Mutex::new(decoded_rx));
    let (resized_tx, resized_rx) = sync_channel::<ResizedItem>(resized_bound);
    let resized_rx = Arc::new(Mutex::new(resized_rx));

    let mut handles = Vec::new();

    for _ in 0..decoders {
        let input_queue = Arc::clone(&input_queue);
        let decoded_tx = decoded_tx.clone();
        let collector = Arc::clone(&collector);
        let abort = Arc::clone(&abort);
        handles.push(std::thread::spawn(move || {
            decoder_loop(input_queue, decoded_tx, collector, abort, stop_on_error);
        }));
    }
    drop(decoded_tx);

    for _ in 0..resizers {
        let decoded_rx = Arc::clone(&decoded_rx);
        let resized_tx = resized_tx.clone();
        let buffers = Arc::clone(&buffers);
        let collector = Arc::clone(&collector);
        let abort = Arc::clone(&abort);
        handles.push(std::thread::spawn(move || {
            resizer_loop(decoded_rx, resized_tx, buffers, collector, abort, stop_on_error);
        }));
    }
    drop(resized_tx);

    for _ in 0..encoders {
        let resized_rx = Arc::clone(&resized_rx);
        let collector = Arc::clone(&collector);
        handles.push(std::thread::spawn(move || {
            encoder_loop(resized_rx, collector);
        }));
    }

    for handle in handles {
        let _ = handle.join();
    }

    Arc::try_unwrap(collector)
        .unwrap_or_else(|arc| ErrorCollector { inner: Mutex::new(arc.inner.lock().unwrap().clone()) })
        .into_result()
}

struct DecodedItem {
    input: PathBuf,
    output: PathBuf,
    options: Arc<ResizeOptions>,
    buffer: crate::PixelBuffer,
}

struct ResizedItem {
    input: PathBuf,
    output: PathBuf,
    options: Arc<ResizeOptions>,
    buffer: crate::PixelBuffer,
}

fn decoder_loop(
    input_queue: Arc<Mutex<std::collections::VecDeque<Job>>>,
    decoded_tx: SyncSender<DecodedItem>,
    collector: Arc<ErrorCollector>,
    abort: Arc<AtomicBool>,
    stop_on_error: bool,
) {
    loop {
        if stop_on_error && abort.load(Ordering::SeqCst) {
            return;
        }
        let job = {
            let mut queue = input_queue.lock().unwrap();
            queue.pop_front()
        };
        let Some(job) = job else { return };

        let precheck = job.options.validate().and_then(|()| {
            if !job.options.overwrite_input && pipeline::paths_equal(&job.input, &job.output) {
                Err(crate::error::CoreError::InvalidOptions(format!(
                    "output path equals input path ({}) and overwrite_input is false",
                    job.input.display()
                )))
            } else {
                Ok(())
            }
        });
        if let Err(err) = precheck {
            collector.record_err(&job.input, &err.phrase());
            if stop_on_error {
                abort.store(true, Ordering::SeqCst);
            }
            continue;
        }

        match registry::decode(&job.input) {
            Ok((buffer, _info)) => {
                let item = DecodedItem {
                    input: job.input,
                    output: job.output,
                    options: job.options,
                    buffer,
                };
                if decoded_tx.send(item).is_err() {
                    return;
                }
            }
            Err(err) => {
                collector.record_err(&job.input, &err.phrase());
                if stop_on_error {
                    abort.store(true, Ordering::SeqCst);
                }
            }
        }
    }
}

fn resizer_loop(
    decoded_rx: Arc<Mutex<Receiver<DecodedItem>>>,
    resized_tx: SyncSender<ResizedItem>,
    buffers: Arc<BufferPool>,
    collector: Arc<ErrorCollector>,
    abort: Arc<AtomicBool>,
    stop_on_error: bool,
) {
    loop {
        if stop_on_error && abort.load(Ordering::SeqCst) {
            return;
        }
        let item = {
            let rx = decoded_rx.lock().unwrap();
            rx.recv()
        };
        let Ok(item) = item else { return };

        let result = (|| -> crate::Result<crate::PixelBuffer> {
            item.options.validate()?;
            let (tw, th) = crate::geometry::resolve_dimensions(
                item.buffer.width,
                item.buffer.height,
                item.options.mode,
                item.options.target_width,
                item.options.target_height,
                item.options.scale_percent,
                item.options.keep_aspect_ratio,
            )?;
            crate::kernel::resize(Some(&buffers), &item.buffer, tw, th, item.options.filter)
        })();

        match result {
            Ok(resized) => {
                let out = ResizedItem {
                    input: item.input,
                    output: item.output,
                    options: item.options,
                    buffer: resized,
                };
                if resized_tx.send(out).is_err() {
                    return;
                }
            }
            Err(err) => {
                collector.record_err(&item.input, &err.phrase());
                if stop_on_error {
                    abort.store(true, Ordering::SeqCst);
                }
            }
        }
    }
}

fn encoder_loop(resized_rx: Arc<Mutex<Receiver<ResizedItem>>>, collector: Arc<ErrorCollector>) {
    loop {
        let item = {
            let rx = resized_rx.lock().unwrap();
            rx.recv()
        };
        let Ok(item) = item else { return };

        match registry::encode(&item.output, &item.buffer, item.options.quality) {
            Ok(()) => collector.record_ok(),
            Err(err) => collector.record_err(&item.input, &err.phrase()),
        }
    }
}
