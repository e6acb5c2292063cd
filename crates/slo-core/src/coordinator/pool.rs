//! Bounded worker pool: fan segment jobs out to threads, fan results back in.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::error::{SegmentError, UploadError};
use crate::planner::SegmentJob;
use crate::progress::ProgressStats;
use crate::worker::SegmentWorker;

use super::result::{SegmentResult, SegmentStatus};

/// Run `jobs` on exactly `workers` threads (fewer if there are fewer jobs).
///
/// Results come back over one channel and are only touched by this function.
/// After the first failed segment no new job is taken; in-flight jobs finish
/// and every thread is joined before returning. On success the results are
/// returned in index order.
pub(super) fn run_pool(
    worker: &SegmentWorker,
    jobs: Vec<SegmentJob>,
    workers: usize,
    total_bytes: u64,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>,
) -> Result<Vec<SegmentResult>, UploadError> {
    let count = jobs.len();
    let queue: Arc<Mutex<VecDeque<SegmentJob>>> = Arc::new(Mutex::new(jobs.into_iter().collect()));
    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<SegmentResult>();
    let num_workers = workers.max(1).min(count.max(1));
    let started = Instant::now();

    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let queue = Arc::clone(&queue);
        let stop = Arc::clone(&stop);
        let tx = tx.clone();
        let worker = worker.clone();
        handles.push(std::thread::spawn(move || loop {
            if stop.load(Ordering::Acquire) {
                break;
            }
            let next = queue
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .pop_front();
            let Some(job) = next else {
                break;
            };
            let result = worker.process(job);
            if !result.is_success() {
                // Raised before sending so this thread cannot take another job first.
                stop.store(true, Ordering::Release);
            }
            if tx.send(result).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    let mut results: BTreeMap<usize, SegmentResult> = BTreeMap::new();
    let mut failed: Vec<usize> = Vec::new();
    let mut budget_violation: Option<(usize, usize)> = None;
    let mut bytes_done = 0u64;
    let mut segments_done = 0usize;

    // Ends once every worker has exited and dropped its sender.
    for result in rx {
        match &result.status {
            SegmentStatus::Succeeded { size_bytes, .. } => {
                bytes_done += size_bytes;
                segments_done += 1;
                if let Some(progress_tx) = progress_tx {
                    let _ = progress_tx.try_send(ProgressStats {
                        bytes_done,
                        total_bytes,
                        elapsed_secs: started.elapsed().as_secs_f64(),
                        segments_done,
                        segment_count: count,
                    });
                }
            }
            SegmentStatus::Failed(e) => {
                if failed.is_empty() {
                    tracing::warn!(index = result.index, "segment failed; no new segments will start");
                }
                stop.store(true, Ordering::Release);
                if let SegmentError::BudgetExhausted { in_use, capacity } = e {
                    budget_violation = Some((*in_use, *capacity));
                }
                failed.push(result.index);
            }
        }
        results.insert(result.index, result);
    }

    let mut panicked = 0usize;
    for h in handles {
        if h.join().is_err() {
            panicked += 1;
        }
    }
    if panicked > 0 {
        tracing::error!(panicked, "segment worker thread(s) panicked");
    }

    if let Some((in_use, capacity)) = budget_violation {
        return Err(UploadError::DiskBudgetExhausted { in_use, capacity });
    }
    if !failed.is_empty() {
        failed.sort_unstable();
        return Err(UploadError::UploadFailed { failed });
    }
    if results.len() < count {
        return Err(UploadError::WorkerPanicked {
            missing: count - results.len(),
        });
    }

    Ok(results.into_values().collect())
}
