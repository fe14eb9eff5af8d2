use super::ServiceError;
use crate::utils::{lock, panic_message};
use allayplots_save_data::{ChangeSet, PlotStorage, StorageError, WorldRecords};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

pub type SharedStorage = Arc<Mutex<Box<dyn PlotStorage>>>;

/// What to write to storage.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveJob {
    Full(WorldRecords),
    Incremental(ChangeSet),
}

impl SaveJob {
    /// Combines an older job with a newer one without losing changes.
    pub fn merge(self, newer: SaveJob) -> SaveJob {
        match (self, newer) {
            (_, SaveJob::Full(records)) => SaveJob::Full(records),
            (SaveJob::Full(mut records), SaveJob::Incremental(changes)) => {
                changes.apply_to(&mut records);
                SaveJob::Full(records)
            }
            (SaveJob::Incremental(mut older), SaveJob::Incremental(changes)) => {
                older.merge(changes);
                SaveJob::Incremental(older)
            }
        }
    }

    fn write(&self, storage: &mut dyn PlotStorage) -> Result<(), StorageError> {
        match self {
            SaveJob::Full(records) => storage.save(records),
            SaveJob::Incremental(changes) => storage.save_incremental(changes),
        }
    }
}

fn combine(older: Option<SaveJob>, newer: Option<SaveJob>) -> Option<SaveJob> {
    match (older, newer) {
        (Some(older), Some(newer)) => Some(older.merge(newer)),
        (older, newer) => older.or(newer),
    }
}

#[derive(Default)]
struct PendingSave {
    job: Option<SaveJob>,
    /// A job that could not be written. It is folded into the next
    /// submission.
    failed: Option<SaveJob>,
    stop: bool,
    stopped: bool,
    submitted: u64,
    completed: u64,
    /// The newest ticket whose data reached storage. A failed job is folded
    /// into the next one, so this covers every ticket at or below it.
    written: u64,
    last_error: Option<String>,
}

/// Hands save jobs to the save thread. Jobs submitted while another is
/// waiting are coalesced into one.
#[derive(Clone, Default)]
pub struct SaveQueue {
    shared: Arc<(Mutex<PendingSave>, Condvar)>,
}

impl SaveQueue {
    /// Queues `job`, together with anything still pending or previously
    /// failed. Returns a ticket to wait on, or `None` when there is nothing
    /// to write.
    pub fn submit(&self, job: Option<SaveJob>) -> Option<u64> {
        let (state, cvar) = &*self.shared;
        let mut pending = lock(state);
        let older = combine(pending.failed.take(), pending.job.take());
        pending.job = combine(older, job);
        pending.job.as_ref()?;
        pending.submitted += 1;
        cvar.notify_all();
        Some(pending.submitted)
    }

    /// Blocks until the job with `ticket`, or a later one containing it, has
    /// been written.
    pub fn wait_for(&self, ticket: u64) -> Result<(), ServiceError> {
        let (state, cvar) = &*self.shared;
        let mut pending = lock(state);
        while pending.completed < ticket && !pending.stopped {
            pending = cvar.wait(pending).unwrap_or_else(PoisonError::into_inner);
        }
        if pending.completed < ticket {
            return Err(ServiceError::NotRunning);
        }
        if pending.written >= ticket {
            return Ok(());
        }
        Err(ServiceError::SaveFailed(
            pending.last_error.clone().unwrap_or_default(),
        ))
    }

    fn stop(&self) {
        let (state, cvar) = &*self.shared;
        lock(state).stop = true;
        cvar.notify_all();
    }

    fn next_job(&self) -> Option<(SaveJob, u64)> {
        let (state, cvar) = &*self.shared;
        let mut pending = lock(state);
        loop {
            if let Some(job) = pending.job.take() {
                return Some((job, pending.submitted));
            }
            if pending.stop {
                pending.stopped = true;
                cvar.notify_all();
                return None;
            }
            pending = cvar.wait(pending).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn finish(&self, job: SaveJob, ticket: u64, result: Result<(), String>) {
        let (state, cvar) = &*self.shared;
        let mut pending = lock(state);
        pending.completed = ticket;
        match result {
            Ok(()) => {
                pending.written = ticket;
                pending.last_error = None;
            }
            Err(err) => {
                // Anything queued meanwhile is newer than the failed job.
                let failed = combine(pending.failed.take(), Some(job));
                if pending.job.is_some() {
                    pending.job = combine(failed, pending.job.take());
                } else {
                    pending.failed = failed;
                }
                pending.last_error = Some(err);
            }
        }
        cvar.notify_all();
    }
}

/// The `plot-save` thread. Writes are serialised through the storage lock.
pub struct SaveWorker {
    queue: SaveQueue,
    handle: Option<JoinHandle<()>>,
}

impl SaveWorker {
    pub fn spawn(queue: SaveQueue, storage: SharedStorage) -> Result<SaveWorker, ServiceError> {
        let worker_queue = queue.clone();
        let handle = thread::Builder::new()
            .name("plot-save".to_owned())
            .spawn(move || run(worker_queue, storage))
            .map_err(ServiceError::Spawn)?;
        Ok(SaveWorker {
            queue,
            handle: Some(handle),
        })
    }

    /// Writes whatever is still queued, then stops the thread.
    pub fn shutdown(&mut self) {
        self.queue.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Plot save thread panicked");
            }
        }
    }
}

fn run(queue: SaveQueue, storage: SharedStorage) {
    while let Some((job, ticket)) = queue.next_job() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut storage = lock(&storage);
            debug!("Saving plot data to {} storage", storage.name());
            job.write(storage.as_mut())
        }));
        let result = match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                let err = anyhow::Error::from(err);
                error!("Failed to save plot data: {:?}", err);
                Err(format!("{:#}", err))
            }
            Err(payload) => {
                let msg = panic_message(&*payload).to_owned();
                error!("Plot save panicked: {}", msg);
                Err(msg)
            }
        };
        queue.finish(job, ticket, result);
    }
}
