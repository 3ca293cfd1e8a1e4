//! Bookkeeping for pipelines launched in the background.
//!
//! [`JobManager`] is the only owner of the job table. Every read and write goes
//! through its mutex, and callers only ever see cloned snapshots of [`Job`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Running => "Running",
            JobState::Stopped => "Stopped",
            JobState::Done => "Done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: usize,
    /// Process id of the last stage of the pipeline.
    pub pid: u32,
    pub command: String,
    pub state: JobState,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]  {}\t{}", self.id, self.state, self.command)
    }
}

#[derive(Debug)]
pub enum JobError {
    /// The table is empty (`None`) or has no job with this id.
    NoSuchJob(Option<usize>),
    InvalidJobId(String),
    Unsupported(&'static str),
    Poisoned,
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::NoSuchJob(None) => write!(f, "no current job"),
            JobError::NoSuchJob(Some(id)) => write!(f, "job {} not found", id),
            JobError::InvalidJobId(arg) => write!(f, "invalid job id: {}", arg),
            JobError::Unsupported(what) => write!(f, "{}: not supported", what),
            JobError::Poisoned => write!(f, "job table is unavailable"),
        }
    }
}

impl std::error::Error for JobError {}

#[derive(Default)]
struct JobTable {
    jobs: BTreeMap<usize, Job>,
    waiters: HashMap<usize, JoinHandle<()>>,
    last_id: usize,
}

#[derive(Clone, Default)]
pub struct JobManager {
    table: Arc<Mutex<JobTable>>,
}

impl JobManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, JobTable>, JobError> {
        self.table.lock().map_err(|_| JobError::Poisoned)
    }

    /// Adds a running job. Ids start at 1 and are never handed out twice.
    pub fn register(&self, command: &str, pid: u32) -> Result<usize, JobError> {
        let mut table = self.lock()?;
        table.last_id += 1;
        let id = table.last_id;
        table.jobs.insert(
            id,
            Job {
                id,
                pid,
                command: command.to_string(),
                state: JobState::Running,
            },
        );
        tracing::debug!(id, pid, command, "registered job");
        Ok(id)
    }

    /// Keeps the handle of the thread reaping job `id` so it can be joined
    /// once the job is collected.
    pub fn attach_waiter(&self, id: usize, handle: JoinHandle<()>) -> Result<(), JobError> {
        let mut table = self.lock()?;
        // Already collected: the thread has finished and needs no join.
        if table.jobs.contains_key(&id) {
            table.waiters.insert(id, handle);
        }
        Ok(())
    }

    /// Snapshot of all jobs, ordered by id.
    pub fn list(&self) -> Result<Vec<Job>, JobError> {
        Ok(self.lock()?.jobs.values().cloned().collect())
    }

    pub fn get(&self, id: usize) -> Result<Option<Job>, JobError> {
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    /// Returns false when the job is no longer in the table.
    pub fn set_state(&self, id: usize, state: JobState) -> Result<bool, JobError> {
        let mut table = self.lock()?;
        match table.jobs.get_mut(&id) {
            Some(job) => {
                tracing::debug!(id, from = %job.state, to = %state, "job state change");
                job.state = state;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes job `id`, or the job with the highest id when `id` is `None`,
    /// and returns it.
    ///
    /// The process is not re-attached: it keeps running on its own and is
    /// still reaped by its waiter thread.
    pub fn bring_to_foreground(&self, id: Option<usize>) -> Result<Job, JobError> {
        let mut table = self.lock()?;
        let id = match id {
            Some(id) => id,
            None => *table
                .jobs
                .keys()
                .next_back()
                .ok_or(JobError::NoSuchJob(None))?,
        };

        let job = table.jobs.remove(&id).ok_or(JobError::NoSuchJob(Some(id)))?;
        // The waiter has no job entry left to update; let it finish detached.
        table.waiters.remove(&id);
        Ok(job)
    }

    /// Leaves the table lock poisoned, as after a panic while it was held.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let table = Arc::clone(&self.table);
        let _ = std::thread::spawn(move || {
            let _guard = table.lock();
            panic!("job table poisoned");
        })
        .join();
    }

    pub fn resume_in_background(&self, _id: Option<usize>) -> Result<Job, JobError> {
        Err(JobError::Unsupported("bg"))
    }

    /// Removes every job whose pipeline has exited and joins its waiter.
    pub fn take_finished(&self) -> Result<Vec<Job>, JobError> {
        let (finished, waiters) = {
            let mut table = self.lock()?;
            let ids: Vec<usize> = table
                .jobs
                .values()
                .filter(|job| job.state == JobState::Done)
                .map(|job| job.id)
                .collect();

            let mut finished = Vec::with_capacity(ids.len());
            let mut waiters = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(job) = table.jobs.remove(&id) {
                    finished.push(job);
                }
                if let Some(handle) = table.waiters.remove(&id) {
                    waiters.push(handle);
                }
            }
            (finished, waiters)
        };

        for handle in waiters {
            if handle.join().is_err() {
                tracing::warn!("job waiter thread panicked");
            }
        }
        Ok(finished)
    }
}

/// Parses `N` or `%N`.
pub fn parse_job_id(arg: &str) -> Result<usize, JobError> {
    arg.strip_prefix('%')
        .unwrap_or(arg)
        .parse::<usize>()
        .map_err(|_| JobError::InvalidJobId(arg.to_string()))
}
