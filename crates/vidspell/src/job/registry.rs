//! In-memory job table shared between job tasks and pollers.
//!
//! Each job lives in its own `RwLock` cell; the map lock is held only for
//! insert, lookup and removal, never while a job is being updated.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use super::events::{JobProgressBroadcaster, JobProgressEvent};
use super::state::{Job, JobPhase, JobStatus, JobView, TransitionError};
use crate::config::ProgressConfig;
use crate::language::Language;

pub type JobCell = RwLock<Job>;

fn read_cell(cell: &JobCell) -> RwLockReadGuard<'_, Job> {
    match cell.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Job lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn write_cell(cell: &JobCell) -> RwLockWriteGuard<'_, Job> {
    match cell.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Job lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Why a job could not be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveError {
    NotFound,
    NotTerminal { status: JobStatus, phase: JobPhase },
}

pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<JobCell>>>,
    events: JobProgressBroadcaster,
    progress: ProgressConfig,
}

impl JobRegistry {
    pub fn new(progress: ProgressConfig, event_capacity: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            events: JobProgressBroadcaster::new(event_capacity),
            progress,
        }
    }

    fn jobs_read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<JobCell>>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn jobs_write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<JobCell>>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Registers a new queued job under a fresh UUID.
    pub fn create(&self, video_name: &str, language: Language) -> JobHandle {
        let id = uuid::Uuid::new_v4().to_string();
        let job = Job::new(id.clone(), video_name, language);
        let event = JobProgressEvent::from_job(&job);
        let cell = Arc::new(RwLock::new(job));

        self.jobs_write().insert(id.clone(), Arc::clone(&cell));
        self.events.send(event);

        JobHandle {
            id,
            cell,
            events: self.events.clone(),
        }
    }

    pub fn get(&self, job_id: &str) -> Option<JobHandle> {
        let cell = self.jobs_read().get(job_id).cloned()?;
        Some(JobHandle {
            id: job_id.to_string(),
            cell,
            events: self.events.clone(),
        })
    }

    /// Consistent copy of a job for pollers.
    pub fn snapshot(&self, job_id: &str) -> Option<JobView> {
        let cell = self.jobs_read().get(job_id).cloned()?;
        let job = read_cell(&cell);
        Some(job.view(&self.progress))
    }

    /// Removes a job that reached done or error.
    pub fn remove_terminal(&self, job_id: &str) -> Result<(), RemoveError> {
        let mut jobs = self.jobs_write();
        let cell = jobs.get(job_id).ok_or(RemoveError::NotFound)?;
        {
            let job = read_cell(cell);
            if !job.is_terminal() {
                return Err(RemoveError::NotTerminal {
                    status: job.status,
                    phase: job.phase,
                });
            }
        }
        jobs.remove(job_id);
        Ok(())
    }

    /// Removes terminal jobs that finished at or before `cutoff`, returning
    /// their ids.
    pub fn remove_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        let mut jobs = self.jobs_write();
        let expired: Vec<String> = jobs
            .iter()
            .filter(|(_, cell)| {
                let job = read_cell(cell);
                job.is_terminal() && job.finished_at.is_some_and(|at| at <= cutoff)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            jobs.remove(id);
        }
        expired
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs_read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.jobs_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.events.subscribe()
    }
}

/// Access to one job's cell. Every mutation happens under a single write lock
/// and emits a progress event afterwards. A rejected update leaves the job
/// unchanged.
#[derive(Clone)]
pub struct JobHandle {
    id: String,
    cell: Arc<JobCell>,
    events: JobProgressBroadcaster,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn read<T>(&self, f: impl FnOnce(&Job) -> T) -> T {
        f(&read_cell(&self.cell))
    }

    pub fn update<T>(
        &self,
        f: impl FnOnce(&mut Job) -> Result<T, TransitionError>,
    ) -> Result<T, TransitionError> {
        let (value, event) = {
            let mut job = write_cell(&self.cell);
            let mut draft = job.clone();
            let value = f(&mut draft)?;
            *job = draft;
            (value, JobProgressEvent::from_job(&job))
        };
        self.events.send(event);
        Ok(value)
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.read(|job| job.cancel_requested)
    }

    /// Flags the job for cancellation; no effect once it is terminal.
    pub fn request_cancel(&self) -> bool {
        let mut job = write_cell(&self.cell);
        if job.is_terminal() {
            return false;
        }
        job.cancel_requested = true;
        true
    }
}
