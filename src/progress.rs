// src/progress.rs
//
// Job-keyed progress state shared between the pipeline runner and whatever
// is polling it. The registry is an explicit handle passed to both sides;
// entries live until the owner calls remove().

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Idle,
    Starting,
    Running,
    Done,
    Error(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Starting => "starting",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error(_))
    }
}

#[derive(Debug, Clone)]
pub struct ProgressState {
    pub current: u64,
    pub total: u64,
    pub status: JobStatus,
}

/// Poll response: percent in [0, 100] plus the job status.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub percent: f32,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressRegistry {
    jobs: Arc<Mutex<HashMap<String, ProgressState>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ProgressState>> {
        match self.jobs.lock() {
            Ok(guard) => guard,
            // A panicked writer leaves counters at their last value, which
            // is still safe to read and overwrite.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a job before its total is known.
    pub fn create(&self, job_id: &str) {
        self.lock().insert(
            job_id.to_string(),
            ProgressState {
                current: 0,
                total: 0,
                status: JobStatus::Starting,
            },
        );
    }

    /// Reset the entry with the frame total and mark it running.
    pub fn start(&self, job_id: &str, total: u64) {
        self.lock().insert(
            job_id.to_string(),
            ProgressState {
                current: 0,
                total,
                status: JobStatus::Running,
            },
        );
    }

    /// One unit of work finished; called once per frame.
    pub fn advance(&self, job_id: &str) {
        if let Some(state) = self.lock().get_mut(job_id) {
            state.current += 1;
        }
    }

    pub fn finish(&self, job_id: &str) {
        if let Some(state) = self.lock().get_mut(job_id) {
            state.status = JobStatus::Done;
        }
    }

    pub fn fail(&self, job_id: &str, message: impl Into<String>) {
        if let Some(state) = self.lock().get_mut(job_id) {
            state.status = JobStatus::Error(message.into());
        }
    }

    pub fn poll(&self, job_id: &str) -> ProgressSnapshot {
        match self.lock().get(job_id) {
            Some(state) => {
                // Metadata may under-report the frame total; the percent
                // still stays within [0, 100].
                let percent = if state.total == 0 {
                    0.0
                } else {
                    (100.0 * state.current as f32 / state.total as f32).clamp(0.0, 100.0)
                };
                ProgressSnapshot {
                    percent,
                    status: state.status.clone(),
                }
            }
            None => ProgressSnapshot {
                percent: 0.0,
                status: JobStatus::Idle,
            },
        }
    }

    /// Explicit eviction; the registry never drops entries on its own.
    pub fn remove(&self, job_id: &str) {
        self.lock().remove(job_id);
    }
}
