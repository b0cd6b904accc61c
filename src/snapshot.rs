//! JSON wire format for the full job store.
//!
//! Jobs travel as a list of `{ "k": id, "v": job }` pairs rather than a JSON
//! object so keys stay integers in every encoding.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobId};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Job id {0} appears more than once")]
    DuplicateId(JobId),
    #[error("Job id {0} leaves no room for new ids")]
    IdOutOfRange(JobId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub k: JobId,
    pub v: Job,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub jobs: Vec<Entry>,
}

impl Snapshot {
    /// Build a snapshot from a job map, ordered by id
    pub fn from_jobs(jobs: &HashMap<JobId, Job>) -> Self {
        let mut jobs: Vec<Entry> = jobs
            .iter()
            .map(|(id, job)| Entry { k: *id, v: job.clone() })
            .collect();
        jobs.sort_by_key(|entry| entry.k);
        Self { jobs }
    }

    pub fn into_jobs(self) -> HashMap<JobId, Job> {
        self.jobs.into_iter().map(|entry| (entry.k, entry.v)).collect()
    }

    /// Ids must be unique and leave room for the next id.
    ///
    /// Job invariants are already enforced when a `Job` is built or decoded.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen = HashSet::with_capacity(self.jobs.len());
        for entry in &self.jobs {
            if entry.k.next().is_none() {
                return Err(SnapshotError::IdOutOfRange(entry.k));
            }
            if !seen.insert(entry.k) {
                return Err(SnapshotError::DuplicateId(entry.k));
            }
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
