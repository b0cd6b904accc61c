use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::job::{DraftError, DraftField, Job, JobDraft, JobId, Overdue};
use crate::snapshot::Snapshot;

/// What the host must do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// State changed; send the snapshot to the backing store.
    Persist,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("No job ids left to allocate")]
    IdsExhausted,
}

/// Everything that can happen to a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Draft(DraftField),
    /// Build a job from the current draft and add it.
    Create,
    Add(Job),
    MarkDone(JobId),
    Delete(JobId),
    Tick(i64),
    /// Swap in every job from a snapshot received over `POST /data`.
    Replace(Snapshot),
}

/// A job that is due, with how overdue it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueJob {
    pub id: JobId,
    pub job: Job,
    pub overdue: Overdue,
}

/// Plain data the dashboard renders from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub now: i64,
    pub due: Vec<DueJob>,
    pub draft: JobDraft,
    pub draft_status: Result<(), DraftError>,
    pub total_jobs: usize,
}

/// All jobs, the id counter and the store's notion of the current time
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs: HashMap<JobId, Job>,
    next_id: JobId,
    now: i64,
    draft: JobDraft,
}

/// One past the largest id in `jobs`, or 0 for no jobs
fn first_free_id(jobs: &HashMap<JobId, Job>) -> Result<JobId, StoreError> {
    match jobs.keys().max() {
        Some(id) => id.next().ok_or(StoreError::IdsExhausted),
        None => Ok(JobId(0)),
    }
}

impl JobStore {
    pub fn new(now: i64) -> Self {
        Self {
            jobs: HashMap::new(),
            next_id: JobId(0),
            now,
            draft: JobDraft::default(),
        }
    }

    pub fn from_jobs(now: i64, jobs: HashMap<JobId, Job>) -> Result<Self, StoreError> {
        let next_id = first_free_id(&jobs)?;

        Ok(Self {
            jobs,
            next_id,
            now,
            draft: JobDraft::default(),
        })
    }

    /// Bootstrap from persisted text. Missing or malformed data gives an
    /// empty store.
    pub fn from_snapshot(now: i64, text: Option<&str>) -> Self {
        let Some(text) = text else {
            debug!("No snapshot, starting empty");
            return Self::new(now);
        };

        let snapshot = match Snapshot::decode(text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed snapshot");
                return Self::new(now);
            }
        };

        match Self::from_jobs(now, snapshot.into_jobs()) {
            Ok(store) => {
                info!(jobs = store.jobs.len(), next_id = %store.next_id, "Loaded snapshot");
                store
            }
            Err(e) => {
                warn!(error = %e, "Ignoring malformed snapshot");
                Self::new(now)
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_jobs(&self.jobs)
    }

    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn next_id(&self) -> JobId {
        self.next_id
    }

    pub fn draft(&self) -> &JobDraft {
        &self.draft
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Apply one event
    pub fn update(&mut self, event: Event) -> Effect {
        match event {
            Event::Draft(field) => {
                self.draft.set(field);
                Effect::None
            }
            Event::Create => self.create(),
            Event::Add(job) => self.try_add(job),
            Event::MarkDone(id) => self.mark_done(id),
            Event::Delete(id) => self.delete_job(id),
            Event::Tick(now) => {
                self.tick(now);
                Effect::None
            }
            Event::Replace(snapshot) => self.replace(snapshot),
        }
    }

    /// Insert a job under the next free id and clear the draft.
    ///
    /// Fails without touching the store once the id space is used up.
    pub fn add_job(&mut self, job: Job) -> Result<JobId, StoreError> {
        let id = self.next_id;
        let next_id = id.next().ok_or(StoreError::IdsExhausted)?;
        info!(job_id = %id, title = %job.title(), period_days = job.period_days(), "Job added");

        self.jobs.insert(id, job);
        self.next_id = next_id;
        self.draft = JobDraft::default();
        Ok(id)
    }

    fn try_add(&mut self, job: Job) -> Effect {
        match self.add_job(job) {
            Ok(_) => Effect::Persist,
            Err(e) => {
                warn!(error = %e, "Job not added");
                Effect::None
            }
        }
    }

    /// Add the current draft if it validates
    pub fn create(&mut self) -> Effect {
        match self.draft.build() {
            Ok(job) => self.try_add(job),
            Err(e) => {
                debug!(error = %e, "Draft not valid, nothing created");
                Effect::None
            }
        }
    }

    /// Replace every job with the snapshot's.
    ///
    /// The id counter never moves backwards, so ids of deleted jobs are not
    /// handed out again. The draft and the current time are kept.
    pub fn replace(&mut self, snapshot: Snapshot) -> Effect {
        if let Err(e) = snapshot.validate() {
            warn!(error = %e, "Ignoring invalid snapshot");
            return Effect::None;
        }

        let jobs = snapshot.into_jobs();
        let next_id = match first_free_id(&jobs) {
            Ok(id) => id.max(self.next_id),
            Err(e) => {
                warn!(error = %e, "Ignoring invalid snapshot");
                return Effect::None;
            }
        };

        info!(jobs = jobs.len(), next_id = %next_id, "Jobs replaced");
        self.jobs = jobs;
        self.next_id = next_id;
        Effect::Persist
    }

    pub fn mark_done(&mut self, id: JobId) -> Effect {
        match self.jobs.get_mut(&id) {
            Some(job) => {
                job.mark_done(self.now);
                info!(job_id = %id, at = self.now, "Job done");
                Effect::Persist
            }
            None => {
                debug!(job_id = %id, "Mark done on unknown job");
                Effect::None
            }
        }
    }

    pub fn delete_job(&mut self, id: JobId) -> Effect {
        match self.jobs.remove(&id) {
            Some(job) => {
                info!(job_id = %id, title = %job.title(), "Job deleted");
                Effect::Persist
            }
            None => {
                debug!(job_id = %id, "Delete on unknown job");
                Effect::None
            }
        }
    }

    pub fn tick(&mut self, now: i64) {
        self.now = now;
    }

    /// Jobs that are due at the store's current time, most overdue first.
    ///
    /// Equal amounts keep ascending id order.
    pub fn due(&self) -> Vec<DueJob> {
        let mut due: Vec<DueJob> = self
            .jobs
            .iter()
            .filter_map(|(id, job)| {
                job.overdue(self.now).map(|overdue| DueJob {
                    id: *id,
                    job: job.clone(),
                    overdue,
                })
            })
            .collect();

        due.sort_by(|a, b| b.overdue.cmp(&a.overdue).then(a.id.cmp(&b.id)));
        due
    }

    pub fn view(&self) -> View {
        View {
            now: self.now,
            due: self.due(),
            draft: self.draft.clone(),
            draft_status: self.draft.build().map(|_| ()),
            total_jobs: self.jobs.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::MS_PER_DAY;

    const T0: i64 = 1_700_000_000_000;
    const DAY: i64 = MS_PER_DAY as i64;

    fn job(title: &str, days: u64, last_done: Option<i64>) -> Job {
        Job::new(title, days * MS_PER_DAY, last_done).unwrap()
    }

    fn store_with(now: i64, jobs: Vec<(u64, Job)>) -> JobStore {
        JobStore::from_jobs(now, jobs.into_iter().map(|(k, v)| (JobId(k), v)).collect()).unwrap()
    }

    fn ids(due: &[DueJob]) -> Vec<u64> {
        due.iter().map(|d| d.id.0).collect()
    }

    #[test]
    fn test_next_id_after_load() {
        assert_eq!(JobStore::new(T0).next_id(), JobId(0));

        let store = store_with(T0, vec![(4, job("a", 1, None)), (11, job("b", 1, None))]);
        assert_eq!(store.next_id(), JobId(12));
    }

    #[test]
    fn test_from_snapshot() {
        let text = r#"{"jobs":[{"k":2,"v":{"title":"Water plants","period":172800000,"lastDone":null}}]}"#;
        let store = JobStore::from_snapshot(T0, Some(text));
        assert_eq!(store.len(), 1);
        assert_eq!(store.next_id(), JobId(3));
        assert_eq!(store.now(), T0);

        let top_id = r#"{"jobs":[{"k":18446744073709551615,"v":{"title":"a","period":86400000,"lastDone":null}}]}"#;
        let empty_title = r#"{"jobs":[{"k":1,"v":{"title":"","period":86400000,"lastDone":null}}]}"#;
        for bad in [None, Some(""), Some("{"), Some(r#"{"tasks":[]}"#), Some(top_id), Some(empty_title)] {
            let store = JobStore::from_snapshot(T0, bad);
            assert!(store.is_empty());
            assert_eq!(store.next_id(), JobId(0));
        }
    }

    #[test]
    fn test_never_done_job_is_due() {
        let store = store_with(T0, vec![(1, job("Water plants", 2, None))]);

        let due = store.due();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, JobId(1));
        assert_eq!(due[0].job.period(), 172_800_000);
        assert_eq!(due[0].overdue, Overdue::Never);
    }

    #[test]
    fn test_due_boundary() {
        let mut store = store_with(T0 + DAY - 1, vec![(0, job("Feed cat", 1, Some(T0)))]);
        assert!(store.due().is_empty());

        store.tick(T0 + DAY);
        let due = store.due();
        assert_eq!(ids(&due), vec![0]);
        assert_eq!(due[0].overdue, Overdue::By(0));
    }

    #[test]
    fn test_due_ordering() {
        let now = T0 + 30 * DAY;
        let store = store_with(
            now,
            vec![
                (0, job("a little late", 1, Some(now - DAY - 10))),
                (1, job("not due", 7, Some(now - DAY))),
                (2, job("very late", 2, Some(T0))),
                (3, job("never", 90, None)),
                (4, job("on the dot", 3, Some(now - 3 * DAY))),
            ],
        );

        let due = store.due();
        assert_eq!(ids(&due), vec![3, 2, 0, 4]);
        assert_eq!(due[1].overdue, Overdue::By((28 * DAY) as u64));
        assert_eq!(due[2].overdue, Overdue::By(10));
        assert!(due.windows(2).all(|w| w[0].overdue >= w[1].overdue));
    }

    #[test]
    fn test_equal_amounts_keep_id_order() {
        let store = store_with(
            T0,
            vec![
                (9, job("c", 1, None)),
                (2, job("a", 1, None)),
                (5, job("b", 1, None)),
            ],
        );
        assert_eq!(ids(&store.due()), vec![2, 5, 9]);
    }

    #[test]
    fn test_add_job_allocates_ids() {
        let mut store = store_with(T0, vec![(3, job("a", 1, None))]);
        store.update(Event::Draft(DraftField::Title("half typed".to_string())));

        assert_eq!(store.update(Event::Add(job("b", 2, None))), Effect::Persist);
        assert_eq!(store.get(JobId(4)).map(|j| j.title()), Some("b"));
        assert_eq!(store.next_id(), JobId(5));
        assert_eq!(store.draft(), &JobDraft::default());
    }

    #[test]
    fn test_create_from_draft() {
        let mut store = JobStore::new(T0);
        store.update(Event::Draft(DraftField::Title("Water plants".to_string())));
        store.update(Event::Draft(DraftField::Period("2".to_string())));

        assert_eq!(store.update(Event::Create), Effect::Persist);
        assert_eq!(store.get(JobId(0)), Some(&job("Water plants", 2, None)));
        assert_eq!(store.next_id(), JobId(1));
        assert_eq!(store.draft(), &JobDraft::default());
    }

    #[test]
    fn test_create_with_invalid_draft_changes_nothing() {
        let mut store = JobStore::new(T0);
        store.update(Event::Draft(DraftField::Title(String::new())));
        store.update(Event::Draft(DraftField::Period("5".to_string())));

        assert_eq!(store.update(Event::Create), Effect::None);
        assert!(store.is_empty());
        assert_eq!(store.next_id(), JobId(0));
        assert_eq!(store.draft(), &JobDraft::new("", "5"));
        assert_eq!(store.view().draft_status, Err(DraftError::EmptyTitle));
    }

    #[test]
    fn test_mark_done_uses_store_time() {
        let mut store = store_with(T0, vec![(1, job("Bins", 7, None))]);
        store.update(Event::Tick(T0 + 500));

        assert_eq!(store.update(Event::MarkDone(JobId(1))), Effect::Persist);
        assert_eq!(store.get(JobId(1)).and_then(|j| j.last_done()), Some(T0 + 500));
        assert!(store.due().is_empty());
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut store = store_with(T0, vec![(1, job("Bins", 7, None))]);
        let before = store.snapshot();

        assert_eq!(store.update(Event::Delete(JobId(99))), Effect::None);
        assert_eq!(store.update(Event::MarkDone(JobId(99))), Effect::None);
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.next_id(), JobId(2));
    }

    #[test]
    fn test_delete_keeps_counter() {
        let mut store = store_with(T0, vec![(1, job("Bins", 7, None))]);

        assert_eq!(store.update(Event::Delete(JobId(1))), Effect::Persist);
        assert!(store.is_empty());
        assert_eq!(store.next_id(), JobId(2));
        assert_eq!(store.add_job(job("Gutters", 90, None)), Ok(JobId(2)));
    }

    #[test]
    fn test_tick_does_not_persist() {
        let mut store = JobStore::new(T0);
        assert_eq!(store.update(Event::Tick(T0 + DAY)), Effect::None);
        assert_eq!(store.now(), T0 + DAY);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = store_with(
            T0,
            vec![(0, job("a", 1, Some(T0 - 5))), (6, job("b", 14, None))],
        );

        let text = store.snapshot().encode().unwrap();
        let reloaded = JobStore::from_snapshot(T0, Some(&text));
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert_eq!(reloaded.next_id(), JobId(7));
    }

    #[test]
    fn test_from_jobs_rejects_top_id() {
        let jobs = HashMap::from([(JobId(u64::MAX), job("a", 1, None))]);
        assert_eq!(JobStore::from_jobs(T0, jobs).unwrap_err(), StoreError::IdsExhausted);
    }

    #[test]
    fn test_add_stops_when_ids_run_out() {
        let mut store = store_with(T0, vec![(u64::MAX - 2, job("a", 1, None))]);
        assert_eq!(store.next_id(), JobId(u64::MAX - 1));

        assert_eq!(store.update(Event::Add(job("b", 1, None))), Effect::Persist);
        assert_eq!(store.next_id(), JobId(u64::MAX));

        store.update(Event::Draft(DraftField::Title("c".to_string())));
        store.update(Event::Draft(DraftField::Period("1".to_string())));
        assert_eq!(store.update(Event::Create), Effect::None);
        assert_eq!(store.add_job(job("d", 1, None)), Err(StoreError::IdsExhausted));
        assert_eq!(store.len(), 2);
        assert_eq!(store.next_id(), JobId(u64::MAX));
        assert_eq!(store.draft(), &JobDraft::new("c", "1"));
    }

    #[test]
    fn test_replace_swaps_jobs() {
        let mut store = store_with(T0, vec![(8, job("old", 1, None))]);
        store.update(Event::Draft(DraftField::Title("typing".to_string())));

        let mut snapshot = Snapshot::default();
        snapshot.jobs.push(crate::snapshot::Entry { k: JobId(2), v: job("new", 3, Some(T0)) });

        assert_eq!(store.update(Event::Replace(snapshot.clone())), Effect::Persist);
        assert_eq!(store.snapshot(), snapshot);
        assert_eq!(store.next_id(), JobId(9));
        assert_eq!(store.draft().title, "typing");
    }

    #[test]
    fn test_replace_rejects_bad_ids() {
        let mut store = store_with(T0, vec![(1, job("kept", 1, None))]);
        let before = store.snapshot();

        let mut duplicated = Snapshot::default();
        for title in ["x", "y"] {
            duplicated.jobs.push(crate::snapshot::Entry { k: JobId(4), v: job(title, 1, None) });
        }
        assert_eq!(store.update(Event::Replace(duplicated)), Effect::None);

        let mut top = Snapshot::default();
        top.jobs.push(crate::snapshot::Entry { k: JobId(u64::MAX), v: job("z", 1, None) });
        assert_eq!(store.update(Event::Replace(top)), Effect::None);

        assert_eq!(store.snapshot(), before);
        assert_eq!(store.next_id(), JobId(2));
    }
}
