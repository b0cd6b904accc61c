mod app;
mod clock;
mod dashboard;
pub mod job;
pub mod persist;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use app::{App, AppError, AppHandle};
pub use clock::{now_millis, DEFAULT_TICK_INTERVAL};
pub use job::{DraftError, DraftField, Job, JobDraft, JobError, JobId, Overdue, MS_PER_DAY};
pub use persist::{HttpPersister, PersistError, Persister, StoragePersister};
pub use snapshot::{Snapshot, SnapshotError};
pub use storage::{SqliteStorage, Storage, StorageError};
pub use store::{DueJob, Effect, Event, JobStore, StoreError, View};
