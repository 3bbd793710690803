//! Batch store actor
//!
//! Owns the [`FileRecord`] collection and the results map. Everything else
//! talks to it through a cloneable [`BatchHandle`]; commands are applied one at
//! a time in the order they were sent, so progress updates queued during
//! extraction always land before the transition that ends it.
//!
//! Records are addressed by index in acceptance order. Removing a record
//! shifts the indices of the records after it.

use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::record::{FileRecord, FileStatus};
use super::types::AnalysisResult;
use crate::error::{StoreError, TransitionError};

/// Capacity of the event channel; slow subscribers miss events past this
const EVENT_CAPACITY: usize = 256;

/// A state change published to subscribers
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordEvent {
    pub index: usize,
    pub name: String,
    pub status: FileStatus,
    pub progress: Option<u8>,
    /// The record left the batch
    pub removed: bool,
}

impl RecordEvent {
    fn of(index: usize, record: &FileRecord) -> Self {
        Self {
            index,
            name: record.file.name.clone(),
            status: record.status,
            progress: record.progress,
            removed: false,
        }
    }
}

/// A copy-on-write state transition applied inside the actor
pub type Transition = Box<dyn FnOnce(FileRecord) -> Result<FileRecord, TransitionError> + Send>;

enum Command {
    Add {
        record: FileRecord,
        reply: oneshot::Sender<usize>,
    },
    Get {
        index: usize,
        reply: oneshot::Sender<Option<FileRecord>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<FileRecord>>,
    },
    Replace {
        index: usize,
        record: FileRecord,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Update {
        index: usize,
        transition: Transition,
        reply: oneshot::Sender<Result<FileRecord, StoreError>>,
    },
    Progress {
        index: usize,
        percent: u8,
    },
    SetResult {
        name: String,
        result: AnalysisResult,
        reply: oneshot::Sender<()>,
    },
    GetResult {
        name: String,
        reply: oneshot::Sender<Option<AnalysisResult>>,
    },
    Results {
        reply: oneshot::Sender<HashMap<String, AnalysisResult>>,
    },
    ClearResult {
        index: usize,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Remove {
        index: usize,
        reply: oneshot::Sender<Result<FileRecord, StoreError>>,
    },
}

/// State owned by the actor task
struct BatchStore {
    records: Vec<FileRecord>,
    results: HashMap<String, AnalysisResult>,
    events: broadcast::Sender<RecordEvent>,
}

impl BatchStore {
    /// Start the actor on the current runtime and return a handle to it.
    /// The actor stops once every handle is dropped.
    fn spawn() -> BatchHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let store = Self {
            records: Vec::new(),
            results: HashMap::new(),
            events: events.clone(),
        };
        tokio::spawn(store.run(rx));

        BatchHandle { tx, events }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        tracing::debug!("[BatchStore] All handles dropped, stopping");
    }

    fn publish(&self, event: RecordEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Add { record, reply } => {
                let index = self.records.len();
                self.publish(RecordEvent::of(index, &record));
                self.records.push(record);
                let _ = reply.send(index);
            }
            Command::Get { index, reply } => {
                let _ = reply.send(self.records.get(index).cloned());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.records.clone());
            }
            Command::Replace {
                index,
                record,
                reply,
            } => {
                let outcome = match self.records.get_mut(index) {
                    Some(slot) => {
                        *slot = record;
                        self.publish(RecordEvent::of(index, &self.records[index]));
                        Ok(())
                    }
                    None => Err(StoreError::NotFound(index)),
                };
                let _ = reply.send(outcome);
            }
            Command::Update {
                index,
                transition,
                reply,
            } => {
                let _ = reply.send(self.apply(index, transition));
            }
            Command::Progress { index, percent } => {
                let Some(current) = self.records.get(index) else {
                    return;
                };
                let before = current.progress;
                match current.clone().record_progress(percent) {
                    Ok(next) => {
                        if next.progress != before {
                            self.publish(RecordEvent::of(index, &next));
                        }
                        self.records[index] = next;
                    }
                    Err(e) => {
                        tracing::debug!("[BatchStore] Dropping progress {} for #{}: {}", percent, index, e);
                    }
                }
            }
            Command::SetResult {
                name,
                result,
                reply,
            } => {
                self.results.insert(name, result);
                let _ = reply.send(());
            }
            Command::GetResult { name, reply } => {
                let _ = reply.send(self.results.get(&name).cloned());
            }
            Command::Results { reply } => {
                let _ = reply.send(self.results.clone());
            }
            Command::ClearResult { index, reply } => {
                let outcome = match self.records.get(index) {
                    Some(record) => {
                        let name = record.name().to_string();
                        self.drop_result_unless_done(&name, Some(index));
                        Ok(())
                    }
                    None => Err(StoreError::NotFound(index)),
                };
                let _ = reply.send(outcome);
            }
            Command::Remove { index, reply } => {
                let outcome = if index < self.records.len() {
                    let record = self.records.remove(index);
                    self.drop_result_unless_done(record.name(), None);
                    self.publish(RecordEvent {
                        removed: true,
                        ..RecordEvent::of(index, &record)
                    });
                    Ok(record)
                } else {
                    Err(StoreError::NotFound(index))
                };
                let _ = reply.send(outcome);
            }
        }
    }

    /// Drop the result for `name` unless another record with that name is
    /// still `done` and relies on it
    fn drop_result_unless_done(&mut self, name: &str, except: Option<usize>) {
        let still_done = self
            .records
            .iter()
            .enumerate()
            .any(|(i, r)| Some(i) != except && r.name() == name && r.status == FileStatus::Done);
        if !still_done {
            self.results.remove(name);
        }
    }

    fn apply(&mut self, index: usize, transition: Transition) -> Result<FileRecord, StoreError> {
        let current = self
            .records
            .get(index)
            .cloned()
            .ok_or(StoreError::NotFound(index))?;

        let next = transition(current)?;
        self.records[index] = next.clone();
        self.publish(RecordEvent::of(index, &next));
        Ok(next)
    }
}

/// Cloneable access to a running [`BatchStore`]
#[derive(Clone)]
pub struct BatchHandle {
    tx: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<RecordEvent>,
}

impl BatchHandle {
    /// Spawn a fresh store
    pub fn spawn() -> Self {
        BatchStore::spawn()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Append a record, returning its index
    pub async fn add(&self, record: FileRecord) -> Result<usize, StoreError> {
        self.request(|reply| Command::Add { record, reply }).await
    }

    pub async fn get(&self, index: usize) -> Result<FileRecord, StoreError> {
        self.request(|reply| Command::Get { index, reply })
            .await?
            .ok_or(StoreError::NotFound(index))
    }

    /// All records in acceptance order
    pub async fn snapshot(&self) -> Result<Vec<FileRecord>, StoreError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.snapshot().await?.len())
    }

    /// Swap in a record wholesale
    pub async fn replace(&self, index: usize, record: FileRecord) -> Result<(), StoreError> {
        self.request(|reply| Command::Replace {
            index,
            record,
            reply,
        })
        .await?
    }

    /// Apply a transition to the current record at `index` and store the result.
    /// On an illegal transition the record is left unchanged.
    pub async fn update<F>(&self, index: usize, transition: F) -> Result<FileRecord, StoreError>
    where
        F: FnOnce(FileRecord) -> Result<FileRecord, TransitionError> + Send + 'static,
    {
        self.request(|reply| Command::Update {
            index,
            transition: Box::new(transition),
            reply,
        })
        .await?
    }

    /// Queue a progress update without waiting. Safe to call from sync callbacks.
    pub fn set_progress(&self, index: usize, percent: u8) {
        if self.tx.send(Command::Progress { index, percent }).is_err() {
            tracing::debug!("[BatchStore] Progress for #{} dropped, store closed", index);
        }
    }

    /// Store an analysis result, overwriting any earlier one with the same name
    pub async fn set_result(&self, name: impl Into<String>, result: AnalysisResult) -> Result<(), StoreError> {
        let name = name.into();
        self.request(|reply| Command::SetResult { name, result, reply })
            .await
    }

    pub async fn get_result(&self, name: impl Into<String>) -> Result<Option<AnalysisResult>, StoreError> {
        let name = name.into();
        self.request(|reply| Command::GetResult { name, reply }).await
    }

    pub async fn results(&self) -> Result<HashMap<String, AnalysisResult>, StoreError> {
        self.request(|reply| Command::Results { reply }).await
    }

    /// Drop the stored result for the record at `index`, e.g. after its
    /// re-analysis failed. Kept while a same-named record is still `done`.
    pub async fn clear_result(&self, index: usize) -> Result<(), StoreError> {
        self.request(|reply| Command::ClearResult { index, reply }).await?
    }

    /// Remove a record and its stored result. The result survives while a
    /// same-named record is still `done`.
    pub async fn remove(&self, index: usize) -> Result<FileRecord, StoreError> {
        self.request(|reply| Command::Remove { index, reply }).await?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.events.subscribe()
    }
}
