//! Per-group episode ingestion queues.
//!
//! Each group id owns an unbounded FIFO queue drained by exactly one worker
//! task, so mutations within a group run strictly in submission order while
//! different groups proceed in parallel. A group's map entry and its worker
//! live and die together: the entry is created (and the worker spawned)
//! under the map lock on first enqueue, and the worker removes the entry
//! under the same lock when it observes the queue empty. An enqueue racing a
//! worker's exit therefore either lands in the queue before the removal or
//! finds the entry gone and spawns a fresh worker itself; no item can be
//! stranded between a dying worker and a caller that believes one is live.

use std::collections::{hash_map::Entry, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use graphiti_memory::utils::truncate_with_ellipsis;
use graphiti_memory::{Graphiti, NewEpisode};

/// How long `shutdown` waits for in-flight episodes before giving up.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Executes one queued episode mutation. The queue owns ordering; the
/// ingestor owns what an episode means.
#[async_trait]
pub trait EpisodeIngestor: Send + Sync {
    async fn ingest(&self, episode: &NewEpisode) -> graphiti_memory::Result<()>;
}

/// Ingestor backed by the real knowledge graph client.
pub struct GraphitiIngestor {
    client: Arc<Graphiti>,
}

impl GraphitiIngestor {
    pub fn new(client: Arc<Graphiti>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EpisodeIngestor for GraphitiIngestor {
    async fn ingest(&self, episode: &NewEpisode) -> graphiti_memory::Result<()> {
        info!(
            episode = %episode.name,
            group_id = %episode.group_id,
            preview = %truncate_with_ellipsis(&episode.body, 80),
            "processing episode"
        );
        let uuid = self.client.add_episode(episode.clone()).await?;
        info!(episode = %episode.name, episode_uuid = %uuid, "episode processed");
        Ok(())
    }
}

type QueueMap = HashMap<String, VecDeque<NewEpisode>>;

/// The group-to-queue map plus worker lifecycle management.
///
/// Invariant: a map entry exists for a group if and only if a worker task
/// is live for that group. All transitions happen under `inner`'s lock.
pub struct GroupQueues {
    ingestor: Arc<dyn EpisodeIngestor>,
    inner: Mutex<QueueMap>,
    shutting_down: AtomicBool,
    /// Signalled each time a worker exits; `shutdown` waits on it.
    idle: Notify,
}

impl GroupQueues {
    pub fn new(ingestor: Arc<dyn EpisodeIngestor>) -> Self {
        Self {
            ingestor,
            inner: Mutex::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
            idle: Notify::new(),
        }
    }

    /// Append an episode to its group's queue, spawning the group's worker
    /// if none is live, and return the resulting queue depth.
    ///
    /// Never blocks on ingestion; the depth counts items waiting behind any
    /// currently executing one. During shutdown the item is still accepted
    /// but will be abandoned when its worker observes the shutdown flag.
    pub fn enqueue(self: &Arc<Self>, episode: NewEpisode) -> usize {
        let group_id = episode.group_id.clone();
        let mut inner = self.lock();
        match inner.entry(group_id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().push_back(episode);
                entry.get().len()
            }
            Entry::Vacant(entry) => {
                entry.insert(VecDeque::from([episode]));
                // Spawning while the lock is held keeps entry-present
                // equivalent to worker-live; spawn only schedules the task.
                tokio::spawn(Arc::clone(self).run_worker(group_id));
                1
            }
        }
    }

    /// Number of groups with a live worker.
    pub fn live_groups(&self) -> usize {
        self.lock().len()
    }

    /// Items waiting in a group's queue; 0 when the group has no live worker.
    pub fn depth(&self, group_id: &str) -> usize {
        self.lock().get(group_id).map_or(0, VecDeque::len)
    }

    /// Stop accepting work into running workers and wait up to `grace` for
    /// in-flight items to finish. Queued-but-unstarted items are abandoned;
    /// the queues are in-memory only and carry no restart guarantee.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutting_down.store(true, Ordering::SeqCst);

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            // Arm the waiter before checking liveness so a worker exiting
            // between the check and the await cannot be missed.
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let live = self.live_groups();
            if live == 0 {
                debug!("all queue workers stopped");
                return;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                warn!(live, "shutdown grace elapsed with workers still running");
                return;
            }
        }
    }

    async fn run_worker(self: Arc<Self>, group_id: String) {
        debug!(group_id = %group_id, "queue worker started");
        let mut processed = 0usize;
        loop {
            let item = {
                let mut inner = self.lock();
                if self.shutting_down.load(Ordering::SeqCst) {
                    let abandoned = inner.remove(&group_id).map_or(0, |q| q.len());
                    if abandoned > 0 {
                        warn!(group_id = %group_id, abandoned, "abandoning queued episodes on shutdown");
                    }
                    self.idle.notify_waiters();
                    break;
                }
                match inner.get_mut(&group_id).and_then(VecDeque::pop_front) {
                    Some(item) => item,
                    None => {
                        // Removal and the emptiness check share one lock
                        // acquisition; see the module docs for the race
                        // this closes.
                        inner.remove(&group_id);
                        self.idle.notify_waiters();
                        break;
                    }
                }
            };

            // One bad episode must not block the rest of the group.
            if let Err(e) = self.ingestor.ingest(&item).await {
                error!(
                    group_id = %group_id,
                    episode = %item.name,
                    error = %e,
                    "episode ingestion failed"
                );
            }
            processed += 1;
        }
        debug!(group_id = %group_id, processed, "queue worker stopped");
    }

    fn lock(&self) -> MutexGuard<'_, QueueMap> {
        // A panicking worker must not wedge every other group's queue.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
