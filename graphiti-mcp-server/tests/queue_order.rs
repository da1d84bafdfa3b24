//! Ordering and concurrency guarantees of the per-group episode queues,
//! exercised through the public `GroupQueues` surface.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use graphiti_mcp_server::queue::{EpisodeIngestor, GroupQueues};
use graphiti_memory::{EpisodeType, NewEpisode};

/// Records `(group_id, name)` pairs in completion order, holding each
/// item for `delay` of virtual time first.
struct Recorder {
    completed: Mutex<Vec<(String, String)>>,
    delay: Duration,
}

#[async_trait]
impl EpisodeIngestor for Recorder {
    async fn ingest(&self, episode: &NewEpisode) -> graphiti_memory::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.completed
            .lock()
            .unwrap()
            .push((episode.group_id.clone(), episode.name.clone()));
        Ok(())
    }
}

fn recording_queues(delay: Duration) -> (Arc<GroupQueues>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder {
        completed: Mutex::new(Vec::new()),
        delay,
    });
    (Arc::new(GroupQueues::new(recorder.clone())), recorder)
}

fn episode(name: &str, group: &str) -> NewEpisode {
    NewEpisode {
        name: name.to_string(),
        body: format!("body of {name}"),
        source: EpisodeType::Text,
        source_description: String::new(),
        group_id: group.to_string(),
        reference_time: Utc::now(),
    }
}

async fn drained(queues: &GroupQueues) {
    while queues.live_groups() > 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn per_group_order_survives_interleaved_submission() {
    let (queues, recorder) = recording_queues(Duration::from_millis(10));

    // Submissions alternate between groups; each group must still drain
    // in its own submission order.
    for name in ["a1", "b1", "a2", "b2", "a3", "b3"] {
        let group = if name.starts_with('a') { "alpha" } else { "beta" };
        queues.enqueue(episode(name, group));
    }
    drained(&queues).await;

    let completed = recorder.completed.lock().unwrap();
    let alpha: Vec<&str> = completed
        .iter()
        .filter(|(g, _)| g == "alpha")
        .map(|(_, n)| n.as_str())
        .collect();
    let beta: Vec<&str> = completed
        .iter()
        .filter(|(g, _)| g == "beta")
        .map(|(_, n)| n.as_str())
        .collect();

    assert_eq!(alpha, ["a1", "a2", "a3"]);
    assert_eq!(beta, ["b1", "b2", "b3"]);
}

#[tokio::test(start_paused = true)]
async fn groups_drain_concurrently() {
    let (queues, recorder) = recording_queues(Duration::from_millis(100));

    let started = Instant::now();
    for group in ["g1", "g2", "g3"] {
        queues.enqueue(episode("first", group));
        queues.enqueue(episode("second", group));
    }
    drained(&queues).await;

    // Two 100ms items per group; serial execution across groups would
    // take 600ms, parallel execution roughly 200ms.
    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(recorder.completed.lock().unwrap().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn no_episode_is_lost_under_drain_churn() {
    let (queues, recorder) = recording_queues(Duration::from_millis(1));

    // Repeatedly let workers exit and force respawns; the total must
    // still account for every submission.
    let mut submitted = 0;
    for round in 0..10 {
        for i in 0..5 {
            let group = format!("group-{}", i % 2);
            queues.enqueue(episode(&format!("r{round}-i{i}"), &group));
            submitted += 1;
        }
        drained(&queues).await;
    }

    assert_eq!(recorder.completed.lock().unwrap().len(), submitted);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_backlog_across_groups() {
    let (queues, recorder) = recording_queues(Duration::from_millis(50));

    for group in ["g1", "g2"] {
        for name in ["keep", "drop1", "drop2"] {
            queues.enqueue(episode(name, group));
        }
    }

    // Let both workers pick up their first item, then stop.
    tokio::time::sleep(Duration::from_millis(10)).await;
    queues.shutdown(Duration::from_secs(5)).await;

    let completed = recorder.completed.lock().unwrap();
    assert_eq!(completed.len(), 2);
    assert!(completed.iter().all(|(_, n)| n == "keep"));
    assert_eq!(queues.live_groups(), 0);
}

#[tokio::test(start_paused = true)]
async fn depth_counts_only_waiting_items() {
    let (queues, _) = recording_queues(Duration::from_millis(100));

    assert_eq!(queues.enqueue(episode("a", "g")), 1);
    assert_eq!(queues.enqueue(episode("b", "g")), 2);
    assert_eq!(queues.depth("g"), 2);

    // Once the worker holds "a", the queue reports only "b" waiting.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(queues.depth("g"), 1);

    drained(&queues).await;
    assert_eq!(queues.depth("g"), 0);
}
