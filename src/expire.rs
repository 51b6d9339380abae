use crate::server::Server;
use crate::store::now_millis;
use rand::seq::IteratorRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Active expiration engine: a background task that periodically samples
/// random deadline-carrying keys and reaps the expired ones, so keys that
/// are never read again still get reclaimed.
pub struct Expirer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Expirer {
    /// Spawn the engine. Every `tick` it runs a sampling pass of
    /// `sample_keys` draws; while a pass finds expired keys in more than
    /// `again_percentage` percent of its draws, another pass runs
    /// immediately, draining backlogs faster than the tick alone would.
    pub fn start(
        server: Arc<Server>,
        tick: Duration,
        sample_keys: u32,
        again_percentage: u32,
    ) -> Expirer {
        let token = CancellationToken::new();
        let stop = token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => {
                        debug!("expirer stopped");
                        return;
                    }
                    _ = interval.tick() => {}
                }
                loop {
                    let deleted = expire_pass(&server, sample_keys).await;
                    if deleted > 0 {
                        trace!(deleted, "expiration pass");
                    }
                    if deleted.saturating_mul(100) / u64::from(sample_keys.max(1))
                        <= u64::from(again_percentage)
                    {
                        break;
                    }
                }
            }
        });
        Expirer { token, handle }
    }

    /// Cancel the engine and wait for the task to wind down.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

/// One sampling pass under a single write guard. Each draw picks a random
/// database that has deadline-carrying keys, then a random such key, and
/// deletes it if its deadline has truly passed. Only actual deletions count
/// toward the repeat threshold.
async fn expire_pass(server: &Server, sample_keys: u32) -> u64 {
    let now = now_millis();
    let mut shared = server.write().await;
    let mut rng = rand::thread_rng();
    let mut deleted = 0u64;

    for _ in 0..sample_keys {
        let candidates: Vec<u64> = shared
            .keyspace
            .db_indexes()
            .filter(|&i| {
                shared
                    .keyspace
                    .db(i)
                    .is_some_and(|db| db.expiring_len() > 0)
            })
            .collect();
        let Some(&index) = candidates.iter().choose(&mut rng) else {
            break;
        };
        let db = shared.keyspace.db_mut(index);
        let Some(key) = db.expiring_keys().choose(&mut rng).cloned() else {
            continue;
        };
        if db.get(&key).is_some_and(|item| item.is_expired(now)) && db.remove(&key) {
            deleted += 1;
        }
    }
    deleted
}
