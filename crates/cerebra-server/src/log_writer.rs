//! The background durable-log writer.
//!
//! The proxy path enqueues a fully populated [`ApiRequest`] and returns
//! immediately: the client response must never wait on durable-store
//! latency. A single task drains the queue, writing each row with bounded
//! retry before giving up and counting it as dropped. The queue itself is
//! bounded; once full, the oldest entry is discarded to make room for the
//! newest one rather than blocking the caller (drop-oldest, not
//! drop-newest — a stalled writer should not silently swallow the most
//! recent activity while clinging to the stalest).

use cerebra_core::ApiRequest;
use cerebra_store::Store;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, warn};

/// Maximum number of not-yet-durable requests held in memory at once.
const QUEUE_CAPACITY: usize = 10_000;

/// Attempts made to write a single row before it is dropped.
const MAX_ATTEMPTS: u32 = 3;

/// Backoff between retry attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

struct Shared {
    queue: Mutex<VecDeque<ApiRequest>>,
    notify: Notify,
    dropped: AtomicU64,
    written: AtomicU64,
}

/// A handle to enqueue completed requests. Cheap to clone; every clone
/// shares the same bounded queue.
#[derive(Clone)]
pub struct LogWriterHandle {
    shared: Arc<Shared>,
}

impl LogWriterHandle {
    /// Enqueue a request for durable logging. Never blocks and never
    /// fails outright: under sustained overload the oldest queued entry is
    /// dropped to make room.
    pub fn enqueue(&self, request: ApiRequest) {
        let mut queue = self.shared.queue.lock();
        if queue.len() >= QUEUE_CAPACITY {
            queue.pop_front();
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("log writer queue full, dropped oldest entry");
        }
        queue.push_back(request);
        drop(queue);
        self.shared.notify.notify_one();
    }

    /// Total rows dropped since startup due to queue overflow.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Total rows successfully written since startup.
    #[must_use]
    pub fn written_count(&self) -> u64 {
        self.shared.written.load(Ordering::Relaxed)
    }

    /// Number of rows currently queued but not yet durable.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().len()
    }
}

/// Spawn the drainer task and return a handle to enqueue onto it.
///
/// The returned `JoinHandle` should be registered with the shutdown
/// coordinator so the process does not exit until the queue is drained.
#[must_use]
pub fn spawn(store: Store) -> (LogWriterHandle, tokio::task::JoinHandle<()>) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY.min(1024))),
        notify: Notify::new(),
        dropped: AtomicU64::new(0),
        written: AtomicU64::new(0),
    });

    let handle = LogWriterHandle { shared: shared.clone() };
    let task = tokio::spawn(drain_loop(shared, store));
    (handle, task)
}

async fn drain_loop(shared: Arc<Shared>, store: Store) {
    loop {
        let next = shared.queue.lock().pop_front();
        let Some(request) = next else {
            shared.notify.notified().await;
            continue;
        };

        if write_with_retry(&store, &request).await {
            shared.written.fetch_add(1, Ordering::Relaxed);
        } else {
            shared.dropped.fetch_add(1, Ordering::Relaxed);
            error!(request_id = %request.id, "giving up on durable log write after retries");
        }
    }
}

/// Drain whatever remains in the queue, for use on graceful shutdown.
/// Returns once the queue is empty.
pub async fn drain_remaining(handle: &LogWriterHandle, store: &Store) {
    loop {
        let next = handle.shared.queue.lock().pop_front();
        let Some(request) = next else { break };
        if write_with_retry(store, &request).await {
            handle.shared.written.fetch_add(1, Ordering::Relaxed);
        } else {
            handle.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

async fn write_with_retry(store: &Store, request: &ApiRequest) -> bool {
    for attempt in 1..=MAX_ATTEMPTS {
        match store.insert_request(request).await {
            Ok(()) => return true,
            Err(error) if attempt < MAX_ATTEMPTS => {
                warn!(%error, attempt, request_id = %request.id, "durable log write failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(error) => {
                error!(%error, request_id = %request.id, "durable log write failed permanently");
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerebra_core::ProviderKind;
    use cerebra_migrations::DatabaseType;
    use rust_decimal_macros::dec;
    use sqlx::any::AnyPoolOptions;

    async fn test_store() -> Store {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        for migration in cerebra_migrations::schema::all_migrations() {
            sqlx::query(&migration.up_sql).execute(&pool).await.unwrap();
        }
        Store::from_pool(pool, DatabaseType::SQLite)
    }

    fn sample_request() -> ApiRequest {
        ApiRequest::new(
            ProviderKind::OpenAI,
            "gpt-4o-mini",
            Some("agent-1".to_string()),
            None,
            None,
            100,
            50,
            dec!(0.000045),
            400,
            200,
        )
    }

    #[tokio::test]
    async fn enqueued_request_eventually_written() {
        let store = test_store().await;
        let (handle, task) = spawn(store.clone());
        handle.enqueue(sample_request());

        for _ in 0..50 {
            if handle.written_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(handle.written_count(), 1);
        task.abort();
    }

    #[test]
    fn queue_drops_oldest_when_full() {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            written: AtomicU64::new(0),
        });
        let handle = LogWriterHandle { shared };
        for _ in 0..QUEUE_CAPACITY + 5 {
            handle.enqueue(sample_request());
        }
        assert_eq!(handle.queue_len(), QUEUE_CAPACITY);
        assert_eq!(handle.dropped_count(), 5);
    }
}
