//! Live views over the query cache.
//!
//! [`observe`] spawns one task per consumer that keeps a key's value
//! current: it fetches on start, again on every poll tick, and whenever
//! the key is invalidated. Direct writes are forwarded without a fetch.
//! Dropping the returned [`QueryWatch`] stops the task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::error::Result;
use crate::query::{QueryClient, QueryEvent, QueryKey};

/// Latest value of one query key, kept fresh by a background task.
pub struct QueryWatch<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
    task: JoinHandle<()>,
}

impl<T> QueryWatch<T> {
    /// Most recent value, `None` until the first successful fetch.
    pub fn latest(&self) -> Option<Arc<T>> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. `None` once the watch has stopped.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.rx.changed().await.ok()?;
        self.latest()
    }
}

impl<T> Drop for QueryWatch<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Keep `key` fresh for as long as the returned watch lives.
///
/// With an `interval` the key is refetched on every tick, the first one
/// immediately. Without one it is loaded once (from cache when fresh) and
/// then only refetched on invalidation.
pub fn observe<T, F, Fut>(
    queries: QueryClient,
    key: QueryKey,
    interval: Option<Duration>,
    fetcher: F,
) -> QueryWatch<T>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let (tx, rx) = watch::channel(queries.cached::<T>(&key));
    let mut events = queries.subscribe();

    let task = tokio::spawn(async move {
        let mut ticker = interval.map(|period| {
            let mut t = tokio::time::interval(period);
            t.set_missed_tick_behavior(MissedTickBehavior::Delay);
            t
        });

        if ticker.is_none() {
            match queries.ensure(key.clone(), &fetcher).await {
                Ok(value) => publish(&tx, value),
                Err(e) => debug!(key = %key, error = %e, "Initial load failed"),
            }
        }

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    refetch(&queries, &key, &fetcher, &tx).await;
                }
                event = events.recv() => match event {
                    Ok(QueryEvent::Invalidated(k)) if k == key => {
                        refetch(&queries, &key, &fetcher, &tx).await;
                    }
                    Ok(QueryEvent::Updated(k)) if k == key => {
                        if let Some(value) = queries.cached::<T>(&key) {
                            publish(&tx, value);
                        }
                    }
                    Ok(QueryEvent::Cleared) => {
                        tx.send_replace(None);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        trace!(key = %key, skipped, "Observer lagged, refetching");
                        refetch(&queries, &key, &fetcher, &tx).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    QueryWatch { rx, task }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn refetch<T, F, Fut>(
    queries: &QueryClient,
    key: &QueryKey,
    fetcher: &F,
    tx: &watch::Sender<Option<Arc<T>>>,
) where
    T: Send + Sync + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    match queries.fetch(key.clone(), fetcher).await {
        Ok(value) => publish(tx, value),
        // Keep showing the last good value; the next tick retries.
        Err(e) => debug!(key = %key, error = %e, "Refetch failed"),
    }
}

fn publish<T>(tx: &watch::Sender<Option<Arc<T>>>, value: Arc<T>) {
    tx.send_if_modified(|current| match current {
        Some(existing) if Arc::ptr_eq(existing, &value) => false,
        _ => {
            *current = Some(value);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(calls: &Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<Result<usize>> + Send + Sync + 'static {
        let calls = calls.clone();
        move || std::future::ready(Ok(calls.fetch_add(1, Ordering::SeqCst) + 1))
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_every_interval() {
        let queries = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut watch = observe(
            queries.clone(),
            QueryKey::GlobalMessages,
            Some(Duration::from_secs(3)),
            counting(&calls),
        );

        assert_eq!(*watch.changed().await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(*watch.latest().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_triggers_refetch_without_interval() {
        let queries = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut watch = observe(
            queries.clone(),
            QueryKey::CurrentUserProfile,
            None,
            counting(&calls),
        );

        assert_eq!(*watch.changed().await.unwrap(), 1);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        queries.invalidate(&QueryKey::CurrentUserProfile);
        assert_eq!(*watch.changed().await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn direct_writes_reach_observers() {
        let queries = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut watch = observe(queries.clone(), QueryKey::SiteLogo, None, counting(&calls));
        watch.changed().await;

        queries.set_data(QueryKey::SiteLogo, 42usize);
        assert_eq!(*watch.changed().await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_watch_stops_polling() {
        let queries = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut watch = observe(
            queries.clone(),
            QueryKey::GlobalMessages,
            Some(Duration::from_secs(3)),
            counting(&calls),
        );
        watch.changed().await;
        drop(watch);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
