use crate::hybrid::HybridSearch;
use crate::types::SearchResponse;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// A response together with the query it answers
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub query: String,
    pub response: SearchResponse,
}

/// Debounced, latest-wins search driver.
///
/// Queries go in through [`SearchPipeline::submit`]; a single consumer task
/// waits for a quiet period, then searches the most recent query. A newer
/// query aborts a search still running for an older one, so only answers to
/// the latest query are delivered. Dropping the handle stops the consumer.
pub struct SearchPipeline {
    queries: UnboundedSender<String>,
    consumer: JoinHandle<()>,
}

impl SearchPipeline {
    #[must_use]
    pub fn spawn(
        engine: Arc<HybridSearch>,
        debounce: Duration,
    ) -> (Self, UnboundedReceiver<QueryResult>) {
        let (query_tx, query_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let consumer = tokio::spawn(consume(engine, debounce, query_rx, result_tx));
        (
            Self {
                queries: query_tx,
                consumer,
            },
            result_rx,
        )
    }

    /// Queue a query; returns false once the consumer has stopped
    pub fn submit(&self, query: impl Into<String>) -> bool {
        self.queries.send(query.into()).is_ok()
    }
}

impl Drop for SearchPipeline {
    fn drop(&mut self) {
        self.consumer.abort();
    }
}

async fn consume(
    engine: Arc<HybridSearch>,
    debounce: Duration,
    mut queries: UnboundedReceiver<String>,
    results: UnboundedSender<QueryResult>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(u64, QueryResult)>();
    let mut generation: u64 = 0;
    let mut pending: Option<String> = None;
    let mut running: Option<JoinHandle<()>> = None;
    let timer = tokio::time::sleep(debounce);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            incoming = queries.recv() => {
                let Some(query) = incoming else { break };
                generation += 1;
                if let Some(stale) = running.take() {
                    stale.abort();
                }
                pending = Some(query);
                timer.as_mut().reset(tokio::time::Instant::now() + debounce);
            }
            () = &mut timer, if pending.is_some() => {
                if let Some(query) = pending.take() {
                    log::debug!("Debounce elapsed, searching '{query}' (generation {generation})");
                    let engine = Arc::clone(&engine);
                    let done = done_tx.clone();
                    let current = generation;
                    running = Some(tokio::spawn(async move {
                        let response = engine.search(&query).await;
                        let _ = done.send((current, QueryResult { query, response }));
                    }));
                }
            }
            Some((finished, result)) = done_rx.recv() => {
                if finished != generation {
                    log::debug!("Dropping stale result for '{}'", result.query);
                    continue;
                }
                running = None;
                if results.send(result).is_err() {
                    break;
                }
            }
        }
    }

    if let Some(task) = running {
        task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::testing::{embedded_blog_corpus, memory_store, BagOfWords};
    use pretty_assertions::assert_eq;

    async fn engine() -> Arc<HybridSearch> {
        Arc::new(
            HybridSearch::new(
                memory_store(embedded_blog_corpus().await),
                Arc::new(BagOfWords::new()),
                SearchConfig::default(),
            )
            .unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_only_the_latest_query() {
        let (pipeline, mut results) = SearchPipeline::spawn(engine().await, Duration::from_millis(300));

        for partial in ["n", "nu", "nux", "nuxt"] {
            assert!(pipeline.submit(partial));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let delivered = results.recv().await.unwrap();
        assert_eq!(delivered.query, "nuxt");
        assert_eq!(delivered.response.results[0].slug, "getting-started-nuxt");

        let extra = tokio::time::timeout(Duration::from_secs(5), results.recv()).await;
        assert!(extra.is_err(), "unexpected second delivery: {extra:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn each_settled_query_is_answered() {
        let (pipeline, mut results) = SearchPipeline::spawn(engine().await, Duration::from_millis(50));

        pipeline.submit("cats");
        let first = results.recv().await.unwrap();
        assert_eq!(first.query, "cats");

        pipeline.submit("typescript");
        let second = results.recv().await.unwrap();
        assert_eq!(second.query, "typescript");
        assert_eq!(second.response.results[0].slug, "typescript-tips");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_consumer() {
        let (pipeline, mut results) = SearchPipeline::spawn(engine().await, Duration::from_millis(50));
        pipeline.submit("nuxt");
        drop(pipeline);

        assert_eq!(results.recv().await, None);
    }
}
