//! Fan-out/fan-in and pacing helpers for external API calls.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use futures::stream::{self, StreamExt};

/// Run futures with a bounded concurrency window, capturing each outcome
/// independently so one failing call never aborts its siblings.
///
/// Results come back in input order.
pub async fn join_settled<T, F>(concurrency: usize, futures: Vec<F>) -> Vec<Result<T>>
where
    F: Future<Output = Result<T>>,
{
    stream::iter(futures)
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Fixed inter-call delay for sequential lookups against a rate-limited API.
///
/// The first call goes out immediately; every subsequent `wait` sleeps for
/// the configured delay.
pub struct Pacer {
    delay: Duration,
    first: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, first: true }
    }

    pub async fn wait(&mut self) {
        if self.first {
            self.first = false;
        } else {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[tokio::test]
    async fn join_settled_captures_failures_independently() {
        let futures = vec![
            Box::pin(async { Ok(1) }) as std::pin::Pin<Box<dyn Future<Output = Result<i32>>>>,
            Box::pin(async { Err(anyhow!("boom")) }),
            Box::pin(async { Ok(3) }),
        ];

        let results = join_settled(3, futures).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &1);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &3);
    }

    #[tokio::test(start_paused = true)]
    async fn pacer_skips_delay_on_first_call() {
        let mut pacer = Pacer::new(Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
