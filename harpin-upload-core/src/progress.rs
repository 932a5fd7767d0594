//! Read-through progress reporting for the storage transfer.
//!
//! [`ProgressStream`] decorates any byte stream: each chunk is forwarded
//! unchanged and its length is reported to a [`ProgressObserver`]. The
//! observer has no say in the transfer itself.
//!
//! An [`IdleWatch`] attached to the stream records when the last chunk was
//! pulled; [`until_idle`] uses it to bound a transfer by inactivity rather
//! than by its total duration.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::time::Instant;

/// Receives byte counts as a body is consumed.
pub trait ProgressObserver: Send + Sync {
    /// A transfer of `total` bytes is starting. Called again on every retry.
    fn begin(&self, total: u64);

    fn advance(&self, bytes: u64);

    fn finish(&self) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn begin(&self, _total: u64) {}

    fn advance(&self, _bytes: u64) {}
}

/// Time of the most recent activity on a transfer.
#[derive(Debug)]
pub struct IdleWatch {
    origin: Instant,
    last_ms: AtomicU64,
}

impl IdleWatch {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    pub fn touch(&self) {
        let now = self.origin.elapsed().as_millis() as u64;
        self.last_ms.store(now, Ordering::Relaxed);
    }

    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_ms.load(Ordering::Relaxed));
        self.origin.elapsed().saturating_sub(last)
    }
}

impl Default for IdleWatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Awaits `fut` for as long as `watch` keeps being touched.
///
/// Returns `None` once `limit` has passed without any activity. A future that
/// keeps making progress is never cut short, however long it runs.
pub async fn until_idle<F>(fut: F, watch: &IdleWatch, limit: Duration) -> Option<F::Output>
where
    F: Future,
{
    tokio::pin!(fut);
    loop {
        let idle = watch.idle_for();
        if idle >= limit {
            return None;
        }
        tokio::select! {
            out = &mut fut => return Some(out),
            _ = tokio::time::sleep(limit - idle) => {}
        }
    }
}

pub struct ProgressStream<S> {
    inner: S,
    observer: Arc<dyn ProgressObserver>,
    watch: Option<Arc<IdleWatch>>,
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            inner,
            observer,
            watch: None,
        }
    }

    /// Touches `watch` on every chunk pulled from the inner stream.
    pub fn watched(mut self, watch: Arc<IdleWatch>) -> Self {
        self.watch = Some(watch);
        self
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(Some(Ok(chunk))) = &polled {
            self.observer.advance(chunk.len() as u64);
            if let Some(watch) = &self.watch {
                watch.touch();
            }
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
