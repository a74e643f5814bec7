//! Bounded consumption of page streams

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::info;

use crate::error::Result;
use crate::types::Page;

pin_project! {
    /// Stream adapter that stops after a fixed number of pages
    ///
    /// Once the limit is reached the wrapped stream is never polled again.
    #[must_use = "streams do nothing unless polled"]
    pub struct LimitPages<S> {
        #[pin]
        inner: S,
        resource: String,
        limit: Option<usize>,
        count: usize,
        finished: bool,
    }
}

impl<S> LimitPages<S> {
    /// Wrap `inner`, yielding at most `limit` pages (all pages for `None`)
    pub fn new(inner: S, resource: impl Into<String>, limit: Option<usize>) -> Self {
        Self {
            inner,
            resource: resource.into(),
            limit,
            count: 0,
            finished: false,
        }
    }

    /// Pages yielded so far
    pub fn pages_yielded(&self) -> usize {
        self.count
    }

    /// Whether the adapter has stopped, by limit or exhaustion
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Configured limit
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl<S> Stream for LimitPages<S>
where
    S: Stream<Item = Result<Page>>,
{
    type Item = Result<Page>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        if let Some(limit) = *this.limit {
            if *this.count >= limit {
                info!("Reached page limit of {} for {}", limit, this.resource);
                info!(
                    "Total pages processed for {}: {}",
                    this.resource, this.count
                );
                *this.finished = true;
                return Poll::Ready(None);
            }
        }

        match this.inner.poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(page))) => {
                info!("Retrieved page {} for {}", *this.count + 1, this.resource);
                *this.count += 1;
                Poll::Ready(Some(Ok(page)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => {
                info!(
                    "Total pages processed for {}: {}",
                    this.resource, this.count
                );
                *this.finished = true;
                Poll::Ready(None)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let (lower, upper) = self.inner.size_hint();
        match self.limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.count);
                (
                    lower.min(remaining),
                    Some(upper.map_or(remaining, |u| u.min(remaining))),
                )
            }
            None => (lower, upper),
        }
    }
}

/// Cap a page stream at `limit` pages, logging progress under `resource`
pub fn limit_pages<S>(inner: S, resource: impl Into<String>, limit: Option<usize>) -> LimitPages<S>
where
    S: Stream<Item = Result<Page>>,
{
    LimitPages::new(inner, resource, limit)
}
